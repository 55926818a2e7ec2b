//! Key reading functionality
//!
//! Keys are exchanged as hex text. Readers that consume text trim
//! surrounding ASCII whitespace (a trailing newline in a key file is normal)
//! before strict hex parsing.

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};
use crate::key::Key;
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for obtaining a key from various sources
pub trait KeyReader {
    fn read_key(&mut self) -> Result<Key>;
}

/// Returns a fixed key (for testing)
pub struct ConstantKeyReader {
    key: Key,
}

impl ConstantKeyReader {
    pub fn new(key: Key) -> Self {
        Self { key }
    }
}

impl KeyReader for ConstantKeyReader {
    fn read_key(&mut self) -> Result<Key> {
        Ok(self.key.clone())
    }
}

/// Reads a hex key from any io::Read source (stdin, a key file)
pub struct ReaderKeyReader {
    reader: Box<dyn Read>,
}

impl ReaderKeyReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl KeyReader for ReaderKeyReader {
    fn read_key(&mut self) -> Result<Key> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading key: {}", e),
                e,
            )
        })?;
        Key::from_hex(data.trim_ascii())
    }
}

/// Reads a hex key from the terminal with no echo
pub struct TerminalKeyReader;

impl TerminalKeyReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalKeyReader {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyReader for TerminalKeyReader {
    fn read_key(&mut self) -> Result<Key> {
        if !io::stdin().is_terminal() {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::KeyUnavailable,
                "cannot read key from terminal - stdin is not a terminal",
            ));
        }

        io::stderr().write_all(b"Key (hex, sealbox): ").map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write prompt: {}", e),
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        let line = Zeroizing::new(rpassword::read_password().map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::KeyUnavailable,
                format!("failure reading key: {}", e),
                e,
            )
        })?);

        Key::from_hex(line.trim())
    }
}
