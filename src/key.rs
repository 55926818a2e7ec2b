//! Secret key material for the secretbox construction
//!
//! A [`Key`] is exactly 32 bytes. It can be built from raw bytes, parsed from
//! a 64-character hex string, or generated from the OS random source. Key
//! bytes are wiped from memory on drop and are never printed by `Debug`.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};

/// Length of a secretbox key in bytes
pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded key.
    ///
    /// The input must be valid hexadecimal (either case) decoding to exactly
    /// [`KEY_LEN`] bytes. No whitespace is accepted; callers reading keys
    /// from files should trim first.
    pub fn from_hex(hex: impl AsRef<[u8]>) -> Result<Self> {
        let decoded = Zeroizing::new(hex::decode(hex.as_ref()).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidEncoding,
                "key is not valid hex",
                e,
            )
        })?);

        if decoded.len() != KEY_LEN {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidKeyLength,
                format!(
                    "key must be {} bytes, got {} bytes",
                    KEY_LEN,
                    decoded.len()
                ),
            ));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&decoded);
        Ok(Self(key))
    }

    /// Generate a fresh key from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; KEY_LEN];
        OsRng.try_fill_bytes(&mut key).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::RandomSource,
                "failed to generate key",
                e,
            )
        })?;
        Ok(Self(key))
    }

    /// Lowercase hex encoding of the key, wiped when dropped.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for Key {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl FromStr for Key {
    type Err = SealboxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Constant-time comparison.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}
