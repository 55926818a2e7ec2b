//! Authenticated encryption using NaCl secretbox (XSalsa20Poly1305)
//!
//! The binary format is:
//! - nonce: 24 bytes
//! - sealed box: variable length (16-byte Poly1305 tag followed by the
//!   XSalsa20 ciphertext, the canonical NaCl layout)
//!
//! A fresh random nonce is drawn for every encryption, so the output for a
//! given key and plaintext differs on every call.

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};
use crate::key::Key;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Bytes added to a plaintext by [`SecretBox::encrypt`]
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Seals and opens byte payloads under a single fixed key.
///
/// Holds no mutable state, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct SecretBox {
    key: Key,
}

impl SecretBox {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// Build a box from a 64-character hex key.
    pub fn from_hex_key(hex: &str) -> Result<Self> {
        Ok(Self::new(Key::from_hex(hex)?))
    }

    /// Encrypt plaintext under a nonce drawn from the OS random source
    ///
    /// Returns the binary format: nonce(24) + sealedbox(plaintext + 16)
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_with_rng(&mut OsRng, plaintext)
    }

    /// Encrypt plaintext under a nonce drawn from `rng`.
    ///
    /// If `rng` fails, the whole operation fails with
    /// [`ErrorKind::RandomSource`].
    pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        rng.try_fill_bytes(&mut nonce).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::RandomSource,
                "failed to generate nonce",
                e,
            )
        })?;

        self.encrypt_deterministic(plaintext, &nonce)
    }

    /// Encrypt plaintext using the provided nonce
    ///
    /// This function is ONLY for testing purposes to generate deterministic output.
    /// NEVER use this in production - reusing a nonce under the same key breaks
    /// both confidentiality and authenticity. Use `encrypt()` instead.
    #[doc(hidden)]
    pub fn encrypt_deterministic(
        &self,
        plaintext: &[u8],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        let sealed_box = self
            .cipher()
            .encrypt(&Nonce::from(*nonce), plaintext)
            .map_err(|e| {
                SealboxError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::SecretboxFailure,
                    format!("encryption failed: {}", e),
                )
            })?;

        let mut output = Vec::with_capacity(NONCE_LEN + sealed_box.len());
        output.extend_from_slice(nonce);
        output.extend_from_slice(&sealed_box);

        tracing::debug!(plaintext_len = plaintext.len(), "sealed payload");
        Ok(output)
    }

    /// Decrypt ciphertext produced by [`SecretBox::encrypt`].
    ///
    /// Any failure after the nonce has been read is reported as
    /// [`ErrorKind::AuthenticationFailed`] without further detail.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidCiphertext,
                "input likely truncated while reading nonce",
            ));
        }
        let (nonce, sealed_box) = ciphertext.split_at(NONCE_LEN);

        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), sealed_box)
            .map_err(|_| {
                tracing::debug!(ciphertext_len = ciphertext.len(), "secretbox open failed");
                SealboxError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::AuthenticationFailed,
                    "corrupt input, tampered-with data, or wrong key",
                )
            })?;

        tracing::debug!(plaintext_len = plaintext.len(), "opened payload");
        Ok(plaintext)
    }

    fn cipher(&self) -> XSalsa20Poly1305 {
        XSalsa20Poly1305::new(&(*self.key.as_bytes()).into())
    }
}
