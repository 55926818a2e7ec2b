//! Sealbox - authenticated symmetric encryption using NaCl secretbox
//!
//! ```
//! use sealbox::{Key, SecretBox};
//!
//! let sbox = SecretBox::new(Key::from([0u8; 32]));
//! let ciphertext = sbox.encrypt(b"hello").unwrap();
//! assert_eq!(ciphertext.len(), 24 + 5 + 16);
//! assert_eq!(sbox.decrypt(&ciphertext).unwrap(), b"hello");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod file_ops;
pub mod key;
pub mod keysource;
pub mod logging;
pub mod secretbox;

pub use error::{ErrorCategory, ErrorKind, Result, SealboxError};
pub use key::{KEY_LEN, Key};
pub use secretbox::{NONCE_LEN, OVERHEAD, SecretBox, TAG_LEN};
