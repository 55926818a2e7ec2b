//! File encryption/decryption operations
//!
//! High-level operations for sealing, opening, and updating files holding a
//! single secretbox ciphertext blob (`nonce || box`, no framing).

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};
use crate::key::Key;
use crate::keysource::KeyReader;
use crate::secretbox::SecretBox;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Encrypt a file
///
/// Reads plaintext from `input_path`, encrypts it under the key from
/// `key_reader`, and writes the ciphertext blob to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    key_reader: &mut dyn KeyReader,
) -> Result<()> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let sbox = SecretBox::new(key_reader.read_key()?);
    let ciphertext = sbox
        .encrypt(&plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, &ciphertext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(output = %output_path.display(), bytes = ciphertext.len(), "encrypted file");
    Ok(())
}

/// Decrypt a file
///
/// Reads a ciphertext blob from `input_path`, decrypts it under the key from
/// `key_reader`, and writes the plaintext to `output_path`. Nothing is written
/// if authentication fails.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    key_reader: &mut dyn KeyReader,
) -> Result<()> {
    let ciphertext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let sbox = SecretBox::new(key_reader.read_key()?);
    let plaintext = sbox
        .decrypt(&ciphertext)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::info!(output = %output_path.display(), bytes = plaintext.len(), "decrypted file");
    Ok(())
}

/// Update an encrypted file with new plaintext under the same key
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the key
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext under a fresh nonce
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// Either the old file or the new file exists afterwards, never a partial one.
/// Validating first prevents accidentally re-keying a file.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    key_reader: &mut dyn KeyReader,
) -> Result<()> {
    let existing = fs::read(crypt_path).map_err(|e| read_error(crypt_path, e))?;
    let sbox = SecretBox::new(key_reader.read_key()?);

    // Validate the key by decrypting the existing file (discard plaintext)
    sbox.decrypt(&existing)
        .map_err(|e| e.with_context("failed to decrypt"))?;

    let new_plaintext = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let new_ciphertext = sbox
        .encrypt(&new_plaintext)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    replace_file_atomic(crypt_path, &new_ciphertext)?;

    tracing::info!(output = %crypt_path.display(), bytes = new_ciphertext.len(), "updated file");
    Ok(())
}

/// Write a key as hex text (with trailing newline) to `path`, mode 0o600 on Unix.
pub fn write_key_file(path: &Path, key: &Key) -> Result<()> {
    let mut text = key.to_hex();
    text.push('\n');
    write_file_secure(path, text.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write key to {}", path.display())))
}

fn replace_file_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "target path has no parent directory",
            ));
        }
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| io_error("failed to create tempfile", e))?;
    temp_file
        .write_all(contents)
        .map_err(|e| io_error("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename, if it succeeds, always points
    // to a complete file.
    temp_file
        .flush()
        .map_err(|e| io_error("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error("failed to sync file prior to rename", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error("failed to set tempfile permissions", e))?;
    }

    temp_file.persist(target).map_err(|e| {
        io_error(
            format!("failed to rename to target file {}", target.display()),
            e.error,
        )
    })?;
    Ok(())
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::OpenOptionsExt;

        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
    }
    .map_err(|e| open_error(path, e))?;

    // mode() only applies on creation; an existing file keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error(format!("failed to set permissions on {}", path.display()), e))?;
    }

    #[cfg(not(unix))]
    let mut file = fs::File::create(path).map_err(|e| open_error(path, e))?;

    file.write_all(contents)
        .map_err(|e| io_error(format!("failed to write {}", path.display()), e))
}

fn io_error(msg: impl Into<String>, err: io::Error) -> SealboxError {
    SealboxError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}

fn open_error(path: &Path, err: io::Error) -> SealboxError {
    SealboxError::with_kind_and_source(
        ErrorCategory::User,
        ErrorKind::Io,
        format!("failed to open {}", path.display()),
        err,
    )
}

fn read_error(path: &Path, err: io::Error) -> SealboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    SealboxError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KEY_LEN;
    use crate::keysource::ConstantKeyReader;
    use crate::secretbox::OVERHEAD;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    fn reader(byte: u8) -> ConstantKeyReader {
        ConstantKeyReader::new(Key::from([byte; KEY_LEN]))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.sealbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        let plaintext = b"Hello, sealbox!";
        fs::write(&plain_path, plaintext).unwrap();

        encrypt_file(&plain_path, &crypt_path, &mut reader(1)).unwrap();
        assert_eq!(
            fs::metadata(&crypt_path).unwrap().len() as usize,
            plaintext.len() + OVERHEAD
        );

        decrypt_file(&crypt_path, &decrypted_path, &mut reader(1)).unwrap();
        let decrypted = fs::read(&decrypted_path).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_update_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.txt");
        let plain2_path = temp_dir.path().join("plain2.txt");
        let crypt_path = temp_dir.path().join("crypt.sealbox");

        fs::write(&plain1_path, b"Initial content").unwrap();
        encrypt_file(&plain1_path, &crypt_path, &mut reader(1)).unwrap();

        fs::write(&plain2_path, b"Updated content").unwrap();
        update_file(&plain2_path, &crypt_path, &mut reader(1)).unwrap();

        let decrypted_path = temp_dir.path().join("decrypted.txt");
        decrypt_file(&crypt_path, &decrypted_path, &mut reader(1)).unwrap();

        let decrypted = fs::read(&decrypted_path).unwrap();
        assert_eq!(decrypted, b"Updated content");
    }

    #[test]
    fn test_update_with_wrong_key_fails() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.txt");
        let plain2_path = temp_dir.path().join("plain2.txt");
        let crypt_path = temp_dir.path().join("crypt.sealbox");

        fs::write(&plain1_path, b"Initial").unwrap();
        encrypt_file(&plain1_path, &crypt_path, &mut reader(1)).unwrap();
        let before = fs::read(&crypt_path).unwrap();

        fs::write(&plain2_path, b"Updated").unwrap();
        let err = update_file(&plain2_path, &crypt_path, &mut reader(2))
            .expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));

        // Existing file is left untouched
        assert_eq!(fs::read(&crypt_path).unwrap(), before);
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.sealbox");

        fs::write(&plain_path, b"test").unwrap();
        encrypt_file(&plain_path, &crypt_path, &mut reader(1)).unwrap();

        let mode = fs::metadata(&crypt_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        update_file(&plain_path, &crypt_path, &mut reader(1)).unwrap();
        let mode = fs::metadata(&crypt_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    #[cfg(unix)]
    fn test_existing_output_permissions_tightened() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.sealbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");
        let key_path = temp_dir.path().join("key.hex");

        fs::write(&plain_path, b"private").unwrap();
        for path in [&crypt_path, &decrypted_path, &key_path] {
            fs::write(path, b"stale contents").unwrap();
            fs::set_permissions(path, fs::Permissions::from_mode(0o644)).unwrap();
        }

        encrypt_file(&plain_path, &crypt_path, &mut reader(1)).unwrap();
        decrypt_file(&crypt_path, &decrypted_path, &mut reader(1)).unwrap();
        write_key_file(&key_path, &Key::from([1u8; KEY_LEN])).unwrap();

        for path in [&crypt_path, &decrypted_path, &key_path] {
            let mode = fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
        }
        assert_eq!(fs::read(&decrypted_path).unwrap(), b"private");
    }

    #[test]
    fn test_decrypt_wrong_key_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.sealbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, b"secret").unwrap();
        encrypt_file(&plain_path, &crypt_path, &mut reader(1)).unwrap();

        let err = decrypt_file(&crypt_path, &decrypted_path, &mut reader(2))
            .expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert!(!decrypted_path.exists());
    }

    #[test]
    fn test_decrypt_truncated_file() {
        let temp_dir = TempDir::new().unwrap();
        let crypt_path = temp_dir.path().join("short.sealbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&crypt_path, [0u8; 10]).unwrap();

        let err = decrypt_file(&crypt_path, &decrypted_path, &mut reader(1))
            .expect_err("expected invalid ciphertext");
        assert_eq!(err.kind, Some(ErrorKind::InvalidCiphertext));
    }

    #[test]
    fn test_missing_input_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.txt");
        let output = temp_dir.path().join("out.sealbox");

        let err = encrypt_file(&missing, &output, &mut reader(1))
            .expect_err("expected read failure");
        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert_eq!(err.category, ErrorCategory::User);
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("empty.txt");
        let crypt_path = temp_dir.path().join("empty.sealbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, b"").unwrap();
        encrypt_file(&plain_path, &crypt_path, &mut reader(1)).unwrap();
        decrypt_file(&crypt_path, &decrypted_path, &mut reader(1)).unwrap();

        let decrypted = fs::read(&decrypted_path).unwrap();
        assert_eq!(decrypted, b"");
    }

    #[test]
    fn test_key_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let key_path = temp_dir.path().join("key.hex");
        let key = Key::generate().unwrap();

        write_key_file(&key_path, &key).unwrap();

        let text = fs::read_to_string(&key_path).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(Key::from_hex(text.trim_end()).unwrap(), key);

        #[cfg(unix)]
        {
            let mode = fs::metadata(&key_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
