//! Sealbox CLI - authenticated file encryption under a shared key
//!
//! Command-line interface for encrypting and decrypting files using
//! NaCl secretbox (XSalsa20Poly1305) with a 32-byte hex key.

use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use sealbox::file_ops;
use sealbox::keysource::{KeyReader, ReaderKeyReader, TerminalKeyReader};
use sealbox::logging::{self, Logging};
use sealbox::{ErrorCategory, ErrorKind, Key, Result, SealboxError};

#[derive(Parser)]
#[command(name = "sealbox")]
#[command(version)]
#[command(about = "Authenticated file encryption with a shared key.", long_about = None)]
struct Cli {
    /// Read the hex key from stdin instead of from terminal (overrides --key-file)
    #[arg(long, global = true)]
    key_stdin: bool,

    /// Read the hex key from a file
    #[arg(long, global = true, value_name = "FILE", env = "SEALBOX_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Log filter used when SEALBOX_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = logging::DEFAULT_LEVEL)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the ciphertext to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file whose contents is to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the plaintext to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Update an encrypted file with new content, while validating
    /// that the key is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing sealbox file to replace with the new ciphertext
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Generate a fresh random key
    Keygen {
        /// Write the hex key to this file (mode 0600) instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let logging = match Logging::init(&cli.log_level) {
        Ok(logging) => logging,
        Err(e) => exit_with(&e),
    };

    let result = run(cli);
    logging.close();

    if let Err(e) = result {
        exit_with(&e);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Encrypt { input, output } => {
            let mut reader = get_key_reader(cli.key_stdin, cli.key_file.as_deref())?;
            file_ops::encrypt_file(&input, &output, &mut *reader)
        }
        Commands::Decrypt { input, output } => {
            let mut reader = get_key_reader(cli.key_stdin, cli.key_file.as_deref())?;
            file_ops::decrypt_file(&input, &output, &mut *reader)
        }
        Commands::Update { input, output } => {
            let mut reader = get_key_reader(cli.key_stdin, cli.key_file.as_deref())?;
            file_ops::update_file(&input, &output, &mut *reader)
        }
        Commands::Keygen { output } => {
            let key = Key::generate()?;
            match output {
                Some(path) => file_ops::write_key_file(&path, &key),
                None => {
                    let mut stdout = io::stdout().lock();
                    writeln!(stdout, "{}", key.to_hex().as_str()).map_err(|e| {
                        SealboxError::with_kind_and_source(
                            ErrorCategory::Internal,
                            ErrorKind::Io,
                            "failed to write key to stdout",
                            e,
                        )
                    })
                }
            }
        }
    }
}

fn get_key_reader(use_stdin: bool, key_file: Option<&Path>) -> Result<Box<dyn KeyReader>> {
    if use_stdin {
        return Ok(Box::new(ReaderKeyReader::new(Box::new(io::stdin()))));
    }
    match key_file {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                SealboxError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::KeyUnavailable,
                    format!("failed to open key file {}", path.display()),
                    e,
                )
            })?;
            Ok(Box::new(ReaderKeyReader::new(Box::new(file))))
        }
        None => Ok(Box::new(TerminalKeyReader::new())),
    }
}

fn exit_with(err: &SealboxError) -> ! {
    let mut msg = err.message().to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    eprintln!("Error: {}", msg);
    process::exit(1);
}
