//! Diagnostic logging setup
//!
//! Logging is owned by an explicit [`Logging`] handle rather than a
//! process-wide global: the subscriber is active while the handle lives and
//! is removed when it is closed or dropped. Events go to stderr so they never
//! mix with data written to stdout.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{ErrorCategory, Result, SealboxError};

/// Environment variable holding a `tracing` filter directive, e.g. `sealbox=debug`.
pub const LOG_ENV: &str = "SEALBOX_LOG";

/// Default filter when neither the environment nor the caller provides one.
pub const DEFAULT_LEVEL: &str = "warn";

/// An installed log subscriber.
#[must_use = "logging stops when the handle is dropped"]
pub struct Logging {
    guard: DefaultGuard,
}

impl Logging {
    /// Install a stderr subscriber for the current thread.
    ///
    /// `SEALBOX_LOG` takes precedence over `level` when set and valid.
    pub fn init(level: &str) -> Result<Self> {
        let filter = match EnvFilter::try_from_env(LOG_ENV) {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(level).map_err(|e| {
                SealboxError::with_source(
                    ErrorCategory::User,
                    format!("invalid log level {:?}", level),
                    e,
                )
            })?,
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();

        Ok(Self {
            guard: tracing::subscriber::set_default(subscriber),
        })
    }

    /// Uninstall the subscriber.
    pub fn close(self) {
        drop(self.guard);
    }
}
