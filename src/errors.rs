//! Unified error type for the inventory core.
//!
//! Storage-engine and file-system failures are translated into the small set of
//! outcomes a presentation layer can act on (not found, conflict, validation,
//! locked resource, authentication) instead of leaking raw driver errors.

use sea_orm::{DbErr, SqlErr};
use std::path::Path;
use thiserror::Error;

/// All errors surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A record, profile or backup does not exist
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of thing that was looked up (e.g. `"product"`, `"profile"`)
        entity: &'static str,
        /// Identifier that failed to resolve
        key: String,
    },

    /// A name or folder is already taken
    #[error("{entity} already exists: {key}")]
    Conflict {
        /// Kind of thing that collided
        entity: &'static str,
        /// The conflicting name
        key: String,
    },

    /// A required field is missing or malformed
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A numeric field is negative, non-finite or out of range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected value
        amount: f64,
    },

    /// A file or the database is held by someone else; retry later
    #[error("Resource is in use, retry later: {path}")]
    LockedResource {
        /// The file or database that could not be accessed
        path: String,
    },

    /// The entered password did not decrypt the validation phrase
    #[error("Authentication failed")]
    AuthFailure,

    /// The active profile is password protected and has not been unlocked
    #[error("Session is locked")]
    SessionLocked,

    /// No profile is currently open
    #[error("No profile is open")]
    NoActiveProfile,

    /// Settings or profile configuration could not be read or written
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable reason
        message: String,
    },

    /// Key derivation or encryption failed for reasons other than a wrong password
    #[error("Crypto error: {message}")]
    Crypto {
        /// Human-readable reason
        message: String,
    },

    /// Any other storage failure
    #[error("Database error: {message}")]
    Database {
        /// Driver message
        message: String,
    },

    /// File-system failure on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
}

impl Error {
    /// Wraps an I/O error with the path it happened on, classifying lock and
    /// sharing violations as [`Error::LockedResource`].
    pub fn io(source: std::io::Error, path: &Path) -> Self {
        if is_lock_violation(&source) {
            return Self::LockedResource {
                path: path.display().to_string(),
            };
        }
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns a closure suitable for `map_err` that attaches `path`.
    pub fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |e| Self::io(e, path)
    }

    /// True for outcomes the user can retry without changing their input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockedResource { .. })
    }
}

fn is_lock_violation(err: &std::io::Error) -> bool {
    // ERROR_SHARING_VIOLATION (32) and ERROR_LOCK_VIOLATION (33)
    #[cfg(windows)]
    if matches!(err.raw_os_error(), Some(32 | 33)) {
        return true;
    }
    err.kind() == std::io::ErrorKind::ResourceBusy
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
            return Self::Conflict {
                entity: "record",
                key: message,
            };
        }
        match err {
            DbErr::RecordNotFound(key) => Self::NotFound {
                entity: "record",
                key,
            },
            other => {
                let message = other.to_string();
                if message.contains("database is locked") || message.contains("database table is locked")
                {
                    Self::LockedResource {
                        path: "database".to_string(),
                    }
                } else {
                    Self::Database { message }
                }
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            message: format!("Invalid profile configuration: {err}"),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
