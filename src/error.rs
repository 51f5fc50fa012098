// src/error.rs

//! Error types for the updater
//!
//! Every fatal condition aborts the whole reconciliation pass. There is no
//! automatic rollback: files already written by earlier components stay in
//! place, and the manifest is only rewritten after a fully successful run.

use thiserror::Error;

/// Errors that can occur during a reconciliation pass
#[derive(Error, Debug)]
pub enum Error {
    /// Locator unreachable or stream truncated
    #[error("download failed: {0}")]
    DownloadError(String),

    /// Container headers are malformed or the format is unsupported
    #[error("unreadable archive '{path}': {reason}")]
    ArchiveFormatError { path: String, reason: String },

    /// A specific entry's content stream could not be decoded
    #[error("failed to decode archive entry '{path}': {reason}")]
    ArchiveEntryError { path: String, reason: String },

    /// Wrong or missing password for an encrypted archive
    ///
    /// Kept separate from [`Error::ArchiveEntryError`] so the user can be
    /// told to re-enter the password on the next run instead of assuming
    /// the download is corrupt.
    #[error("wrong or missing password for '{0}'")]
    BadPassword(String),

    /// Recorded and remote versions live on different base versions
    ///
    /// An incremental patch cannot bridge this; a fresh install is required.
    #[error(
        "'{component}' is at {recorded} but the remote offers {remote}; \
         this update cannot be applied incrementally, reinstall manually"
    )]
    IncompatibleVersion {
        component: String,
        recorded: String,
        remote: String,
    },

    /// Manifest could not be parsed or serialized
    #[error("manifest error: {0}")]
    ConfigError(String),

    /// Filesystem failure during extraction or persistence
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
