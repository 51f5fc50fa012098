// src/lib.rs

//! modstack — incremental updater for layered game and mod installations
//!
//! Reconciles a locally installed file tree against remotely published
//! versions of an ordered list of components (the base game, then mods
//! layered on top) and applies full-replacement patch archives in manifest
//! order:
//!
//! - Per-component version tracking with base-version compatibility checks
//! - Change-aware extraction: byte-identical files are never rewritten
//! - Forced re-application cascades downstream once an upstream layer changed
//! - zip and password-protected 7z patch containers
//!
//! # No rollback
//!
//! A run that fails partway — an incompatible version or an I/O error —
//! leaves already-applied components in place and the destination tree
//! possibly mid-patch. The manifest is only rewritten after a fully
//! successful run, so the next run re-derives what is still outstanding;
//! recovering a broken tree beyond that is a manual job.

pub mod archive;
pub mod config;
mod error;
pub mod extract;
pub mod fingerprint;
pub mod transport;
pub mod updater;
pub mod version;

pub use archive::{ArchiveEntry, ArchiveFormat, PatchArchive};
pub use config::{Component, UpdaterConfig};
pub use error::{Error, Result};
pub use extract::{apply_archive, apply_entry, EntryAction, ExtractStats};
pub use fingerprint::Fingerprint;
pub use transport::{HttpTransport, Transport};
pub use updater::{ComponentOutcome, ComponentReport, PasswordPrompt, StdinPrompt, Updater};
pub use version::{base_version, classify, VersionStatus};
