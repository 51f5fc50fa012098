// src/updater.rs

//! Update reconciliation across the ordered component list
//!
//! Components are layered: each patch applies on top of the file state left
//! by everything before it in the manifest. The orchestrator walks the list
//! strictly in order and threads a *cascade* accumulator through the walk:
//! once any earlier component's content actually changed, every later
//! component is re-applied regardless of its recorded version, because
//! version equality alone cannot prove its files were not overwritten by the
//! upstream change.
//!
//! The first incompatible version or I/O failure aborts the whole run.
//! Components applied earlier in the same run are left in place; the
//! manifest is only rewritten by the caller after a fully successful run, so
//! a failed run never records progress it did not make.

use crate::archive::{ArchiveFormat, PatchArchive};
use crate::config::{Component, UpdaterConfig};
use crate::error::{Error, Result};
use crate::extract::{apply_archive, ExtractStats};
use crate::transport::{download_progress_bar, Transport};
use crate::version::{classify, VersionStatus};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reserved filename the remote version string is downloaded to
const VERSION_DOWNLOAD_NAME: &str = "_version.txt";

/// All reserved temp filenames, removed on every exit path
const TEMP_ARTIFACTS: [&str; 3] = ["_patch.zip", "_patch.7z", VERSION_DOWNLOAD_NAME];

/// Supplies a password when an encrypted archive is first encountered
pub trait PasswordPrompt {
    /// Ask the user for the password of `component`
    ///
    /// An empty answer means "no password".
    fn read_password(&self, component: &str) -> Result<String>;
}

/// Interactive prompt reading from standard input
pub struct StdinPrompt;

impl PasswordPrompt for StdinPrompt {
    fn read_password(&self, component: &str) -> Result<String> {
        println!("Provide password for {component}:");
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::IoError(format!("failed to read password: {e}")))?;
        Ok(line.trim().to_string())
    }
}

/// Terminal state of one component after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOutcome {
    /// Already up to date; nothing touched
    Skipped,
    /// Patch applied, with the resulting write/skip counts
    Applied(ExtractStats),
}

/// Per-component result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentReport {
    pub name: String,
    pub outcome: ComponentOutcome,
}

/// Removes reserved temp files when dropped, on success and failure alike
struct TempArtifacts {
    root: PathBuf,
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        for name in TEMP_ARTIFACTS {
            let path = self.root.join(name);
            if path.is_file() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Drives one reconciliation pass over the component list
pub struct Updater<'a, T: Transport, P: PasswordPrompt> {
    transport: &'a T,
    prompt: &'a P,
    dest_root: PathBuf,
    show_progress: bool,
}

impl<'a, T: Transport, P: PasswordPrompt> Updater<'a, T, P> {
    pub fn new(transport: &'a T, prompt: &'a P, dest_root: &Path) -> Self {
        Self {
            transport,
            prompt,
            dest_root: dest_root.to_path_buf(),
            show_progress: false,
        }
    }

    /// Show download progress bars (for interactive use)
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Reconcile every component in manifest order
    ///
    /// Mutates `version` and `password` fields in place; the caller persists
    /// the manifest only when this returns `Ok`.
    pub fn run(&self, config: &mut UpdaterConfig) -> Result<Vec<ComponentReport>> {
        let _cleanup = TempArtifacts {
            root: self.dest_root.clone(),
        };

        let mut cascade = false;
        let mut reports = Vec::with_capacity(config.components.len());

        for component in &mut config.components {
            let (outcome, next_cascade) = self.reconcile(component, cascade)?;
            reports.push(ComponentReport {
                name: component.name.clone(),
                outcome,
            });
            cascade = next_cascade;
        }

        Ok(reports)
    }

    /// Apply the per-component state machine, returning the new cascade value
    fn reconcile(
        &self,
        component: &mut Component,
        cascade: bool,
    ) -> Result<(ComponentOutcome, bool)> {
        self.ensure_password(component)?;

        let bootstrap_stats = self.bootstrap_if_missing(component)?;

        // A component is only classified when it tracks a version and no
        // upstream change forces it; every other case applies unconditionally.
        let version_url = match &component.version_url {
            Some(url) if !cascade => url.clone(),
            tracking => {
                info!("applying {} unconditionally", component.name);

                let remote = tracking
                    .as_deref()
                    .map(|url| self.fetch_remote_version(url))
                    .transpose()?;

                let applied =
                    self.apply_patch(&component.patch_url, component.password.as_deref())?;
                let stats = merge(bootstrap_stats, applied);

                if let Some(remote) = remote {
                    component.version = Some(remote);
                }
                return Ok((ComponentOutcome::Applied(stats), true));
            }
        };

        let remote = self.fetch_remote_version(&version_url)?;
        let recorded = component.recorded_version().to_string();

        match classify(&recorded, &remote) {
            VersionStatus::UpToDate => {
                info!("{} is up to date at {}", component.name, remote);
                match bootstrap_stats {
                    // A fresh install changed the file tree even though the
                    // patch itself has nothing new; downstream layers must
                    // still be reapplied on top of it.
                    Some(stats) => Ok((ComponentOutcome::Applied(stats), true)),
                    None => Ok((ComponentOutcome::Skipped, cascade)),
                }
            }
            VersionStatus::Outdated => {
                info!(
                    "{} is outdated: {} -> {}",
                    component.name,
                    if recorded.is_empty() { "(none)" } else { &recorded },
                    remote
                );

                let applied =
                    self.apply_patch(&component.patch_url, component.password.as_deref())?;
                let changed = remote != recorded;
                component.version = Some(remote);
                Ok((
                    ComponentOutcome::Applied(merge(bootstrap_stats, applied)),
                    cascade || changed,
                ))
            }
            VersionStatus::Incompatible => Err(Error::IncompatibleVersion {
                component: component.name.clone(),
                recorded,
                remote,
            }),
        }
    }

    /// Prompt for and persist a password when an encrypted format needs one
    fn ensure_password(&self, component: &mut Component) -> Result<()> {
        if component.password.is_some() {
            return Ok(());
        }

        let needs_password = ArchiveFormat::from_locator(&component.patch_url)
            == ArchiveFormat::SevenZ
            || component
                .install_url
                .as_deref()
                .is_some_and(|url| ArchiveFormat::from_locator(url) == ArchiveFormat::SevenZ);

        if needs_password {
            let password = self.prompt.read_password(&component.name)?;
            if !password.is_empty() {
                component.password = Some(password);
            }
        }
        Ok(())
    }

    /// First-time installation of a component's full archive
    ///
    /// Triggered when the component declares an install marker and that file
    /// is absent under the destination root. A tracked component is first
    /// checked for base compatibility: shipping a manifest for 1.x is no use
    /// against a remote that moved to 2.x.
    fn bootstrap_if_missing(&self, component: &Component) -> Result<Option<ExtractStats>> {
        let (install_url, marker) = match (&component.install_url, &component.install_marker) {
            (Some(url), Some(marker)) => (url, marker),
            _ => return Ok(None),
        };

        if self.dest_root.join(marker).is_file() {
            return Ok(None);
        }

        info!("installing {} for the first time", component.name);

        if let Some(version_url) = &component.version_url {
            let remote = self.fetch_remote_version(version_url)?;
            let recorded = component.recorded_version();
            if classify(recorded, &remote) == VersionStatus::Incompatible {
                return Err(Error::IncompatibleVersion {
                    component: component.name.clone(),
                    recorded: recorded.to_string(),
                    remote,
                });
            }
        }

        let stats = self.apply_patch(install_url, component.password.as_deref())?;
        Ok(Some(stats))
    }

    /// Fetch and trim the remote version string for a component
    fn fetch_remote_version(&self, version_url: &str) -> Result<String> {
        let dest = self.dest_root.join(VERSION_DOWNLOAD_NAME);
        self.transport.fetch(version_url, &dest, None)?;

        let text = fs::read_to_string(&dest)
            .map_err(|e| Error::IoError(format!("failed to read {}: {}", dest.display(), e)))?;
        Ok(text.trim().to_string())
    }

    /// Download an archive to its reserved name and apply it change-aware
    fn apply_patch(&self, locator: &str, password: Option<&str>) -> Result<ExtractStats> {
        let format = ArchiveFormat::from_locator(locator);
        let archive_path = self.dest_root.join(format.reserved_download_name());

        let progress = self.show_progress.then(download_progress_bar);
        self.transport.fetch(locator, &archive_path, progress.as_ref())?;
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let archive = PatchArchive::open(&archive_path, format, password)?;
        let stats = apply_archive(archive, &self.dest_root)?;

        fs::remove_file(&archive_path).map_err(|e| {
            Error::IoError(format!("failed to remove {}: {}", archive_path.display(), e))
        })?;

        Ok(stats)
    }
}

fn merge(earlier: Option<ExtractStats>, later: ExtractStats) -> ExtractStats {
    match earlier {
        Some(first) => ExtractStats {
            written: first.written + later.written,
            skipped: first.skipped + later.skipped,
        },
        None => later,
    }
}
