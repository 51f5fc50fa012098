// src/archive.rs

//! Patch archive containers
//!
//! Patches are distributed as full-replacement archives in one of two
//! container formats, selected by the locator suffix:
//! - **zip**: decoded entry by entry, on demand, never a credential.
//! - **7z**: optionally AES-encrypted; decompressed once into a temporary
//!   staging directory (solid blocks make per-entry random access
//!   impractical), then walked file by file.
//!
//! Both variants present the same single-pass, forward-only entry iterator.
//! Directory entries are skipped; entries whose path would escape the
//! destination root are skipped as well.

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Zip entries at or above this size are staged to disk instead of buffered
///
/// Patch archives regularly carry multi-gigabyte asset files; those must
/// never be held in memory whole.
const ZIP_SPILL_THRESHOLD: u64 = 4 * 1024 * 1024;

/// Supported container formats, dispatched on the patch locator suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    SevenZ,
}

impl ArchiveFormat {
    /// Select the format from a patch locator
    ///
    /// Anything that does not end in `.7z` is treated as zip, matching how
    /// patches are published.
    pub fn from_locator(locator: &str) -> Self {
        if locator.ends_with(".7z") {
            Self::SevenZ
        } else {
            Self::Zip
        }
    }

    /// Reserved local filename the archive is downloaded to
    ///
    /// These names must never collide with legitimate installed content.
    pub fn reserved_download_name(&self) -> &'static str {
        match self {
            Self::Zip => "_patch.zip",
            Self::SevenZ => "_patch.7z",
        }
    }
}

/// One non-directory entry of a patch archive
pub struct ArchiveEntry {
    relative_path: PathBuf,
    source: EntrySource,
}

enum EntrySource {
    /// Small entry decoded into memory
    Buffered(Vec<u8>),
    /// Entry staged on disk in an extraction temp dir
    ///
    /// The `Arc` keeps the staging directory alive for as long as any entry
    /// still points into it.
    Staged {
        _stage: Arc<TempDir>,
        path: PathBuf,
    },
}

impl ArchiveEntry {
    /// Path under which the file must exist, relative to the destination root
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Fingerprint of the entry's content
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        match &self.source {
            EntrySource::Buffered(data) => Ok(Fingerprint::of_bytes(data)),
            EntrySource::Staged { path, .. } => Fingerprint::of_file(path).map_err(|e| {
                Error::ArchiveEntryError {
                    path: self.relative_path.display().to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }

    /// Write the entry's content to `dest`, overwriting any existing file
    ///
    /// The caller is responsible for creating parent directories first.
    pub fn write_to(&self, dest: &Path) -> Result<u64> {
        match &self.source {
            EntrySource::Buffered(data) => {
                fs::write(dest, data).map_err(|e| {
                    Error::IoError(format!("failed to write {}: {}", dest.display(), e))
                })?;
                Ok(data.len() as u64)
            }
            EntrySource::Staged { path, .. } => fs::copy(path, dest).map_err(|e| {
                Error::IoError(format!("failed to write {}: {}", dest.display(), e))
            }),
        }
    }
}

/// An opened patch archive
#[derive(Debug)]
pub enum PatchArchive {
    Zip(ZipArchive<BufReader<File>>),
    SevenZ(StagedArchive),
}

/// 7z contents decompressed into a temp dir that lives as long as iteration
#[derive(Debug)]
pub struct StagedArchive {
    stage: TempDir,
}

impl PatchArchive {
    /// Open a downloaded patch archive
    ///
    /// Malformed or unsupported containers fail with
    /// [`Error::ArchiveFormatError`]; an encrypted 7z with a wrong or
    /// missing password fails with [`Error::BadPassword`].
    pub fn open(path: &Path, format: ArchiveFormat, password: Option<&str>) -> Result<Self> {
        match format {
            ArchiveFormat::Zip => {
                let file = File::open(path).map_err(|e| Error::ArchiveFormatError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                let archive =
                    ZipArchive::new(BufReader::new(file)).map_err(|e| Error::ArchiveFormatError {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                debug!("opened zip archive with {} entries", archive.len());
                Ok(Self::Zip(archive))
            }
            ArchiveFormat::SevenZ => {
                let stage = tempfile::tempdir()
                    .map_err(|e| Error::IoError(format!("failed to create staging dir: {e}")))?;

                let result = match password {
                    Some(pw) => sevenz_rust::decompress_file_with_password(
                        path,
                        stage.path(),
                        sevenz_rust::Password::from(pw),
                    ),
                    None => sevenz_rust::decompress_file(path, stage.path()),
                };

                result.map_err(|e| map_sevenz_error(path, e, password.is_some()))?;
                debug!("staged 7z archive into {}", stage.path().display());
                Ok(Self::SevenZ(StagedArchive { stage }))
            }
        }
    }

    /// Consume the archive and iterate its file entries exactly once
    pub fn entries(self) -> Entries {
        match self {
            Self::Zip(archive) => Entries::Zip {
                archive,
                next_index: 0,
                spill: None,
            },
            Self::SevenZ(staged) => {
                let walker = walkdir::WalkDir::new(staged.stage.path())
                    .sort_by_file_name()
                    .into_iter();
                Entries::Staged {
                    stage: Arc::new(staged.stage),
                    walker,
                }
            }
        }
    }
}

/// Map 7z decode failures, keeping credential problems distinguishable
///
/// AES-encrypted content carries no integrity of its own: when a password
/// was supplied, a checksum or decode failure almost always means the
/// password is wrong, not that the download is corrupt.
fn map_sevenz_error(path: &Path, e: sevenz_rust::Error, with_password: bool) -> Error {
    match e {
        sevenz_rust::Error::PasswordRequired | sevenz_rust::Error::MaybeBadPassword(_) => {
            Error::BadPassword(path.display().to_string())
        }
        sevenz_rust::Error::ChecksumVerificationFailed if with_password => {
            Error::BadPassword(path.display().to_string())
        }
        other => Error::ArchiveFormatError {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    }
}

/// Single-pass iterator over the non-directory entries of a patch archive
pub enum Entries {
    Zip {
        archive: ZipArchive<BufReader<File>>,
        next_index: usize,
        /// Lazily created staging dir for entries too large to buffer
        spill: Option<Arc<TempDir>>,
    },
    Staged {
        /// Keeps the staging directory alive until iteration finishes
        stage: Arc<TempDir>,
        walker: walkdir::IntoIter,
    },
}

impl Iterator for Entries {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Zip {
                archive,
                next_index,
                spill,
            } => loop {
                if *next_index >= archive.len() {
                    return None;
                }
                let index = *next_index;
                *next_index += 1;

                let mut entry = match archive.by_index(index) {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(Error::ArchiveEntryError {
                            path: format!("#{index}"),
                            reason: e.to_string(),
                        }))
                    }
                };

                if entry.is_dir() {
                    continue;
                }

                let relative_path = match entry.enclosed_name() {
                    Some(path) => path,
                    None => {
                        warn!("skipping entry with unsafe path: {}", entry.name());
                        continue;
                    }
                };

                if entry.size() >= ZIP_SPILL_THRESHOLD {
                    let stage = match spill {
                        Some(stage) => Arc::clone(stage),
                        None => match tempfile::tempdir() {
                            Ok(dir) => {
                                let stage = Arc::new(dir);
                                *spill = Some(Arc::clone(&stage));
                                stage
                            }
                            Err(e) => {
                                return Some(Err(Error::IoError(format!(
                                    "failed to create staging dir: {e}"
                                ))))
                            }
                        },
                    };

                    let staged_path = stage.path().join(format!("entry-{index}"));
                    let copy = File::create(&staged_path)
                        .and_then(|mut file| std::io::copy(&mut entry, &mut file));
                    if let Err(e) = copy {
                        return Some(Err(Error::ArchiveEntryError {
                            path: relative_path.display().to_string(),
                            reason: e.to_string(),
                        }));
                    }

                    return Some(Ok(ArchiveEntry {
                        relative_path,
                        source: EntrySource::Staged {
                            _stage: stage,
                            path: staged_path,
                        },
                    }));
                }

                let mut data = Vec::with_capacity(entry.size() as usize);
                if let Err(e) = entry.read_to_end(&mut data) {
                    return Some(Err(Error::ArchiveEntryError {
                        path: relative_path.display().to_string(),
                        reason: e.to_string(),
                    }));
                }

                return Some(Ok(ArchiveEntry {
                    relative_path,
                    source: EntrySource::Buffered(data),
                }));
            },
            Self::Staged { stage, walker } => loop {
                let entry = match walker.next()? {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(Error::IoError(format!(
                            "failed to walk staged archive: {e}"
                        ))))
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                let relative_path = match entry.path().strip_prefix(stage.path()) {
                    Ok(rel) => rel.to_path_buf(),
                    Err(_) => continue,
                };

                return Some(Ok(ArchiveEntry {
                    relative_path,
                    source: EntrySource::Staged {
                        _stage: Arc::clone(stage),
                        path: entry.path().to_path_buf(),
                    },
                }));
            },
        }
    }
}
