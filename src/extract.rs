// src/extract.rs

//! Change-aware archive application
//!
//! Patch archives always carry full replacement files, so application is a
//! per-entry decision: write the entry if the destination file is missing or
//! differs, skip it if the on-disk content already matches byte for byte.
//! Skipping leaves the existing file completely untouched (no write, no
//! timestamp churn), which makes re-applying an already-applied patch a true
//! no-op.
//!
//! Entries are independent of each other; any I/O failure aborts the whole
//! application and may leave the destination partially patched. That state
//! is not rolled back (see the crate-level docs).

use crate::archive::{ArchiveEntry, PatchArchive};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// What happened to a single archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    /// Destination file was created or overwritten
    Written,
    /// Destination content already matched the entry
    Skipped,
}

/// Write/skip counts for one archive application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub written: usize,
    pub skipped: usize,
}

/// Apply every entry of an archive beneath `dest_root`
pub fn apply_archive(archive: PatchArchive, dest_root: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();

    for entry in archive.entries() {
        match apply_entry(&entry?, dest_root)? {
            EntryAction::Written => stats.written += 1,
            EntryAction::Skipped => stats.skipped += 1,
        }
    }

    info!(
        "archive applied: {} files written, {} unchanged",
        stats.written, stats.skipped
    );
    Ok(stats)
}

/// Materialize one entry, skipping it when the on-disk content already matches
pub fn apply_entry(entry: &ArchiveEntry, dest_root: &Path) -> Result<EntryAction> {
    let dest = dest_root.join(entry.relative_path());

    if dest.is_file() {
        let existing = Fingerprint::of_file(&dest).map_err(|e| {
            Error::IoError(format!("failed to read {}: {}", dest.display(), e))
        })?;

        if existing == entry.fingerprint()? {
            debug!("unchanged: {}", entry.relative_path().display());
            return Ok(EntryAction::Skipped);
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::IoError(format!("failed to create {}: {}", parent.display(), e))
        })?;
    }

    entry.write_to(&dest)?;
    debug!("extracted: {}", entry.relative_path().display());
    Ok(EntryAction::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveFormat;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;

    fn write_zip_fixture(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    fn open_fixture(path: &Path) -> PatchArchive {
        PatchArchive::open(path, ArchiveFormat::Zip, None).unwrap()
    }

    #[test]
    fn extracts_into_missing_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("_patch.zip");
        write_zip_fixture(&archive_path, &[("data/deep/file.txt", b"content")]);

        let stats = apply_archive(open_fixture(&archive_path), dir.path()).unwrap();

        assert_eq!(stats, ExtractStats { written: 1, skipped: 0 });
        assert_eq!(
            fs::read(dir.path().join("data/deep/file.txt")).unwrap(),
            b"content"
        );
    }

    #[test]
    fn second_application_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("_patch.zip");
        write_zip_fixture(
            &archive_path,
            &[("a.txt", b"alpha"), ("sub/b.txt", b"beta")],
        );

        let first = apply_archive(open_fixture(&archive_path), dir.path()).unwrap();
        assert_eq!(first, ExtractStats { written: 2, skipped: 0 });

        let second = apply_archive(open_fixture(&archive_path), dir.path()).unwrap();
        assert_eq!(second, ExtractStats { written: 0, skipped: 2 });
    }

    #[test]
    fn matching_file_keeps_its_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("_patch.zip");
        write_zip_fixture(&archive_path, &[("a.txt", b"alpha")]);

        let dest = dir.path().join("a.txt");
        fs::write(&dest, b"alpha").unwrap();
        let before = fs::metadata(&dest).unwrap().modified().unwrap();

        std::thread::sleep(Duration::from_millis(20));
        apply_archive(open_fixture(&archive_path), dir.path()).unwrap();

        let after = fs::metadata(&dest).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn mismatched_file_is_overwritten_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("_patch.zip");
        write_zip_fixture(&archive_path, &[("a.txt", b"new content")]);

        let dest = dir.path().join("a.txt");
        fs::write(&dest, b"old content").unwrap();

        let stats = apply_archive(open_fixture(&archive_path), dir.path()).unwrap();

        assert_eq!(stats, ExtractStats { written: 1, skipped: 0 });
        assert_eq!(fs::read(&dest).unwrap(), b"new content");
    }

    #[test]
    fn mixed_archive_reports_both_actions() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("_patch.zip");
        write_zip_fixture(
            &archive_path,
            &[("same.txt", b"kept"), ("changed.txt", b"v2")],
        );

        fs::write(dir.path().join("same.txt"), b"kept").unwrap();
        fs::write(dir.path().join("changed.txt"), b"v1").unwrap();

        let stats = apply_archive(open_fixture(&archive_path), dir.path()).unwrap();
        assert_eq!(stats, ExtractStats { written: 1, skipped: 1 });
    }
}
