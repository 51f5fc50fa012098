// tests/common/mod.rs

//! Shared helpers for integration tests: a file-backed transport double, a
//! canned password prompt, and zip fixture builders.

#![allow(dead_code)]

use indicatif::ProgressBar;
use modstack::updater::PasswordPrompt;
use modstack::{Component, Error, Result, Transport};
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Transport that treats locators as local filesystem paths
///
/// Records every fetched locator so tests can assert which remote resources
/// a run touched.
pub struct FileTransport {
    pub fetched: RefCell<Vec<String>>,
}

impl FileTransport {
    pub fn new() -> Self {
        Self {
            fetched: RefCell::new(Vec::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.borrow().len()
    }
}

impl Transport for FileTransport {
    fn fetch(&self, locator: &str, dest: &Path, _progress: Option<&ProgressBar>) -> Result<u64> {
        self.fetched.borrow_mut().push(locator.to_string());
        std::fs::copy(locator, dest)
            .map_err(|e| Error::DownloadError(format!("cannot fetch {locator}: {e}")))
    }
}

/// Prompt that always answers with the same canned password
pub struct StaticPrompt(pub &'static str);

impl PasswordPrompt for StaticPrompt {
    fn read_password(&self, _component: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Write a zip archive containing the given (path, content) pairs
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// Build a tracked component whose remote files live under `remote_dir`
pub fn tracked_component(name: &str, remote_dir: &Path, recorded: Option<&str>) -> Component {
    Component {
        name: name.to_string(),
        patch_url: remote_dir.join(format!("{name}.zip")).display().to_string(),
        install_url: None,
        install_marker: None,
        version_url: Some(remote_dir.join(format!("{name}.version")).display().to_string()),
        version: recorded.map(String::from),
        password: None,
    }
}

/// Build an untracked component (no version source, always reapplied)
pub fn untracked_component(name: &str, remote_dir: &Path) -> Component {
    Component {
        name: name.to_string(),
        patch_url: remote_dir.join(format!("{name}.zip")).display().to_string(),
        install_url: None,
        install_marker: None,
        version_url: None,
        version: None,
        password: None,
    }
}
