// src/transport.rs

//! Download transport for patch archives and version strings
//!
//! Provides a thin abstraction over "stream the bytes behind a locator into
//! a local file, reporting progress as they arrive". The production
//! implementation wraps a blocking reqwest client; the orchestrator only
//! depends on the [`Transport`] trait so tests can feed it local files.
//!
//! Besides plain HTTP(S) URLs, one family of cloud share links is supported:
//! Google Drive `/file/d/<id>/` links, which need a rewrite to the direct
//! download form before the stream can be opened.

use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Timeout for establishing HTTP connections (30 seconds)
///
/// Reads themselves are unbounded: a patch download on a slow link may
/// legitimately take a long time, and interrupted downloads are not resumed.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Fetches remote bytes into local files
pub trait Transport {
    /// Download `locator` into `dest`, returning the number of bytes written
    ///
    /// When a progress bar is supplied its length is set from the reported
    /// content size (if any) and its position advanced as chunks arrive.
    fn fetch(&self, locator: &str, dest: &Path, progress: Option<&ProgressBar>) -> Result<u64>;
}

/// Blocking HTTP(S) transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, locator: &str, dest: &Path, progress: Option<&ProgressBar>) -> Result<u64> {
        let url = resolve_locator(locator)?;
        debug!("fetching {} -> {}", url, dest.display());

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::DownloadError(format!("failed to fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let mut file = File::create(dest).map_err(|e| {
            Error::IoError(format!("failed to create {}: {}", dest.display(), e))
        })?;

        let written = stream_response_to_file(response, &mut file, total_size, progress)?;
        info!("downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}

/// Stream an HTTP response body to a file in fixed-size chunks
fn stream_response_to_file(
    mut response: reqwest::blocking::Response,
    file: &mut File,
    total_size: u64,
    progress: Option<&ProgressBar>,
) -> Result<u64> {
    if let Some(pb) = progress {
        if total_size > 0 {
            pb.set_length(total_size);
        }
    }

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| Error::DownloadError(format!("failed to read response: {e}")))?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::IoError(format!("failed to write download: {e}")))?;

        downloaded += bytes_read as u64;
        if let Some(pb) = progress {
            pb.set_position(downloaded);
        }
    }

    Ok(downloaded)
}

/// Build the download progress bar used by the CLI
pub fn download_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Resolve a locator into a directly streamable URL
///
/// Plain `http(s)` locators pass through unchanged. Google Drive share links
/// of the form `https://drive.google.com/file/d/<id>/view` are rewritten to
/// the `uc?export=download` endpoint, which serves the raw bytes.
pub fn resolve_locator(locator: &str) -> Result<String> {
    let parsed = url::Url::parse(locator)
        .map_err(|e| Error::DownloadError(format!("invalid locator '{locator}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::DownloadError(format!(
                "unsupported locator scheme '{other}' in {locator}"
            )))
        }
    }

    if parsed.host_str() == Some("drive.google.com") {
        if let Some(id) = drive_file_id(&parsed) {
            let direct = format!("https://drive.google.com/uc?export=download&id={id}");
            debug!("resolved share link {} -> {}", locator, direct);
            return Ok(direct);
        }
        return Err(Error::DownloadError(format!(
            "unrecognized Google Drive link format: {locator}"
        )));
    }

    Ok(locator.to_string())
}

/// Extract the file id from a `/file/d/<id>/...` Drive path
fn drive_file_id(url: &url::Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next() != Some("file") || segments.next() != Some("d") {
        return None;
    }
    segments.next().filter(|id| !id.is_empty()).map(String::from)
}
