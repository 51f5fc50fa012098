// src/fingerprint.rs

//! Content fingerprints for file equality checks
//!
//! A fingerprint is a SHA-1 digest of a byte stream. It is used purely as an
//! equality oracle when deciding whether an archive entry needs to be
//! written over an existing file; cryptographic strength is not a concern
//! here, collision resistance at 160 bits is plenty.

use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Buffer size for streaming fingerprint computation (64 KB)
const FINGERPRINT_BUFFER_SIZE: usize = 65536;

/// A 160-bit content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    /// Fingerprint an in-memory byte slice
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(Sha1::digest(data).into())
    }

    /// Fingerprint a byte stream, reading it to exhaustion
    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Sha1::new();
        let mut buffer = [0u8; FINGERPRINT_BUFFER_SIZE];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Self(hasher.finalize().into()))
    }

    /// Fingerprint a file on disk
    pub fn of_file(path: &Path) -> io::Result<Self> {
        Self::of_reader(File::open(path)?)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_produce_identical_fingerprints() {
        let a = Fingerprint::of_bytes(b"patch content");
        let b = Fingerprint::of_bytes(b"patch content");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_produce_different_fingerprints() {
        let a = Fingerprint::of_bytes(b"patch content");
        let b = Fingerprint::of_bytes(b"patch content v2");
        assert_ne!(a, b);
    }

    #[test]
    fn reader_and_bytes_agree() {
        let data = vec![0xA5u8; 200_000]; // larger than one buffer
        let from_bytes = Fingerprint::of_bytes(&data);
        let from_reader = Fingerprint::of_reader(&data[..]).unwrap();
        assert_eq!(from_bytes, from_reader);
    }

    #[test]
    fn file_fingerprint_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"on disk").unwrap();

        assert_eq!(
            Fingerprint::of_file(&path).unwrap(),
            Fingerprint::of_bytes(b"on disk")
        );
    }

    #[test]
    fn known_sha1_vector() {
        // SHA-1("abc")
        assert_eq!(
            Fingerprint::of_bytes(b"abc").to_string(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }
}
