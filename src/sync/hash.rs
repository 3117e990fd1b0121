//! Content fingerprints for file comparison.
//!
//! BLAKE3 over the full byte stream, with multicore hashing for large inputs.

use std::fmt;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{Result, SyncError};

/// Inputs above this size are hashed across the rayon pool.
const PARALLEL_THRESHOLD: usize = 128 * 1024;

/// Files above this size are memory-mapped and hashed in parallel.
const LARGE_FILE: u64 = 1024 * 1024;

/// A strong content hash of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// BLAKE3 digest as lowercase hex.
    pub value: String,
    /// Bytes hashed.
    pub size: u64,
}

impl Fingerprint {
    pub fn new(value: String, size: u64) -> Self {
        Self { value, size }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.value)
    }
}

/// Hash bytes using BLAKE3.
pub fn hash_bytes(data: &[u8]) -> String {
    if data.len() > PARALLEL_THRESHOLD {
        let mut hasher = blake3::Hasher::new();
        hasher.update_rayon(data);
        hasher.finalize().to_hex().to_string()
    } else {
        blake3::hash(data).to_hex().to_string()
    }
}

/// Hash a file using BLAKE3 with multicore support for large files.
pub fn hash_file(path: &Path) -> Result<Fingerprint> {
    read_fingerprint(path).map_err(|e| SyncError::from_io_error(e, "hashing file", path))
}

fn read_fingerprint(path: &Path) -> io::Result<Fingerprint> {
    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();

    if size > LARGE_FILE {
        drop(file);
        let mut hasher = blake3::Hasher::new();
        hasher.update_mmap_rayon(path)?;
        return Ok(Fingerprint::new(
            hasher.finalize().to_hex().to_string(),
            hasher.count(),
        ));
    }

    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 65536];
    let mut total = 0u64;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok(Fingerprint::new(hasher.finalize().to_hex().to_string(), total))
}

/// Hash a file on the blocking pool.
pub async fn hash_file_async(path: &Path) -> Result<Fingerprint> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_file(&owned))
        .await
        .map_err(|e| SyncError::Io {
            path: path.to_path_buf(),
            operation: "hashing file".to_string(),
            source: io::Error::other(e.to_string()),
        })?
}
