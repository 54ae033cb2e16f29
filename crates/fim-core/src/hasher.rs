//! Streaming content hasher (BLAKE3 / SHA-256)
//!
//! Files are read through a fixed-size buffer, never loaded whole, so memory
//! use is constant regardless of file size.

use crate::error::HashError;
use crate::models::{Fingerprint, HashAlgorithm};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default buffer size for streaming reads (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Largest read buffer a hasher will allocate (16MB)
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Incremental digest state for either algorithm
enum DigestState {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
        }
    }

    fn finalize(self) -> Fingerprint {
        match self {
            Self::Blake3(h) => Fingerprint::from_digest(h.finalize().as_bytes()),
            Self::Sha256(h) => Fingerprint::from_digest(&h.finalize()),
        }
    }
}

/// File hasher
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self::with_buffer_size(algorithm, DEFAULT_BUFFER_SIZE)
    }

    /// The buffer size is clamped to `1..=MAX_BUFFER_SIZE`.
    pub fn with_buffer_size(algorithm: HashAlgorithm, buffer_size: usize) -> Self {
        Self {
            algorithm,
            buffer_size: buffer_size.clamp(1, MAX_BUFFER_SIZE),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash everything `reader` yields until EOF
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<Fingerprint> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(state.finalize())
    }

    /// Hash an in-memory buffer
    pub fn hash_bytes(&self, data: &[u8]) -> Fingerprint {
        let mut state = DigestState::new(self.algorithm);
        state.update(data);
        state.finalize()
    }

    /// Hash a file, returning the fingerprint and the number of bytes read
    pub fn hash_file(&self, path: &Path) -> Result<(Fingerprint, u64), HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut counted = CountingReader { inner: file, count: 0 };
        let fingerprint = self
            .hash_reader(&mut counted)
            .map_err(|e| HashError::from_io(path, e))?;
        Ok((fingerprint, counted.count))
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
