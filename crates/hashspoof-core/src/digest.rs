//! Digest computation over byte streams.
//!
//! [`DigestEngine`] is the only place in the crate that touches the hash
//! primitive. Input is consumed in fixed-size chunks, so memory use does not
//! grow with the size of the candidate image.

use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use log::error;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::SpoofError;
use crate::result::Result;

/// Chunk size used when streaming input into the hasher
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Hash algorithms the engine can compute
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// length of the hex representation of a digest
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha224 => 56,
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 => 128,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// a fresh hasher for this algorithm
    pub fn hasher(&self) -> Box<dyn HexHasher> {
        match self {
            HashAlgorithm::Sha224 => Box::new(Sha224::new()),
            HashAlgorithm::Sha256 => Box::new(Sha256::new()),
            HashAlgorithm::Sha384 => Box::new(Sha384::new()),
            HashAlgorithm::Sha512 => Box::new(Sha512::new()),
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = SpoofError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(SpoofError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// incremental hasher that yields its result as lowercase hex
pub trait HexHasher {
    fn update(&mut self, data: &[u8]);
    fn finalize_hex(self: Box<Self>) -> String;
}

impl<D: Digest> HexHasher for D {
    fn update(&mut self, data: &[u8]) {
        Digest::update(self, data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode((*self).finalize())
    }
}

/// lowercase hex digest of a byte stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DigestResult(String);

impl DigestResult {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for DigestResult {
    fn from(value: String) -> Self {
        Self(value.to_ascii_lowercase())
    }
}

impl From<&str> for DigestResult {
    fn from(value: &str) -> Self {
        Self(value.to_ascii_lowercase())
    }
}

impl AsRef<str> for DigestResult {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for DigestResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can turn a byte stream into a [`DigestResult`].
///
/// The search loop only depends on this seam, so tests can substitute a
/// rigged digester.
pub trait Digester {
    fn digest_reader(&self, reader: &mut dyn Read) -> Result<DigestResult>;
}

#[derive(Debug, Clone)]
pub struct DigestEngine {
    algorithm: HashAlgorithm,
    chunk_size: usize,
}

impl Default for DigestEngine {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl DigestEngine {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Use a different chunk size for streaming, `0` is bumped to `1`
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn digest_bytes(&self, bytes: &[u8]) -> DigestResult {
        let mut hasher = self.algorithm.hasher();
        hasher.update(bytes);
        DigestResult(hasher.finalize_hex())
    }

    pub fn digest_file(&self, path: &Path) -> Result<DigestResult> {
        let mut file = File::open(path).map_err(|source| {
            error!("Error opening {path:?} for hashing: {source}");
            SpoofError::DigestIoError { source }
        })?;
        self.digest_reader(&mut file)
    }
}

impl Digester for DigestEngine {
    fn digest_reader(&self, reader: &mut dyn Read) -> Result<DigestResult> {
        let mut hasher = self.algorithm.hasher();
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => hasher.update(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    error!("Error reading bytes to digest: {source}");
                    return Err(SpoofError::DigestIoError { source });
                }
            }
        }

        Ok(DigestResult(hasher.finalize_hex()))
    }
}
