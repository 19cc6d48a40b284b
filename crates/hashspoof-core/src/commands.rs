use std::path::Path;

use crate::digest::{DigestEngine, DigestResult, HashAlgorithm};
use crate::SpoofError;

pub fn digest(file: &Path, algorithm: HashAlgorithm) -> Result<DigestResult, SpoofError> {
    DigestEngine::new(algorithm).digest_file(file)
}
