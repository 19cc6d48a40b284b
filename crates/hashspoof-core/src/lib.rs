//! # Hashspoof Core API
//!
//! Changes the metadata of a PNG or JPEG image until the digest of the
//! resulting file starts with a chosen hex prefix. The pixels stay the same
//! (PNG) or visually the same (JPEG).
//!
//! The building blocks are
//! - [`PrefixSpec`][prefix] for validating the wanted prefix
//! - [`CodecMutator`][mutator] for producing a distinct candidate per iteration
//! - [`DigestEngine`][digest] for hashing candidates
//! - [`SearchLoop`][search] for driving the search until a match or the budget runs out
//!
//! # Usage Examples
//!
//! ## Spoof the digest of an image
//!
//! ```rust
//! use image::{Rgb, RgbImage};
//! use tempfile::tempdir;
//!
//! let temp_dir = tempdir().expect("Failed to create temporary directory");
//! let carrier = temp_dir.path().join("carrier-image.png");
//! RgbImage::from_pixel(16, 16, Rgb([42, 42, 42]))
//!     .save(&carrier)
//!     .expect("Failed to write carrier image");
//!
//! let report = hashspoof_core::api::spoof::prepare()
//!     .with_image(&carrier)
//!     .with_prefix("0x0")             // the sha256 of the result starts with 0
//!     .with_max_attempts(1_000)       // gives up after that many candidates
//!     .with_output(temp_dir.path().join("spoofed.png"))
//!     .execute()
//!     .expect("Failed to spoof the image");
//!
//! assert!(report.outcome.is_match());
//! ```
//!
//! ## Digest a file
//!
//! ```rust
//! use hashspoof_core::{DigestEngine, HashAlgorithm};
//!
//! let digest = DigestEngine::new(HashAlgorithm::Sha256).digest_bytes(b"abc");
//! assert!(digest.as_str().starts_with("ba7816bf"));
//! ```
//!
//! [prefix]: ./struct.PrefixSpec.html
//! [mutator]: ./struct.CodecMutator.html
//! [digest]: ./struct.DigestEngine.html
//! [search]: ./struct.SearchLoop.html

#![warn(clippy::redundant_else)]

pub mod api;
pub mod commands;
pub mod digest;
pub mod error;
pub mod media;
pub mod mutator;
pub mod prefix;
pub mod result;
pub mod search;
pub mod storage;

pub use crate::api::spoof::SpoofReport;
pub use crate::digest::{DigestEngine, DigestResult, Digester, HashAlgorithm};
pub use crate::error::{PrefixViolation, SpoofError};
pub use crate::media::SourceImage;
pub use crate::mutator::{CodecMutator, ImageMutator, MutationAttempt, MutationOptions};
pub use crate::prefix::PrefixSpec;
pub use crate::result::Result;
pub use crate::search::{
    CancellationToken, NoProgress, ProgressObserver, SearchLoop, SearchOutcome, SearchState,
};
pub use crate::storage::{CandidateStore, FileSlot, MemorySlot, OutputStrategy};
