use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpoofError {
    /// Represents a malformed target prefix, for example `abc` without the `0x` marker
    #[error("Invalid hex prefix: {0}")]
    InvalidPrefix(PrefixViolation),

    /// Represents an image codec that cannot carry iteration metadata. For example a GIF file
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Represents a failure to read the candidate bytes while computing their digest
    #[error("Digest I/O error")]
    DigestIoError { source: std::io::Error },

    /// Represents an unknown digest algorithm name
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Represents an input image that could not be decoded. For example a broken PNG file
    #[error("Image media is invalid")]
    InvalidImageMedia,

    /// Represents a failure of the codec while encoding a candidate
    #[error("Image encoding error: {0}")]
    ImageEncodingError(String),

    /// Represents a failure to read from input.
    #[error("Read error")]
    ReadError { source: std::io::Error },

    /// Represents a failure to write target file.
    #[error("Write error")]
    WriteError { source: std::io::Error },

    /// Represents a failure that aborted a search run at the given iteration
    #[error("Error during iteration {iteration}: {source}")]
    IterationFailed {
        iteration: u64,
        source: Box<SpoofError>,
    },

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("No input image set")]
    ImageNotSet,

    #[error("No target file set")]
    TargetNotSet,

    /// Candidates are written to the output, it must not replace the image they are made from
    #[error("Output file {0:?} is the input image")]
    OutputIsInput(std::path::PathBuf),

    #[error("API Error: Missing prefix")]
    PrefixNotSet,
}

impl SpoofError {
    /// The error that caused a run to abort, with the iteration wrapper removed
    pub fn root_cause(&self) -> &SpoofError {
        match self {
            SpoofError::IterationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// The rule a prefix argument broke
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixViolation {
    MissingMarker,
    Empty,
    TooLong { length: usize, max_length: usize },
    NonHexCharacter { character: char, position: usize },
}

impl Display for PrefixViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PrefixViolation::MissingMarker => write!(f, "hex prefix must start with '0x'"),
            PrefixViolation::Empty => write!(f, "hex prefix must not be empty after '0x'"),
            PrefixViolation::TooLong { length, max_length } => write!(
                f,
                "hex prefix must not exceed {max_length} characters, got {length}"
            ),
            PrefixViolation::NonHexCharacter {
                character,
                position,
            } => write!(
                f,
                "hex prefix must contain only hexadecimal characters, found {character:?} at position {position}"
            ),
        }
    }
}

impl From<PrefixViolation> for SpoofError {
    fn from(violation: PrefixViolation) -> Self {
        SpoofError::InvalidPrefix(violation)
    }
}
