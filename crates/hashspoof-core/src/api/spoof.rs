use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::digest::{DigestEngine, HashAlgorithm};
use crate::media::{compare, SourceImage};
use crate::mutator::{CodecMutator, MutationOptions};
use crate::prefix::{PrefixSpec, DEFAULT_MAX_PREFIX_LENGTH};
use crate::search::{
    CancellationToken, NoProgress, ProgressObserver, SearchLoop, SearchOutcome,
    DEFAULT_MAX_ATTEMPTS,
};
use crate::storage::{CandidateStore, FileSlot, MemorySlot, OutputStrategy};
use crate::SpoofError;

pub fn prepare() -> SpoofApi {
    SpoofApi::default()
}

/// what a finished run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoofReport {
    pub outcome: SearchOutcome,
    /// holds the winning candidate when `outcome` is a match
    pub output: PathBuf,
    /// side-by-side comparison, if one was requested and the run matched
    pub comparison: Option<PathBuf>,
}

#[derive(Debug)]
pub struct SpoofApi {
    image: Option<PathBuf>,
    output: Option<PathBuf>,
    prefix: Option<String>,
    comparison: Option<PathBuf>,
    max_prefix_length: usize,
    max_attempts: u64,
    algorithm: HashAlgorithm,
    options: MutationOptions,
    strategy: OutputStrategy,
    cancellation: CancellationToken,
}

impl Default for SpoofApi {
    fn default() -> Self {
        Self {
            image: None,
            output: None,
            prefix: None,
            comparison: None,
            max_prefix_length: DEFAULT_MAX_PREFIX_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            algorithm: HashAlgorithm::default(),
            options: MutationOptions::default(),
            strategy: OutputStrategy::default(),
            cancellation: CancellationToken::default(),
        }
    }
}

impl SpoofApi {
    /// The image whose digest should be spoofed, PNG or JPEG
    pub fn with_image<A: AsRef<Path>>(mut self, image: A) -> Self {
        self.image = Some(image.as_ref().to_path_buf());
        self
    }

    /// The file the winning candidate ends up in
    pub fn with_output<A: AsRef<Path>>(mut self, output: A) -> Self {
        self.output = Some(output.as_ref().to_path_buf());
        self
    }

    /// The target prefix in the form `0x<hex digits>`
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_max_prefix_length(mut self, max_prefix_length: usize) -> Self {
        self.max_prefix_length = max_prefix_length;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_options(mut self, options: MutationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_strategy(mut self, strategy: OutputStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The run checks this token before every iteration
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Write a side-by-side comparison of original and result to `target` after a match
    pub fn with_comparison<A: AsRef<Path>>(mut self, target: A) -> Self {
        self.comparison = Some(target.as_ref().to_path_buf());
        self
    }

    /// If `None` is passed, no comparison will be written
    pub fn use_comparison<A: AsRef<Path>>(mut self, target: Option<A>) -> Self {
        self.comparison = target.map(|t| t.as_ref().to_path_buf());
        self
    }

    pub fn execute(self) -> Result<SpoofReport, SpoofError> {
        self.execute_with_progress(&mut NoProgress)
    }

    /// Execute the search and blocks until it is finished
    pub fn execute_with_progress(
        self,
        progress: &mut dyn ProgressObserver,
    ) -> Result<SpoofReport, SpoofError> {
        let Some(raw_prefix) = self.prefix.as_deref() else {
            return Err(SpoofError::PrefixNotSet);
        };
        let prefix = PrefixSpec::parse(raw_prefix, self.max_prefix_length)?;
        let Some(image_path) = self.image.as_ref() else {
            return Err(SpoofError::ImageNotSet);
        };
        let Some(output) = self.output.as_ref() else {
            return Err(SpoofError::TargetNotSet);
        };
        if same_file(image_path, output) {
            return Err(SpoofError::OutputIsInput(output.clone()));
        }

        let image = SourceImage::from_file(image_path)?;
        info!("Image loaded: {image_path:?}");

        let mutator = CodecMutator::new(self.options.clone());
        let engine = DigestEngine::new(self.algorithm);

        let outcome = match self.strategy {
            OutputStrategy::EachAttempt => {
                let mut search = SearchLoop::new(mutator, engine, FileSlot::new(output))
                    .with_cancellation(self.cancellation.clone());
                let outcome = search.run(&image, &prefix, self.max_attempts, progress);
                settle(outcome, search.store_mut())?
            }
            OutputStrategy::OnMatch => {
                let mut search = SearchLoop::new(mutator, engine, MemorySlot::new())
                    .with_cancellation(self.cancellation.clone());
                let outcome = search.run(&image, &prefix, self.max_attempts, progress)?;
                if outcome.is_match() {
                    search.store().commit_to(output)?;
                }
                outcome
            }
        };

        let comparison = match (&outcome, &self.comparison) {
            (SearchOutcome::Matched { .. }, Some(target)) => {
                compare::save_comparison(image_path, output, target)?;
                Some(target.clone())
            }
            _ => None,
        };

        Ok(SpoofReport {
            outcome,
            output: output.clone(),
            comparison,
        })
    }
}

/// both paths resolve to the same existing file
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// removes the candidate file unless the run matched
fn settle(
    outcome: Result<SearchOutcome, SpoofError>,
    slot: &mut FileSlot,
) -> Result<SearchOutcome, SpoofError> {
    if matches!(outcome, Ok(SearchOutcome::Matched { .. })) {
        return outcome;
    }
    if let Err(e) = slot.discard() {
        warn!("Could not remove unmatched candidate {:?}: {e}", slot.path());
    }
    outcome
}
