use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use hashspoof_core::media::jpeg::DEFAULT_JPEG_QUALITY;
use hashspoof_core::prefix::DEFAULT_MAX_PREFIX_LENGTH;
use hashspoof_core::search::DEFAULT_MAX_ATTEMPTS;
use hashspoof_core::{
    CancellationToken, HashAlgorithm, MutationOptions, OutputStrategy, SearchOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;

use crate::CliResult;

/// Tweaks image metadata until the digest of the file starts with PREFIX
#[derive(Args, Debug)]
pub struct SpoofArgs {
    /// Wanted digest prefix, hex digits after a leading 0x, e.g. 0xcafe
    #[arg(value_name = "PREFIX")]
    pub prefix: String,

    /// PNG or JPEG image, used readonly.
    #[arg(short = 'i', long = "in", value_name = "image file", required = true)]
    pub image: PathBuf,

    /// Image with the matching digest will be stored as file
    #[arg(
        short = 'o',
        long = "out",
        value_name = "output image file",
        required = true
    )]
    pub write_to_file: PathBuf,

    /// Give up after that many candidates
    #[arg(long, value_name = "count", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u64,

    /// Digest algorithm: sha224, sha256, sha384 or sha512
    #[arg(short, long, value_name = "algorithm", default_value_t = HashAlgorithm::default())]
    pub algorithm: HashAlgorithm,

    /// Do not append padding bytes after the encoded image
    #[arg(long)]
    pub no_padding: bool,

    /// Quality of the re-encoded JPEG image
    #[arg(
        long,
        value_name = "1-100",
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub jpeg_quality: u8,

    /// Longest prefix accepted, in hex digits
    #[arg(long, value_name = "digits", default_value_t = DEFAULT_MAX_PREFIX_LENGTH)]
    pub max_prefix_length: usize,

    /// Keep candidates in memory and write only the matching one
    #[arg(long)]
    pub write_on_match: bool,

    /// Store original and result side by side in this PNG file
    #[arg(long, value_name = "comparison image file")]
    pub compare: Option<PathBuf>,
}

impl SpoofArgs {
    pub fn strategy(&self) -> OutputStrategy {
        if self.write_on_match {
            OutputStrategy::OnMatch
        } else {
            OutputStrategy::EachAttempt
        }
    }

    fn options(&self) -> MutationOptions {
        MutationOptions::default()
            .with_padding(!self.no_padding)
            .with_jpeg_quality(self.jpeg_quality)
    }

    pub fn run(self) -> CliResult<ExitCode> {
        let cancellation = CancellationToken::new();
        let on_interrupt = cancellation.clone();
        if let Err(e) = ctrlc::set_handler(move || on_interrupt.cancel()) {
            warn!("Cannot install the Ctrl-C handler: {e}");
        }

        let progress_bar = ProgressBar::new(self.max_attempts);
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{elapsed_precise} [{bar:40}] {pos}/{len} attempts ({per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        let mut progress = |current: u64, _max: u64| progress_bar.set_position(current);

        let report = hashspoof_core::api::spoof::prepare()
            .with_image(&self.image)
            .with_output(&self.write_to_file)
            .with_prefix(&self.prefix)
            .with_max_prefix_length(self.max_prefix_length)
            .with_max_attempts(self.max_attempts)
            .with_algorithm(self.algorithm)
            .with_options(self.options())
            .with_strategy(self.strategy())
            .with_cancellation(cancellation)
            .use_comparison(self.compare.as_ref())
            .execute_with_progress(&mut progress);
        progress_bar.finish_and_clear();
        let report = report?;

        match report.outcome {
            SearchOutcome::Matched {
                iteration,
                digest,
                elapsed,
            } => {
                println!("Success! Hash matches prefix '{}'.", self.prefix);
                println!("Hash: {digest}");
                println!("Iteration: {iteration}");
                println!("Output saved to: {}", report.output.display());
                if let Some(comparison) = report.comparison {
                    println!("Comparison saved to: {}", comparison.display());
                }
                println!("Time taken: {:.2} seconds", elapsed.as_secs_f64());
                Ok(ExitCode::SUCCESS)
            }
            SearchOutcome::Exhausted { attempts } => {
                eprintln!(
                    "Failed to find a hash matching '{}' after {attempts} attempts.",
                    self.prefix
                );
                Ok(ExitCode::FAILURE)
            }
            SearchOutcome::Cancelled { attempts } => {
                eprintln!("Interrupted after {attempts} attempts, no matching hash found.");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
