use clap::{Parser, Subcommand};

use crate::commands::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Spoof(spoof::SpoofArgs),
    Digest(digest::DigestArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use hashspoof_core::storage::OutputStrategy;
    use hashspoof_core::HashAlgorithm;

    #[test]
    fn verify_cli() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn should_parse_spoof_with_defaults() {
        let args = CliArgs::try_parse_from([
            "hashspoof", "spoof", "0xcafe", "-i", "in.png", "-o", "out.png",
        ])
        .unwrap();

        let Commands::Spoof(spoof) = args.command else {
            panic!("expected the spoof command");
        };
        assert_eq!(spoof.prefix, "0xcafe");
        assert_eq!(spoof.max_attempts, 100_000);
        assert_eq!(spoof.algorithm, HashAlgorithm::Sha256);
        assert_eq!(spoof.jpeg_quality, 75);
        assert_eq!(spoof.max_prefix_length, 16);
        assert!(!spoof.no_padding);
        assert_eq!(spoof.strategy(), OutputStrategy::EachAttempt);
        assert_eq!(spoof.compare, None);
    }

    #[test]
    fn should_parse_all_spoof_options() {
        let args = CliArgs::try_parse_from([
            "hashspoof",
            "spoof",
            "0x00",
            "--in",
            "in.jpg",
            "--out",
            "out.jpg",
            "--max-attempts",
            "42",
            "--algorithm",
            "SHA-512",
            "--no-padding",
            "--jpeg-quality",
            "90",
            "--max-prefix-length",
            "8",
            "--write-on-match",
            "--compare",
            "side-by-side.png",
        ])
        .unwrap();

        let Commands::Spoof(spoof) = args.command else {
            panic!("expected the spoof command");
        };
        assert_eq!(spoof.max_attempts, 42);
        assert_eq!(spoof.algorithm, HashAlgorithm::Sha512);
        assert!(spoof.no_padding);
        assert_eq!(spoof.jpeg_quality, 90);
        assert_eq!(spoof.max_prefix_length, 8);
        assert_eq!(spoof.strategy(), OutputStrategy::OnMatch);
        assert!(spoof.compare.is_some());
    }

    #[test]
    fn should_reject_out_of_range_jpeg_quality() {
        let result = CliArgs::try_parse_from([
            "hashspoof",
            "spoof",
            "0x0",
            "-i",
            "in.jpg",
            "-o",
            "out.jpg",
            "--jpeg-quality",
            "0",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn should_require_input_and_output() {
        assert!(CliArgs::try_parse_from(["hashspoof", "spoof", "0x0", "-i", "in.png"]).is_err());
        assert!(CliArgs::try_parse_from(["hashspoof", "spoof", "0x0", "-o", "out.png"]).is_err());
    }

    #[test]
    fn should_parse_digest_with_many_files() {
        let args = CliArgs::try_parse_from([
            "hashspoof",
            "digest",
            "--algorithm",
            "sha224",
            "a.png",
            "b.png",
        ])
        .unwrap();

        let Commands::Digest(digest) = args.command else {
            panic!("expected the digest command");
        };
        assert_eq!(digest.files.len(), 2);
        assert_eq!(digest.algorithm, HashAlgorithm::Sha224);
    }

    #[test]
    fn should_reject_unknown_algorithms() {
        let result = CliArgs::try_parse_from(["hashspoof", "digest", "--algorithm", "md5", "a"]);

        assert!(result.is_err());
    }
}
