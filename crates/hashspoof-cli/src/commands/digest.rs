use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use hashspoof_core::HashAlgorithm;

use crate::CliResult;

/// Prints the digest of one or more files
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Digest algorithm: sha224, sha256, sha384 or sha512
    #[arg(short, long, value_name = "algorithm", default_value_t = HashAlgorithm::default())]
    pub algorithm: HashAlgorithm,

    /// File(s) to digest
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

impl DigestArgs {
    pub fn run(self) -> CliResult<ExitCode> {
        for file in &self.files {
            let digest = hashspoof_core::commands::digest(file, self.algorithm)?;
            println!("{digest}  {}", file.display());
        }

        Ok(ExitCode::SUCCESS)
    }
}
