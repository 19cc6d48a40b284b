use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use hashspoof_core::SpoofError;

mod cli;
mod commands;

use cli::{CliArgs, Commands};

pub type CliResult<T> = Result<T, SpoofError>;

fn main() -> ExitCode {
    env_logger::init();

    let args = CliArgs::parse();
    let result = match args.command {
        Commands::Spoof(args) => args.run(),
        Commands::Digest(args) => args.run(),
    };

    result.unwrap_or_else(|e| {
        report(&e);
        ExitCode::FAILURE
    })
}

fn report(e: &SpoofError) {
    eprintln!("Error: {e}");
    let mut source = e.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
