//! gwpipe inspiral shim entrypoint.
//!
//! Parses the workflow's arguments, runs the inspiral binary and exits with
//! its status.
use std::process::ExitCode;

use clap::Parser;

use gwpipe::cli::{self, ShimArgs};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = ShimArgs::parse();
    cli::run_shim(args)
}
