//! gwpipe inference driver entrypoint.
//!
//! A thin wrapper over `gwpipe::cli`; for programmatic use prefer
//! `gwpipe::api::run_inference`.
use clap::Parser;

use gwpipe::cli::{self, InferenceArgs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = InferenceArgs::parse();
    cli::run_inference(args)
}
