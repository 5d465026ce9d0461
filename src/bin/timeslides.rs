//! gwpipe time-slide builder entrypoint.
use clap::Parser;

use gwpipe::cli::{self, TimeSlidesArgs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = TimeSlidesArgs::parse();
    cli::run_timeslides(args)
}
