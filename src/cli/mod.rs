//! Command Line Interface (CLI) layer shared by the gwpipe binaries.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and one runner per tool (`runner`). Runners wire user-provided options
//! to the library functionality exposed via `gwpipe::api` and
//! `gwpipe::core`.
//!
//! If you are embedding gwpipe into another application, prefer the
//! high-level `gwpipe::api` module over the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::{InferenceArgs, ShimArgs, TimeSlidesArgs};
pub use runner::{init_logging, run_inference, run_shim, run_timeslides};
