#![doc = r#"
gwpipe: command-line tools and a small library for a gravitational-wave
analysis pipeline.

Three tools ship with the crate:

- `gwpipe_inspiral_shim` turns a workflow-manager job into a call to an
  external inspiral binary: it writes a LAL frame cache, runs the binary,
  and renames its output to what the workflow asked for.
- `gwpipe_timeslides` builds LIGO_LW time-slide tables for background
  estimation and splits them evenly across output files.
- `gwpipe_inference` runs a checkpointed ensemble MCMC over detector strain
  and writes chains, PSDs and diagnostics to a JSON container that can be
  resumed.

Stability
---------
The library API is experimental and may change between releases.

Build time slides
-----------------
```rust,no_run
use std::path::PathBuf;
use gwpipe::{parse_range_spec, SlideRequest, TimeSlideJob, write_time_slides};

fn main() -> gwpipe::Result<()> {
    let job = TimeSlideJob {
        request: SlideRequest {
            ranges: vec![
                parse_range_spec("H1=0:0:1")?,
                parse_range_spec("L1=-50:50:5")?,
            ],
            remove_zero_lag: true,
            ..SlideRequest::default()
        },
        outputs: vec![PathBuf::from("slides_0.xml"), PathBuf::from("slides_1.xml")],
        ..TimeSlideJob::default()
    };
    let counts = write_time_slides(&job)?;
    println!("{counts:?}");
    Ok(())
}
```

Run an inference job
--------------------
```rust,no_run
use std::path::PathBuf;
use gwpipe::{DataOptions, InferenceJob, RunOptions, SamplerOverrides, run_inference};

fn main() -> gwpipe::Result<()> {
    let job = InferenceJob {
        config_file: PathBuf::from("inference.toml"),
        overrides: SamplerOverrides::default(),
        data: DataOptions {
            fake_strain: vec!["H1".into()],
            sample_rate: Some(512.0),
            gps_start_time: Some(1_000_000_000.0),
            gps_end_time: Some(1_000_000_032.0),
            psd_segment_length: Some(4.0),
            ..DataOptions::default()
        },
        run: RunOptions {
            output_file: PathBuf::from("samples.json"),
            force: false,
            resume: true,
            nprocesses: 4,
            command_line: std::env::args().collect(),
        },
    };
    let summary = run_inference(&job)?;
    println!("{} iterations, burn-in {:?}", summary.iterations, summary.burn_in_iteration);
    Ok(())
}
```

Error handling
--------------
All public functions return `gwpipe::Result<T>`; match on `gwpipe::Error` to
handle specific cases.

```rust,no_run
use std::path::Path;
use gwpipe::{Error, InferenceConfig};

fn main() {
    match InferenceConfig::load(Path::new("inference.toml")) {
        Ok(config) => println!("{} parameters", config.ndim()),
        Err(Error::MissingPrior { param }) => eprintln!("add a [prior.{param}] section"),
        Err(other) => eprintln!("{other}"),
    }
}
```

Useful modules
--------------
- [`api`]: high-level entry points for time slides and inference runs.
- [`core`]: time-slide generation, the inspiral shim, signal processing and
  the inference engine.
- [`io`]: frame caches, LIGO_LW documents, ASCII strain files, the inference
  container and Pegasus catalog entries.
- [`types`]: shared enums (`PsdEstimation`, `SamplerKind`, `UserTag`, ...).
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod cli;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
pub use error::{Error, Result};
pub use types::{
    Approximant, BurnInMethod, ModelKind, PsdEstimation, SamplerKind, UserTag,
};

pub use core::inference::{DataOptions, InferenceConfig, RunOptions, RunSummary};
pub use core::shim::{Invocation, classify_user_tag, run_inspiral, user_tag_from_filename};
pub use core::timeslides::{
    OffsetVector, SlideRequest, parse_multiples_spec, parse_range_spec, partition,
};

pub use io::cache::{CacheEntry, CacheError};
pub use io::ligolw::Document;
pub use io::output::InferenceFile;

// High-level API re-exports
pub use api::{
    InferenceJob, SamplerOverrides, TimeSlideJob, build_time_slide_documents, run_inference,
    write_time_slides,
};
