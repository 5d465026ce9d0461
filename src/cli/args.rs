use clap::Parser;
use std::path::PathBuf;

use crate::types::PsdEstimation;

/// Parse `IFO:PATH`
pub fn parse_ifo_path(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once(':') {
        Some((ifo, path)) if !ifo.is_empty() && !path.is_empty() => {
            Ok((ifo.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected IFO:PATH, got `{s}`")),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "gwpipe_inspiral_shim",
    version,
    about = "Run the inspiral binary for one workflow job and deliver its output"
)]
pub struct ShimArgs {
    /// Inspiral executable to run
    #[arg(long, default_value = "lalapps_inspiral")]
    pub executable: PathBuf,

    /// Interferometer, e.g. H1
    #[arg(long)]
    pub ifo: Option<String>,

    /// GPS start of the analysis segment
    #[arg(long)]
    pub gps_start_time: Option<u64>,

    /// GPS end of the analysis segment
    #[arg(long)]
    pub gps_end_time: Option<u64>,

    /// User tag; derived from --output-file when omitted
    #[arg(long)]
    pub user_tag: Option<String>,

    /// Frame file URL or path (repeatable)
    #[arg(long = "frame-file")]
    pub frame_files: Vec<String>,

    /// Name the workflow expects the result under
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Extension of the file the binary writes
    #[arg(long, default_value = "xml")]
    pub output_extension: String,

    /// Directory to run the binary in
    #[arg(long, default_value = ".")]
    pub working_dir: PathBuf,

    /// Write a Pegasus transformation catalog entry for --executable and exit
    #[arg(long)]
    pub write_tc: Option<PathBuf>,

    /// Transformation name for --write-tc
    #[arg(long, default_value = "inspiral")]
    pub tc_name: String,

    /// Site name for --write-tc
    #[arg(long, default_value = "local")]
    pub tc_site: String,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Arguments passed through to the binary (after `--`)
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "gwpipe_timeslides",
    version,
    about = "Build LIGO_LW time-slide tables for background estimation"
)]
pub struct TimeSlidesArgs {
    /// Offset range INSTRUMENT=START:STOP:STEP or INSTRUMENT=OFFSET (repeatable)
    #[arg(long = "instrument")]
    pub instruments: Vec<String>,

    /// Multiples of an offset vector, [START:]STOP:INSTRUMENT=OFFSET,... (repeatable)
    #[arg(long = "inspiral-num-slides")]
    pub inspiral_num_slides: Vec<String>,

    /// Shift each vector so INSTRUMENT sits at OFFSET (repeatable)
    #[arg(long = "normalize")]
    pub normalize: Vec<String>,

    /// Drop the vector with all offsets zero
    #[arg(long, default_value_t = false)]
    pub remove_zero_lag: bool,

    /// Existing time-slide document to merge (repeatable)
    #[arg(long = "add-to")]
    pub add_to: Vec<PathBuf>,

    /// Comment for the process table
    #[arg(long, default_value = "")]
    pub comment: String,

    /// Output file (repeatable); slides are split evenly across them
    #[arg(long = "output", default_value = "time_slides.xml")]
    pub outputs: Vec<PathBuf>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "gwpipe_inference",
    version,
    about = "Checkpointed Bayesian parameter estimation over strain data"
)]
pub struct InferenceArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config_file: PathBuf,

    /// Output file; rewritten after every checkpoint
    #[arg(long)]
    pub output_file: PathBuf,

    /// Strain file for a detector, IFO:PATH (repeatable)
    #[arg(long = "data", value_parser = parse_ifo_path)]
    pub data: Vec<(String, PathBuf)>,

    /// Sample rate of single-column strain files, and of synthetic noise
    #[arg(long)]
    pub sample_rate: Option<f64>,

    /// Generate white Gaussian noise for this detector (repeatable)
    #[arg(long = "fake-strain")]
    pub fake_strain: Vec<String>,

    /// Seed for synthetic noise
    #[arg(long, default_value_t = 0)]
    pub fake_strain_seed: u64,

    /// Standard deviation of synthetic noise
    #[arg(long, default_value_t = 1.0)]
    pub fake_strain_sigma: f64,

    /// GPS start of the analysis segment
    #[arg(long)]
    pub gps_start_time: Option<f64>,

    /// GPS end of the analysis segment
    #[arg(long)]
    pub gps_end_time: Option<f64>,

    /// TOML file with `approximant` and a `[params]` table to inject
    #[arg(long)]
    pub injection_file: Option<PathBuf>,

    /// Averaging used by the Welch PSD estimate
    #[arg(long, value_enum, default_value_t = PsdEstimation::Median)]
    pub psd_estimation: PsdEstimation,

    /// Welch segment length in seconds
    #[arg(long)]
    pub psd_segment_length: Option<f64>,

    /// Welch segment stride in seconds (default: half the length)
    #[arg(long)]
    pub psd_segment_stride: Option<f64>,

    /// PSD file for a detector, IFO:PATH (repeatable)
    #[arg(long = "psd-file", value_parser = parse_ifo_path)]
    pub psd_files: Vec<(String, PathBuf)>,

    /// Overwrite an existing output file
    #[arg(long, default_value_t = false, conflicts_with = "resume")]
    pub force: bool,

    /// Continue the run stored in an existing output file
    #[arg(long, default_value_t = false)]
    pub resume: bool,

    /// Threads used to evaluate the posterior
    #[arg(long, default_value_t = 1)]
    pub nprocesses: usize,

    /// Override sampler.nwalkers
    #[arg(long)]
    pub nwalkers: Option<usize>,

    /// Override sampler.niterations
    #[arg(long)]
    pub niterations: Option<usize>,

    /// Override sampler.checkpoint_interval
    #[arg(long)]
    pub checkpoint_interval: Option<usize>,

    /// Override sampler.seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifo_path_pairs() {
        assert_eq!(
            parse_ifo_path("H1:/data/h1.txt").unwrap(),
            ("H1".to_string(), PathBuf::from("/data/h1.txt"))
        );
        assert!(parse_ifo_path("H1").is_err());
        assert!(parse_ifo_path(":x").is_err());
    }

    #[test]
    fn timeslides_defaults_and_repeats() {
        let args = TimeSlidesArgs::parse_from([
            "gwpipe_timeslides",
            "--instrument",
            "H1=0:0:1",
            "--instrument",
            "L1=-10:10:5",
        ]);
        assert_eq!(args.instruments.len(), 2);
        assert_eq!(args.outputs, vec![PathBuf::from("time_slides.xml")]);
    }

    #[test]
    fn shim_passthrough_args() {
        let args = ShimArgs::parse_from([
            "gwpipe_inspiral_shim",
            "--ifo",
            "H1",
            "--",
            "--snr-threshold",
            "5.5",
        ]);
        assert_eq!(args.extra_args, vec!["--snr-threshold", "5.5"]);
    }

    #[test]
    fn inference_force_conflicts_with_resume() {
        let r = InferenceArgs::try_parse_from([
            "gwpipe_inference",
            "--config-file",
            "c.toml",
            "--output-file",
            "o.json",
            "--force",
            "--resume",
        ]);
        assert!(r.is_err());
    }
}
