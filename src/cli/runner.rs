use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{self, InferenceJob, SamplerOverrides, TimeSlideJob, write_time_slides};
use crate::core::inference::{DataOptions, RunOptions};
use crate::core::shim::{Invocation, run_inspiral, write_transformation_catalog};
use crate::core::timeslides::{
    SlideRequest, parse_multiples_spec, parse_normalization, parse_range_spec,
};

use super::args::{InferenceArgs, ShimArgs, TimeSlidesArgs};
use super::errors::AppError;

/// Log to stderr at DEBUG with `verbose`, warnings only otherwise; `RUST_LOG` wins when set
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn missing(arg: &str) -> AppError {
    AppError::MissingArgument {
        arg: arg.to_string(),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

pub fn run_shim(args: ShimArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_logging(args.verbose);

    if let Some(tc) = &args.write_tc {
        write_transformation_catalog(tc, &args.tc_name, &args.tc_site, &args.executable)?;
        return Ok(ExitCode::SUCCESS);
    }

    let invocation = Invocation {
        ifo: args.ifo.ok_or_else(|| missing("--ifo"))?,
        gps_start_time: args.gps_start_time.ok_or_else(|| missing("--gps-start-time"))?,
        gps_end_time: args.gps_end_time.ok_or_else(|| missing("--gps-end-time"))?,
        output_file: args.output_file.ok_or_else(|| missing("--output-file"))?,
        executable: args.executable,
        user_tag: args.user_tag,
        frame_urls: args.frame_files,
        output_extension: args.output_extension,
        working_dir: args.working_dir,
        extra_args: args.extra_args,
    };
    if invocation.frame_urls.is_empty() {
        return Err(missing("--frame-file").into());
    }

    let code = run_inspiral(&invocation)?;
    Ok(exit_code(code))
}

fn process_params(args: &TimeSlidesArgs) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut push = |flag: &str, value: String| params.push((flag.to_string(), value));
    for v in &args.instruments {
        push("--instrument", v.clone());
    }
    for v in &args.inspiral_num_slides {
        push("--inspiral-num-slides", v.clone());
    }
    for v in &args.normalize {
        push("--normalize", v.clone());
    }
    if args.remove_zero_lag {
        push("--remove-zero-lag", String::new());
    }
    for v in &args.add_to {
        push("--add-to", v.display().to_string());
    }
    if !args.comment.is_empty() {
        push("--comment", args.comment.clone());
    }
    for v in &args.outputs {
        push("--output", v.display().to_string());
    }
    params
}

pub fn run_timeslides(args: TimeSlidesArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.verbose);

    let invalid = |flag: &'static str, value: &str, e: crate::Error| AppError::InvalidFlag {
        flag,
        value: value.to_string(),
        reason: e.to_string(),
    };
    let ranges = args
        .instruments
        .iter()
        .map(|s| parse_range_spec(s).map_err(|e| invalid("instrument", s.as_str(), e)))
        .collect::<Result<Vec<_>, _>>()?;
    let multiples = args
        .inspiral_num_slides
        .iter()
        .map(|s| parse_multiples_spec(s).map_err(|e| invalid("inspiral-num-slides", s.as_str(), e)))
        .collect::<Result<Vec<_>, _>>()?;
    let normalize = parse_normalization(&args.normalize)?;

    let job = TimeSlideJob {
        request: SlideRequest {
            ranges,
            multiples,
            normalize,
            remove_zero_lag: args.remove_zero_lag,
        },
        params: process_params(&args),
        add_to: args.add_to,
        outputs: args.outputs,
        comment: args.comment,
    };
    let counts = write_time_slides(&job)?;
    info!(
        "Wrote {} time slides to {} file(s)",
        counts.iter().sum::<usize>(),
        counts.len()
    );
    Ok(())
}

pub fn run_inference(args: InferenceArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.verbose);

    let job = InferenceJob {
        config_file: args.config_file,
        overrides: SamplerOverrides {
            nwalkers: args.nwalkers,
            niterations: args.niterations,
            checkpoint_interval: args.checkpoint_interval,
            seed: args.seed,
        },
        data: DataOptions {
            data: args.data,
            sample_rate: args.sample_rate,
            fake_strain: args.fake_strain,
            fake_strain_seed: args.fake_strain_seed,
            fake_strain_sigma: args.fake_strain_sigma,
            gps_start_time: args.gps_start_time,
            gps_end_time: args.gps_end_time,
            injection_file: args.injection_file,
            psd_estimation: args.psd_estimation,
            psd_segment_length: args.psd_segment_length,
            psd_segment_stride: args.psd_segment_stride,
            psd_files: args.psd_files,
        },
        run: RunOptions {
            output_file: args.output_file,
            force: args.force,
            resume: args.resume,
            nprocesses: args.nprocesses.max(1),
            command_line: std::env::args().collect(),
        },
    };
    let summary = api::run_inference(&job)?;
    match summary.burn_in_iteration {
        Some(i) => info!("Burn-in reached at iteration {}", i),
        None => info!("Burn-in not reached"),
    }
    Ok(())
}
