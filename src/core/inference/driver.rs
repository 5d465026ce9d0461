//! Checkpointed sampler run with resume support.
use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, warn};

use crate::core::inference::burn_in::burn_in_iteration;
use crate::core::inference::config::InferenceConfig;
use crate::core::inference::model::Posterior;
use crate::core::inference::sampler::{EnsembleState, build_sampler};
use crate::core::inference::seeds::iteration_rng;
use crate::core::signal::psd::Psd;
use crate::error::{Error, Result};
use crate::io::output::{InferenceFile, RunAttributes};

pub const PROGRAM: &str = "gwpipe_inference";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_file: PathBuf,
    /// Overwrite an existing output file
    pub force: bool,
    /// Continue from an existing output file
    pub resume: bool,
    /// Worker threads for posterior evaluation; 1 evaluates serially
    pub nprocesses: usize,
    pub command_line: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub iterations: usize,
    /// Iteration the run started from (non-zero when resumed)
    pub start_iteration: usize,
    pub burn_in_iteration: Option<usize>,
    pub mean_acceptance: f64,
}

fn build_pool(nprocesses: usize) -> Result<Option<ThreadPool>> {
    if nprocesses <= 1 {
        return Ok(None);
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(nprocesses)
        .build()
        .map_err(Error::external)?;
    info!("Evaluating posteriors on {} threads", nprocesses);
    Ok(Some(pool))
}

/// Stored run must match the configuration it is resumed with
fn check_resumable(file: &InferenceFile, config: &InferenceConfig) -> Result<()> {
    let attrs = &file.attrs;
    let mismatch = |what: &str| {
        Err(Error::Config(format!(
            "cannot resume: {what} differs from the existing output file"
        )))
    };
    if attrs.variable_params != config.variable_params.names {
        return mismatch("variable_params");
    }
    if attrs.sampler != config.sampler.name {
        return mismatch("sampler");
    }
    if attrs.nwalkers != config.sampler.nwalkers {
        return mismatch("nwalkers");
    }
    if attrs.seed != config.sampler.seed {
        return mismatch("seed");
    }
    if attrs.model != config.model.name {
        return mismatch("model");
    }
    Ok(())
}

/// Existing output to continue from, if any
fn open_output(config: &InferenceConfig, options: &RunOptions) -> Result<Option<InferenceFile>> {
    let path = &options.output_file;
    if !path.exists() {
        if options.resume {
            info!("No output at {:?}; starting a new run", path);
        }
        return Ok(None);
    }
    if options.resume {
        let mut file = InferenceFile::load(path)?;
        check_resumable(&file, config)?;
        if file.sampler_state.is_none() && file.iterations() > 0 {
            return Err(Error::Config(format!("{}: no sampler state to resume from", path.display())));
        }
        file.attrs.niterations = config.sampler.niterations;
        file.attrs.config = config.clone();
        return Ok(Some(file));
    }
    if options.force {
        warn!("Overwriting existing output {:?}", path);
        return Ok(None);
    }
    Err(Error::Config(format!(
        "{} already exists; use --force to overwrite or --resume to continue",
        path.display()
    )))
}

/// Run the sampler to `niterations`, rewriting the output after every chunk.
pub fn run(
    config: &InferenceConfig,
    posterior: &Posterior,
    psds: BTreeMap<String, Psd>,
    options: &RunOptions,
) -> Result<RunSummary> {
    let sampler_cfg = &config.sampler;
    let existing = open_output(config, options)?;

    let (mut file, resumed) = match existing {
        Some(file) if file.attrs.is_complete() && file.sampler_state.is_some() => {
            info!(
                "{:?} already holds {} iterations; nothing to do",
                options.output_file,
                file.iterations()
            );
            return Ok(summary(&file, file.iterations()));
        }
        Some(mut file) => {
            let state = file.sampler_state.take();
            (file, state)
        }
        None => (
            InferenceFile::new(
                RunAttributes::new(PROGRAM, config, options.command_line.clone()),
                psds,
            ),
            None,
        ),
    };

    let pool = build_pool(options.nprocesses)?;
    let sampler = build_sampler(sampler_cfg, &posterior.prior);
    let mut state = match resumed {
        Some(state) => {
            info!("Resuming from iteration {}", state.iteration);
            state
        }
        None => EnsembleState::initialize(
            posterior,
            sampler_cfg.nwalkers,
            sampler_cfg.seed,
            pool.as_ref(),
        )?,
    };
    let start_iteration = state.iteration;

    let interval = match sampler_cfg.checkpoint_interval {
        0 => sampler_cfg.niterations,
        n => n,
    };
    let ndim = posterior.ndim();
    while state.iteration < sampler_cfg.niterations {
        let chunk_end = (state.iteration + interval).min(sampler_cfg.niterations);
        let mut records = Vec::with_capacity(chunk_end - state.iteration);
        while state.iteration < chunk_end {
            let mut rng = iteration_rng(sampler_cfg.seed, state.iteration);
            sampler.step(&mut state, posterior, &mut rng, pool.as_ref());
            records.push(state.record());
        }

        file.append(&records)?;
        file.acceptance_fraction = state.acceptance_fraction();
        file.attrs.burn_in_iteration = burn_in_iteration(
            sampler_cfg.burn_in,
            file.log_posterior().view(),
            ndim,
            sampler_cfg.min_burn_in,
        );
        file.sampler_state = Some(state.clone());
        file.write(&options.output_file)?;
        info!(
            "Checkpoint at iteration {}/{}; burn-in {}",
            state.iteration,
            sampler_cfg.niterations,
            file.attrs
                .burn_in_iteration
                .map_or_else(|| "not reached".to_string(), |i| i.to_string())
        );
    }

    if !file.attrs.is_burned_in() {
        warn!("Chain is not burned in after {} iterations", state.iteration);
    }
    Ok(summary(&file, start_iteration))
}

fn summary(file: &InferenceFile, start_iteration: usize) -> RunSummary {
    let acc = &file.acceptance_fraction;
    RunSummary {
        iterations: file.iterations(),
        start_iteration,
        burn_in_iteration: file.attrs.burn_in_iteration,
        mean_acceptance: if acc.is_empty() {
            0.0
        } else {
            acc.iter().sum::<f64>() / acc.len() as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
[variable_params]
names = ["x", "y"]
[prior.x]
distribution = "uniform"
min = -5.0
max = 5.0
[prior.y]
distribution = "uniform"
min = -5.0
max = 5.0
[model]
name = "test_normal"
[sampler]
name = "emcee"
nwalkers = 8
niterations = 40
checkpoint_interval = 10
seed = 21
"#;

    fn options(path: PathBuf) -> RunOptions {
        RunOptions {
            output_file: path,
            force: false,
            resume: false,
            nprocesses: 1,
            command_line: vec![PROGRAM.to_string()],
        }
    }

    fn posterior(config: &InferenceConfig) -> Posterior {
        Posterior::from_config(config, Vec::new()).unwrap()
    }

    #[test]
    fn refuses_to_clobber_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "{}").unwrap();
        let config = InferenceConfig::from_toml(CONFIG).unwrap();
        let err = run(&config, &posterior(&config), BTreeMap::new(), &options(path.clone())).unwrap_err();
        assert!(err.to_string().contains("--force"));

        let mut opts = options(path.clone());
        opts.force = true;
        let summary = run(&config, &posterior(&config), BTreeMap::new(), &opts).unwrap();
        assert_eq!(summary.iterations, 40);
        assert_eq!(InferenceFile::load(&path).unwrap().samples.dim(), (8, 40, 2));
    }

    #[test]
    fn complete_file_is_left_alone_on_resume() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let config = InferenceConfig::from_toml(CONFIG).unwrap();
        run(&config, &posterior(&config), BTreeMap::new(), &options(path.clone())).unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut opts = options(path.clone());
        opts.resume = true;
        let summary = run(&config, &posterior(&config), BTreeMap::new(), &opts).unwrap();
        assert_eq!(summary.iterations, 40);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn resume_rejects_changed_seed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let config = InferenceConfig::from_toml(CONFIG).unwrap();
        run(&config, &posterior(&config), BTreeMap::new(), &options(path.clone())).unwrap();

        let changed = InferenceConfig::from_toml(&CONFIG.replace("seed = 21", "seed = 22")).unwrap();
        let mut opts = options(path);
        opts.resume = true;
        assert!(run(&changed, &posterior(&changed), BTreeMap::new(), &opts).is_err());
    }
}
