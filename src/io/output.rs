//! JSON container for inference results and checkpoint state.
//!
//! The file is rewritten as a whole after every checkpoint: the new content
//! goes to a temporary file in the same directory, which is then renamed
//! over the old one, so readers never observe a partially written file.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3, Axis, concatenate};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::inference::config::InferenceConfig;
use crate::core::inference::sampler::{EnsembleState, IterationRecord};
use crate::core::signal::psd::Psd;
use crate::error::{Error, Result};
use crate::types::{ModelKind, SamplerKind};

pub const FORMAT_VERSION: u32 = 1;

/// Run metadata stored alongside the chains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAttributes {
    pub program: String,
    pub version: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub command_line: Vec<String>,
    pub variable_params: Vec<String>,
    pub static_params: BTreeMap<String, f64>,
    pub model: ModelKind,
    pub sampler: SamplerKind,
    pub nwalkers: usize,
    /// Requested iterations
    pub niterations: usize,
    /// Completed iterations
    pub iterations: usize,
    pub seed: u64,
    pub burn_in_iteration: Option<usize>,
    pub config: InferenceConfig,
}

impl RunAttributes {
    pub fn new(program: &str, config: &InferenceConfig, command_line: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            program: program.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created: now,
            updated: now,
            command_line,
            variable_params: config.variable_params.names.clone(),
            static_params: config.static_params.clone(),
            model: config.model.name,
            sampler: config.sampler.name,
            nwalkers: config.sampler.nwalkers,
            niterations: config.sampler.niterations,
            iterations: 0,
            seed: config.sampler.seed,
            burn_in_iteration: None,
            config: config.clone(),
        }
    }

    pub fn is_burned_in(&self) -> bool {
        self.burn_in_iteration.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.iterations >= self.niterations
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceFile {
    pub format_version: u32,
    pub attrs: RunAttributes,
    pub psds: BTreeMap<String, Psd>,
    /// `nwalkers x iterations x ndim`
    pub samples: Array3<f64>,
    /// `nwalkers x iterations`
    pub log_likelihood: Array2<f64>,
    pub log_prior: Array2<f64>,
    pub acceptance_fraction: Vec<f64>,
    /// Ensemble at the last completed iteration, for resuming
    pub sampler_state: Option<EnsembleState>,
}

impl InferenceFile {
    pub fn new(attrs: RunAttributes, psds: BTreeMap<String, Psd>) -> Self {
        let nwalkers = attrs.nwalkers;
        let ndim = attrs.variable_params.len();
        Self {
            format_version: FORMAT_VERSION,
            attrs,
            psds,
            samples: Array3::zeros((nwalkers, 0, ndim)),
            log_likelihood: Array2::zeros((nwalkers, 0)),
            log_prior: Array2::zeros((nwalkers, 0)),
            acceptance_fraction: vec![0.0; nwalkers],
            sampler_state: None,
        }
    }

    pub fn iterations(&self) -> usize {
        self.samples.len_of(Axis(1))
    }

    /// `log_prior + log_likelihood`, `nwalkers x iterations`
    pub fn log_posterior(&self) -> Array2<f64> {
        &self.log_prior + &self.log_likelihood
    }

    /// Append iterations to the chains
    pub fn append(&mut self, records: &[IterationRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut samples = vec![self.samples.view()];
        let mut lnl = vec![self.log_likelihood.view()];
        let mut lnp = vec![self.log_prior.view()];
        for r in records {
            samples.push(r.positions.view().insert_axis(Axis(1)));
            lnl.push(r.log_likelihood.view().insert_axis(Axis(1)));
            lnp.push(r.log_prior.view().insert_axis(Axis(1)));
        }
        let samples = concatenate(Axis(1), &samples).map_err(Error::external)?;
        let lnl = concatenate(Axis(1), &lnl).map_err(Error::external)?;
        let lnp = concatenate(Axis(1), &lnp).map_err(Error::external)?;
        self.samples = samples;
        self.log_likelihood = lnl;
        self.log_prior = lnp;
        self.attrs.iterations = self.iterations();
        Ok(())
    }

    /// Chains from `burn_in_iteration` on, flattened to `(nwalkers * n) x ndim`
    pub fn posterior_samples(&self) -> Option<Array2<f64>> {
        let start = self.attrs.burn_in_iteration?;
        let kept = self.samples.slice(ndarray::s![.., start.., ..]);
        let (w, n, d) = kept.dim();
        Array2::from_shape_vec((w * n, d), kept.iter().copied().collect()).ok()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file: InferenceFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if file.format_version != FORMAT_VERSION {
            return Err(Error::Config(format!(
                "{}: unsupported format version {}",
                path.display(),
                file.format_version
            )));
        }
        Ok(file)
    }

    /// Atomically replace `path` with this container
    pub fn write(&mut self, path: &Path) -> Result<()> {
        self.attrs.updated = Utc::now();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut out, self)?;
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        debug!("Wrote {} iterations to {:?}", self.iterations(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};
    use tempfile::tempdir;

    fn config() -> InferenceConfig {
        InferenceConfig::from_toml(
            r#"
[variable_params]
names = ["x"]
[prior.x]
distribution = "uniform"
min = 0.0
max = 1.0
[model]
name = "test_normal"
[sampler]
name = "metropolis"
nwalkers = 2
niterations = 4
"#,
        )
        .unwrap()
    }

    fn record(v: f64) -> IterationRecord {
        IterationRecord {
            positions: array![[v], [v + 0.5]],
            log_prior: Array1::zeros(2),
            log_likelihood: array![-v, -v - 0.5],
        }
    }

    #[test]
    fn append_grows_iteration_axis() {
        let attrs = RunAttributes::new("test", &config(), vec![]);
        let mut file = InferenceFile::new(attrs, BTreeMap::new());
        file.append(&[record(0.25), record(0.5)]).unwrap();
        file.append(&[record(0.75)]).unwrap();
        assert_eq!(file.samples.dim(), (2, 3, 1));
        assert_eq!(file.attrs.iterations, 3);
        assert_eq!(file.samples[[1, 2, 0]], 1.25);
        assert_eq!(file.log_posterior()[[0, 1]], -0.5);
        assert!(!file.attrs.is_complete());
    }

    #[test]
    fn write_then_load_preserves_chains() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let attrs = RunAttributes::new("test", &config(), vec!["a".into()]);
        let mut psds = BTreeMap::new();
        psds.insert(
            "H1".to_string(),
            Psd {
                delta_f: 0.25,
                values: vec![1e-46, 2e-46],
            },
        );
        let mut file = InferenceFile::new(attrs, psds);
        file.append(&[record(0.1 + 0.2), record(1.0 / 3.0)]).unwrap();
        file.attrs.burn_in_iteration = Some(1);
        file.write(&path).unwrap();

        let back = InferenceFile::load(&path).unwrap();
        assert_eq!(back.samples, file.samples);
        assert_eq!(back.psds, file.psds);
        assert_eq!(back.attrs.command_line, vec!["a".to_string()]);
        assert_eq!(back.posterior_samples().unwrap().dim(), (2, 1));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
