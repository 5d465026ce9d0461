use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::inference::prior::Distribution;
use crate::error::{Error, Result};
use crate::types::{Approximant, BurnInMethod, ModelKind, SamplerKind};

/// TOML-configurable description of an inference run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub variable_params: VariableParams,
    #[serde(default)]
    pub static_params: BTreeMap<String, f64>,
    #[serde(default)]
    pub prior: BTreeMap<String, Distribution>,
    pub model: ModelConfig,
    pub sampler: SamplerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableParams {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: ModelKind,
    /// Waveform used by data-driven models
    #[serde(default)]
    pub approximant: Option<Approximant>,
    #[serde(default = "default_low_frequency_cutoff")]
    pub low_frequency_cutoff: f64,
    /// Defaults to the Nyquist frequency of the data
    #[serde(default)]
    pub high_frequency_cutoff: Option<f64>,
}

fn default_low_frequency_cutoff() -> f64 {
    20.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub name: SamplerKind,
    pub nwalkers: usize,
    pub niterations: usize,
    /// Iterations between output rewrites; 0 writes only once at the end
    #[serde(default)]
    pub checkpoint_interval: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub burn_in: BurnInMethod,
    #[serde(default)]
    pub min_burn_in: usize,
    /// Stretch-move scale parameter for the ensemble sampler
    #[serde(default = "default_stretch_scale")]
    pub stretch_scale: f64,
    /// Random-walk step as a fraction of each prior's width
    #[serde(default = "default_proposal_scale")]
    pub proposal_scale: f64,
}

fn default_seed() -> u64 {
    0
}

fn default_stretch_scale() -> f64 {
    2.0
}

fn default_proposal_scale() -> f64 {
    0.1
}

impl InferenceConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: InferenceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn ndim(&self) -> usize {
        self.variable_params.names.len()
    }

    pub fn validate(&self) -> Result<()> {
        let names = &self.variable_params.names;
        if names.is_empty() {
            return Err(Error::Config("no variable parameters".into()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::Config(format!("variable parameter `{name}` listed twice")));
            }
            if self.static_params.contains_key(name) {
                return Err(Error::Config(format!(
                    "`{name}` is both a variable and a static parameter"
                )));
            }
            let prior = self.prior.get(name).ok_or_else(|| Error::MissingPrior {
                param: name.clone(),
            })?;
            prior.validate(name)?;
        }
        for name in self.prior.keys().filter(|p| !names.contains(p)) {
            warn!("Ignoring prior for `{}`, which is not a variable parameter", name);
        }

        if self.model.name.needs_data() {
            let approximant = self.model.approximant.ok_or_else(|| {
                Error::Config(format!("model `{}` needs an approximant", self.model.name))
            })?;
            for p in approximant.parameters() {
                if !names.iter().any(|n| n == p) && !self.static_params.contains_key(*p) {
                    return Err(Error::Config(format!(
                        "approximant {approximant} needs parameter `{p}`"
                    )));
                }
            }
        }
        if self.model.low_frequency_cutoff < 0.0 {
            return Err(Error::Config("low_frequency_cutoff must be non-negative".into()));
        }
        if let Some(high) = self.model.high_frequency_cutoff {
            if high <= self.model.low_frequency_cutoff {
                return Err(Error::Config(
                    "high_frequency_cutoff must exceed low_frequency_cutoff".into(),
                ));
            }
        }
        self.sampler.validate(self.ndim())
    }
}

impl SamplerConfig {
    pub fn validate(&self, ndim: usize) -> Result<()> {
        if self.niterations == 0 {
            return Err(Error::Config("niterations must be positive".into()));
        }
        match self.name {
            SamplerKind::Emcee => {
                if self.nwalkers < 2 * ndim || self.nwalkers % 2 != 0 {
                    return Err(Error::Config(format!(
                        "emcee needs an even number of walkers, at least {} for {} parameters; got {}",
                        2 * ndim,
                        ndim,
                        self.nwalkers
                    )));
                }
                if self.stretch_scale <= 1.0 {
                    return Err(Error::Config("stretch_scale must exceed 1".into()));
                }
            }
            SamplerKind::Metropolis => {
                if self.nwalkers == 0 {
                    return Err(Error::Config("nwalkers must be positive".into()));
                }
                if self.proposal_scale <= 0.0 {
                    return Err(Error::Config("proposal_scale must be positive".into()));
                }
            }
        }
        Ok(())
    }
}
