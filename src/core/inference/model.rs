//! Likelihood models keyed by name, and the posterior that combines a model with the prior.
use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::core::inference::config::InferenceConfig;
use crate::core::inference::prior::Prior;
use crate::core::signal::psd::{Psd, inner_product};
use crate::core::signal::series::FrequencySeries;
use crate::core::signal::waveform::{FrequencyGrid, Params};
use crate::error::{Error, Result};
use crate::types::{Approximant, ModelKind};

/// Log-likelihood of a full parameter set (variable and static)
pub trait Model: Send + Sync {
    fn name(&self) -> &'static str;
    fn log_likelihood(&self, params: &Params) -> f64;
}

/// Conditioned data for one detector
#[derive(Debug, Clone)]
pub struct DetectorData {
    pub name: String,
    pub strain: FrequencySeries,
    /// PSD on the strain's frequency grid
    pub psd: Psd,
    pub kmin: usize,
    pub kmax: usize,
}

impl DetectorData {
    /// Bins `[f_low, f_high)` of `strain`, with `psd` resampled onto its grid
    pub fn new(
        name: &str,
        strain: FrequencySeries,
        psd: &Psd,
        f_low: f64,
        f_high: Option<f64>,
    ) -> Result<Self> {
        let psd = psd.interpolated(strain.delta_f, strain.len());
        let kmin = strain.bin(f_low);
        let kmax = f_high.map_or(strain.len(), |f| strain.bin(f));
        if kmin >= kmax {
            return Err(Error::Config(format!(
                "{name}: no frequency bins between {f_low} Hz and the high-frequency cutoff"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            strain,
            psd,
            kmin,
            kmax,
        })
    }

    pub fn grid(&self, f_lower: f64) -> FrequencyGrid {
        FrequencyGrid {
            delta_f: self.strain.delta_f,
            len: self.strain.len(),
            f_lower,
            epoch: self.strain.epoch,
        }
    }
}

/// Stationary Gaussian noise: `sum_det <d,h> - <h,h>/2`
pub struct GaussianNoise {
    approximant: Approximant,
    detectors: Vec<DetectorData>,
    f_lower: f64,
}

impl GaussianNoise {
    pub fn new(approximant: Approximant, detectors: Vec<DetectorData>, f_lower: f64) -> Self {
        Self {
            approximant,
            detectors,
            f_lower,
        }
    }
}

impl Model for GaussianNoise {
    fn name(&self) -> &'static str {
        "gaussian_noise"
    }

    fn log_likelihood(&self, params: &Params) -> f64 {
        let mut total = 0.0;
        for det in &self.detectors {
            let h = match self.approximant.generate(params, &det.grid(self.f_lower)) {
                Ok(h) => h,
                Err(e) => {
                    debug!("Waveform rejected for {}: {}", det.name, e);
                    return f64::NEG_INFINITY;
                }
            };
            let df = det.strain.delta_f;
            let dh = inner_product(&det.strain.data, &h, &det.psd.values, df, det.kmin, det.kmax);
            let hh = inner_product(&h, &h, &det.psd.values, df, det.kmin, det.kmax);
            total += dh.re - 0.5 * hh.re;
        }
        total
    }
}

/// Independent unit normal in every variable parameter
pub struct TestNormal {
    names: Vec<String>,
}

impl TestNormal {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Model for TestNormal {
    fn name(&self) -> &'static str {
        "test_normal"
    }

    fn log_likelihood(&self, params: &Params) -> f64 {
        -0.5 * self
            .names
            .iter()
            .map(|n| params.get(n).map_or(f64::INFINITY, |x| x * x))
            .sum::<f64>()
    }
}

/// Rosenbrock banana over the variable parameters in order
pub struct TestRosenbrock {
    names: Vec<String>,
}

impl TestRosenbrock {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Model for TestRosenbrock {
    fn name(&self) -> &'static str {
        "test_rosenbrock"
    }

    fn log_likelihood(&self, params: &Params) -> f64 {
        let xs: Vec<f64> = self
            .names
            .iter()
            .map(|n| params.get(n).copied().unwrap_or(f64::NAN))
            .collect();
        let value: f64 = xs
            .windows(2)
            .map(|w| (1.0 - w[0]).powi(2) + 100.0 * (w[1] - w[0] * w[0]).powi(2))
            .sum();
        if value.is_nan() { f64::NEG_INFINITY } else { -value }
    }
}

/// Build the configured model; data-driven models consume `detectors`
pub fn build_model(config: &InferenceConfig, detectors: Vec<DetectorData>) -> Result<Box<dyn Model>> {
    let names = config.variable_params.names.clone();
    let model: Box<dyn Model> = match config.model.name {
        ModelKind::GaussianNoise => {
            let approximant = config
                .model
                .approximant
                .ok_or_else(|| Error::Config("gaussian_noise needs an approximant".into()))?;
            if detectors.is_empty() {
                return Err(Error::Config("gaussian_noise needs detector data".into()));
            }
            Box::new(GaussianNoise::new(
                approximant,
                detectors,
                config.model.low_frequency_cutoff,
            ))
        }
        ModelKind::TestNormal => Box::new(TestNormal::new(names)),
        ModelKind::TestRosenbrock => Box::new(TestRosenbrock::new(names)),
    };
    info!("Using model {}", model.name());
    Ok(model)
}

/// Log prior and log likelihood at one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub log_prior: f64,
    pub log_likelihood: f64,
}

impl Evaluation {
    pub fn log_posterior(&self) -> f64 {
        self.log_prior + self.log_likelihood
    }
}

/// Prior times likelihood over the variable parameters
pub struct Posterior {
    pub prior: Prior,
    pub model: Box<dyn Model>,
    pub static_params: BTreeMap<String, f64>,
}

impl Posterior {
    pub fn new(prior: Prior, model: Box<dyn Model>, static_params: BTreeMap<String, f64>) -> Self {
        Self {
            prior,
            model,
            static_params,
        }
    }

    pub fn from_config(config: &InferenceConfig, detectors: Vec<DetectorData>) -> Result<Self> {
        let names = config.variable_params.names.clone();
        let distributions = names
            .iter()
            .map(|n| {
                config
                    .prior
                    .get(n)
                    .cloned()
                    .ok_or_else(|| Error::MissingPrior { param: n.clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        let model = build_model(config, detectors)?;
        Ok(Self::new(
            Prior::new(names, distributions),
            model,
            config.static_params.clone(),
        ))
    }

    pub fn ndim(&self) -> usize {
        self.prior.ndim()
    }

    /// Full parameter map for a point in variable-parameter space
    pub fn params(&self, x: &[f64]) -> Params {
        let mut params = self.static_params.clone();
        for (name, &v) in self.prior.names.iter().zip(x) {
            params.insert(name.clone(), v);
        }
        params
    }

    /// The likelihood is only evaluated inside the prior's support
    pub fn evaluate(&self, x: &[f64]) -> Evaluation {
        let log_prior = self.prior.log_prob(x);
        if !log_prior.is_finite() {
            return Evaluation {
                log_prior: f64::NEG_INFINITY,
                log_likelihood: f64::NEG_INFINITY,
            };
        }
        let log_likelihood = self.model.log_likelihood(&self.params(x));
        Evaluation {
            log_prior,
            log_likelihood: if log_likelihood.is_nan() {
                f64::NEG_INFINITY
            } else {
                log_likelihood
            },
        }
    }
}
