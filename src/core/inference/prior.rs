use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One-dimensional prior distribution, tagged by `distribution` in config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum Distribution {
    Uniform {
        min: f64,
        max: f64,
    },
    /// Normal distribution, optionally truncated to `[min, max]`
    Gaussian {
        mean: f64,
        sigma: f64,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    UniformAngle {
        #[serde(default)]
        min: f64,
        #[serde(default = "two_pi")]
        max: f64,
    },
    /// Uniform in `log10(x)`
    UniformLog10 {
        min: f64,
        max: f64,
    },
}

fn two_pi() -> f64 {
    2.0 * PI
}

const MAX_REJECTIONS: usize = 10_000;

impl Distribution {
    pub fn validate(&self, name: &str) -> Result<()> {
        let bad = |why: &str| Err(Error::Config(format!("prior for `{name}`: {why}")));
        match *self {
            Distribution::Uniform { min, max } | Distribution::UniformAngle { min, max } => {
                if !(min.is_finite() && max.is_finite()) {
                    return bad("min and max must be finite");
                }
                if !(min < max) {
                    return bad("min must be below max");
                }
                if !(max - min).is_finite() {
                    return bad("max - min overflows");
                }
            }
            Distribution::UniformLog10 { min, max } => {
                if !(max.is_finite() && 0.0 < min && min < max) {
                    return bad("need 0 < min < max, both finite");
                }
            }
            Distribution::Gaussian {
                mean,
                sigma,
                min,
                max,
            } => {
                if !mean.is_finite() {
                    return bad("mean must be finite");
                }
                if !(sigma > 0.0 && sigma.is_finite()) {
                    return bad("sigma must be positive and finite");
                }
                if min.is_some_and(|v| !v.is_finite()) || max.is_some_and(|v| !v.is_finite()) {
                    return bad("truncation bounds must be finite");
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if !(lo < hi) {
                        return bad("min must be below max");
                    }
                }
            }
        }
        Ok(())
    }

    fn bounds(&self) -> (f64, f64) {
        match *self {
            Distribution::Uniform { min, max }
            | Distribution::UniformAngle { min, max }
            | Distribution::UniformLog10 { min, max } => (min, max),
            Distribution::Gaussian { min, max, .. } => {
                (min.unwrap_or(f64::NEG_INFINITY), max.unwrap_or(f64::INFINITY))
            }
        }
    }

    /// Unnormalized-for-truncation log density; `-inf` outside the support
    pub fn log_pdf(&self, x: f64) -> f64 {
        let (lo, hi) = self.bounds();
        if !(lo <= x && x <= hi) {
            return f64::NEG_INFINITY;
        }
        match *self {
            Distribution::Uniform { min, max } | Distribution::UniformAngle { min, max } => {
                -(max - min).ln()
            }
            Distribution::UniformLog10 { min, max } => -x.ln() - (max / min).ln().ln(),
            Distribution::Gaussian { mean, sigma, .. } => {
                let z = (x - mean) / sigma;
                -0.5 * z * z - sigma.ln() - 0.5 * (2.0 * PI).ln()
            }
        }
    }

    /// Characteristic width used to scale random-walk proposals; in decades
    /// for log-scale priors
    pub fn width(&self) -> f64 {
        match *self {
            Distribution::Uniform { min, max } | Distribution::UniformAngle { min, max } => {
                max - min
            }
            Distribution::UniformLog10 { min, max } => max.log10() - min.log10(),
            Distribution::Gaussian { sigma, .. } => sigma,
        }
    }

    /// Whether random walks should step in `log10(x)`
    pub fn is_log_scale(&self) -> bool {
        matches!(self, Distribution::UniformLog10 { .. })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            Distribution::Uniform { min, max } | Distribution::UniformAngle { min, max } => {
                rng.gen_range(min..max)
            }
            Distribution::UniformLog10 { min, max } => {
                10f64.powf(rng.gen_range(min.log10()..max.log10()))
            }
            Distribution::Gaussian { mean, sigma, .. } => {
                let (lo, hi) = self.bounds();
                let normal = match Normal::new(mean, sigma) {
                    Ok(n) => n,
                    Err(_) => return mean,
                };
                for _ in 0..MAX_REJECTIONS {
                    let x = normal.sample(rng);
                    if lo <= x && x <= hi {
                        return x;
                    }
                }
                mean.clamp(lo, hi)
            }
        }
    }
}

/// Joint prior over the variable parameters, in their configured order
#[derive(Debug, Clone)]
pub struct Prior {
    pub names: Vec<String>,
    pub distributions: Vec<Distribution>,
}

impl Prior {
    pub fn new(names: Vec<String>, distributions: Vec<Distribution>) -> Self {
        Self {
            names,
            distributions,
        }
    }

    pub fn ndim(&self) -> usize {
        self.names.len()
    }

    pub fn log_prob(&self, x: &[f64]) -> f64 {
        let mut total = 0.0;
        for (d, &v) in self.distributions.iter().zip(x) {
            total += d.log_pdf(v);
            if total == f64::NEG_INFINITY {
                break;
            }
        }
        total
    }

    pub fn draw<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        self.distributions.iter().map(|d| d.sample(rng)).collect()
    }
}
