//! Ensemble samplers keyed by name.
//!
//! A sampler advances an [`EnsembleState`] one iteration at a time. Every
//! random number an iteration needs is drawn serially from the RNG passed
//! in, before any posterior is evaluated, so the chain does not depend on
//! how evaluations are spread over the worker pool.
pub mod emcee;
pub mod metropolis;

pub use emcee::Emcee;
pub use metropolis::{Metropolis, Step};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::inference::config::SamplerConfig;
use crate::core::inference::model::{Evaluation, Posterior};
use crate::core::inference::prior::Prior;
use crate::core::inference::seeds::initial_rng;
use crate::error::{Error, Result};
use crate::types::SamplerKind;

const MAX_INIT_ROUNDS: usize = 1000;

pub trait Sampler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Advance every walker by one iteration and bump `state.iteration`
    fn step(
        &self,
        state: &mut EnsembleState,
        posterior: &Posterior,
        rng: &mut StdRng,
        pool: Option<&ThreadPool>,
    );
}

pub fn build_sampler(config: &SamplerConfig, prior: &Prior) -> Box<dyn Sampler> {
    let sampler: Box<dyn Sampler> = match config.name {
        SamplerKind::Emcee => Box::new(Emcee::new(config.stretch_scale)),
        SamplerKind::Metropolis => Box::new(Metropolis::from_prior(prior, config.proposal_scale)),
    };
    info!("Using sampler {} with {} walkers", sampler.name(), config.nwalkers);
    sampler
}

/// Walker positions and their cached posterior terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleState {
    /// `nwalkers x ndim`
    pub positions: Array2<f64>,
    pub log_prior: Array1<f64>,
    pub log_likelihood: Array1<f64>,
    /// Accepted proposals per walker since iteration 0
    pub accepted: Vec<u64>,
    /// Iterations completed
    pub iteration: usize,
}

/// One iteration's worth of chain output
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub positions: Array2<f64>,
    pub log_prior: Array1<f64>,
    pub log_likelihood: Array1<f64>,
}

impl EnsembleState {
    /// Draw every walker from the prior, redrawing those whose posterior is not finite
    pub fn initialize(
        posterior: &Posterior,
        nwalkers: usize,
        seed: u64,
        pool: Option<&ThreadPool>,
    ) -> Result<Self> {
        let ndim = posterior.ndim();
        let mut rng = initial_rng(seed);
        let mut state = EnsembleState {
            positions: Array2::zeros((nwalkers, ndim)),
            log_prior: Array1::from_elem(nwalkers, f64::NEG_INFINITY),
            log_likelihood: Array1::from_elem(nwalkers, f64::NEG_INFINITY),
            accepted: vec![0; nwalkers],
            iteration: 0,
        };

        let mut pending: Vec<usize> = (0..nwalkers).collect();
        for round in 0..MAX_INIT_ROUNDS {
            if pending.is_empty() {
                break;
            }
            let points: Vec<Vec<f64>> = pending.iter().map(|_| posterior.prior.draw(&mut rng)).collect();
            let evals = evaluate_batch(posterior, &points, pool);
            let mut still = Vec::new();
            for ((&k, x), e) in pending.iter().zip(&points).zip(evals) {
                if e.log_posterior().is_finite() {
                    state.set_walker(k, x, e);
                } else {
                    still.push(k);
                }
            }
            if !still.is_empty() {
                debug!("Round {}: redrawing {} walkers", round, still.len());
            }
            pending = still;
        }
        if !pending.is_empty() {
            return Err(Error::Config(format!(
                "could not place {} walkers at a finite posterior after {} draws",
                pending.len(),
                MAX_INIT_ROUNDS
            )));
        }
        Ok(state)
    }

    pub fn nwalkers(&self) -> usize {
        self.positions.nrows()
    }

    pub fn ndim(&self) -> usize {
        self.positions.ncols()
    }

    pub fn log_posterior(&self, walker: usize) -> f64 {
        self.log_prior[walker] + self.log_likelihood[walker]
    }

    pub fn set_walker(&mut self, walker: usize, x: &[f64], e: Evaluation) {
        for (dst, &v) in self.positions.row_mut(walker).iter_mut().zip(x) {
            *dst = v;
        }
        self.log_prior[walker] = e.log_prior;
        self.log_likelihood[walker] = e.log_likelihood;
    }

    pub fn acceptance_fraction(&self) -> Vec<f64> {
        let n = self.iteration.max(1) as f64;
        self.accepted.iter().map(|&a| a as f64 / n).collect()
    }

    pub fn record(&self) -> IterationRecord {
        IterationRecord {
            positions: self.positions.clone(),
            log_prior: self.log_prior.clone(),
            log_likelihood: self.log_likelihood.clone(),
        }
    }
}

/// Evaluate the posterior at `points`, on `pool` when one is given
pub fn evaluate_batch(
    posterior: &Posterior,
    points: &[Vec<f64>],
    pool: Option<&ThreadPool>,
) -> Vec<Evaluation> {
    match pool {
        Some(pool) => pool.install(|| points.par_iter().map(|x| posterior.evaluate(x)).collect()),
        None => points.iter().map(|x| posterior.evaluate(x)).collect(),
    }
}

/// Metropolis acceptance test; a NaN ratio rejects
fn accept(log_u: f64, log_ratio: f64) -> bool {
    log_u < log_ratio
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use crate::core::inference::model::{Posterior, TestNormal};
    use crate::core::inference::prior::{Distribution, Prior};

    /// Unit normal inside a wide uniform prior
    pub fn normal_posterior(ndim: usize) -> Posterior {
        let names: Vec<String> = (0..ndim).map(|i| format!("x{i}")).collect();
        Posterior::new(
            Prior::new(
                names.clone(),
                vec![Distribution::Uniform { min: -10.0, max: 10.0 }; ndim],
            ),
            Box::new(TestNormal::new(names)),
            BTreeMap::new(),
        )
    }
}
