//! Affine-invariant ensemble sampler using the Goodman & Weare stretch move.
//!
//! The ensemble is split into two halves. Each half is updated in turn,
//! proposing moves toward walkers of the other (fixed) half, so proposals
//! within a half can be evaluated concurrently.
use rand::Rng;
use rand::rngs::StdRng;
use rayon::ThreadPool;

use super::{EnsembleState, Sampler, accept, evaluate_batch};
use crate::core::inference::model::Posterior;

pub struct Emcee {
    /// Stretch scale `a`; `z` is drawn from `g(z) ∝ 1/sqrt(z)` on `[1/a, a]`
    scale: f64,
}

impl Emcee {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    fn draw_stretch(&self, rng: &mut StdRng) -> f64 {
        let a = self.scale;
        let u: f64 = rng.gen_range(0.0..1.0);
        ((a - 1.0) * u + 1.0).powi(2) / a
    }
}

impl Sampler for Emcee {
    fn name(&self) -> &'static str {
        "emcee"
    }

    fn step(
        &self,
        state: &mut EnsembleState,
        posterior: &Posterior,
        rng: &mut StdRng,
        pool: Option<&ThreadPool>,
    ) {
        let n = state.nwalkers();
        let half = n / 2;
        let ndim = state.ndim() as f64;

        for (active, other) in [(0..half, half..n), (half..n, 0..half)] {
            let mut proposals = Vec::with_capacity(active.len());
            let mut stretches = Vec::with_capacity(active.len());
            let mut log_us = Vec::with_capacity(active.len());
            for k in active.clone() {
                let j = rng.gen_range(other.clone());
                let z = self.draw_stretch(rng);
                let y: Vec<f64> = state
                    .positions
                    .row(j)
                    .iter()
                    .zip(state.positions.row(k).iter())
                    .map(|(&xj, &xk)| xj + z * (xk - xj))
                    .collect();
                proposals.push(y);
                stretches.push(z);
                log_us.push(rng.gen_range(0.0f64..1.0).ln());
            }

            let evals = evaluate_batch(posterior, &proposals, pool);
            for (i, k) in active.enumerate() {
                let log_ratio = (ndim - 1.0) * stretches[i].ln() + evals[i].log_posterior()
                    - state.log_posterior(k);
                if accept(log_us[i], log_ratio) {
                    state.set_walker(k, &proposals[i], evals[i]);
                    state.accepted[k] += 1;
                }
            }
        }
        state.iteration += 1;
    }
}
