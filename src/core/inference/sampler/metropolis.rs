//! Independent random-walk Metropolis walkers with Gaussian proposals.
//!
//! Log-scale parameters step multiplicatively, with a Gaussian in
//! `log10(x)`; the acceptance ratio carries the matching Hastings term.
use std::f64::consts::LN_10;

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use rayon::ThreadPool;

use super::{EnsembleState, Sampler, accept, evaluate_batch};
use crate::core::inference::model::Posterior;
use crate::core::inference::prior::Prior;

/// Proposal standard deviation for one dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Linear(f64),
    /// In decades
    Log10(f64),
}

pub struct Metropolis {
    steps: Vec<Step>,
}

impl Metropolis {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Steps of `proposal_scale` times each prior's width
    pub fn from_prior(prior: &Prior, proposal_scale: f64) -> Self {
        Self::new(
            prior
                .distributions
                .iter()
                .map(|d| {
                    let s = d.width() * proposal_scale;
                    if d.is_log_scale() {
                        Step::Log10(s)
                    } else {
                        Step::Linear(s)
                    }
                })
                .collect(),
        )
    }
}

impl Sampler for Metropolis {
    fn name(&self) -> &'static str {
        "metropolis"
    }

    fn step(
        &self,
        state: &mut EnsembleState,
        posterior: &Posterior,
        rng: &mut StdRng,
        pool: Option<&ThreadPool>,
    ) {
        let n = state.nwalkers();
        let mut proposals = Vec::with_capacity(n);
        let mut hastings = Vec::with_capacity(n);
        let mut log_us = Vec::with_capacity(n);
        for k in 0..n {
            // ln q(x|y) - ln q(y|x)
            let mut log_q = 0.0;
            let y: Vec<f64> = state
                .positions
                .row(k)
                .iter()
                .zip(&self.steps)
                .map(|(&x, &step)| {
                    let z: f64 = rng.sample(StandardNormal);
                    match step {
                        Step::Linear(s) => x + s * z,
                        Step::Log10(s) => {
                            log_q += s * z * LN_10;
                            x * 10f64.powf(s * z)
                        }
                    }
                })
                .collect();
            proposals.push(y);
            hastings.push(log_q);
            log_us.push(rng.gen_range(0.0f64..1.0).ln());
        }

        let evals = evaluate_batch(posterior, &proposals, pool);
        for k in 0..n {
            let log_ratio = evals[k].log_posterior() - state.log_posterior(k) + hastings[k];
            if accept(log_us[k], log_ratio) {
                state.set_walker(k, &proposals[k], evals[k]);
                state.accepted[k] += 1;
            }
        }
        state.iteration += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::normal_posterior;
    use super::*;
    use crate::core::inference::seeds::iteration_rng;

    #[test]
    fn walkers_move_and_stay_in_support() {
        let post = normal_posterior(2);
        let mut state = EnsembleState::initialize(&post, 4, 3, None).unwrap();
        let start = state.positions.clone();
        let sampler = Metropolis::new(vec![Step::Linear(1.0); 2]);
        for _ in 0..200 {
            let mut rng = iteration_rng(3, state.iteration);
            sampler.step(&mut state, &post, &mut rng, None);
        }
        assert_eq!(state.iteration, 200);
        assert_ne!(state.positions, start);
        assert!(state.positions.iter().all(|x| x.abs() <= 10.0));
        assert!(state.accepted.iter().all(|&a| a > 20));
    }

    #[test]
    fn log_scale_walk_samples_log_uniform_prior() {
        use std::collections::BTreeMap;

        use crate::core::inference::model::TestNormal;
        use crate::core::inference::prior::Distribution;

        // flat likelihood, so the chain should reproduce the prior
        let prior = Prior::new(
            vec!["scale".into()],
            vec![Distribution::UniformLog10 { min: 1.0, max: 1e6 }],
        );
        let sampler = Metropolis::from_prior(&prior, 0.1);
        match sampler.steps[0] {
            Step::Log10(s) => assert!((s - 0.6).abs() < 1e-12),
            other => panic!("expected a log10 step, got {other:?}"),
        }
        let post = Posterior::new(prior, Box::new(TestNormal::new(Vec::new())), BTreeMap::new());

        let mut state = EnsembleState::initialize(&post, 16, 4, None).unwrap();
        let mut decades = Vec::new();
        for _ in 0..3000 {
            let mut rng = iteration_rng(4, state.iteration);
            sampler.step(&mut state, &post, &mut rng, None);
            if state.iteration > 200 {
                decades.extend(state.positions.column(0).iter().map(|x| x.log10()));
            }
        }
        let acc = state.acceptance_fraction();
        assert!(acc.iter().all(|&a| a > 0.5), "acceptance {acc:?}");
        let below = decades.iter().filter(|&&d| d < 3.0).count() as f64 / decades.len() as f64;
        assert!((0.35..0.65).contains(&below), "fraction below 1e3: {below}");
        assert!(decades.iter().all(|d| (0.0..=6.0).contains(d)));
    }

    #[test]
    fn pool_does_not_change_the_chain() {
        let post = normal_posterior(3);
        let sampler = Metropolis::new(vec![Step::Linear(0.5); 3]);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let mut serial = EnsembleState::initialize(&post, 5, 1, None).unwrap();
        let mut pooled = EnsembleState::initialize(&post, 5, 1, Some(&pool)).unwrap();
        for _ in 0..20 {
            let i = serial.iteration;
            sampler.step(&mut serial, &post, &mut iteration_rng(1, i), None);
            sampler.step(&mut pooled, &post, &mut iteration_rng(1, i), Some(&pool));
        }
        assert_eq!(serial, pooled);
    }
}
