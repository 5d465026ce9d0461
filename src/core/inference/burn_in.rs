use ndarray::ArrayView2;

use crate::types::BurnInMethod;

/// Iteration at which the chain is considered burned in, or `None` if it is not yet.
///
/// `log_posterior` is `nwalkers x iterations`.
pub fn burn_in_iteration(
    method: BurnInMethod,
    log_posterior: ArrayView2<f64>,
    ndim: usize,
    min_burn_in: usize,
) -> Option<usize> {
    let niterations = log_posterior.ncols();
    if niterations == 0 {
        return None;
    }
    let found = match method {
        BurnInMethod::None => Some(0),
        BurnInMethod::HalfChain => Some(niterations / 2),
        BurnInMethod::MaxPosterior => max_posterior(log_posterior, ndim),
    }?;
    let iteration = found.max(min_burn_in);
    (iteration < niterations).then_some(iteration)
}

/// First iteration where every walker is within `ndim / 2` of the chain's maximum
fn max_posterior(log_posterior: ArrayView2<f64>, ndim: usize) -> Option<usize> {
    let max = log_posterior
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }
    let threshold = max - ndim as f64 / 2.0;
    log_posterior
        .columns()
        .into_iter()
        .position(|col| col.iter().all(|&v| v >= threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn half_chain_and_minimum() {
        let lp = ndarray::Array2::<f64>::zeros((2, 10));
        assert_eq!(burn_in_iteration(BurnInMethod::HalfChain, lp.view(), 2, 0), Some(5));
        assert_eq!(burn_in_iteration(BurnInMethod::HalfChain, lp.view(), 2, 7), Some(7));
        assert_eq!(burn_in_iteration(BurnInMethod::None, lp.view(), 2, 0), Some(0));
        assert_eq!(burn_in_iteration(BurnInMethod::None, lp.view(), 2, 10), None);
    }

    #[test]
    fn max_posterior_waits_for_every_walker() {
        let lp = array![
            [-50.0, -3.0, -0.5, -0.2, -0.1],
            [-60.0, -40.0, -20.0, -0.9, -0.3],
        ];
        // ndim 2: threshold is max - 1 = -1.1
        assert_eq!(burn_in_iteration(BurnInMethod::MaxPosterior, lp.view(), 2, 0), Some(3));
        assert_eq!(burn_in_iteration(BurnInMethod::MaxPosterior, lp.view(), 2, 4), Some(4));
    }

    #[test]
    fn max_posterior_measures_against_whole_chain_maximum() {
        // walker 1 starts within 1 of walker 0's early value but not of the later peak
        let lp = array![[-5.0, 0.0], [-5.5, 0.0]];
        assert_eq!(burn_in_iteration(BurnInMethod::MaxPosterior, lp.view(), 2, 0), Some(1));
    }

    #[test]
    fn max_posterior_none_while_walkers_disagree() {
        let lp = array![[-9.0, -9.0, 0.0], [-9.0, -9.0, -5.0]];
        assert_eq!(burn_in_iteration(BurnInMethod::MaxPosterior, lp.view(), 2, 0), None);
    }
}
