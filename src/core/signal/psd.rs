//! Power spectral density estimation (Welch's method with a Hann window),
//! interpolation onto a data frequency grid, and the noise-weighted inner product.
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::signal::series::{TimeSeries, rfft};
use crate::error::{Error, Result};
use crate::types::PsdEstimation;

/// One-sided PSD sampled every `delta_f` from 0 Hz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Psd {
    pub delta_f: f64,
    pub values: Vec<f64>,
}

impl Psd {
    pub fn frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.values.len()).map(move |k| k as f64 * self.delta_f)
    }

    /// Value at frequency `f`, linearly interpolated, held flat past the end
    pub fn at(&self, f: f64) -> f64 {
        interpolate(
            &self.frequencies().collect::<Vec<_>>(),
            &self.values,
            f,
        )
    }

    /// Resample onto a grid of `len` bins spaced `delta_f`
    pub fn interpolated(&self, delta_f: f64, len: usize) -> Psd {
        let freqs: Vec<f64> = self.frequencies().collect();
        Psd {
            delta_f,
            values: (0..len)
                .map(|k| interpolate(&freqs, &self.values, k as f64 * delta_f))
                .collect(),
        }
    }

    /// Build from arbitrary `(frequency, value)` samples
    pub fn from_samples(freqs: &[f64], values: &[f64], delta_f: f64, len: usize) -> Result<Psd> {
        if freqs.len() != values.len() || freqs.len() < 2 {
            return Err(Error::invalid("--psd-file", "need at least two frequency rows"));
        }
        if freqs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::invalid("--psd-file", "frequencies must increase"));
        }
        Ok(Psd {
            delta_f,
            values: (0..len)
                .map(|k| interpolate(freqs, values, k as f64 * delta_f))
                .collect(),
        })
    }
}

fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let i = xs.partition_point(|&v| v <= x);
    let (x0, x1, y0, y1) = (xs[i - 1], xs[i], ys[i - 1], ys[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

fn hann(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos())
        .collect()
}

/// Bias of the median of `n` exponentially distributed segment powers
pub fn median_bias(n: usize) -> f64 {
    let mut bias = 1.0;
    let mut i = 1;
    while 2 * i < n {
        bias += 1.0 / (2 * i + 1) as f64 - 1.0 / (2 * i) as f64;
        i += 1;
    }
    bias
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Welch PSD estimate from segments of `seg_len` seconds every `seg_stride` seconds
pub fn welch(
    strain: &TimeSeries,
    seg_len: f64,
    seg_stride: f64,
    method: PsdEstimation,
) -> Result<Psd> {
    let seg_samples = (seg_len / strain.delta_t).round() as usize;
    let stride_samples = (seg_stride / strain.delta_t).round() as usize;
    if seg_samples < 2 || stride_samples == 0 {
        return Err(Error::invalid(
            "--psd-segment-length",
            format!("{}s with stride {}s", seg_len, seg_stride),
        ));
    }
    if seg_samples > strain.len() {
        return Err(Error::Config(format!(
            "PSD segment of {} samples is longer than the {} samples of data",
            seg_samples,
            strain.len()
        )));
    }

    let window = hann(seg_samples);
    let norm = 2.0 * strain.delta_t / window.iter().map(|w| w * w).sum::<f64>();
    let nbins = seg_samples / 2 + 1;

    let mut segments: Vec<Vec<f64>> = Vec::new();
    let mut start = 0;
    while start + seg_samples <= strain.len() {
        let windowed: Vec<f64> = strain.data[start..start + seg_samples]
            .iter()
            .zip(&window)
            .map(|(x, w)| x * w)
            .collect();
        let power: Vec<f64> = rfft(&windowed)
            .iter()
            .enumerate()
            .map(|(k, c)| {
                // DC and Nyquist bins have no negative-frequency partner
                let one_sided = if k == 0 || (seg_samples % 2 == 0 && k == nbins - 1) {
                    0.5
                } else {
                    1.0
                };
                c.norm_sqr() * norm * one_sided
            })
            .collect();
        segments.push(power);
        start += stride_samples;
    }

    let count = segments.len();
    let values: Vec<f64> = (0..nbins)
        .map(|k| match method {
            PsdEstimation::Mean => segments.iter().map(|s| s[k]).sum::<f64>() / count as f64,
            PsdEstimation::Median => {
                let mut column: Vec<f64> = segments.iter().map(|s| s[k]).collect();
                median(&mut column) / median_bias(count)
            }
        })
        .collect();

    debug!(
        "Welch PSD: {} segments of {} samples, method {}",
        count, seg_samples, method
    );
    Ok(Psd {
        delta_f: 1.0 / (seg_samples as f64 * strain.delta_t),
        values,
    })
}

/// Noise-weighted inner product `4 df sum conj(a) b / S` over bins `kmin..kmax`
pub fn inner_product(
    a: &[Complex<f64>],
    b: &[Complex<f64>],
    psd: &[f64],
    delta_f: f64,
    kmin: usize,
    kmax: usize,
) -> Complex<f64> {
    let kmax = kmax.min(a.len()).min(b.len()).min(psd.len());
    let mut sum = Complex::new(0.0, 0.0);
    for k in kmin..kmax {
        if psd[k] > 0.0 {
            sum += a[k].conj() * b[k] / psd[k];
        }
    }
    sum * 4.0 * delta_f
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn white_noise(n: usize, sigma: f64, dt: f64, seed: u64) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, sigma).unwrap();
        TimeSeries::new((0..n).map(|_| normal.sample(&mut rng)).collect(), dt, 0.0)
    }

    #[test]
    fn welch_recovers_white_noise_level() {
        let dt = 1.0 / 256.0;
        let strain = white_noise(256 * 64, 1.0, dt, 7);
        let expected = 2.0 * dt;
        for method in [PsdEstimation::Mean, PsdEstimation::Median] {
            let psd = welch(&strain, 4.0, 2.0, method).unwrap();
            assert_eq!(psd.delta_f, 0.25);
            let mid = &psd.values[10..psd.values.len() - 10];
            let avg = mid.iter().sum::<f64>() / mid.len() as f64;
            assert!((avg / expected - 1.0).abs() < 0.1, "{method}: {avg} vs {expected}");
        }
    }

    #[test]
    fn segment_longer_than_data_is_rejected() {
        let strain = white_noise(128, 1.0, 1.0 / 128.0, 1);
        assert!(welch(&strain, 4.0, 2.0, PsdEstimation::Mean).is_err());
    }

    #[test]
    fn median_bias_values() {
        assert_eq!(median_bias(1), 1.0);
        assert!((median_bias(3) - (1.0 + 1.0 / 3.0 - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn interpolation_is_linear_and_flat_outside() {
        let psd = Psd::from_samples(&[10.0, 20.0], &[1.0, 3.0], 5.0, 6).unwrap();
        assert_eq!(psd.values, vec![1.0, 1.0, 1.0, 2.0, 3.0, 3.0]);
        assert_eq!(psd.at(12.5), 1.5);
    }

    #[test]
    fn inner_product_skips_zero_psd() {
        let a = vec![Complex::new(1.0, 0.0); 4];
        let psd = vec![0.0, 1.0, 2.0, 1.0];
        let v = inner_product(&a, &a, &psd, 0.5, 0, 4);
        assert!((v.re - 4.0 * 0.5 * 2.5).abs() < 1e-12);
    }
}
