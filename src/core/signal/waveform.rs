//! Frequency-domain waveform models keyed by approximant name.
//!
//! Both models produce the strain seen by an optimally oriented detector; no
//! antenna pattern or inter-detector delay is applied.
use std::collections::BTreeMap;
use std::f64::consts::PI;

use num_complex::Complex;

use crate::error::{Error, Result};
use crate::types::Approximant;

/// G * M_sun / c^3 in seconds
pub const MTSUN_SI: f64 = 4.925_490_947_641_267e-6;
/// Speed of light in m/s
pub const C_SI: f64 = 299_792_458.0;
/// One megaparsec in metres
pub const MPC_SI: f64 = 3.085_677_581_491_367e22;

pub type Params = BTreeMap<String, f64>;

/// Frequency grid a waveform is evaluated on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyGrid {
    pub delta_f: f64,
    pub len: usize,
    pub f_lower: f64,
    /// GPS time of the data start; `tc` is measured from here
    pub epoch: f64,
}

impl Approximant {
    /// Parameter names the approximant reads
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            Approximant::SineGaussian => &["amplitude", "frequency", "quality", "tc", "phase"],
            Approximant::TaylorF2 => &["mass1", "mass2", "distance", "tc", "coa_phase"],
        }
    }

    pub fn generate(&self, params: &Params, grid: &FrequencyGrid) -> Result<Vec<Complex<f64>>> {
        match self {
            Approximant::SineGaussian => sine_gaussian(params, grid),
            Approximant::TaylorF2 => taylor_f2(params, grid),
        }
    }
}

fn param(params: &Params, name: &'static str) -> Result<f64> {
    params.get(name).copied().ok_or(Error::MissingArgument {
        arg: name.to_string(),
    })
}

fn time_shift(f: f64, dt: f64) -> Complex<f64> {
    Complex::from_polar(1.0, -2.0 * PI * f * dt)
}

/// Analytic transform of `A exp(-(t-tc)^2/tau^2) sin(2 pi f0 (t-tc) + phase)`
/// with `tau = Q / (sqrt(2) pi f0)`.
fn sine_gaussian(params: &Params, grid: &FrequencyGrid) -> Result<Vec<Complex<f64>>> {
    let amplitude = param(params, "amplitude")?;
    let f0 = param(params, "frequency")?;
    let quality = param(params, "quality")?;
    let tc = param(params, "tc")? - grid.epoch;
    let phase = param(params, "phase")?;
    if f0 <= 0.0 || quality <= 0.0 {
        return Err(Error::invalid("frequency/quality", format!("{f0}/{quality}")));
    }

    let tau = quality / (2f64.sqrt() * PI * f0);
    let norm = amplitude * tau * PI.sqrt() / 2.0;
    let (pos, neg) = (Complex::from_polar(1.0, phase), Complex::from_polar(1.0, -phase));
    let minus_i = Complex::new(0.0, -1.0);

    Ok((0..grid.len)
        .map(|k| {
            let f = k as f64 * grid.delta_f;
            if f < grid.f_lower {
                return Complex::new(0.0, 0.0);
            }
            let g_pos = (-(PI * tau * (f - f0)).powi(2)).exp();
            let g_neg = (-(PI * tau * (f + f0)).powi(2)).exp();
            (pos * g_pos - neg * g_neg) * minus_i * norm * time_shift(f, tc)
        })
        .collect())
}

/// Stationary-phase inspiral with Newtonian-order phasing, cut at the ISCO frequency
fn taylor_f2(params: &Params, grid: &FrequencyGrid) -> Result<Vec<Complex<f64>>> {
    let m1 = param(params, "mass1")?;
    let m2 = param(params, "mass2")?;
    let distance = param(params, "distance")?;
    let tc = param(params, "tc")? - grid.epoch;
    let coa_phase = param(params, "coa_phase")?;
    if m1 <= 0.0 || m2 <= 0.0 || distance <= 0.0 {
        return Err(Error::invalid("mass1/mass2/distance", format!("{m1}/{m2}/{distance}")));
    }

    let total = (m1 + m2) * MTSUN_SI;
    let eta = m1 * m2 / (m1 + m2).powi(2);
    let chirp = eta.powf(0.6) * total;
    let amp0 = (5.0f64 / 24.0).sqrt() * PI.powf(-2.0 / 3.0) * chirp.powf(5.0 / 6.0) * C_SI
        / (distance * MPC_SI);
    let f_isco = 1.0 / (6f64.powf(1.5) * PI * total);

    Ok((0..grid.len)
        .map(|k| {
            let f = k as f64 * grid.delta_f;
            if f < grid.f_lower.max(grid.delta_f) || f > f_isco {
                return Complex::new(0.0, 0.0);
            }
            let v = (PI * total * f).cbrt();
            let psi = 2.0 * PI * f * tc - coa_phase - PI / 4.0 + 3.0 / (128.0 * eta * v.powi(5));
            Complex::from_polar(amp0 * f.powf(-7.0 / 6.0), -psi)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal::series::TimeSeries;

    fn grid(len: usize, delta_f: f64) -> FrequencyGrid {
        FrequencyGrid {
            delta_f,
            len,
            f_lower: 0.0,
            epoch: 0.0,
        }
    }

    fn params(pairs: &[(&str, f64)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn sine_gaussian_matches_numerical_transform() {
        let sample_rate = 1024.0;
        let n = 1024 * 4;
        let dt = 1.0 / sample_rate;
        let (amp, f0, q, tc, phase) = (1.0, 100.0, 10.0, 2.0, 0.3);
        let tau = q / (2f64.sqrt() * PI * f0);
        let data: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 * dt - tc;
                amp * (-(t * t) / (tau * tau)).exp() * (2.0 * PI * f0 * t + phase).sin()
            })
            .collect();
        let numeric = TimeSeries::new(data, dt, 0.0).to_frequency_series();
        let p = params(&[
            ("amplitude", amp),
            ("frequency", f0),
            ("quality", q),
            ("tc", tc),
            ("phase", phase),
        ]);
        let analytic = Approximant::SineGaussian
            .generate(&p, &grid(numeric.len(), numeric.delta_f))
            .unwrap();
        for k in [380, 400, 420] {
            let diff = (analytic[k] - numeric.data[k]).norm();
            assert!(diff < 1e-6 * numeric.data[400].norm().max(1e-12) + 1e-9, "bin {k}");
        }
    }

    #[test]
    fn taylor_f2_is_zero_above_isco_and_falls_with_distance() {
        let near = params(&[
            ("mass1", 1.4),
            ("mass2", 1.4),
            ("distance", 100.0),
            ("tc", 0.0),
            ("coa_phase", 0.0),
        ]);
        let mut far = near.clone();
        far.insert("distance".into(), 200.0);
        let g = grid(4097, 1.0);
        let h_near = Approximant::TaylorF2.generate(&near, &g).unwrap();
        let h_far = Approximant::TaylorF2.generate(&far, &g).unwrap();
        assert!((h_near[100].norm() / h_far[100].norm() - 2.0).abs() < 1e-9);
        // ISCO for 2.8 Msun is about 1570 Hz
        assert_eq!(h_near[2000].norm(), 0.0);
        assert!(h_near[1500].norm() > 0.0);
    }

    #[test]
    fn missing_parameter_is_reported() {
        let err = Approximant::TaylorF2
            .generate(&params(&[("mass1", 1.0)]), &grid(8, 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));
    }
}
