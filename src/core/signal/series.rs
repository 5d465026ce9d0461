use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// Uniformly sampled real time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub data: Vec<f64>,
    pub delta_t: f64,
    /// GPS time of the first sample
    pub start_time: f64,
}

impl TimeSeries {
    pub fn new(data: Vec<f64>, delta_t: f64, start_time: f64) -> Self {
        Self {
            data,
            delta_t,
            start_time,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.delta_t
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 * self.delta_t
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// Samples in `[start, end)`, clipped to the series
    pub fn time_slice(&self, start: f64, end: f64) -> TimeSeries {
        let first = ((start - self.start_time) / self.delta_t).round().max(0.0) as usize;
        let last = ((end - self.start_time) / self.delta_t).round().max(0.0) as usize;
        let first = first.min(self.data.len());
        let last = last.clamp(first, self.data.len());
        TimeSeries {
            data: self.data[first..last].to_vec(),
            delta_t: self.delta_t,
            start_time: self.start_time + first as f64 * self.delta_t,
        }
    }

    /// One-sided frequency series `dt * FFT(x)`
    pub fn to_frequency_series(&self) -> FrequencySeries {
        let spectrum = rfft(&self.data);
        FrequencySeries {
            data: spectrum.into_iter().map(|c| c * self.delta_t).collect(),
            delta_f: 1.0 / self.duration(),
            epoch: self.start_time,
        }
    }
}

/// One-sided complex frequency series
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySeries {
    pub data: Vec<Complex<f64>>,
    pub delta_f: f64,
    /// GPS time of the first sample of the originating time series
    pub epoch: f64,
}

impl FrequencySeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Index of the first bin at or above `f`
    pub fn bin(&self, f: f64) -> usize {
        ((f / self.delta_f).ceil().max(0.0) as usize).min(self.data.len())
    }
}

/// Forward FFT of real input, keeping the `n/2 + 1` non-negative frequencies
pub fn rfft(input: &[f64]) -> Vec<Complex<f64>> {
    let n = input.len();
    if n == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f64>> = input.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buffer);
    buffer.truncate(n / 2 + 1);
    buffer
}
