//! Signal-processing primitives for the inference driver: time and frequency
//! series, Welch PSD estimation, and frequency-domain waveform models.
pub mod psd;
pub mod series;
pub mod waveform;

pub use psd::{Psd, inner_product, welch};
pub use series::{FrequencySeries, TimeSeries, rfft};
pub use waveform::{FrequencyGrid, Params};
