//! Core building blocks: time-slide generation, the inspiral invocation shim,
//! signal processing (FFT, PSDs, waveforms) and the inference engine. These
//! are consumed by the high-level `api` module and the CLI runners.
pub mod inference;
pub mod shim;
pub mod signal;
pub mod timeslides;
