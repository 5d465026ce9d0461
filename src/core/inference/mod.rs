//! Bayesian parameter estimation: configuration, priors, likelihood models,
//! ensemble samplers and the checkpointed driver that ties them together.
pub mod burn_in;
pub mod config;
pub mod data;
pub mod driver;
pub mod model;
pub mod prior;
pub mod sampler;
pub mod seeds;

pub use burn_in::burn_in_iteration;
pub use config::{InferenceConfig, ModelConfig, SamplerConfig};
pub use data::{DataOptions, Injection, LoadedData, load_data};
pub use driver::{RunOptions, RunSummary, run};
pub use model::{DetectorData, Model, Posterior};
pub use prior::{Distribution, Prior};
pub use sampler::{EnsembleState, Sampler};
