//! Shared types and enums used across gwpipe.
//! Includes `PsdEstimation`, `BurnInMethod`, `SamplerKind`, `ModelKind`,
//! `Approximant` and the workflow `UserTag` classification.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PsdEstimation {
    Mean,
    Median,
}

impl std::fmt::Display for PsdEstimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PsdEstimation::Mean => "mean",
            PsdEstimation::Median => "median",
        };
        write!(f, "{}", s)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnInMethod {
    None,
    HalfChain,
    MaxPosterior,
}

impl Default for BurnInMethod {
    fn default() -> Self {
        BurnInMethod::MaxPosterior
    }
}

impl std::fmt::Display for BurnInMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BurnInMethod::None => write!(f, "none"),
            BurnInMethod::HalfChain => write!(f, "half_chain"),
            BurnInMethod::MaxPosterior => write!(f, "max_posterior"),
        }
    }
}

/// Sampler registry key
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    Emcee,
    Metropolis,
}

impl std::fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerKind::Emcee => write!(f, "emcee"),
            SamplerKind::Metropolis => write!(f, "metropolis"),
        }
    }
}

/// Likelihood model registry key
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    GaussianNoise,
    TestNormal,
    TestRosenbrock,
}

impl ModelKind {
    /// Whether the model consumes detector strain.
    pub fn needs_data(&self) -> bool {
        matches!(self, ModelKind::GaussianNoise)
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::GaussianNoise => write!(f, "gaussian_noise"),
            ModelKind::TestNormal => write!(f, "test_normal"),
            ModelKind::TestRosenbrock => write!(f, "test_rosenbrock"),
        }
    }
}

/// Waveform registry key
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Approximant {
    SineGaussian,
    TaylorF2,
}

impl std::fmt::Display for Approximant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Approximant::SineGaussian => write!(f, "SineGaussian"),
            Approximant::TaylorF2 => write!(f, "TaylorF2"),
        }
    }
}

/// Workflow classification of a user tag
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum UserTag {
    FullData,
    Playground,
    Injection(String),
    Other(String),
}

impl std::fmt::Display for UserTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserTag::FullData => write!(f, "FULL_DATA"),
            UserTag::Playground => write!(f, "PLAYGROUND"),
            UserTag::Injection(tag) | UserTag::Other(tag) => write!(f, "{}", tag),
        }
    }
}
