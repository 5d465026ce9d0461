//! Time-slide construction: offset vectors, the two slide grammars, candidate
//! generation, deduplication and normalization, and even partitioning of the
//! result across output files.
pub mod generate;
pub mod offsetvector;
pub mod parse;
pub mod partition;

use std::collections::BTreeMap;

use tracing::info;

pub use generate::{cartesian_product, deduplicate, multiples, normalize_all, remove_zero_lag};
pub use offsetvector::OffsetVector;
pub use parse::{MultiplesSpec, RangeSpec, parse_multiples_spec, parse_normalization, parse_range_spec};
pub use partition::partition;

/// Inputs to the slide generator
#[derive(Debug, Clone, Default)]
pub struct SlideRequest {
    pub ranges: Vec<RangeSpec>,
    pub multiples: Vec<MultiplesSpec>,
    pub normalize: BTreeMap<String, f64>,
    pub remove_zero_lag: bool,
}

/// Generate, optionally drop the zero-lag vector, then normalize and deduplicate.
///
/// `existing` vectors (from documents being appended to) take part in
/// deduplication but are not returned.
pub fn build_offset_vectors(request: &SlideRequest, existing: &[OffsetVector]) -> Vec<OffsetVector> {
    let mut candidates = cartesian_product(&request.ranges);
    for spec in &request.multiples {
        candidates.extend(multiples(spec));
    }
    let generated = candidates.len();

    // zero lag is judged on the unshifted offsets
    if request.remove_zero_lag {
        candidates = remove_zero_lag(candidates);
    }
    let vectors = normalize_all(candidates, &request.normalize);
    let vectors: Vec<OffsetVector> = deduplicate(vectors)
        .into_iter()
        .filter(|v| !existing.iter().any(|e| e.is_equivalent(v)))
        .collect();

    info!(
        "Generated {} candidate offset vectors, {} unique new",
        generated,
        vectors.len()
    );
    vectors
}
