use std::collections::BTreeMap;

use tracing::debug;

use crate::core::timeslides::offsetvector::OffsetVector;
use crate::core::timeslides::parse::{MultiplesSpec, RangeSpec};

/// Every combination of per-instrument range values.
///
/// An instrument named by several ranges gets the concatenation of their values.
pub fn cartesian_product(ranges: &[RangeSpec]) -> Vec<OffsetVector> {
    if ranges.is_empty() {
        return Vec::new();
    }
    let mut axes: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for range in ranges {
        axes.entry(range.instrument.as_str())
            .or_default()
            .extend(range.values());
    }

    let mut vectors = vec![OffsetVector::new()];
    for (instrument, values) in &axes {
        let mut next = Vec::with_capacity(vectors.len() * values.len());
        for partial in &vectors {
            for &value in values {
                let mut v = partial.clone();
                v.insert(*instrument, value);
                next.push(v);
            }
        }
        vectors = next;
    }
    debug!(
        "Generated {} offset vectors over {} instruments",
        vectors.len(),
        axes.len()
    );
    vectors
}

/// `n * base` for every `n` in `first..=last`
pub fn multiples(spec: &MultiplesSpec) -> Vec<OffsetVector> {
    (spec.first..=spec.last)
        .map(|n| spec.base.scaled(n as f64))
        .collect()
}

/// Drop vectors whose offsets are all zero
pub fn remove_zero_lag(vectors: Vec<OffsetVector>) -> Vec<OffsetVector> {
    vectors.into_iter().filter(|v| !v.is_zero_lag()).collect()
}

/// Drop vectors equivalent to an earlier one, keeping first occurrences in order
pub fn deduplicate(vectors: Vec<OffsetVector>) -> Vec<OffsetVector> {
    let mut kept: Vec<OffsetVector> = Vec::with_capacity(vectors.len());
    for v in vectors {
        if !kept.iter().any(|k| k.is_equivalent(&v)) {
            kept.push(v);
        }
    }
    kept
}

/// Normalize every vector against the reference offsets
pub fn normalize_all(
    vectors: Vec<OffsetVector>,
    references: &BTreeMap<String, f64>,
) -> Vec<OffsetVector> {
    if references.is_empty() {
        return vectors;
    }
    vectors.iter().map(|v| v.normalized(references)).collect()
}
