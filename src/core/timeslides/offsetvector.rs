use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Offsets closer than this are treated as equal
pub const OFFSET_TOLERANCE: f64 = 1e-9;

/// Mapping instrument name -> time offset in seconds, ordered alphabetically by instrument
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OffsetVector(BTreeMap<String, f64>);

impl OffsetVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, instrument: impl Into<String>, offset: f64) -> Option<f64> {
        self.0.insert(instrument.into(), offset)
    }

    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.0.get(instrument).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True when every instrument has a zero offset
    pub fn is_zero_lag(&self) -> bool {
        self.0.values().all(|&v| v == 0.0)
    }

    /// Offsets relative to the alphabetically-first instrument
    pub fn deltas(&self) -> Vec<(&str, f64)> {
        let Some(reference) = self.0.values().next().copied() else {
            return Vec::new();
        };
        self.iter().map(|(k, v)| (k, v - reference)).collect()
    }

    /// Same instruments and same relative offsets: the vectors describe the same slide
    pub fn is_equivalent(&self, other: &OffsetVector) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.deltas()
            .iter()
            .zip(other.deltas().iter())
            .all(|((ia, da), (ib, db))| ia == ib && (da - db).abs() <= OFFSET_TOLERANCE)
    }

    /// Add `shift` to every offset
    pub fn shifted(&self, shift: f64) -> Self {
        Self(self.0.iter().map(|(k, v)| (k.clone(), v + shift)).collect())
    }

    /// Multiply every offset by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|(k, v)| (k.clone(), v * factor)).collect())
    }

    /// Shift the vector so that the alphabetically-first reference instrument it
    /// contains takes its reference offset. Vectors without any reference
    /// instrument come back unchanged.
    pub fn normalized(&self, references: &BTreeMap<String, f64>) -> Self {
        for (instrument, target) in references {
            if let Some(current) = self.get(instrument) {
                return self.shifted(target - current);
            }
        }
        self.clone()
    }
}

impl FromIterator<(String, f64)> for OffsetVector {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for OffsetVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(","))
    }
}
