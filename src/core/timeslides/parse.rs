//! Slide specification grammars.
//!
//! Range grammar: `INSTRUMENT=START:STOP:STEP` or `INSTRUMENT=OFFSET`.
//! Multiples grammar: `[START:]STOP:INSTRUMENT=OFFSET[,INSTRUMENT=OFFSET...]`.
use std::collections::BTreeMap;

use crate::core::timeslides::offsetvector::{OFFSET_TOLERANCE, OffsetVector};
use crate::error::{Error, Result};

/// Inclusive range of offsets for one instrument
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    pub instrument: String,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl RangeSpec {
    /// Offsets from `start` to `stop` inclusive, in `step` increments
    pub fn values(&self) -> Vec<f64> {
        if self.start == self.stop {
            return vec![self.start];
        }
        let count = ((self.stop - self.start) / self.step + OFFSET_TOLERANCE).floor() as usize;
        (0..=count)
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// Integer multiples `n * base` for every `n` in `first..=last`
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplesSpec {
    pub first: i64,
    pub last: i64,
    pub base: OffsetVector,
}

fn parse_f64(arg: &'static str, text: &str, whole: &str) -> Result<f64> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| Error::invalid(arg, whole))?;
    if !value.is_finite() {
        return Err(Error::invalid(arg, whole));
    }
    Ok(value)
}

fn split_assignment<'a>(arg: &'static str, text: &'a str) -> Result<(&'a str, &'a str)> {
    let (name, value) = text.split_once('=').ok_or_else(|| Error::invalid(arg, text))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid(arg, text));
    }
    Ok((name, value.trim()))
}

pub fn parse_range_spec(text: &str) -> Result<RangeSpec> {
    const ARG: &str = "--instrument";
    let (instrument, range) = split_assignment(ARG, text)?;
    let parts: Vec<&str> = range.split(':').collect();
    let (start, stop, step) = match parts.as_slice() {
        [single] => {
            let v = parse_f64(ARG, single, text)?;
            (v, v, 1.0)
        }
        [start, stop, step] => (
            parse_f64(ARG, start, text)?,
            parse_f64(ARG, stop, text)?,
            parse_f64(ARG, step, text)?,
        ),
        _ => return Err(Error::invalid(ARG, text)),
    };
    if step <= 0.0 || start > stop {
        return Err(Error::invalid(ARG, text));
    }
    Ok(RangeSpec {
        instrument: instrument.to_string(),
        start,
        stop,
        step,
    })
}

pub fn parse_multiples_spec(text: &str) -> Result<MultiplesSpec> {
    const ARG: &str = "--inspiral-num-slides";
    let parse_count = |s: &str| -> Result<i64> {
        s.trim().parse().map_err(|_| Error::invalid(ARG, text))
    };
    let parts: Vec<&str> = text.splitn(3, ':').collect();
    let (first, last, vector) = match parts.as_slice() {
        [stop, vector] => {
            let stop = parse_count(stop)?;
            (-stop, stop, *vector)
        }
        [start, stop, vector] => (parse_count(start)?, parse_count(stop)?, *vector),
        _ => return Err(Error::invalid(ARG, text)),
    };
    if first > last {
        return Err(Error::invalid(ARG, text));
    }
    let mut base = OffsetVector::new();
    for pair in vector.split(',').filter(|p| !p.trim().is_empty()) {
        let (instrument, offset) = split_assignment(ARG, pair)?;
        if base.insert(instrument, parse_f64(ARG, offset, text)?).is_some() {
            return Err(Error::invalid(ARG, text));
        }
    }
    if base.is_empty() {
        return Err(Error::invalid(ARG, text));
    }
    Ok(MultiplesSpec { first, last, base })
}

/// Parse `INSTRUMENT=OFFSET` normalization references
pub fn parse_normalization(items: &[String]) -> Result<BTreeMap<String, f64>> {
    const ARG: &str = "--normalize";
    let mut refs = BTreeMap::new();
    for item in items {
        let (instrument, offset) = split_assignment(ARG, item)?;
        if refs
            .insert(instrument.to_string(), parse_f64(ARG, offset, item)?)
            .is_some()
        {
            return Err(Error::invalid(ARG, item.as_str()));
        }
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive() {
        let r = parse_range_spec("H1=-10:10:5").unwrap();
        assert_eq!(r.values(), vec![-10.0, -5.0, 0.0, 5.0, 10.0]);
    }

    #[test]
    fn single_offset_range() {
        let r = parse_range_spec("L1=3.5").unwrap();
        assert_eq!(r.values(), vec![3.5]);
    }

    #[test]
    fn fractional_step_keeps_endpoint() {
        let r = parse_range_spec("V1=0:0.3:0.1").unwrap();
        assert_eq!(r.values().len(), 4);
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(parse_range_spec("H1=0:10:0").is_err());
        assert!(parse_range_spec("H1=10:0:1").is_err());
        assert!(parse_range_spec("H1").is_err());
        assert!(parse_range_spec("=1:2:1").is_err());
        assert!(parse_range_spec("H1=a:b:c").is_err());
    }

    #[test]
    fn multiples_default_start_is_negative_stop() {
        let m = parse_multiples_spec("3:H1=0,L1=5").unwrap();
        assert_eq!((m.first, m.last), (-3, 3));
        assert_eq!(m.base.get("L1"), Some(5.0));
    }

    #[test]
    fn multiples_with_explicit_start() {
        let m = parse_multiples_spec("1:4:H1=0,L1=5,V1=10").unwrap();
        assert_eq!((m.first, m.last), (1, 4));
        assert_eq!(m.base.len(), 3);
    }

    #[test]
    fn multiples_reject_duplicates_and_empty_vectors() {
        assert!(parse_multiples_spec("3:H1=0,H1=5").is_err());
        assert!(parse_multiples_spec("3:").is_err());
        assert!(parse_multiples_spec("4:1:H1=0").is_err());
    }

    #[test]
    fn normalization_pairs() {
        let refs = parse_normalization(&["H1=0".into(), "L1=2".into()]).unwrap();
        assert_eq!(refs.get("L1"), Some(&2.0));
        assert!(parse_normalization(&["H1=0".into(), "H1=1".into()]).is_err());
    }
}
