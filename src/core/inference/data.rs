//! Strain loading, synthetic noise, PSD estimation and signal injection.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::inference::config::ModelConfig;
use crate::core::inference::model::DetectorData;
use crate::core::inference::seeds::noise_rng;
use crate::core::signal::psd::{Psd, welch};
use crate::core::signal::series::{FrequencySeries, TimeSeries};
use crate::core::signal::waveform::{FrequencyGrid, Params};
use crate::error::{Error, Result};
use crate::io::strain::{read_psd_samples, read_time_series};
use crate::types::{Approximant, PsdEstimation};

/// Where detector strain and PSDs come from
#[derive(Debug, Clone)]
pub struct DataOptions {
    /// `(IFO, path)` ASCII strain files
    pub data: Vec<(String, PathBuf)>,
    pub sample_rate: Option<f64>,
    /// Detectors to fill with synthetic white Gaussian noise
    pub fake_strain: Vec<String>,
    pub fake_strain_seed: u64,
    pub fake_strain_sigma: f64,
    pub gps_start_time: Option<f64>,
    pub gps_end_time: Option<f64>,
    pub injection_file: Option<PathBuf>,
    pub psd_estimation: PsdEstimation,
    pub psd_segment_length: Option<f64>,
    pub psd_segment_stride: Option<f64>,
    /// `(IFO, path)` ASCII PSD files; take precedence over estimation
    pub psd_files: Vec<(String, PathBuf)>,
}

impl Default for DataOptions {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            sample_rate: None,
            fake_strain: Vec::new(),
            fake_strain_seed: 0,
            fake_strain_sigma: 1.0,
            gps_start_time: None,
            gps_end_time: None,
            injection_file: None,
            psd_estimation: PsdEstimation::Median,
            psd_segment_length: None,
            psd_segment_stride: None,
            psd_files: Vec::new(),
        }
    }
}

/// Waveform added to every detector's strain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Injection {
    pub approximant: Approximant,
    pub params: Params,
}

impl Injection {
    pub fn load(path: &Path) -> Result<Self> {
        let injection: Injection = toml::from_str(&std::fs::read_to_string(path)?)?;
        for p in injection.approximant.parameters() {
            if !injection.params.contains_key(*p) {
                return Err(Error::Config(format!(
                    "{}: injection needs parameter `{}`",
                    path.display(),
                    p
                )));
            }
        }
        Ok(injection)
    }
}

/// Conditioned detector data ready for a likelihood model
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub detectors: Vec<DetectorData>,
    /// PSD per detector on its data grid
    pub psds: BTreeMap<String, Psd>,
}

impl LoadedData {
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

fn strain_sources(options: &DataOptions) -> Result<BTreeMap<String, Option<PathBuf>>> {
    let mut sources = BTreeMap::new();
    for (ifo, path) in &options.data {
        if sources.insert(ifo.clone(), Some(path.clone())).is_some() {
            return Err(Error::invalid("--data", format!("{ifo} given twice")));
        }
    }
    for ifo in &options.fake_strain {
        if sources.insert(ifo.clone(), None).is_some() {
            return Err(Error::invalid("--fake-strain", format!("{ifo} already has data")));
        }
    }
    Ok(sources)
}

/// White Gaussian noise over `[gps_start_time, gps_end_time)`
pub fn fake_strain(options: &DataOptions, index: usize) -> Result<TimeSeries> {
    let rate = options.sample_rate.ok_or(Error::MissingArgument {
        arg: "--sample-rate".to_string(),
    })?;
    let start = options.gps_start_time.ok_or(Error::MissingArgument {
        arg: "--gps-start-time".to_string(),
    })?;
    let end = options.gps_end_time.ok_or(Error::MissingArgument {
        arg: "--gps-end-time".to_string(),
    })?;
    let n = ((end - start) * rate).round();
    if !(n >= 1.0) {
        return Err(Error::invalid("--gps-end-time", format!("{end} is not after {start}")));
    }
    let normal = Normal::new(0.0, options.fake_strain_sigma)
        .map_err(|_| Error::invalid("--fake-strain-sigma", options.fake_strain_sigma.to_string()))?;
    let mut rng = noise_rng(options.fake_strain_seed, index);
    Ok(TimeSeries::new(
        (0..n as usize).map(|_| normal.sample(&mut rng)).collect(),
        1.0 / rate,
        start,
    ))
}

fn load_strain(options: &DataOptions, ifo: &str, source: Option<&Path>, index: usize) -> Result<TimeSeries> {
    let strain = match source {
        Some(path) => {
            let ts = read_time_series(path, options.sample_rate, options.gps_start_time)?;
            match (options.gps_start_time, options.gps_end_time) {
                (None, None) => ts,
                (start, end) => ts.time_slice(
                    start.unwrap_or(ts.start_time),
                    end.unwrap_or_else(|| ts.end_time()),
                ),
            }
        }
        None => {
            info!("Generating synthetic noise for {}", ifo);
            fake_strain(options, index)?
        }
    };
    if strain.len() < 2 {
        return Err(Error::Config(format!("{ifo}: no strain samples in the analysis segment")));
    }
    Ok(strain)
}

fn load_psd(options: &DataOptions, ifo: &str, strain: &TimeSeries, fd: &FrequencySeries) -> Result<Psd> {
    if let Some((_, path)) = options.psd_files.iter().find(|(i, _)| i == ifo) {
        let (freqs, values) = read_psd_samples(path)?;
        return Psd::from_samples(&freqs, &values, fd.delta_f, fd.len());
    }
    let seg_len = options.psd_segment_length.ok_or(Error::MissingArgument {
        arg: format!("--psd-segment-length or --psd-file {ifo}:PATH"),
    })?;
    let stride = options.psd_segment_stride.unwrap_or(seg_len / 2.0);
    let psd = welch(strain, seg_len, stride, options.psd_estimation)?;
    Ok(psd.interpolated(fd.delta_f, fd.len()))
}

/// Load, condition and optionally inject into every detector's strain.
///
/// The PSD is measured on the strain before the injection is added in the
/// frequency domain.
pub fn load_data(options: &DataOptions, model: &ModelConfig) -> Result<LoadedData> {
    let sources = strain_sources(options)?;
    for (ifo, _) in &options.psd_files {
        if !sources.contains_key(ifo) {
            warn!("Ignoring PSD file for {}, which has no strain", ifo);
        }
    }
    let injection = options.injection_file.as_deref().map(Injection::load).transpose()?;

    let mut detectors = Vec::new();
    let mut psds = BTreeMap::new();
    for (index, (ifo, source)) in sources.iter().enumerate() {
        let strain = load_strain(options, ifo, source.as_deref(), index)?;
        let mut fd = strain.to_frequency_series();
        let psd = load_psd(options, ifo, &strain, &fd)?;

        if let Some(inj) = &injection {
            let grid = FrequencyGrid {
                delta_f: fd.delta_f,
                len: fd.len(),
                f_lower: model.low_frequency_cutoff,
                epoch: fd.epoch,
            };
            let h = inj.approximant.generate(&inj.params, &grid)?;
            for (d, s) in fd.data.iter_mut().zip(h) {
                *d += s;
            }
            info!("Injected {} into {}", inj.approximant, ifo);
        }

        info!(
            "{}: {} samples at {} Hz from GPS {}",
            ifo,
            strain.len(),
            strain.sample_rate(),
            strain.start_time
        );
        let det = DetectorData::new(
            ifo,
            fd,
            &psd,
            model.low_frequency_cutoff,
            model.high_frequency_cutoff,
        )?;
        psds.insert(ifo.clone(), det.psd.clone());
        detectors.push(det);
    }
    Ok(LoadedData { detectors, psds })
}
