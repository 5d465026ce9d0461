//! High-level library API: build and write time-slide documents, and run a
//! complete inference job from a configuration file. The CLI runners are thin
//! wrappers over these; prefer them when embedding gwpipe.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::inference::{
    DataOptions, InferenceConfig, Posterior, RunOptions, RunSummary, load_data, run,
};
use crate::core::timeslides::{OffsetVector, SlideRequest, build_offset_vectors, partition};
use crate::error::{Error, Result};
use crate::io::ligolw::Document;

pub const TIMESLIDES_PROGRAM: &str = "gwpipe_timeslides";

/// A time-slide run: what to generate and where to write it
#[derive(Debug, Clone, Default)]
pub struct TimeSlideJob {
    pub request: SlideRequest,
    /// Existing documents whose slides are carried into the output
    pub add_to: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub comment: String,
    /// Recorded in the process_params table
    pub params: Vec<(String, String)>,
}

/// Slides of every input document, in document order then id order, deduplicated
pub fn load_existing_slides(paths: &[PathBuf]) -> Result<Vec<OffsetVector>> {
    let mut existing: Vec<OffsetVector> = Vec::new();
    for path in paths {
        let doc = Document::read(path)?;
        let slides = doc.time_slides()?;
        let mut ids: Vec<&String> = slides.keys().collect();
        ids.sort_by_key(|id| id.rsplit(':').next().and_then(|n| n.parse::<usize>().ok()));
        let before = existing.len();
        for id in ids {
            let v = &slides[id];
            if !existing.iter().any(|e| e.is_equivalent(v)) {
                existing.push(v.clone());
            }
        }
        info!("Loaded {} time slides from {:?}", existing.len() - before, path);
    }
    Ok(existing)
}

/// Build one document per output holding its share of the slides
pub fn build_time_slide_documents(job: &TimeSlideJob) -> Result<Vec<Document>> {
    let request = &job.request;
    if request.ranges.is_empty() && request.multiples.is_empty() && job.add_to.is_empty() {
        return Err(Error::Config(
            "nothing to do: no --instrument, --inspiral-num-slides or --add-to given".into(),
        ));
    }
    if job.outputs.is_empty() {
        return Err(Error::MissingArgument {
            arg: "--output".to_string(),
        });
    }

    let existing = load_existing_slides(&job.add_to)?;
    let new = build_offset_vectors(request, &existing);
    let mut vectors = existing;
    vectors.extend(new);

    let groups = partition(vectors, job.outputs.len());
    let mut documents = Vec::with_capacity(groups.len());
    for group in groups {
        let mut doc = Document::new();
        let pid = doc.register_process(TIMESLIDES_PROGRAM, &job.comment, &job.params);
        doc.append_time_slides(&pid, &group);
        doc.finish_process(&pid);
        documents.push(doc);
    }
    Ok(documents)
}

/// Build and write the documents; returns the number of slides per output
pub fn write_time_slides(job: &TimeSlideJob) -> Result<Vec<usize>> {
    let documents = build_time_slide_documents(job)?;
    let mut counts = Vec::with_capacity(documents.len());
    for (doc, path) in documents.iter().zip(&job.outputs) {
        doc.write(path)?;
        let n = doc.time_slides()?.len();
        info!("Wrote {} time slides to {:?}", n, path);
        counts.push(n);
    }
    Ok(counts)
}

/// Command-line overrides of the sampler section
#[derive(Debug, Clone, Default)]
pub struct SamplerOverrides {
    pub nwalkers: Option<usize>,
    pub niterations: Option<usize>,
    pub checkpoint_interval: Option<usize>,
    pub seed: Option<u64>,
}

impl SamplerOverrides {
    pub fn apply(&self, config: &mut InferenceConfig) {
        let s = &mut config.sampler;
        if let Some(v) = self.nwalkers {
            s.nwalkers = v;
        }
        if let Some(v) = self.niterations {
            s.niterations = v;
        }
        if let Some(v) = self.checkpoint_interval {
            s.checkpoint_interval = v;
        }
        if let Some(v) = self.seed {
            s.seed = v;
        }
    }
}

/// Everything one inference run needs
#[derive(Debug, Clone)]
pub struct InferenceJob {
    pub config_file: PathBuf,
    pub overrides: SamplerOverrides,
    pub data: DataOptions,
    pub run: RunOptions,
}

/// Load the configuration with overrides applied and validated
pub fn load_config(path: &Path, overrides: &SamplerOverrides) -> Result<InferenceConfig> {
    let text = std::fs::read_to_string(path)?;
    let mut config: InferenceConfig = toml::from_str(&text)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load data if the model needs it, build the posterior and run the sampler
pub fn run_inference(job: &InferenceJob) -> Result<RunSummary> {
    let config = load_config(&job.config_file, &job.overrides)?;
    info!(
        "Sampling {} parameters with {} ({} walkers, {} iterations)",
        config.ndim(),
        config.sampler.name,
        config.sampler.nwalkers,
        config.sampler.niterations
    );

    let (detectors, psds) = if config.model.name.needs_data() {
        let data = load_data(&job.data, &config.model)?;
        if data.is_empty() {
            return Err(Error::MissingArgument {
                arg: "--data or --fake-strain".to_string(),
            });
        }
        (data.detectors, data.psds)
    } else {
        if !job.data.data.is_empty() || !job.data.fake_strain.is_empty() {
            warn!("Model {} does not use strain data; ignoring it", config.model.name);
        }
        (Vec::new(), BTreeMap::new())
    };

    let posterior = Posterior::from_config(&config, detectors)?;
    let summary = run(&config, &posterior, psds, &job.run)?;
    info!(
        "Finished {} iterations; mean acceptance {:.3}",
        summary.iterations, summary.mean_acceptance
    );
    Ok(summary)
}
