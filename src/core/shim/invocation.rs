//! Run the external inspiral binary for one workflow job.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use super::usertag::{classify_user_tag, expected_output_name, user_tag_from_filename};
use crate::error::{Error, Result};
use crate::io::cache::write_cache_file;
use crate::types::UserTag;

/// Everything the workflow manager hands the shim for one job
#[derive(Debug, Clone)]
pub struct Invocation {
    pub executable: PathBuf,
    pub ifo: String,
    pub gps_start_time: u64,
    pub gps_end_time: u64,
    /// Derived from `output_file` when absent
    pub user_tag: Option<String>,
    pub frame_urls: Vec<String>,
    /// Name the workflow expects the result under
    pub output_file: PathBuf,
    /// Extension of the file the binary writes
    pub output_extension: String,
    /// Directory the binary runs in and writes its output to
    pub working_dir: PathBuf,
    /// Passed through to the binary after the generated arguments
    pub extra_args: Vec<String>,
}

impl Invocation {
    pub fn duration(&self) -> u64 {
        self.gps_end_time.saturating_sub(self.gps_start_time)
    }

    pub fn resolved_user_tag(&self) -> Option<String> {
        self.user_tag
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| user_tag_from_filename(&self.output_file))
    }

    /// Path the binary's own output lands at
    pub fn produced_output(&self) -> PathBuf {
        self.working_dir.join(expected_output_name(
            &self.ifo,
            self.resolved_user_tag().as_deref(),
            self.gps_start_time,
            self.duration(),
            &self.output_extension,
        ))
    }

    /// Argument list for the binary, given the frame cache path
    pub fn arguments(&self, cache: &Path) -> Vec<String> {
        let mut args = vec![
            "--frame-cache".to_string(),
            cache.display().to_string(),
            "--gps-start-time".to_string(),
            self.gps_start_time.to_string(),
            "--gps-end-time".to_string(),
            self.gps_end_time.to_string(),
            "--ifo-tag".to_string(),
            self.ifo.clone(),
        ];
        if let Some(tag) = self.resolved_user_tag() {
            args.push("--user-tag".to_string());
            args.push(tag);
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Rename, falling back to copy-and-delete across filesystems
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    let _ = fs::remove_file(from);
    Ok(())
}

/// Run the binary and return its exit code.
///
/// The temporary frame cache is removed when this returns, whatever the
/// outcome. A binary killed by a signal yields exit code 1.
pub fn run_inspiral(invocation: &Invocation) -> Result<i32> {
    if invocation.gps_end_time <= invocation.gps_start_time {
        return Err(Error::invalid(
            "--gps-end-time",
            format!(
                "{} is not after {}",
                invocation.gps_end_time, invocation.gps_start_time
            ),
        ));
    }
    let tag = invocation.resolved_user_tag();
    match tag.as_deref().map(classify_user_tag) {
        Some(UserTag::Injection(name)) => info!("Injection job {}", name),
        Some(kind) => info!("Analysis job tagged {}", kind),
        None => info!("Untagged analysis job"),
    }

    let cache = tempfile::Builder::new()
        .prefix(&format!("{}-", invocation.ifo))
        .suffix(".cache")
        .tempfile_in(&invocation.working_dir)?;
    let entries = write_cache_file(&invocation.frame_urls, cache.path())?;
    debug!("Frame cache {:?} holds {} frames", cache.path(), entries.len());

    let args = invocation.arguments(cache.path());
    info!("Running {:?} {}", invocation.executable, args.join(" "));
    let status = Command::new(&invocation.executable)
        .args(&args)
        .current_dir(&invocation.working_dir)
        .status()
        .map_err(|e| Error::External(format!("cannot run {:?}: {}", invocation.executable, e)))?;

    let code = match status.code() {
        Some(0) => 0,
        Some(code) => {
            warn!("{:?} exited with status {}", invocation.executable, code);
            return Ok(code);
        }
        None => {
            warn!("{:?} was terminated by a signal", invocation.executable);
            return Ok(1);
        }
    };

    let produced = invocation.produced_output();
    if !produced.exists() {
        return Err(Error::External(format!(
            "{:?} succeeded but did not write {:?}",
            invocation.executable, produced
        )));
    }
    if produced != invocation.output_file {
        move_file(&produced, &invocation.output_file)?;
        info!("Moved {:?} to {:?}", produced, invocation.output_file);
    }
    Ok(code)
}
