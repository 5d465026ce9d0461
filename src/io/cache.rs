//! LAL frame cache files: one `OBS DESCRIPTION START DURATION URL` entry per line.
//! Entries are derived from frame file names of the form `OBS-DESC-START-DURATION.ext`.
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors encountered when building or parsing frame caches
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed cache line {line}: {text}")]
    MalformedLine { line: usize, text: String },
    #[error("File name does not follow OBS-DESC-START-DURATION convention: {0}")]
    BadFileName(String),
}

/// A single frame cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub observatory: String,
    pub description: String,
    pub gps_start: u64,
    pub duration: u64,
    pub url: String,
}

impl CacheEntry {
    /// Build an entry from a frame URL or plain path.
    ///
    /// Plain paths become `file://localhost` URLs with an absolute path.
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let url = normalize_url(url)?;
        let name = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CacheError::BadFileName(url.clone()))?;
        let (observatory, description, gps_start, duration) = split_frame_name(name)?;
        Ok(Self {
            observatory,
            description,
            gps_start,
            duration,
            url,
        })
    }

    /// GPS end time (exclusive) covered by this entry
    pub fn gps_end(&self) -> u64 {
        self.gps_start.saturating_add(self.duration)
    }

    /// Filesystem path for `file://` URLs
    pub fn path(&self) -> Option<PathBuf> {
        let rest = self.url.strip_prefix("file://")?;
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        Some(PathBuf::from(rest))
    }

    /// Parse one cache line
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, CacheError> {
        let malformed = || CacheError::MalformedLine {
            line: line_no,
            text: line.to_string(),
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(malformed());
        }
        Ok(Self {
            observatory: fields[0].to_string(),
            description: fields[1].to_string(),
            gps_start: fields[2].parse().map_err(|_| malformed())?,
            duration: fields[3].parse().map_err(|_| malformed())?,
            url: fields[4].to_string(),
        })
    }
}

impl fmt::Display for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.observatory, self.description, self.gps_start, self.duration, self.url
        )
    }
}

fn normalize_url(url: &str) -> Result<String, CacheError> {
    if url.contains("://") {
        return Ok(url.to_string());
    }
    let path = Path::new(url);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(format!("file://localhost{}", absolute.display()))
}

/// Split `OBS-DESC-START-DURATION.ext` into its parts.
///
/// DESC may itself contain dashes; START and DURATION are always the last two fields.
pub fn split_frame_name(name: &str) -> Result<(String, String, u64, u64), CacheError> {
    let bad = || CacheError::BadFileName(name.to_string());
    let stem = name.split('.').next().ok_or_else(bad)?;
    let fields: Vec<&str> = stem.split('-').collect();
    if fields.len() < 4 {
        return Err(bad());
    }
    let n = fields.len();
    let duration = fields[n - 1].parse().map_err(|_| bad())?;
    let gps_start = fields[n - 2].parse().map_err(|_| bad())?;
    let description = fields[1..n - 2].join("-");
    Ok((fields[0].to_string(), description, gps_start, duration))
}

/// Write cache entries to `out`, one per line
pub fn write_cache<W: Write>(entries: &[CacheEntry], out: &mut W) -> Result<(), CacheError> {
    for entry in entries {
        writeln!(out, "{}", entry)?;
    }
    Ok(())
}

/// Build a cache from frame URLs and write it to `path`
pub fn write_cache_file(urls: &[String], path: &Path) -> Result<Vec<CacheEntry>, CacheError> {
    let mut entries = urls
        .iter()
        .map(|u| CacheEntry::from_url(u))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|a, b| {
        (a.observatory.as_str(), a.gps_start).cmp(&(b.observatory.as_str(), b.gps_start))
    });
    let mut file = fs::File::create(path)?;
    write_cache(&entries, &mut file)?;
    debug!("Wrote {} frame cache entries to {:?}", entries.len(), path);
    Ok(entries)
}

/// Read a cache file, skipping blank lines and `#` comments
pub fn read_cache_file(path: &Path) -> Result<Vec<CacheEntry>, CacheError> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .map(|(i, l)| CacheEntry::parse_line(l, i + 1))
        .collect()
}
