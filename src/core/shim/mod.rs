//! Inspiral invocation shim: turn a workflow job description into a call to
//! the external inspiral binary, then hand its output back under the name
//! the workflow asked for.
pub mod invocation;
pub mod usertag;

use std::path::{Path, PathBuf};

use tracing::info;

pub use invocation::{Invocation, run_inspiral};
pub use usertag::{classify_user_tag, expected_output_name, user_tag_from_filename};

use crate::error::{Error, Result};
use crate::io::pegasus::TransformationEntry;

/// Absolute path of an existing executable.
///
/// A bare name is looked up on `PATH` first, then in the working directory.
pub fn resolve_executable(executable: &Path) -> Result<PathBuf> {
    if executable.is_absolute() {
        if executable.is_file() {
            return Ok(executable.to_path_buf());
        }
        return Err(not_found(executable));
    }
    if executable.components().count() == 1 {
        let on_path = std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(executable))
                .find(|candidate| candidate.is_absolute() && candidate.is_file())
        });
        if let Some(found) = on_path {
            return Ok(found);
        }
    }
    let local = std::env::current_dir()?.join(executable);
    if local.is_file() {
        Ok(local)
    } else {
        Err(not_found(executable))
    }
}

fn not_found(executable: &Path) -> Error {
    Error::invalid(
        "--executable",
        format!("{} not found on PATH or in the working directory", executable.display()),
    )
}

/// Pegasus catalog entry for `executable` installed on `site`
pub fn transformation_catalog_entry(name: &str, site: &str, executable: &Path) -> Result<String> {
    let absolute = resolve_executable(executable)?;
    Ok(TransformationEntry::installed(name, site, &absolute).to_catalog_text())
}

pub fn write_transformation_catalog(
    path: &Path,
    name: &str,
    site: &str,
    executable: &Path,
) -> Result<()> {
    std::fs::write(path, transformation_catalog_entry(name, site, executable)?)?;
    info!("Wrote transformation catalog entry for {} to {:?}", name, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn absolute_executable_is_kept() {
        let exe = NamedTempFile::new().unwrap();
        let entry = transformation_catalog_entry("inspiral", "local", exe.path()).unwrap();
        assert!(entry.contains(&format!("pfn \"file://{}\"", exe.path().display())));
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_is_found_on_path() {
        let resolved = resolve_executable(Path::new("sh")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("sh"));
        assert_ne!(resolved, std::env::current_dir().unwrap().join("sh"));
    }

    #[test]
    fn missing_executable_is_an_error() {
        for exe in ["gwpipe-no-such-inspiral", "/nonexistent/bin/lalapps_inspiral"] {
            assert!(matches!(
                transformation_catalog_entry("inspiral", "local", Path::new(exe)),
                Err(Error::InvalidArgument { arg: "--executable", .. })
            ));
        }
    }
}
