use std::path::Path;

use crate::io::cache::split_frame_name;
use crate::types::UserTag;

/// Classify a workflow user tag by its suffix
pub fn classify_user_tag(tag: &str) -> UserTag {
    if tag.ends_with("FULL_DATA") {
        UserTag::FullData
    } else if tag.ends_with("PLAYGROUND") {
        UserTag::Playground
    } else if tag.ends_with("INJ") {
        UserTag::Injection(tag.to_string())
    } else {
        UserTag::Other(tag.to_string())
    }
}

/// User tag carried in an `IFO-DESCRIPTION-START-DURATION.ext` file name.
///
/// The tag is whatever follows the first `_` of DESCRIPTION, so
/// `H1-INSPIRAL_FULL_DATA-967000000-2048.xml` carries `FULL_DATA`.
pub fn user_tag_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (_, description, _, _) = split_frame_name(name).ok()?;
    let (_, tag) = description.split_once('_')?;
    (!tag.is_empty()).then(|| tag.to_string())
}

/// File name the inspiral binary writes for a job
pub fn expected_output_name(
    ifo: &str,
    user_tag: Option<&str>,
    gps_start: u64,
    duration: u64,
    extension: &str,
) -> String {
    match user_tag {
        Some(tag) if !tag.is_empty() => {
            format!("{ifo}-INSPIRAL_{tag}-{gps_start}-{duration}.{extension}")
        }
        _ => format!("{ifo}-INSPIRAL-{gps_start}-{duration}.{extension}"),
    }
}
