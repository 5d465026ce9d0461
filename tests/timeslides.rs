use std::path::PathBuf;
use std::process::Command;

use gwpipe::{Document, OffsetVector, SlideRequest, TimeSlideJob, parse_range_spec, write_time_slides};
use tempfile::tempdir;

fn request(specs: &[&str]) -> SlideRequest {
    SlideRequest {
        ranges: specs.iter().map(|s| parse_range_spec(s).unwrap()).collect(),
        ..SlideRequest::default()
    }
}

fn slides(path: &PathBuf) -> Vec<OffsetVector> {
    Document::read(path).unwrap().time_slides().unwrap().into_values().collect()
}

#[test]
fn every_vector_lands_in_exactly_one_file() {
    let dir = tempdir().unwrap();
    let outputs: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("slides_{i}.xml"))).collect();
    let job = TimeSlideJob {
        request: SlideRequest {
            remove_zero_lag: true,
            ..request(&["H1=0:0:1", "L1=-25:25:5", "V1=0:10:10"])
        },
        outputs: outputs.clone(),
        ..TimeSlideJob::default()
    };
    let counts = write_time_slides(&job).unwrap();
    // 11 x 2 combinations, minus the zero lag
    assert_eq!(counts.iter().sum::<usize>(), 21);
    assert_eq!(counts, vec![7, 7, 7]);

    let all: Vec<OffsetVector> = outputs.iter().flat_map(slides).collect();
    assert_eq!(all.len(), 21);
    assert!(all.iter().all(|v| !v.is_zero_lag()));
    for (i, a) in all.iter().enumerate() {
        assert!(all[i + 1..].iter().all(|b| !a.is_equivalent(b)));
    }
}

#[test]
fn normalization_collapses_equivalent_vectors() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("norm.xml");
    let mut req = request(&["H1=0:10:5", "L1=0:10:5"]);
    req.normalize.insert("H1".to_string(), 0.0);
    let job = TimeSlideJob {
        request: req,
        outputs: vec![out.clone()],
        ..TimeSlideJob::default()
    };
    // 9 combinations, 5 distinct relative offsets
    assert_eq!(write_time_slides(&job).unwrap(), vec![5]);
    assert!(slides(&out).iter().all(|v| v.get("H1") == Some(0.0)));
}

#[test]
fn cli_writes_default_output_and_rejects_empty_runs() {
    let dir = tempdir().unwrap();
    let exe = env!("CARGO_BIN_EXE_gwpipe_timeslides");

    let status = Command::new(exe)
        .current_dir(dir.path())
        .args(["--instrument", "H1=0", "--instrument", "L1=0:100:50", "--comment", "test"])
        .status()
        .unwrap();
    assert!(status.success());
    let written = dir.path().join("time_slides.xml");
    assert_eq!(slides(&written).len(), 3);

    let doc = Document::read(&written).unwrap();
    assert!(doc.table("process").is_some());
    assert!(doc.table("process_params").is_some());

    let status = Command::new(exe).current_dir(dir.path()).status().unwrap();
    assert!(!status.success());
}

#[test]
fn cli_appends_to_existing_document() {
    let dir = tempdir().unwrap();
    let exe = env!("CARGO_BIN_EXE_gwpipe_timeslides");
    let first = dir.path().join("first.xml");
    let second = dir.path().join("second.xml");

    let status = Command::new(exe)
        .args(["--instrument", "H1=0", "--instrument", "L1=0:5:5", "--output"])
        .arg(&first)
        .status()
        .unwrap();
    assert!(status.success());

    let status = Command::new(exe)
        .args(["--instrument", "H1=0", "--instrument", "L1=0:10:5", "--add-to"])
        .arg(&first)
        .arg("--output")
        .arg(&second)
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(slides(&second).len(), 3);
}
