#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use gwpipe::{Invocation, run_inspiral};
use gwpipe::io::cache::read_cache_file;
use tempfile::tempdir;

const FAKE_INSPIRAL: &str = r#"#!/bin/sh
tag=""
while [ $# -gt 0 ]; do
  case "$1" in
    --frame-cache) cache="$2"; shift ;;
    --gps-start-time) start="$2"; shift ;;
    --gps-end-time) end="$2"; shift ;;
    --ifo-tag) ifo="$2"; shift ;;
    --user-tag) tag="_$2"; shift ;;
    --exit-with) exit "$2" ;;
    --write-nothing) exit 0 ;;
  esac
  shift
done
cp "$cache" "$ifo-INSPIRAL$tag-$start-$((end - start)).xml"
"#;

fn fake_binary(dir: &Path) -> PathBuf {
    let path = dir.join("fake_inspiral.sh");
    fs::write(&path, FAKE_INSPIRAL).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn invocation(bin: &Path, work: &Path, output: PathBuf) -> Invocation {
    Invocation {
        executable: bin.to_path_buf(),
        ifo: "H1".into(),
        gps_start_time: 967000000,
        gps_end_time: 967002048,
        user_tag: None,
        frame_urls: vec![
            "/frames/H-H1_LDAS_C02_L2-967001024-1024.gwf".into(),
            "/frames/H-H1_LDAS_C02_L2-967000000-1024.gwf".into(),
        ],
        output_file: output,
        output_extension: "xml".into(),
        working_dir: work.to_path_buf(),
        extra_args: vec![],
    }
}

fn leftover_caches(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|x| x == "cache")
        })
        .count()
}

#[test]
fn successful_run_moves_output_and_cleans_up() {
    let dir = tempdir().unwrap();
    let bin = fake_binary(dir.path());
    let work = dir.path().join("work");
    fs::create_dir(&work).unwrap();
    let output = dir.path().join("H1-INSPIRAL_FULL_DATA-967000000-2048.xml");

    let code = run_inspiral(&invocation(&bin, &work, output.clone())).unwrap();
    assert_eq!(code, 0);
    assert!(output.exists());
    assert!(!work.join("H1-INSPIRAL_FULL_DATA-967000000-2048.xml").exists());
    assert_eq!(leftover_caches(&work), 0);

    // the fake binary copied its frame cache to the output
    let entries = read_cache_file(&output).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].gps_start, 967000000);
    assert!(entries[0].url.starts_with("file://localhost/frames/"));
}

#[test]
fn failing_binary_exit_code_is_returned() {
    let dir = tempdir().unwrap();
    let bin = fake_binary(dir.path());
    let output = dir.path().join("out.xml");
    let mut inv = invocation(&bin, dir.path(), output.clone());
    inv.extra_args = vec!["--exit-with".into(), "3".into()];

    assert_eq!(run_inspiral(&inv).unwrap(), 3);
    assert!(!output.exists());
    assert_eq!(leftover_caches(dir.path()), 0);
}

#[test]
fn missing_output_is_an_error() {
    let dir = tempdir().unwrap();
    let bin = fake_binary(dir.path());
    let mut inv = invocation(&bin, dir.path(), dir.path().join("out.xml"));
    inv.extra_args = vec!["--write-nothing".into()];
    assert!(run_inspiral(&inv).is_err());
    assert_eq!(leftover_caches(dir.path()), 0);
}

#[test]
fn cli_propagates_exit_status() {
    let dir = tempdir().unwrap();
    let bin = fake_binary(dir.path());
    let status = Command::new(env!("CARGO_BIN_EXE_gwpipe_inspiral_shim"))
        .arg("--executable")
        .arg(&bin)
        .arg("--working-dir")
        .arg(dir.path())
        .args([
            "--ifo",
            "L1",
            "--gps-start-time",
            "100",
            "--gps-end-time",
            "200",
            "--frame-file",
            "/frames/L-L1_RDS-100-100.gwf",
            "--output-file",
        ])
        .arg(dir.path().join("L1-INSPIRAL_PLAYGROUND-100-100.xml"))
        .args(["--", "--exit-with", "7"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(7));
}

#[test]
fn cli_writes_transformation_catalog() {
    let dir = tempdir().unwrap();
    let bin = fake_binary(dir.path());
    let tc = dir.path().join("tc.txt");
    let status = Command::new(env!("CARGO_BIN_EXE_gwpipe_inspiral_shim"))
        .arg("--executable")
        .arg(&bin)
        .arg("--write-tc")
        .arg(&tc)
        .status()
        .unwrap();
    assert!(status.success());
    let text = fs::read_to_string(&tc).unwrap();
    assert!(text.contains(&format!("pfn \"file://{}\"", bin.display())));
    assert!(text.contains("type \"INSTALLED\""));
}

#[test]
fn cli_write_tc_rejects_unknown_executable() {
    let dir = tempdir().unwrap();
    let tc = dir.path().join("tc.txt");
    let status = Command::new(env!("CARGO_BIN_EXE_gwpipe_inspiral_shim"))
        .current_dir(dir.path())
        .args(["--executable", "gwpipe-no-such-inspiral", "--write-tc"])
        .arg(&tc)
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!tc.exists());
}
