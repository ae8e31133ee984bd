use assert_cmd::prelude::*;
use lazy_static::lazy_static;
use predicates::str::{contains, PredicateStrExt};
use regex::Regex;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

lazy_static! {
    static ref CANDIDATE_ROW: Regex =
        Regex::new(r"(?m)^(\d+)\t(\d+)\t(\d+)\t([0-9.e-]+)\t(\d+)\t(\d+)$").unwrap();
}

const AMPLICONS: &str = "tests/input/amplicons.fastq";

fn fastq_records(path: &std::path::Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count() / 4
}

#[test]
fn cli_no_args() {
    Command::cargo_bin("smartdada").unwrap().assert().failure();
}

#[test]
fn cli_no_such_file() {
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["trim", "tests/no_such_file.fastq"])
        .assert()
        .failure()
        .stderr(contains("FileNotFound").trim());
}

#[test]
fn cli_wrong_extension() {
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["trim", "tests/input/amplicons.txt"])
        .assert()
        .failure()
        .stderr(contains("NotFastq"));
}

#[test]
fn cli_bad_nucleotide() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.tsv");
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["trim", "tests/input/bad_nucleotide.fastq", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(contains("Format"));
}

#[test]
fn cli_trim() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("parameter_info.tsv");
    let ee_output = dir.path().join("SumEEInfo.tsv");
    let positions = dir.path().join("positions.tsv");

    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["trim", AMPLICONS, "-o"])
        .arg(&output)
        .arg("--ee-output")
        .arg(&ee_output)
        .arg("--positions-output")
        .arg(&positions)
        .assert()
        .success()
        .stdout(contains("2\t17"))
        .stderr(contains("might be too low"));

    let table = fs::read_to_string(&output).unwrap();
    assert!(table.starts_with(
        "LeftIndex\tRightIndex\tReadLength\tAvgEEPerPosition\tReadsUnderMaxEE\tReadsOverMaxEE\n"
    ));
    let rows: Vec<_> = CANDIDATE_ROW.captures_iter(&table).collect();
    assert_eq!(rows.len(), 6);
    for row in rows {
        let left: usize = row[1].parse().unwrap();
        let right: usize = row[2].parse().unwrap();
        assert_eq!(row[3].parse::<usize>().unwrap(), right - left);
        assert_eq!(&row[5], "40");
        assert_eq!(&row[6], "0");
    }

    let sums = fs::read_to_string(&ee_output).unwrap();
    assert_eq!(sums.lines().count(), 41);
    assert!(sums.starts_with("NoTrimming\tObviousTrimming\n"));

    let positions = fs::read_to_string(&positions).unwrap();
    assert_eq!(positions.lines().count(), 21);
    // every fifth read carries an N at position 18
    assert!(positions.lines().any(|line| line.starts_with("18\t") && line.ends_with("\t8")));
}

#[test]
fn cli_trim_gzipped() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("parameter_info.tsv");
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["trim", "tests/input/amplicons.fastq.gz", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("2\t17"));
}

#[test]
fn cli_classify_existing_table() {
    let dir = tempdir().unwrap();
    let windows = dir.path().join("parameter_info.tsv");
    let output = dir.path().join("strict.tsv");

    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["trim", AMPLICONS, "-o"])
        .arg(&windows)
        .assert()
        .success();

    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["classify", AMPLICONS, "--max-ee", "0.001", "-w"])
        .arg(&windows)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let table = fs::read_to_string(&output).unwrap();
    let rows: Vec<_> = CANDIDATE_ROW.captures_iter(&table).collect();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|row| &row[5] == "0" && &row[6] == "40"));
}

#[test]
fn cli_classify_rejects_other_tables() {
    let dir = tempdir().unwrap();
    let windows = dir.path().join("windows.tsv");
    fs::write(&windows, "left\tright\n2\t17\n").unwrap();

    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["classify", AMPLICONS, "-w"])
        .arg(&windows)
        .arg("-o")
        .arg(dir.path().join("out.tsv"))
        .assert()
        .failure()
        .stderr(contains("Validation"));
}

#[test]
fn cli_subsample_exact() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("subset.fastq");
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["subsample", AMPLICONS, "-n", "10", "--seed", "5", "-o"])
        .arg(&output)
        .assert()
        .success();
    assert_eq!(fastq_records(&output), 10);
}

#[test]
fn cli_subsample_too_many() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["subsample", AMPLICONS, "-n", "41", "-o"])
        .arg(dir.path().join("subset.fastq"))
        .assert()
        .failure()
        .stderr(contains("Validation"));
}

#[test]
fn cli_subsample_fraction() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("subset.fastq");
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["subsample", AMPLICONS, "-f", "0.5", "-o"])
        .arg(&output)
        .assert()
        .success();
    assert_eq!(fastq_records(&output), 20);
}

#[test]
fn cli_split() {
    let dir = tempdir().unwrap();
    let forward = dir.path().join("forward.fastq");
    let reverse = dir.path().join("reverse.fastq");
    Command::cargo_bin("smartdada")
        .unwrap()
        .args(&["split", AMPLICONS, "--forward"])
        .arg(&forward)
        .arg("--reverse")
        .arg(&reverse)
        .assert()
        .success();

    assert_eq!(fastq_records(&forward), 20);
    assert_eq!(fastq_records(&reverse), 20);
    let forward = fs::read_to_string(&forward).unwrap();
    assert!(forward
        .lines()
        .step_by(4)
        .all(|header| header.starts_with("@amp.1 ")));
}
