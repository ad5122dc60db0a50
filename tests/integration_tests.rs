//! Integration tests for the distance-matrix binary and library
//!
//! Every test writes its fixtures into a temporary directory and drives the
//! built binary, so the process strategy spawns real worker processes.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use distance_matrix::{
    CalculatorSpec, DistanceRecord, MatrixOptions, Pairing, Strategy, WORKER_FLAG,
};
use predicates::prelude::*;
use tempfile::TempDir;

const CITIES: &str = "Ann Arbor,42.2808,-83.7430
Pleasant Grove,40.3641,-111.7385
London,51.5074,-0.1278
Paris,48.8566,2.3522
Sydney,-33.8688,151.2093
";

fn write_cities(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("cities.csv");
    fs::write(&path, CITIES).unwrap();
    path
}

fn binary() -> Command {
    Command::cargo_bin("distance-matrix").unwrap()
}

/// Parse headerless `origin,destination,distance` rows, sorted by name pair
fn read_triples(path: &Path) -> Vec<(String, String, f64)> {
    let mut triples: Vec<(String, String, f64)> = fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 3, "bad output row: {line}");
            (
                fields[0].to_string(),
                fields[1].to_string(),
                fields[2].parse().unwrap(),
            )
        })
        .collect();
    triples.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    triples
}

fn assert_same_triples(actual: &[(String, String, f64)], expected: &[(String, String, f64)]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_eq!((&a.0, &a.1), (&e.0, &e.1));
        assert!((a.2 - e.2).abs() < 1e-9, "{a:?} vs {e:?}");
    }
}

#[test]
fn test_every_strategy_agrees() {
    let dir = TempDir::new().unwrap();
    let input = write_cities(&dir);

    let reference = dir.path().join("sequential.csv");
    binary()
        .arg(&input)
        .arg(&reference)
        .assert()
        .success();
    let expected = read_triples(&reference);
    assert_eq!(expected.len(), 20);

    for strategy in ["threaded", "pool", "process", "cooperative", "vectorized"] {
        let output = dir.path().join(format!("{strategy}.csv"));
        binary()
            .arg(&input)
            .arg(&output)
            .args(["--strategy", strategy, "--workers", "3"])
            .assert()
            .success();
        assert_same_triples(&read_triples(&output), &expected);
    }
}

#[test]
fn test_known_distance_from_every_strategy() {
    let dir = TempDir::new().unwrap();
    let input = write_cities(&dir);

    for strategy in Strategy::ALL {
        let output = dir.path().join(format!("{strategy}.csv"));
        binary()
            .arg(&input)
            .arg(&output)
            .args(["--strategy", strategy.as_str()])
            .assert()
            .success();

        let triples = read_triples(&output);
        let (_, _, distance) = triples
            .iter()
            .find(|(from, to, _)| from == "Ann Arbor" && to == "Pleasant Grove")
            .unwrap();
        assert!((distance - 2336.96).abs() < 1.0, "{strategy}: {distance}");
    }
}

#[test]
fn test_default_output_next_to_input() {
    let dir = TempDir::new().unwrap();
    let input = write_cities(&dir);

    binary()
        .arg(&input)
        .args(["--pairing", "unordered"])
        .assert()
        .success()
        .stderr(predicate::str::contains("10 records from 5 locations"));

    assert_eq!(read_triples(&dir.path().join("output.csv")).len(), 10);
}

#[test]
fn test_partitioned_vectorized_output() {
    let dir = TempDir::new().unwrap();
    let input = write_cities(&dir);
    let reference = dir.path().join("reference.csv");
    binary().arg(&input).arg(&reference).assert().success();

    binary()
        .arg(&input)
        .args(["--strategy", "vectorized", "--partitions", "3"])
        .assert()
        .success();

    let out = dir.path().join("output");
    let mut combined = Vec::new();
    for index in 0..3 {
        let part = out.join(format!("{index}.csv"));
        assert!(part.exists(), "missing {}", part.display());
        combined.extend(read_triples(&part));
    }
    combined.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    assert_same_triples(&combined, &read_triples(&reference));
}

#[test]
fn test_invalid_row_is_named_and_nothing_written() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cities.csv");
    fs::write(&input, "Ann Arbor,42.2808,-83.7430\nNowhere,123.0,0.0\n").unwrap();

    for strategy in ["sequential", "cooperative", "vectorized"] {
        binary()
            .arg(&input)
            .args(["--strategy", strategy])
            .assert()
            .failure()
            .stderr(predicate::str::contains("line 2"))
            .stderr(predicate::str::contains("latitude"));
        assert!(!dir.path().join("output.csv").exists());
    }
}

#[test]
fn test_unknown_strategy_suggests_closest() {
    let dir = TempDir::new().unwrap();
    let input = write_cities(&dir);

    binary()
        .arg(&input)
        .args(["--strategy", "multiproces"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Did you mean 'process'?"));
}

#[test]
fn test_partitions_require_vectorized() {
    let dir = TempDir::new().unwrap();
    let input = write_cities(&dir);

    binary()
        .arg(&input)
        .args(["--strategy", "pool", "--partitions", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("partitions"));
    assert!(!dir.path().join("output.csv").exists());
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    binary()
        .arg(dir.path().join("absent.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_worker_mode_round_trip() {
    let request = r#"{"calculator":{"formula":"haversine","earth_radius":6371.0088},
        "tasks":[{"index":4,"from":{"latitude":42.2808,"longitude":-83.743},
                  "to":{"latitude":40.3641,"longitude":-111.7385}}]}"#;

    binary()
        .arg(WORKER_FLAG)
        .write_stdin(request)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""index":4"#))
        .stdout(predicate::str::contains("2336.9"));
}

#[test]
fn test_worker_mode_rejects_garbage() {
    binary()
        .arg(WORKER_FLAG)
        .write_stdin("not a request")
        .assert()
        .failure();
}

#[test]
fn test_library_process_strategy_with_explicit_worker() {
    let dir = TempDir::new().unwrap();
    let input = write_cities(&dir);

    let sequential = distance_matrix::compute(&input).unwrap();
    let options = MatrixOptions {
        strategy: Strategy::Process,
        pairing: Pairing::Ordered,
        calculator: CalculatorSpec::default(),
        workers: 2,
        worker_program: Some(PathBuf::from(env!("CARGO_BIN_EXE_distance-matrix"))),
        ..Default::default()
    };
    let process: Vec<DistanceRecord> =
        distance_matrix::compute_with_options(&input, &options).unwrap();

    // Process results are re-sorted by pair index, so order matches too
    assert_eq!(process.len(), sequential.len());
    for (p, s) in process.iter().zip(&sequential) {
        assert_eq!((&p.origin, &p.destination), (&s.origin, &s.destination));
        assert!((p.distance - s.distance).abs() < 1e-12);
    }
}
