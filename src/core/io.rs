//! CSV input and output
//!
//! Input rows are `name,latitude,longitude`, output rows are
//! `origin,destination,distance`. Neither file carries a header.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::{debug, info};
use ndarray::Array1;

use crate::core::coordinates::Location;
use crate::core::error::{Error, Result};
use crate::core::executor::vectorized::LocationTable;
use crate::core::executor::DistanceRecord;

/// Default output file name, created next to the input
pub const OUTPUT_FILE_NAME: &str = "output.csv";

/// Default directory for partitioned output, created next to the input
pub const PARTITION_DIR_NAME: &str = "output";

const FIELDS_PER_ROW: usize = 3;

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(false).flexible(true).trim(Trim::All);
    builder
}

/// Split a record into its raw name and degree values
fn parse_fields(record: &StringRecord, line: u64) -> Result<(String, f64, f64)> {
    if record.len() != FIELDS_PER_ROW {
        return Err(Error::MalformedRow {
            line,
            reason: format!(
                "expected {FIELDS_PER_ROW} fields (name,latitude,longitude), found {}",
                record.len()
            ),
        });
    }

    let name = &record[0];
    if name.is_empty() {
        return Err(Error::MalformedRow {
            line,
            reason: "location name is empty".to_string(),
        });
    }

    let number = |field: &str, raw: &str| -> Result<f64> {
        raw.parse::<f64>().map_err(|_| Error::MalformedRow {
            line,
            reason: format!("{field} '{raw}' is not a number"),
        })
    };

    Ok((
        name.to_string(),
        number("latitude", &record[1])?,
        number("longitude", &record[2])?,
    ))
}

fn parse_location(record: &StringRecord, line: u64) -> Result<Location> {
    let (name, latitude, longitude) = parse_fields(record, line)?;
    Location::from_degrees(name, latitude, longitude)
        .map_err(|error| Error::InvalidRow { line, error })
}

fn record_line(record: &StringRecord, fallback: usize) -> u64 {
    record
        .position()
        .map(|position| position.line())
        .unwrap_or(fallback as u64 + 1)
}

/// Parse one input record into a location.
///
/// The text is usually one physical line, but may span several when a quoted
/// name contains a newline. Blank input yields `None`. `line_no` is only used
/// in error messages.
pub fn parse_line(line: &str, line_no: u64) -> Result<Option<Location>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let mut reader = reader_builder().from_reader(line.as_bytes());
    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(None);
    }

    parse_location(&record, line_no).map(Some)
}

/// Read every location from a headerless CSV file.
///
/// Stops at the first bad row; nothing is returned for a partly valid file.
pub fn read_locations(path: impl AsRef<Path>) -> Result<Vec<Location>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = reader_builder().from_reader(file);

    let mut locations = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let line = record_line(&record, row);
        locations.push(parse_location(&record, line)?);
    }

    info!("Read {} locations from {}", locations.len(), path.display());
    Ok(locations)
}

/// Read the input as columns and validate them as whole arrays
pub fn read_table(path: impl AsRef<Path>) -> Result<LocationTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = reader_builder().from_reader(file);

    let mut names = Vec::new();
    let mut latitude = Vec::new();
    let mut longitude = Vec::new();
    let mut lines = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let line = record_line(&record, row);
        let (name, lat, lon) = parse_fields(&record, line)?;
        names.push(name);
        latitude.push(lat);
        longitude.push(lon);
        lines.push(line);
    }

    let latitude = Array1::from(latitude);
    let longitude = Array1::from(longitude);
    if let Err((row, error)) = LocationTable::check_columns(&latitude, &longitude) {
        let line = lines.get(row).copied().unwrap_or(row as u64 + 1);
        return Err(Error::InvalidRow { line, error });
    }

    info!("Read {} location rows from {}", names.len(), path.display());
    LocationTable::from_columns(names, latitude, longitude)
}

/// Encode one record as a CSV line, terminator included
pub(crate) fn encode_record(record: &DistanceRecord) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.serialize(record)?;
    writer.flush()?;
    Ok(writer.get_ref().clone())
}

/// Write records as headerless CSV, replacing any existing file
pub fn write_records(path: impl AsRef<Path>, records: &[DistanceRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Write each partition to its own numbered file inside `dir`.
///
/// Returns the written paths in partition order.
pub fn write_partitioned(
    dir: impl AsRef<Path>,
    parts: &[Vec<DistanceRecord>],
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(parts.len());
    for (index, part) in parts.iter().enumerate() {
        let path = dir.join(format!("{index}.csv"));
        write_records(&path, part)?;
        debug!("Partition {index} holds {} records", part.len());
        paths.push(path);
    }

    Ok(paths)
}

fn sibling(input: &Path, name: &str) -> PathBuf {
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Default output file: `output.csv` in the input's directory
pub fn resolve_output_path(input: impl AsRef<Path>) -> PathBuf {
    sibling(input.as_ref(), OUTPUT_FILE_NAME)
}

/// Default partition directory: `output/` in the input's directory
pub fn resolve_partition_dir(input: impl AsRef<Path>) -> PathBuf {
    sibling(input.as_ref(), PARTITION_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CoordinateField;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("cities.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_locations_trims_and_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_input(
            &dir,
            "Ann Arbor, 42.2808, -83.7430\n\n  Pleasant Grove ,40.3641,-111.7385\n",
        );

        let locations = read_locations(&path).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1].name(), "Pleasant Grove");
        assert_eq!(locations[1].coordinates().longitude(), -111.7385);
    }

    #[test]
    fn test_read_locations_names_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "A,1,2\nB,3,4\nC,95.0,4\n");

        match read_locations(&path) {
            Err(Error::InvalidRow { line, error }) => {
                assert_eq!(line, 3);
                assert_eq!(error.field, CoordinateField::Latitude);
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn test_read_locations_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "A,1,2\nB,north,4\n");
        assert!(matches!(
            read_locations(&path),
            Err(Error::MalformedRow { line: 2, .. })
        ));

        let path = write_input(&dir, "A,1\n");
        assert!(matches!(
            read_locations(&path),
            Err(Error::MalformedRow { line: 1, .. })
        ));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_locations(dir.path().join("absent.csv")),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn test_parse_line() {
        assert!(parse_line("   ", 4).unwrap().is_none());

        let location = parse_line("\"Paris, FR\",48.8566,2.3522", 1)
            .unwrap()
            .unwrap();
        assert_eq!(location.name(), "Paris, FR");

        match parse_line("X,0,200", 9) {
            Err(Error::InvalidRow { line, error }) => {
                assert_eq!(line, 9);
                assert_eq!(error.field, CoordinateField::Longitude);
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn test_read_table_reports_source_line() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "A,1,2\n\nB,-91,4\n");

        match read_table(&path) {
            Err(Error::InvalidRow { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn test_write_records_is_headerless() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![
            DistanceRecord {
                origin: "A".to_string(),
                destination: "B".to_string(),
                distance: 1.5,
            },
            DistanceRecord {
                origin: "B, the second".to_string(),
                destination: "A".to_string(),
                distance: 1.5,
            },
        ];

        write_records(&path, &records).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "A,B,1.5\n\"B, the second\",A,1.5\n");
        assert_eq!(encode_record(&records[0]).unwrap(), b"A,B,1.5\n");
    }

    #[test]
    fn test_write_partitioned_numbers_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("output");
        let record = DistanceRecord {
            origin: "A".to_string(),
            destination: "B".to_string(),
            distance: 2.0,
        };
        let parts = vec![vec![record.clone()], vec![record.clone(), record]];

        let paths = write_partitioned(&out, &parts).unwrap();
        assert_eq!(paths, vec![out.join("0.csv"), out.join("1.csv")]);
        assert_eq!(fs::read_to_string(&paths[1]).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_resolve_output_paths() {
        assert_eq!(
            resolve_output_path("/data/cities.csv"),
            PathBuf::from("/data/output.csv")
        );
        assert_eq!(resolve_output_path("cities.csv"), PathBuf::from("output.csv"));
        assert_eq!(
            resolve_partition_dir("/data/cities.csv"),
            PathBuf::from("/data/output")
        );
    }
}
