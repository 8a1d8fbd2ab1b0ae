//! Output formatting and persistence for records.
//!
//! Supports pretty-printing, JSON serialization, and CSV append for any
//! serializable record type.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use csv::WriterBuilder;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs a record using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(record: &T) {
    debug!("{:#?}", record);
}

/// Logs a record as pretty-printed JSON.
pub fn print_json<T: Serialize>(record: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: impl AsRef<Path>, record: &T) -> Result<()> {
    let path = path.as_ref();
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Inspection;
    use chrono::Utc;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn inspection() -> Inspection {
        Inspection {
            timestamp: Utc::now(),
            product_id: 1,
            inspector: "inspector".to_string(),
            remarks: "looks fine".to_string(),
            score: 0.93,
            grade: "A+".to_string(),
            certification: "Organic Premium Plus".to_string(),
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&inspection());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&inspection()).unwrap();
    }

    #[test]
    fn test_append_record_creates_file() {
        let path = temp_path("crop_rater_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_record(&path, &inspection()).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.is_empty());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("crop_rater_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &inspection()).unwrap();
        append_record(&path, &inspection()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header line should appear exactly once
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_two_rows() {
        let path = temp_path("crop_rater_test_rows.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &inspection()).unwrap();
        append_record(&path, &inspection()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // 1 header + 2 data rows = 3 lines (last may be empty due to trailing newline)
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        fs::remove_file(&path).unwrap();
    }
}
