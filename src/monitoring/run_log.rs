use serde::Serialize;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

use crate::shared_data::RunSummary;

/// Generic helper to append a record to a CSV file, writing the header only
/// when the file is first created.
fn log_to_csv<T: Serialize>(filename: &Path, record: &T) -> Result<(), Box<dyn Error>> {
    let file_exists = filename.exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(filename)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

/// Appends one run's summary. Summary logging is best-effort: a write
/// failure is reported but never aborts the comparison.
pub fn log_run_summary(filename: &Path, record: &RunSummary) {
    if let Err(e) = log_to_csv(filename, record) {
        eprintln!("Error logging run summary: {}", e);
    }
}
