//! CSV export of the unit table

use lltrack_common::db::Unit;
use lltrack_common::{Error, Result};
use std::io::Write;

const HEADER: [&str; 9] = [
    "id",
    "identifier",
    "name",
    "status",
    "current_sample",
    "created_at",
    "updated_at",
    "image_path",
    "notes",
];

/// Write `units` as CSV (header row first) to `writer`
pub fn write_units_csv<W: Write>(units: &[Unit], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(HEADER).map_err(csv_error)?;

    for unit in units {
        let id = unit.id.to_string();
        csv_writer
            .write_record([
                id.as_str(),
                unit.identifier.as_str(),
                unit.name.as_str(),
                unit.status.as_str(),
                unit.current_sample.as_deref().unwrap_or(""),
                unit.created_at.as_str(),
                unit.updated_at.as_str(),
                unit.image_path.as_deref().unwrap_or(""),
                unit.notes.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Render `units` as a CSV string
pub fn units_to_csv(units: &[Unit]) -> Result<String> {
    let mut buffer = Vec::new();
    write_units_csv(units, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Internal(format!("CSV is not UTF-8: {}", e)))
}

fn csv_error(e: csv::Error) -> Error {
    Error::Internal(format!("CSV write failed: {}", e))
}
