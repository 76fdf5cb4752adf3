//! Export builder: replay the ledger over every frame into a labelled table.
//!
//! Only named records are exported. Column order is the input's, followed by
//! `PersonName`; rows follow ascending frame order and input order within a
//! frame.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::ExportError;
use crate::ledger::IdentityLedger;
use crate::record::RecordStore;

/// Name of the label column appended to the export.
pub const PERSON_NAME_COLUMN: &str = "PersonName";

/// A flat, fully labelled output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Write the table as delimited text with a header row.
    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<(), ExportError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        wtr.write_record(&self.columns).map_err(write_error)?;
        for row in &self.rows {
            wtr.write_record(row).map_err(write_error)?;
        }
        wtr.flush().map_err(|e| ExportError::Write {
            message: e.to_string(),
        })
    }

    /// Write the table to `path`, replacing any existing file.
    pub fn write_to_path(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<(), ExportError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| ExportError::Write {
            message: format!("{}: {e}", path.display()),
        })?;
        self.write_csv(file, delimiter)?;
        tracing::info!(path = %path.display(), rows = self.len(), "wrote labelled export");
        Ok(())
    }

    pub fn to_csv_string(&self, delimiter: u8) -> Result<String, ExportError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf, delimiter)?;
        String::from_utf8(buf).map_err(|e| ExportError::Write {
            message: e.to_string(),
        })
    }
}

fn write_error(err: csv::Error) -> ExportError {
    ExportError::Write {
        message: err.to_string(),
    }
}

/// Build the labelled export from every record with a ledger name.
///
/// Fails with [`ExportError::Empty`] when no record is named.
pub fn export_all(store: &RecordStore, ledger: &IdentityLedger) -> Result<ExportTable, ExportError> {
    let mut columns: Vec<String> = store.columns().to_vec();
    columns.push(PERSON_NAME_COLUMN.to_string());

    let mut rows = Vec::new();
    for record in store.iter() {
        let Some(name) = ledger.name_of(record.body_id) else {
            continue;
        };
        let mut row: Vec<String> = store.columns().iter().map(|c| record.cell(c)).collect();
        row.push(name.to_string());
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ExportError::Empty);
    }
    tracing::info!(
        rows = rows.len(),
        skipped = store.len() - rows.len(),
        "built labelled export"
    );
    Ok(ExportTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PersonNameCatalog;
    use crate::record::BodyId;

    const DATA: &str = "\
Frame,Timestamp,BodyID,NECK_X,NECK_Y,NECK_Z,Camera
2,0.5,9,1.4,0,0,left
1,0.25,7,0,0,0,left
1,0.25,8,5,5,,right
";

    fn store() -> RecordStore {
        RecordStore::from_reader(DATA.as_bytes(), b',').unwrap()
    }

    #[test]
    fn only_named_records_are_exported_in_frame_order() {
        let catalog = PersonNameCatalog::parse("Alice").unwrap();
        let alice = catalog.get("Alice").unwrap().clone();
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(7), alice.clone(), None);
        ledger.assign(BodyId(9), alice, None);

        let table = export_all(&store(), &ledger).unwrap();
        assert_eq!(
            table.columns,
            vec!["Frame", "Timestamp", "BodyID", "NECK_X", "NECK_Y", "NECK_Z", "Camera", "PersonName"]
        );
        assert_eq!(table.rows, vec![
            vec!["1", "0.25", "7", "0", "0", "0", "left", "Alice"],
            vec!["2", "0.5", "9", "1", "0", "0", "left", "Alice"],
        ]);
    }

    #[test]
    fn nothing_named_is_an_empty_export() {
        let mut ledger = IdentityLedger::new();
        ledger.mark_uninterested(BodyId(7));
        assert!(matches!(export_all(&store(), &ledger), Err(ExportError::Empty)));
    }

    #[test]
    fn missing_coordinates_export_as_empty_cells() {
        let catalog = PersonNameCatalog::parse("Bob").unwrap();
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(8), catalog.get("Bob").unwrap().clone(), None);

        let csv = export_all(&store(), &ledger).unwrap().to_csv_string(b',').unwrap();
        assert_eq!(
            csv,
            "Frame,Timestamp,BodyID,NECK_X,NECK_Y,NECK_Z,Camera,PersonName\n\
             1,0.25,8,5,5,,right,Bob\n"
        );
    }

    #[test]
    fn column_accessor() {
        let catalog = PersonNameCatalog::parse("Alice").unwrap();
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(9), catalog.get("Alice").unwrap().clone(), None);

        let table = export_all(&store(), &ledger).unwrap();
        assert_eq!(table.column("BodyID"), Some(vec!["9"]));
        assert_eq!(table.column("Nope"), None);
    }
}
