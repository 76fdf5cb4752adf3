//! Record store: the full table of pose records, grouped by frame.
//!
//! Loads delimited text with `csv`, normalises coordinate columns to integer
//! units and exposes frame-grouped, read-only access. Records are immutable
//! once loaded; person names live in the [`IdentityLedger`](crate::ledger::IdentityLedger).

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::error::InputError;
use crate::record::{
    BODY_ID_COLUMN, BodyId, Coordinate, FRAME_COLUMN, FrameId, PoseRecord, REQUIRED_COLUMNS,
    TIMESTAMP_COLUMN, is_coordinate_column, round_coordinate,
};

/// Cell values read as the missing-value marker.
const MISSING_MARKERS: [&str; 5] = ["", "nan", "na", "null", "none"];

/// In-memory table of pose records keyed by (Frame, BodyID).
#[derive(Debug, Clone)]
pub struct RecordStore {
    columns: Vec<String>,
    frames: BTreeMap<FrameId, Vec<PoseRecord>>,
    len: usize,
}

impl RecordStore {
    /// Load a dataset from a file on disk.
    pub fn from_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| InputError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_reader(file, delimiter)?;
        tracing::info!(
            path = %path.display(),
            records = store.len(),
            frames = store.frame_count(),
            "loaded pose dataset"
        );
        Ok(store)
    }

    /// Load a dataset from any reader producing delimited text with a header row.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, InputError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = rdr
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();

        for required in REQUIRED_COLUMNS {
            if !columns.iter().any(|c| c == required) {
                return Err(InputError::MissingColumn {
                    column: required.to_string(),
                });
            }
        }

        let mut frames: BTreeMap<FrameId, Vec<PoseRecord>> = BTreeMap::new();
        let mut seen: HashSet<(FrameId, BodyId)> = HashSet::new();
        let mut len = 0;

        for row in rdr.records() {
            let row = row.map_err(csv_error)?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let record = parse_row(&columns, &row, line)?;

            if !seen.insert((record.frame, record.body_id)) {
                return Err(InputError::DuplicateRecord {
                    line,
                    frame: record.frame.0,
                    body_id: record.body_id.0,
                });
            }
            frames.entry(record.frame).or_default().push(record);
            len += 1;
        }

        Ok(Self { columns, frames, len })
    }

    /// Input column names, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The joint-coordinate columns, in file order.
    pub fn coordinate_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| is_coordinate_column(c))
    }

    /// Distinct frame indices in ascending order.
    pub fn frames(&self) -> Vec<FrameId> {
        self.frames.keys().copied().collect()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn contains_frame(&self, frame: FrameId) -> bool {
        self.frames.contains_key(&frame)
    }

    /// Records of `frame` in the order they appeared in the input.
    /// Unknown frames yield an empty slice.
    pub fn frame_records(&self, frame: FrameId) -> &[PoseRecord] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a single record by its key.
    pub fn record(&self, frame: FrameId, body_id: BodyId) -> Option<&PoseRecord> {
        self.frame_records(frame)
            .iter()
            .find(|r| r.body_id == body_id)
    }

    /// All records, frames ascending, input order within a frame.
    pub fn iter(&self) -> impl Iterator<Item = &PoseRecord> {
        self.frames.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn csv_error(err: csv::Error) -> InputError {
    InputError::Csv {
        message: err.to_string(),
    }
}

fn parse_row(columns: &[String], row: &csv::StringRecord, line: u64) -> Result<PoseRecord, InputError> {
    let mut frame = None;
    let mut timestamp = None;
    let mut body_id = None;
    let mut joints = BTreeMap::new();
    let mut attributes = BTreeMap::new();

    for (column, value) in columns.iter().zip(row.iter()) {
        let invalid = || InputError::InvalidValue {
            line,
            column: column.clone(),
            value: value.to_string(),
        };
        match column.as_str() {
            FRAME_COLUMN => frame = Some(FrameId(parse_integer(value).ok_or_else(invalid)?)),
            BODY_ID_COLUMN => body_id = Some(BodyId(parse_integer(value).ok_or_else(invalid)?)),
            TIMESTAMP_COLUMN => {
                timestamp = Some((value.parse::<f64>().map_err(|_| invalid())?, value.to_string()));
            }
            c if is_coordinate_column(c) => {
                joints.insert(column.clone(), parse_coordinate(value).ok_or_else(invalid)?);
            }
            _ => {
                attributes.insert(column.clone(), value.to_string());
            }
        }
    }

    // Short rows are rejected by the csv reader unless `flexible` is set, so
    // every required column has been visited by now.
    let missing = |column: &str| InputError::InvalidValue {
        line,
        column: column.to_string(),
        value: String::new(),
    };
    let (timestamp, raw_timestamp) = timestamp.ok_or_else(|| missing(TIMESTAMP_COLUMN))?;
    Ok(PoseRecord {
        frame: frame.ok_or_else(|| missing(FRAME_COLUMN))?,
        timestamp,
        raw_timestamp: Some(raw_timestamp),
        body_id: body_id.ok_or_else(|| missing(BODY_ID_COLUMN))?,
        joints,
        attributes,
    })
}

/// Integers may be written as `7` or `7.0`; anything fractional or outside
/// the `i64` range is rejected.
fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    let v = value.parse::<f64>().ok()?;
    // `i64::MAX as f64` rounds up to 2^63, which is itself out of range.
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    (v.is_finite() && v.fract() == 0.0 && in_range).then_some(v as i64)
}

fn parse_coordinate(value: &str) -> Option<Coordinate> {
    if MISSING_MARKERS.contains(&value.to_ascii_lowercase().as_str()) {
        return Some(Coordinate::Missing);
    }
    let raw = value.parse::<f64>().ok()?;
    if raw.is_nan() {
        return Some(Coordinate::Missing);
    }
    raw.is_finite().then(|| Coordinate::Value(round_coordinate(raw)))
}
