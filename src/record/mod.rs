//! Pose records: the fixed-schema rows produced by the upstream pose tracker.
//!
//! A [`PoseRecord`] carries the three identifying fields explicitly and keeps
//! the variable joint-coordinate set in an ordered map keyed by column name.
//! Coordinates are normalised to integer units on load (see [`round_coordinate`]).

pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use store::RecordStore;

/// Column holding the integer frame index.
pub const FRAME_COLUMN: &str = "Frame";
/// Column holding the frame timestamp.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";
/// Column holding the tracker's ephemeral body identifier.
pub const BODY_ID_COLUMN: &str = "BodyID";
/// The neck joint coordinates, used as the re-identification key.
pub const NECK_COLUMNS: [&str; 3] = ["NECK_X", "NECK_Y", "NECK_Z"];

/// Columns that must be present for a dataset to load.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    FRAME_COLUMN,
    TIMESTAMP_COLUMN,
    BODY_ID_COLUMN,
    NECK_COLUMNS[0],
    NECK_COLUMNS[1],
    NECK_COLUMNS[2],
];

/// Frame index as emitted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub i64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracker-assigned body identifier. Unique only within one frame and not
/// stable across occlusions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub i64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An integer coordinate, or the missing-value marker.
///
/// `Missing` is distinct from `Value(0)`: a tracker that lost a joint leaves
/// the cell empty (or `NaN`) and that must never be read as the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coordinate {
    Value(i64),
    Missing,
}

impl Coordinate {
    pub fn value(self) -> Option<i64> {
        match self {
            Coordinate::Value(v) => Some(v),
            Coordinate::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Coordinate::Missing)
    }
}

impl fmt::Display for Coordinate {
    /// Missing coordinates render as an empty cell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Value(v) => write!(f, "{v}"),
            Coordinate::Missing => Ok(()),
        }
    }
}

/// Round a raw coordinate to integer units, half to even.
///
/// `12.6 -> 13`, `12.5 -> 12`, `13.5 -> 14`, `-0.5 -> 0`, `-1.5 -> -2`.
pub fn round_coordinate(raw: f64) -> i64 {
    raw.round_ties_even() as i64
}

/// True if `column` names a joint coordinate (`*_X`, `*_Y`, `*_Z`).
pub fn is_coordinate_column(column: &str) -> bool {
    column.ends_with("_X") || column.ends_with("_Y") || column.ends_with("_Z")
}

/// One tracker output row: a single body in a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub frame: FrameId,
    pub timestamp: f64,
    /// Timestamp cell as it appeared in the input; exported verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_timestamp: Option<String>,
    pub body_id: BodyId,
    /// Every `*_X`/`*_Y`/`*_Z` column, rounded.
    pub joints: BTreeMap<String, Coordinate>,
    /// Any other column, kept verbatim for export.
    pub attributes: BTreeMap<String, String>,
}

impl PoseRecord {
    /// Look up a joint coordinate column. Unknown columns read as missing.
    pub fn joint(&self, column: &str) -> Coordinate {
        self.joints.get(column).copied().unwrap_or(Coordinate::Missing)
    }

    /// Render the value of `column` the way it is written back out.
    pub fn cell(&self, column: &str) -> String {
        match column {
            FRAME_COLUMN => self.frame.to_string(),
            TIMESTAMP_COLUMN => match &self.raw_timestamp {
                Some(raw) => raw.clone(),
                None => self.timestamp.to_string(),
            },
            BODY_ID_COLUMN => self.body_id.to_string(),
            _ => match self.joints.get(column) {
                Some(coord) => coord.to_string(),
                None => self.attributes.get(column).cloned().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(round_coordinate(12.6), 13);
        assert_eq!(round_coordinate(12.4), 12);
        assert_eq!(round_coordinate(12.5), 12);
        assert_eq!(round_coordinate(13.5), 14);
        assert_eq!(round_coordinate(-0.5), 0);
        assert_eq!(round_coordinate(-1.5), -2);
        assert_eq!(round_coordinate(-2.7), -3);
    }

    #[test]
    fn coordinate_columns_are_recognised_by_suffix() {
        assert!(is_coordinate_column("NECK_X"));
        assert!(is_coordinate_column("LEFT_WRIST_Z"));
        assert!(!is_coordinate_column("BodyID"));
        assert!(!is_coordinate_column("NECK_x"));
    }

    #[test]
    fn missing_coordinate_is_not_zero() {
        assert_ne!(Coordinate::Missing, Coordinate::Value(0));
        assert_eq!(Coordinate::Missing.value(), None);
        assert_eq!(Coordinate::Value(0).value(), Some(0));
        assert_eq!(Coordinate::Missing.to_string(), "");
    }

    #[test]
    fn cell_renders_fixed_and_extra_columns() {
        let mut joints = BTreeMap::new();
        joints.insert("NECK_X".to_string(), Coordinate::Value(-3));
        joints.insert("NECK_Y".to_string(), Coordinate::Missing);
        let mut attributes = BTreeMap::new();
        attributes.insert("Camera".to_string(), "left".to_string());
        let record = PoseRecord {
            frame: FrameId(4),
            timestamp: 0.25,
            raw_timestamp: None,
            body_id: BodyId(9),
            joints,
            attributes,
        };

        assert_eq!(record.cell("Frame"), "4");
        assert_eq!(record.cell("Timestamp"), "0.25");
        assert_eq!(record.cell("BodyID"), "9");
        assert_eq!(record.cell("NECK_X"), "-3");
        assert_eq!(record.cell("NECK_Y"), "");
        assert_eq!(record.cell("Camera"), "left");
        assert_eq!(record.joint("NECK_Z"), Coordinate::Missing);
    }

    #[test]
    fn raw_timestamp_text_is_kept() {
        let record = PoseRecord {
            frame: FrameId(1),
            timestamp: 1.5,
            raw_timestamp: Some("1.50".to_string()),
            body_id: BodyId(2),
            joints: BTreeMap::new(),
            attributes: BTreeMap::new(),
        };
        assert_eq!(record.cell("Timestamp"), "1.50");
    }
}
