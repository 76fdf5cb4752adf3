//! Spatial key extraction: the neck joint as a per-body matching key.

use serde::{Deserialize, Serialize};

use crate::error::KeyError;
use crate::record::{NECK_COLUMNS, PoseRecord};

/// A 3D point in the dataset's integer coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl ReferencePoint {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    ///
    /// Differences are taken in `f64`, so coordinates anywhere in the `i64`
    /// range cannot overflow.
    pub fn distance(&self, other: &ReferencePoint) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        let dz = self.z as f64 - other.z as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Read the neck coordinate triple of `record`.
///
/// Fails with [`KeyError::MissingKey`] naming the first missing column.
pub fn reference_point(record: &PoseRecord) -> Result<ReferencePoint, KeyError> {
    let mut xyz = [0i64; 3];
    for (slot, column) in xyz.iter_mut().zip(NECK_COLUMNS) {
        *slot = record.joint(column).value().ok_or_else(|| KeyError::MissingKey {
            frame: record.frame.0,
            body_id: record.body_id.0,
            column: column.to_string(),
        })?;
    }
    Ok(ReferencePoint::new(xyz[0], xyz[1], xyz[2]))
}
