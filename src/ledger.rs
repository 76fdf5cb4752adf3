//! Identity ledger: the mutable state of one annotation session.
//!
//! Three pieces of state, owned by exactly one session:
//!
//! - **names**: BodyID → PersonName. A BodyID maps to at most one name;
//!   re-assignment overwrites.
//! - **last points**: PersonName → the most recent reference point observed for
//!   that name. Updated whenever the name is (re)assigned with a known point.
//! - **uninterested**: BodyIDs the annotator marked as not a person of interest.
//!   Never overlaps the keys of `names`.
//!
//! ## Tie-break policy
//!
//! Last points are kept in an ordered map keyed by name and scanned in that
//! order with a strict `<` comparison, so when several names are equally close
//! the lexicographically smallest name wins. This makes nearest-name search
//! independent of insertion history.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::catalog::PersonName;
use crate::record::BodyId;
use crate::spatial::ReferencePoint;

/// A name found by [`IdentityLedger::nearest_available`].
#[derive(Debug, Clone, PartialEq)]
pub struct NearestName<'a> {
    pub name: &'a PersonName,
    pub distance: f64,
}

/// BodyID ↔ PersonName mapping state for one annotation session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdentityLedger {
    names: BTreeMap<BodyId, PersonName>,
    last_points: BTreeMap<PersonName, ReferencePoint>,
    uninterested: BTreeSet<BodyId>,
}

impl IdentityLedger {
    /// An empty ledger, as at session start.
    pub fn new() -> Self {
        Self::default()
    }

    /// The name currently mapped to `body_id`.
    pub fn name_of(&self, body_id: BodyId) -> Option<&PersonName> {
        self.names.get(&body_id)
    }

    /// The latest reference point recorded for `name`.
    pub fn last_point(&self, name: &PersonName) -> Option<ReferencePoint> {
        self.last_points.get(name).copied()
    }

    pub fn is_uninterested(&self, body_id: BodyId) -> bool {
        self.uninterested.contains(&body_id)
    }

    /// Map `body_id` to `name`, clearing any "uninterested" mark.
    ///
    /// When `point` is known it becomes the name's last point; otherwise the
    /// previous last point (if any) is left as it was.
    pub fn assign(&mut self, body_id: BodyId, name: PersonName, point: Option<ReferencePoint>) {
        if let Some(point) = point {
            self.last_points.insert(name.clone(), point);
        }
        self.uninterested.remove(&body_id);
        self.names.insert(body_id, name);
    }

    /// Remove any name for `body_id` and mark it uninterested.
    pub fn mark_uninterested(&mut self, body_id: BodyId) {
        self.names.remove(&body_id);
        self.uninterested.insert(body_id);
    }

    /// The closest name to `point` whose last point is known, skipping `used`.
    ///
    /// Ties go to the lexicographically smallest name (see module docs).
    pub fn nearest_available(
        &self,
        point: &ReferencePoint,
        used: &HashSet<PersonName>,
    ) -> Option<NearestName<'_>> {
        let mut best: Option<NearestName<'_>> = None;
        for (name, last) in &self.last_points {
            if used.contains(name) {
                continue;
            }
            let distance = point.distance(last);
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(NearestName { name, distance });
            }
        }
        best
    }

    /// Every BodyID → name mapping, ordered by BodyID.
    pub fn assignments(&self) -> impl Iterator<Item = (BodyId, &PersonName)> {
        self.names.iter().map(|(id, name)| (*id, name))
    }

    /// Every name with a known last point, ordered by name.
    pub fn last_points(&self) -> impl Iterator<Item = (&PersonName, ReferencePoint)> {
        self.last_points.iter().map(|(name, p)| (name, *p))
    }

    /// Uninterested BodyIDs, ascending.
    pub fn uninterested(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.uninterested.iter().copied()
    }

    /// Number of named BodyIDs.
    pub fn named_count(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.last_points.is_empty() && self.uninterested.is_empty()
    }
}
