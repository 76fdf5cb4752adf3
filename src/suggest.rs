//! Suggestion engine: greedy nearest-neighbour re-identification for one frame.
//!
//! For every body in the frame:
//!
//! 1. an existing ledger mapping is applied as-is and its name is claimed;
//! 2. otherwise, unless the body is marked uninterested or has no neck key,
//!    the closest unclaimed name from the ledger's last points is assigned,
//!    written back to the ledger and claimed.
//!
//! A name is never handed to two bodies of the same frame. The search is greedy
//! in record order; it makes no attempt at a globally optimal assignment.

use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::{PersonName, PersonNameCatalog};
use crate::ledger::IdentityLedger;
use crate::record::{BodyId, FrameId, PoseRecord};
use crate::spatial::reference_point;

/// Why a presented row carries the label it does.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelSource {
    /// Mapping already present in the ledger.
    Ledger,
    /// Assigned by nearest-neighbour search in this pass.
    Suggested { distance: f64 },
    /// Marked not-a-person; never auto-labelled.
    Uninterested,
    /// Neck coordinate incomplete; needs manual input.
    MissingKey { column: String },
    /// No unclaimed name with a known position.
    NoCandidate,
}

/// One body as presented to the annotator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRow {
    pub frame: FrameId,
    pub timestamp: f64,
    pub body_id: BodyId,
    pub person_name: Option<PersonName>,
    pub source: LabelSource,
}

impl LabeledRow {
    /// The label as shown in the editor; empty when unresolved.
    pub fn label(&self) -> &str {
        self.person_name.as_ref().map(PersonName::as_str).unwrap_or("")
    }
}

/// The presented rows of one frame plus the selectable label options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSuggestion {
    pub frame: FrameId,
    pub rows: Vec<LabeledRow>,
    /// `""` followed by every catalog name.
    pub options: Vec<String>,
}

impl FrameSuggestion {
    pub fn row(&self, body_id: BodyId) -> Option<&LabeledRow> {
        self.rows.iter().find(|r| r.body_id == body_id)
    }

    /// Rows still waiting for a manual label.
    pub fn unresolved(&self) -> impl Iterator<Item = &LabeledRow> {
        self.rows.iter().filter(|r| r.person_name.is_none())
    }
}

/// Label every record of one frame, writing new suggestions into `ledger`.
///
/// All `records` must belong to the same frame.
pub fn suggest_for_frame(
    frame: FrameId,
    records: &[PoseRecord],
    ledger: &mut IdentityLedger,
    catalog: &PersonNameCatalog,
) -> FrameSuggestion {
    let mut used: HashSet<PersonName> = HashSet::new();
    let mut labels: Vec<Option<(PersonName, LabelSource)>> = Vec::with_capacity(records.len());

    // Existing mappings take precedence and claim their names first.
    for record in records {
        let mapped = ledger.name_of(record.body_id).cloned();
        if let Some(name) = &mapped {
            used.insert(name.clone());
        }
        labels.push(mapped.map(|name| (name, LabelSource::Ledger)));
    }

    let mut rows = Vec::with_capacity(records.len());
    for (record, label) in records.iter().zip(labels) {
        let (person_name, source) = match label {
            Some((name, source)) => (Some(name), source),
            None => suggest_one(record, ledger, &mut used),
        };
        rows.push(LabeledRow {
            frame: record.frame,
            timestamp: record.timestamp,
            body_id: record.body_id,
            person_name,
            source,
        });
    }

    FrameSuggestion {
        frame,
        rows,
        options: catalog.options(),
    }
}

fn suggest_one(
    record: &PoseRecord,
    ledger: &mut IdentityLedger,
    used: &mut HashSet<PersonName>,
) -> (Option<PersonName>, LabelSource) {
    if ledger.is_uninterested(record.body_id) {
        return (None, LabelSource::Uninterested);
    }

    let point = match reference_point(record) {
        Ok(point) => point,
        Err(err) => {
            tracing::warn!(
                frame = record.frame.0,
                body_id = record.body_id.0,
                "{err}; leaving for manual labeling"
            );
            let crate::error::KeyError::MissingKey { column, .. } = err;
            return (None, LabelSource::MissingKey { column });
        }
    };

    let Some(best) = ledger.nearest_available(&point, used) else {
        return (None, LabelSource::NoCandidate);
    };
    let name = best.name.clone();
    let distance = best.distance;

    tracing::debug!(
        frame = record.frame.0,
        body_id = record.body_id.0,
        name = %name,
        distance,
        "suggested identity"
    );
    ledger.assign(record.body_id, name.clone(), Some(point));
    used.insert(name.clone());
    (Some(name), LabelSource::Suggested { distance })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::record::{Coordinate, NECK_COLUMNS};
    use crate::spatial::ReferencePoint;

    fn catalog() -> PersonNameCatalog {
        PersonNameCatalog::parse("Alice\nBob\nCarol").unwrap()
    }

    fn name(n: &str) -> PersonName {
        catalog().get(n).cloned().unwrap()
    }

    fn rec(frame: i64, body: i64, neck: Option<(i64, i64, i64)>) -> PoseRecord {
        let values = match neck {
            Some((x, y, z)) => [Coordinate::Value(x), Coordinate::Value(y), Coordinate::Value(z)],
            None => [Coordinate::Missing; 3],
        };
        PoseRecord {
            frame: FrameId(frame),
            timestamp: frame as f64 / 30.0,
            raw_timestamp: None,
            body_id: BodyId(body),
            joints: NECK_COLUMNS
                .iter()
                .zip(values)
                .map(|(c, v)| (c.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn nearest_previous_name_is_suggested() {
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(7), name("Alice"), Some(ReferencePoint::new(0, 0, 0)));

        let records = vec![rec(2, 9, Some((1, 0, 0)))];
        let out = suggest_for_frame(FrameId(2), &records, &mut ledger, &catalog());

        assert_eq!(out.rows[0].label(), "Alice");
        assert_eq!(out.rows[0].source, LabelSource::Suggested { distance: 1.0 });
        assert_eq!(ledger.name_of(BodyId(9)), Some(&name("Alice")));
        assert_eq!(ledger.last_point(&name("Alice")), Some(ReferencePoint::new(1, 0, 0)));
    }

    #[test]
    fn existing_mapping_is_never_overridden() {
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(1), name("Alice"), Some(ReferencePoint::new(0, 0, 0)));
        ledger.assign(BodyId(2), name("Bob"), Some(ReferencePoint::new(100, 0, 0)));

        // Body 2 now stands exactly where Alice was last seen.
        let records = vec![rec(3, 2, Some((0, 0, 0)))];
        let out = suggest_for_frame(FrameId(3), &records, &mut ledger, &catalog());

        assert_eq!(out.rows[0].label(), "Bob");
        assert_eq!(out.rows[0].source, LabelSource::Ledger);
        assert_eq!(ledger.name_of(BodyId(2)), Some(&name("Bob")));
    }

    #[test]
    fn names_claimed_by_mapped_bodies_are_not_suggested_again() {
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(1), name("Alice"), Some(ReferencePoint::new(0, 0, 0)));
        ledger.assign(BodyId(2), name("Bob"), Some(ReferencePoint::new(50, 0, 0)));

        // Body 5 is nearest to Alice, but body 1 (listed later) already holds Alice.
        let records = vec![rec(4, 5, Some((1, 0, 0))), rec(4, 1, Some((2, 0, 0)))];
        let out = suggest_for_frame(FrameId(4), &records, &mut ledger, &catalog());

        assert_eq!(out.row(BodyId(1)).unwrap().label(), "Alice");
        assert_eq!(out.row(BodyId(5)).unwrap().label(), "Bob");
    }

    #[test]
    fn no_name_is_assigned_twice_within_a_frame() {
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(1), name("Alice"), Some(ReferencePoint::new(0, 0, 0)));

        let records = vec![
            rec(2, 10, Some((1, 0, 0))),
            rec(2, 11, Some((0, 1, 0))),
            rec(2, 12, Some((0, 0, 1))),
        ];
        let out = suggest_for_frame(FrameId(2), &records, &mut ledger, &catalog());

        let labelled: Vec<_> = out.rows.iter().filter(|r| r.person_name.is_some()).collect();
        assert_eq!(labelled.len(), 1);
        assert_eq!(labelled[0].body_id, BodyId(10));
        assert_eq!(out.row(BodyId(11)).unwrap().source, LabelSource::NoCandidate);
        assert_eq!(out.row(BodyId(12)).unwrap().source, LabelSource::NoCandidate);
    }

    #[test]
    fn uninterested_bodies_are_skipped() {
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(1), name("Alice"), Some(ReferencePoint::new(0, 0, 0)));
        ledger.mark_uninterested(BodyId(8));

        let records = vec![rec(2, 8, Some((0, 0, 0)))];
        let out = suggest_for_frame(FrameId(2), &records, &mut ledger, &catalog());

        assert_eq!(out.rows[0].person_name, None);
        assert_eq!(out.rows[0].source, LabelSource::Uninterested);
        assert!(ledger.name_of(BodyId(8)).is_none());
    }

    #[test]
    fn missing_key_degrades_to_manual_input() {
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(1), name("Alice"), Some(ReferencePoint::new(0, 0, 0)));

        let records = vec![rec(2, 6, None), rec(2, 7, Some((0, 0, 0)))];
        let out = suggest_for_frame(FrameId(2), &records, &mut ledger, &catalog());

        assert_eq!(
            out.row(BodyId(6)).unwrap().source,
            LabelSource::MissingKey { column: "NECK_X".into() }
        );
        assert_eq!(out.row(BodyId(7)).unwrap().label(), "Alice");
    }

    #[test]
    fn empty_ledger_leaves_everything_unresolved() {
        let mut ledger = IdentityLedger::new();
        let records = vec![rec(1, 7, Some((0, 0, 0)))];
        let out = suggest_for_frame(FrameId(1), &records, &mut ledger, &catalog());

        assert_eq!(out.unresolved().count(), 1);
        assert_eq!(out.options, vec!["", "Alice", "Bob", "Carol"]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn repeated_suggestion_is_stable() {
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(1), name("Alice"), Some(ReferencePoint::new(0, 0, 0)));
        let records = vec![rec(2, 9, Some((3, 0, 0)))];

        let first = suggest_for_frame(FrameId(2), &records, &mut ledger, &catalog());
        let snapshot = ledger.clone();
        let second = suggest_for_frame(FrameId(2), &records, &mut ledger, &catalog());

        assert_eq!(first.rows[0].label(), second.rows[0].label());
        assert_eq!(second.rows[0].source, LabelSource::Ledger);
        assert_eq!(ledger, snapshot);
    }
}
