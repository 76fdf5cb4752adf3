//! Edit reconciler: fold an annotator's per-row labels back into the ledger.
//!
//! A non-empty label maps the BodyID to that name, refreshes the name's last
//! point from the body's neck key and clears any "uninterested" mark. An empty
//! label drops the mapping and marks the BodyID uninterested.
//!
//! The batch is validated before anything is written, so an invalid row leaves
//! the ledger untouched. Applying the same batch twice yields the same ledger.
//!
//! A session commits a frame by reconciling every presented row, not only the
//! edited ones (see [`presented_edits`]): bodies that kept their name refresh
//! the name's last point, and rows left empty become uninterested.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::catalog::PersonNameCatalog;
use crate::error::{CatalogError, InputError, ReidResult, SessionError};
use crate::ledger::IdentityLedger;
use crate::record::{BodyId, FrameId, PoseRecord};
use crate::spatial::reference_point;
use crate::suggest::FrameSuggestion;

/// A presented row after manual editing. `person_name` is `None` (or blank)
/// when the annotator cleared the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEdit {
    pub body_id: BodyId,
    pub person_name: Option<String>,
}

impl RowEdit {
    pub fn label(body_id: BodyId, name: impl Into<String>) -> Self {
        Self {
            body_id,
            person_name: Some(name.into()),
        }
    }

    pub fn clear(body_id: BodyId) -> Self {
        Self {
            body_id,
            person_name: None,
        }
    }

    fn name(&self) -> Option<&str> {
        self.person_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Edits grouped by the frame they apply to.
pub type EditScript = BTreeMap<FrameId, Vec<RowEdit>>;

#[derive(Debug, Deserialize)]
struct EditScriptRow {
    #[serde(rename = "Frame")]
    frame: i64,
    #[serde(rename = "BodyID")]
    body_id: i64,
    #[serde(rename = "PersonName", default)]
    person_name: Option<String>,
}

/// Read a batch of edits from delimited text with `Frame,BodyID,PersonName`
/// columns. An empty `PersonName` clears the label. Row order is kept within
/// each frame.
pub fn read_edit_script<R: Read>(reader: R, delimiter: u8) -> Result<EditScript, InputError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut script = EditScript::new();
    for row in rdr.deserialize::<EditScriptRow>() {
        let row = row.map_err(|e| InputError::Csv {
            message: format!("edit script: {e}"),
        })?;
        script.entry(FrameId(row.frame)).or_default().push(RowEdit {
            body_id: BodyId(row.body_id),
            person_name: row.person_name,
        });
    }
    Ok(script)
}

/// The full set of presented rows after manual edits: every row of
/// `presented` keeps its shown label unless `overrides` holds an edit for its
/// BodyID. Overrides for bodies not in the frame are appended so that
/// [`reconcile`] reports them.
pub fn presented_edits(presented: &FrameSuggestion, overrides: &[RowEdit]) -> Vec<RowEdit> {
    let mut edits: Vec<RowEdit> = presented
        .rows
        .iter()
        .map(|row| match overrides.iter().rev().find(|e| e.body_id == row.body_id) {
            Some(edit) => edit.clone(),
            None => RowEdit {
                body_id: row.body_id,
                person_name: row.person_name.as_ref().map(|n| n.to_string()),
            },
        })
        .collect();
    edits.extend(
        overrides
            .iter()
            .filter(|e| presented.row(e.body_id).is_none())
            .cloned(),
    );
    edits
}

/// What a reconcile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub named: usize,
    pub cleared: usize,
    /// Named rows whose neck key was incomplete; their names kept the previous point.
    pub without_point: usize,
}

/// Apply `edits` for the bodies of `frame` to `ledger`.
///
/// Every edit must reference a BodyID present in `records`, and every non-empty
/// label must be a catalog name.
pub fn reconcile(
    frame: FrameId,
    records: &[PoseRecord],
    edits: &[RowEdit],
    ledger: &mut IdentityLedger,
    catalog: &PersonNameCatalog,
) -> ReidResult<ReconcileSummary> {
    let by_body: HashMap<BodyId, &PoseRecord> = records.iter().map(|r| (r.body_id, r)).collect();

    for edit in edits {
        if !by_body.contains_key(&edit.body_id) {
            return Err(SessionError::UnknownBody {
                frame: frame.0,
                body_id: edit.body_id.0,
            }
            .into());
        }
        if let Some(name) = edit.name() {
            if !catalog.contains(name) {
                return Err(CatalogError::UnknownName {
                    name: name.to_string(),
                    body_id: edit.body_id.0,
                }
                .into());
            }
        }
    }

    warn_on_shared_names(frame, edits);

    let mut summary = ReconcileSummary::default();
    for edit in edits {
        let Some(record) = by_body.get(&edit.body_id) else {
            continue;
        };
        match edit.name().and_then(|n| catalog.get(n)) {
            Some(name) => {
                let point = match reference_point(record) {
                    Ok(point) => Some(point),
                    Err(err) => {
                        tracing::warn!("{err}; name kept without updating its last position");
                        summary.without_point += 1;
                        None
                    }
                };
                ledger.assign(edit.body_id, name.clone(), point);
                summary.named += 1;
            }
            None => {
                ledger.mark_uninterested(edit.body_id);
                summary.cleared += 1;
            }
        }
    }

    tracing::debug!(
        frame = frame.0,
        named = summary.named,
        cleared = summary.cleared,
        "reconciled edits"
    );
    Ok(summary)
}

/// Manual edits may give two bodies the same name; that is allowed but unusual.
fn warn_on_shared_names(frame: FrameId, edits: &[RowEdit]) {
    let mut seen: HashMap<&str, BodyId> = HashMap::new();
    for edit in edits {
        if let Some(name) = edit.name() {
            if let Some(other) = seen.insert(name, edit.body_id) {
                if other != edit.body_id {
                    tracing::warn!(
                        frame = frame.0,
                        name,
                        first = other.0,
                        second = edit.body_id.0,
                        "same name given to two bodies in one frame"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::ReidError;
    use crate::record::{Coordinate, NECK_COLUMNS};
    use crate::spatial::ReferencePoint;

    fn catalog() -> PersonNameCatalog {
        PersonNameCatalog::parse("Alice\nBob").unwrap()
    }

    fn rec(body: i64, neck: Option<(i64, i64, i64)>) -> PoseRecord {
        let values = match neck {
            Some((x, y, z)) => [Coordinate::Value(x), Coordinate::Value(y), Coordinate::Value(z)],
            None => [Coordinate::Value(0), Coordinate::Missing, Coordinate::Value(0)],
        };
        PoseRecord {
            frame: FrameId(1),
            timestamp: 0.0,
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
    fn edit_script_groups_rows_by_frame() {
        let text = "Frame,BodyID,PersonName\n2,9,Alice\n1,7,Bob\n2,4,\n";
        let script = read_edit_script(text.as_bytes(), b',').unwrap();

        assert_eq!(script.keys().copied().collect::<Vec<_>>(), vec![FrameId(1), FrameId(2)]);
        assert_eq!(script[&FrameId(1)], vec![RowEdit::label(BodyId(7), "Bob")]);
        assert_eq!(
            script[&FrameId(2)],
            vec![RowEdit::label(BodyId(9), "Alice"), RowEdit::clear(BodyId(4))]
        );
    }

    #[test]
    fn edit_script_rejects_bad_ids() {
        let text = "Frame,BodyID,PersonName\n1,seven,Bob\n";
        assert!(matches!(
            read_edit_script(text.as_bytes(), b','),
            Err(InputError::Csv { .. })
        ));
    }

    #[test]
    fn label_sets_name_and_position() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        let records = vec![rec(7, Some((4, 5, 6)))];

        let summary = reconcile(
            FrameId(1),
            &records,
            &[RowEdit::label(BodyId(7), "Alice")],
            &mut ledger,
            &catalog,
        )
        .unwrap();

        let alice = catalog.get("Alice").unwrap();
        assert_eq!(summary.named, 1);
        assert_eq!(ledger.name_of(BodyId(7)), Some(alice));
        assert_eq!(ledger.last_point(alice), Some(ReferencePoint::new(4, 5, 6)));
    }

    #[test]
    fn clearing_moves_body_to_uninterested() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        let records = vec![rec(7, Some((0, 0, 0)))];

        reconcile(FrameId(1), &records, &[RowEdit::label(BodyId(7), "Bob")], &mut ledger, &catalog)
            .unwrap();
        reconcile(FrameId(1), &records, &[RowEdit::clear(BodyId(7))], &mut ledger, &catalog)
            .unwrap();

        assert!(ledger.name_of(BodyId(7)).is_none());
        assert!(ledger.is_uninterested(BodyId(7)));
    }

    #[test]
    fn blank_name_counts_as_cleared() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        let records = vec![rec(7, Some((0, 0, 0)))];
        let edit = RowEdit {
            body_id: BodyId(7),
            person_name: Some("   ".into()),
        };

        let summary = reconcile(FrameId(1), &records, &[edit], &mut ledger, &catalog).unwrap();
        assert_eq!(summary.cleared, 1);
        assert!(ledger.is_uninterested(BodyId(7)));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        let records = vec![rec(7, Some((1, 1, 1))), rec(8, Some((9, 9, 9))), rec(9, None)];
        let edits = vec![
            RowEdit::label(BodyId(7), "Alice"),
            RowEdit::clear(BodyId(8)),
            RowEdit::label(BodyId(9), "Bob"),
        ];

        reconcile(FrameId(1), &records, &edits, &mut ledger, &catalog).unwrap();
        let once = ledger.clone();
        reconcile(FrameId(1), &records, &edits, &mut ledger, &catalog).unwrap();
        assert_eq!(ledger, once);
    }

    #[test]
    fn unknown_name_rejects_whole_batch() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        let records = vec![rec(7, Some((0, 0, 0))), rec(8, Some((1, 1, 1)))];
        let edits = vec![RowEdit::label(BodyId(7), "Alice"), RowEdit::label(BodyId(8), "Mallory")];

        let err = reconcile(FrameId(1), &records, &edits, &mut ledger, &catalog).unwrap_err();
        assert!(matches!(
            err,
            ReidError::Catalog(CatalogError::UnknownName { body_id: 8, .. })
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn edit_for_absent_body_is_rejected() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        let records = vec![rec(7, Some((0, 0, 0)))];

        let err = reconcile(
            FrameId(1),
            &records,
            &[RowEdit::label(BodyId(99), "Alice")],
            &mut ledger,
            &catalog,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReidError::Session(SessionError::UnknownBody { frame: 1, body_id: 99 })
        ));
    }

    #[test]
    fn presented_rows_carry_shown_labels_and_overrides() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        ledger.assign(BodyId(7), catalog.get("Alice").unwrap().clone(), None);
        let records = vec![rec(7, Some((0, 0, 0))), rec(8, Some((5, 5, 5))), rec(9, None)];
        let shown = crate::suggest::suggest_for_frame(FrameId(1), &records, &mut ledger, &catalog);

        let edits = presented_edits(&shown, &[
            RowEdit::label(BodyId(8), "Alice"),
            RowEdit::label(BodyId(8), "Bob"),
            RowEdit::clear(BodyId(42)),
        ]);
        assert_eq!(edits, vec![
            RowEdit::label(BodyId(7), "Alice"),
            RowEdit::label(BodyId(8), "Bob"),
            RowEdit::clear(BodyId(9)),
            RowEdit::clear(BodyId(42)),
        ]);
    }

    #[test]
    fn missing_key_keeps_previous_position() {
        let catalog = catalog();
        let mut ledger = IdentityLedger::new();
        let alice = catalog.get("Alice").unwrap().clone();
        ledger.assign(BodyId(1), alice.clone(), Some(ReferencePoint::new(3, 3, 3)));

        let records = vec![rec(9, None)];
        let summary = reconcile(
            FrameId(1),
            &records,
            &[RowEdit::label(BodyId(9), "Alice")],
            &mut ledger,
            &catalog,
        )
        .unwrap();

        assert_eq!(summary.without_point, 1);
        assert_eq!(ledger.name_of(BodyId(9)), Some(&alice));
        assert_eq!(ledger.last_point(&alice), Some(ReferencePoint::new(3, 3, 3)));
    }
}
