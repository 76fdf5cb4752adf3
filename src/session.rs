//! Annotation session: the single owner of a dataset, a name catalog and the
//! identity ledger built over them.
//!
//! One session serves one annotator. Operations run to completion one at a
//! time; nothing here is shared across threads. Concurrent annotators each
//! need their own session.

use crate::catalog::PersonNameCatalog;
use crate::config::SessionConfig;
use crate::error::{ReidResult, SessionError};
use crate::export::{ExportTable, export_all};
use crate::imagery::{FrameImages, FrameNamePattern};
use crate::ledger::IdentityLedger;
use crate::reconcile::{EditScript, ReconcileSummary, RowEdit, presented_edits, reconcile};
use crate::record::{FrameId, PoseRecord, RecordStore};
use crate::suggest::{FrameSuggestion, suggest_for_frame};

/// An interactive annotation session with a frame cursor.
#[derive(Debug)]
pub struct AnnotationSession {
    store: RecordStore,
    catalog: PersonNameCatalog,
    images: FrameImages,
    ledger: IdentityLedger,
    frames: Vec<FrameId>,
    position: usize,
}

impl AnnotationSession {
    /// Start a session over already-loaded inputs with an empty ledger.
    pub fn new(store: RecordStore, catalog: PersonNameCatalog) -> ReidResult<Self> {
        let frames = store.frames();
        if frames.is_empty() {
            return Err(SessionError::NoFrames.into());
        }
        tracing::info!(
            frames = frames.len(),
            records = store.len(),
            names = catalog.len(),
            "annotation session started"
        );
        Ok(Self {
            store,
            catalog,
            images: FrameImages::new(),
            ledger: IdentityLedger::new(),
            frames,
            position: 0,
        })
    }

    /// Open every input named by `config`.
    ///
    /// The name catalog is validated before the dataset is read, so an empty
    /// catalog is reported without touching the pose data.
    pub fn open(config: &SessionConfig) -> ReidResult<Self> {
        let catalog = PersonNameCatalog::from_path(config.names_path()?)?;
        let delimiter = config.delimiter_byte()?;
        let store = RecordStore::from_path(config.dataset_path()?, delimiter)?;
        let images = match &config.images {
            Some(path) => {
                let pattern = FrameNamePattern::new(&config.image_prefix)?;
                FrameImages::from_zip_path(path, &pattern)?
            }
            None => FrameImages::new(),
        };
        Ok(Self::new(store, catalog)?.with_images(images))
    }

    pub fn with_images(mut self, images: FrameImages) -> Self {
        let missing = self.frames.iter().filter(|f| !images.contains(**f)).count();
        if !images.is_empty() && missing > 0 {
            tracing::warn!(missing, "some frames have no image");
        }
        self.images = images;
        self
    }

    // -- navigation ---------------------------------------------------------

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Current cursor position in `0..frame_count()`.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current_frame(&self) -> FrameId {
        self.frames[self.position]
    }

    pub fn frames(&self) -> &[FrameId] {
        &self.frames
    }

    /// Step forward; stays on the last frame.
    pub fn next(&mut self) -> FrameId {
        self.seek(self.position.saturating_add(1))
    }

    /// Step back; stays on the first frame.
    pub fn prev(&mut self) -> FrameId {
        self.seek(self.position.saturating_sub(1))
    }

    /// Move to `position`, clamped to the last frame.
    pub fn seek(&mut self, position: usize) -> FrameId {
        self.position = position.min(self.frames.len() - 1);
        self.current_frame()
    }

    /// Human-readable cursor, e.g. `Frame 42 (3/120)`.
    pub fn status_line(&self) -> String {
        format!(
            "Frame {} ({}/{})",
            self.current_frame(),
            self.position + 1,
            self.frames.len()
        )
    }

    // -- core operations ----------------------------------------------------

    /// Label the frame at `position`, updating the ledger with new suggestions.
    pub fn suggest_for_position(&mut self, position: usize) -> ReidResult<FrameSuggestion> {
        let frame = *self
            .frames
            .get(position)
            .ok_or(SessionError::PositionOutOfRange {
                position,
                total: self.frames.len(),
            })?;
        Ok(self.suggest_for_frame_id(frame))
    }

    /// Label the frame under the cursor.
    pub fn suggest_current(&mut self) -> FrameSuggestion {
        self.suggest_for_frame_id(self.current_frame())
    }

    /// Label a frame by its frame index.
    pub fn suggest_for_frame(&mut self, frame: FrameId) -> ReidResult<FrameSuggestion> {
        if !self.store.contains_frame(frame) {
            return Err(SessionError::UnknownFrame { frame: frame.0 }.into());
        }
        Ok(self.suggest_for_frame_id(frame))
    }

    fn suggest_for_frame_id(&mut self, frame: FrameId) -> FrameSuggestion {
        let records = self.store.frame_records(frame);
        suggest_for_frame(frame, records, &mut self.ledger, &self.catalog)
    }

    /// Merge edited rows of the frame under the cursor into the ledger.
    pub fn reconcile(&mut self, edits: &[RowEdit]) -> ReidResult<ReconcileSummary> {
        self.reconcile_frame(self.current_frame(), edits)
    }

    /// Merge edited rows of `frame` into the ledger.
    pub fn reconcile_frame(&mut self, frame: FrameId, edits: &[RowEdit]) -> ReidResult<ReconcileSummary> {
        if !self.store.contains_frame(frame) {
            return Err(SessionError::UnknownFrame { frame: frame.0 }.into());
        }
        let records = self.store.frame_records(frame);
        reconcile(frame, records, edits, &mut self.ledger, &self.catalog)
    }

    /// Commit the frame under the cursor: present it, overlay `edits`, and
    /// reconcile every presented row.
    pub fn commit_current(&mut self, edits: &[RowEdit]) -> ReidResult<ReconcileSummary> {
        self.commit_frame(self.current_frame(), edits)
    }

    /// Commit `frame` as an annotator leaving it would.
    ///
    /// Rows keep the label they are presented with unless `edits` overrides
    /// them, so a tracked name's last point follows its body and a row left
    /// empty marks its BodyID uninterested.
    pub fn commit_frame(&mut self, frame: FrameId, edits: &[RowEdit]) -> ReidResult<ReconcileSummary> {
        if !self.store.contains_frame(frame) {
            return Err(SessionError::UnknownFrame { frame: frame.0 }.into());
        }
        let presented = self.suggest_for_frame_id(frame);
        let rows = presented_edits(&presented, edits);
        self.reconcile_frame(frame, &rows)
    }

    /// Visit every frame in ascending order and commit it with that frame's
    /// scripted edits, as an annotator stepping through with "next" would.
    /// Leaves the cursor on the last frame.
    pub fn replay(&mut self, script: &EditScript) -> ReidResult<ReconcileSummary> {
        if let Some(frame) = script.keys().find(|f| !self.store.contains_frame(**f)) {
            return Err(SessionError::UnknownFrame { frame: frame.0 }.into());
        }

        let mut total = ReconcileSummary::default();
        for position in 0..self.frames.len() {
            let frame = self.seek(position);
            let edits = script.get(&frame).map(Vec::as_slice).unwrap_or(&[]);
            let summary = self.commit_frame(frame, edits)?;
            total.named += summary.named;
            total.cleared += summary.cleared;
            total.without_point += summary.without_point;
        }
        tracing::info!(
            frames = self.frames.len(),
            named = total.named,
            cleared = total.cleared,
            "replayed edit script"
        );
        Ok(total)
    }

    /// Build the labelled export of every frame.
    pub fn export_all(&self) -> ReidResult<ExportTable> {
        Ok(export_all(&self.store, &self.ledger)?)
    }

    // -- accessors ----------------------------------------------------------

    pub fn ledger(&self) -> &IdentityLedger {
        &self.ledger
    }

    pub fn catalog(&self) -> &PersonNameCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn current_records(&self) -> &[PoseRecord] {
        self.store.frame_records(self.current_frame())
    }

    /// Raw bytes of the image for the frame under the cursor.
    pub fn current_image(&self) -> Option<&[u8]> {
        self.images.get(self.current_frame())
    }

    /// Discard the ledger, ending the session.
    pub fn finish(self) -> IdentityLedger {
        tracing::info!(named = self.ledger.named_count(), "annotation session finished");
        self.ledger
    }
}
