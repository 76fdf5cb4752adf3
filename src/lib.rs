// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # skeleton-reid
//!
//! Identity resolution for annotating skeletal pose tracks. A pose tracker
//! emits per-frame bodies with ephemeral `BodyID`s; this crate helps a human
//! annotator give them stable person names by re-identifying each body as the
//! nearest previously-seen name.
//!
//! ## Architecture
//!
//! - **Record store** (`record`): pose rows keyed by (Frame, BodyID), grouped by frame
//! - **Spatial key** (`spatial`): the neck joint as a 3D matching key
//! - **Identity ledger** (`ledger`): BodyID → name, name → last position, uninterested set
//! - **Suggestion engine** (`suggest`): greedy nearest-neighbour labelling of one frame
//! - **Edit reconciler** (`reconcile`): merge manual labels back into the ledger
//! - **Export builder** (`export`): replay the ledger into a labelled table
//! - **Session** (`session`): owns all of the above plus a frame cursor
//!
//! ## Library usage
//!
//! ```no_run
//! use skeleton_reid::catalog::PersonNameCatalog;
//! use skeleton_reid::reconcile::RowEdit;
//! use skeleton_reid::record::{BodyId, RecordStore};
//! use skeleton_reid::session::AnnotationSession;
//!
//! let store = RecordStore::from_path("raw_skeletons.csv", b',').unwrap();
//! let catalog = PersonNameCatalog::parse("Alice\nBob").unwrap();
//! let mut session = AnnotationSession::new(store, catalog).unwrap();
//!
//! let frame = session.suggest_current();
//! println!("{} bodies in frame {}", frame.rows.len(), frame.frame);
//! session.reconcile(&[RowEdit::label(BodyId(7), "Alice")]).unwrap();
//!
//! session.next();
//! let suggested = session.suggest_current();
//! let table = session.export_all().unwrap();
//! table.write_to_path("edited_skeletons.csv", b',').unwrap();
//! # let _ = suggested;
//! ```

pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod imagery;
pub mod ledger;
pub mod reconcile;
pub mod record;
pub mod session;
pub mod spatial;
pub mod suggest;
