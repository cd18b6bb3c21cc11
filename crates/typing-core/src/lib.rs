#![warn(missing_docs)]
//! Typing Core - Headless Typing Engine for Structured Documents
//!
//! # Overview
//!
//! `typing-core` is the typing layer of a headless structured-document
//! editor: deletion around the caret, plain-text insertion, undo batch
//! grouping, and reconciliation of changes the editing surface makes on its
//! own (native typing, spell-checker rewrites, IME output). It owns no
//! rendering; the host supplies a view of the document and feeds observed
//! mutations back in.
//!
//! # Core Features
//!
//! - **Tree model with atomic transactions**: positions, ranges, and a
//!   schema-validated document that rolls back on rejected edits
//! - **Unit-aware deletion**: grapheme clusters and word steps via Unicode
//!   segmentation, block merging across boundaries, isolating containers
//!   consumed as whole objects
//! - **Undo batch grouping**: a change buffer that keeps consecutive
//!   keystrokes in one batch until a configured step limit rotates it
//! - **Mutation reconciliation**: reduces a batch of observed surface
//!   mutations to one minimal text edit against the model, preserving the
//!   model's structure and mapping the caret through the change
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TypingEngine (commands + reconciliation)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Commands & Selection Extension             │  ← Editing Semantics
//! ├─────────────────────────────────────────────┤
//! │  View Tree & Text Deltas                    │  ← Surface Contract
//! ├─────────────────────────────────────────────┤
//! │  Document Model (transactions, schema)      │  ← State
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use typing_core::{
//!     DeleteOptions, ModelElement, ModelNode, Position, Range, Schema,
//!     TypingConfig, TypingEngine,
//! };
//!
//! let mut schema = Schema::new();
//! schema.register_block("paragraph");
//!
//! let root = ModelElement::with_children(
//!     "$root",
//!     vec![ModelNode::element("paragraph", vec![ModelNode::text("hello")])],
//! );
//! let mut engine = TypingEngine::new(root, schema, &TypingConfig::default());
//!
//! // Place the caret after "hello" and backspace once.
//! engine.select(
//!     vec![Range::collapsed(Position::new(vec![0], 5))],
//!     false,
//! );
//! engine.delete_backward(DeleteOptions::default()).unwrap();
//!
//! assert_eq!(engine.document().flattened_text(&[0]).unwrap(), "hell");
//! ```

pub mod buffer;
pub mod commands;
pub mod config;
pub mod delta;
pub mod engine;
pub mod extend;
pub mod model;
pub mod reconcile;
pub mod view;

pub use buffer::{Batch, ChangeBuffer};
pub use commands::{DeleteCommand, DeleteOptions, InsertTextCommand};
pub use config::{DEFAULT_UNDO_STEP, TypingConfig};
pub use delta::{TextEdit, diff};
pub use engine::{TypingEngine, render_view};
pub use extend::{Direction, Unit, extend_selection};
pub use model::{
    Document, ModelElement, ModelError, ModelNode, Position, Range, Schema, Selection, Writer,
};
pub use reconcile::{EditingSurface, ReconcileOutcome, reconcile};
pub use view::{ViewMutation, ViewNode, ViewPosition, common_ancestor, flat_offset_within};
