//! Editing commands: deletion and plain-text insertion.
//!
//! Each command owns a [`ChangeBuffer`] so that consecutive keystrokes land
//! in one undo batch until the configured step limit rotates it. Commands
//! never touch the document outside a transaction; a failed transaction
//! leaves both the tree and the selection exactly as they were.

use log::debug;

use crate::buffer::{Batch, ChangeBuffer};
use crate::config::TypingConfig;
use crate::extend::{Direction, Unit, extend_selection};
use crate::model::{Document, ModelError, Range};

/// Options for a single [`DeleteCommand::execute`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Granularity used when the selection is collapsed.
    pub unit: Unit,
}

/// Removes content next to the caret, or the selected content.
///
/// A collapsed selection is first extended by one [`Unit`] in the command's
/// direction; a non-collapsed selection is removed as-is. Removing a range
/// that spans a block boundary merges the adjacent blocks.
///
/// Only the selection's primary range participates: extension, counting,
/// and deletion all work on the first range, and the commit collapses the
/// selection to a single caret. Secondary ranges of a multi-range selection
/// are dropped, not deleted.
#[derive(Debug)]
pub struct DeleteCommand {
    direction: Direction,
    buffer: ChangeBuffer,
}

impl DeleteCommand {
    /// Creates a delete command for `direction`, with its own change buffer
    /// sized from `config`.
    pub fn new(direction: Direction, config: &TypingConfig) -> Self {
        Self {
            direction,
            buffer: ChangeBuffer::new(config.undo_step),
        }
    }

    /// The direction this command consumes content in.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The command's change buffer.
    pub fn buffer(&self) -> &ChangeBuffer {
        &self.buffer
    }

    /// Mutable access to the change buffer, for resets on external events
    /// such as caret movement or focus loss.
    pub fn buffer_mut(&mut self) -> &mut ChangeBuffer {
        &mut self.buffer
    }

    /// Performs one deletion against `doc`.
    ///
    /// Returns the batch the change was recorded into, or `None` when there
    /// was nothing to remove (caret at a document edge or an isolating
    /// boundary).
    pub fn execute(
        &mut self,
        doc: &mut Document,
        options: DeleteOptions,
    ) -> Result<Option<Batch>, ModelError> {
        let selection = doc.selection().clone();
        let mut range = selection.primary_range().clone();

        if range.is_collapsed() {
            extend_selection(doc, &mut range, self.direction, options.unit);
        }
        if range.is_collapsed() {
            debug!("delete: no content in {:?} direction", self.direction);
            return Ok(None);
        }

        let count = doc.item_count(&range)?;
        let backward = selection.is_backward();

        self.buffer.lock();
        let result = doc.transact(|writer| {
            let caret = writer.delete_content(&range, true)?;
            writer.set_selection(vec![Range::collapsed(caret)], backward);
            Ok(())
        });
        self.buffer.unlock();
        result?;

        let batch = self.buffer.batch();
        self.buffer.input(count);
        debug!("delete: removed {count} item(s)");
        Ok(Some(batch))
    }
}

/// Inserts plain text at the selection, replacing any selected content.
#[derive(Debug)]
pub struct InsertTextCommand {
    buffer: ChangeBuffer,
}

impl InsertTextCommand {
    /// Creates an insert command with its own change buffer sized from
    /// `config`.
    pub fn new(config: &TypingConfig) -> Self {
        Self {
            buffer: ChangeBuffer::new(config.undo_step),
        }
    }

    /// The command's change buffer.
    pub fn buffer(&self) -> &ChangeBuffer {
        &self.buffer
    }

    /// Mutable access to the change buffer.
    pub fn buffer_mut(&mut self) -> &mut ChangeBuffer {
        &mut self.buffer
    }

    /// Inserts `text` at the primary selection range and collapses the
    /// selection after the inserted text.
    pub fn execute(&mut self, doc: &mut Document, text: &str) -> Result<Batch, ModelError> {
        let range = doc.selection().primary_range().clone();
        let count = text.chars().count();

        self.buffer.lock();
        let result = doc.transact(|writer| {
            let caret = if range.is_collapsed() {
                range.start().clone()
            } else {
                writer.delete_content(&range, true)?
            };
            let after = writer.insert_text(&caret, text)?;
            writer.set_selection(vec![Range::collapsed(after)], false);
            Ok(())
        });
        self.buffer.unlock();
        result?;

        let batch = self.buffer.batch();
        self.buffer.input(count);
        Ok(batch)
    }
}
