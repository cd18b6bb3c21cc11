//! The typing engine: one owner for the document, the editing commands, and
//! the rendered view they reconcile against.
//!
//! The engine is the seam a host embeds: keystroke dispatch lands on
//! [`TypingEngine::delete_backward`], [`TypingEngine::delete_forward`], and
//! [`TypingEngine::insert_text`]; the surface's mutation observer lands on
//! [`TypingEngine::handle_mutations`]. After every content change the engine
//! refreshes its rendered view so the next mutation batch is interpreted
//! against what the surface was actually showing.

use log::trace;

use crate::buffer::Batch;
use crate::commands::{DeleteCommand, DeleteOptions, InsertTextCommand};
use crate::config::TypingConfig;
use crate::extend::Direction;
use crate::model::{Document, ModelElement, ModelError, ModelNode, Range, Schema};
use crate::reconcile::{EditingSurface, ReconcileOutcome, reconcile};
use crate::view::{ViewMutation, ViewNode, ViewPosition};

/// Renders a model subtree into a fresh view tree, node for node.
pub fn render_view(el: &ModelElement) -> ViewNode {
    let children = el
        .children
        .iter()
        .map(|child| match child {
            ModelNode::Text(data) => ViewNode::text(data.clone()),
            ModelNode::Element(inner) => render_view(inner),
        })
        .collect();
    ViewNode::element(el.name.clone(), children)
}

/// Owns a document plus the typing commands bound to it.
#[derive(Debug)]
pub struct TypingEngine {
    doc: Document,
    delete_backward: DeleteCommand,
    delete_forward: DeleteCommand,
    insert: InsertTextCommand,
    last_render: ViewNode,
}

impl TypingEngine {
    /// Creates an engine over `root`, rendering it once.
    pub fn new(root: ModelElement, schema: Schema, config: &TypingConfig) -> Self {
        let doc = Document::new(root, schema);
        let last_render = render_view(doc.root());
        Self {
            doc,
            delete_backward: DeleteCommand::new(Direction::Backward, config),
            delete_forward: DeleteCommand::new(Direction::Forward, config),
            insert: InsertTextCommand::new(config),
            last_render,
        }
    }

    /// The live document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The view tree from the most recent render.
    pub fn last_render(&self) -> &ViewNode {
        &self.last_render
    }

    /// The backward delete command, for buffer inspection.
    pub fn delete_backward_command(&self) -> &DeleteCommand {
        &self.delete_backward
    }

    /// The forward delete command, for buffer inspection.
    pub fn delete_forward_command(&self) -> &DeleteCommand {
        &self.delete_forward
    }

    /// The insert command, for buffer inspection.
    pub fn insert_command(&self) -> &InsertTextCommand {
        &self.insert
    }

    /// Moves the selection in response to user interaction.
    ///
    /// A caret that moved for any reason other than a command's own write
    /// ends the current typing run, so every unlocked change buffer resets.
    pub fn select(&mut self, ranges: Vec<Range>, backward: bool) {
        self.doc.select(ranges, backward);
        for buffer in [
            self.delete_backward.buffer_mut(),
            self.delete_forward.buffer_mut(),
            self.insert.buffer_mut(),
        ] {
            if !buffer.is_locked() {
                buffer.reset();
            }
        }
    }

    /// Deletes one unit (or the selection) before the caret.
    pub fn delete_backward(
        &mut self,
        options: DeleteOptions,
    ) -> Result<Option<Batch>, ModelError> {
        let batch = self.delete_backward.execute(&mut self.doc, options)?;
        if batch.is_some() {
            self.refresh_render();
        }
        Ok(batch)
    }

    /// Deletes one unit (or the selection) after the caret.
    pub fn delete_forward(&mut self, options: DeleteOptions) -> Result<Option<Batch>, ModelError> {
        let batch = self.delete_forward.execute(&mut self.doc, options)?;
        if batch.is_some() {
            self.refresh_render();
        }
        Ok(batch)
    }

    /// Inserts plain text at the selection.
    pub fn insert_text(&mut self, text: &str) -> Result<Batch, ModelError> {
        let batch = self.insert.execute(&mut self.doc, text)?;
        self.refresh_render();
        Ok(batch)
    }

    /// Feeds one observed mutation batch through reconciliation.
    pub fn handle_mutations(
        &mut self,
        surface: &mut dyn EditingSurface,
        mutations: &[ViewMutation],
        hint: Option<&ViewPosition>,
    ) -> Result<ReconcileOutcome, ModelError> {
        let outcome = reconcile(&mut self.doc, &self.last_render, surface, mutations, hint)?;
        if outcome == ReconcileOutcome::Patched {
            self.refresh_render();
        }
        Ok(outcome)
    }

    fn refresh_render(&mut self) {
        self.last_render = render_view(self.doc.root());
        trace!("re-rendered at document version {}", self.doc.version());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.register_block("paragraph");
        schema
    }

    fn engine_with(text: &str) -> TypingEngine {
        TypingEngine::new(
            ModelElement::with_children(
                "$root",
                vec![ModelNode::element("paragraph", vec![ModelNode::text(text)])],
            ),
            schema(),
            &TypingConfig::default(),
        )
    }

    #[test]
    fn test_render_mirrors_the_model() {
        let engine = engine_with("hello");
        let render = engine.last_render();
        assert_eq!(render.name(), Some("$root"));
        assert_eq!(render.flat_text(), "hello");
        assert_eq!(render.children()[0].name(), Some("paragraph"));
    }

    #[test]
    fn test_delete_refreshes_the_render() {
        let mut engine = engine_with("hello");
        engine.select(
            vec![Range::collapsed(Position::new(vec![0], 5))],
            false,
        );
        engine
            .delete_backward(DeleteOptions::default())
            .unwrap();
        assert_eq!(engine.last_render().flat_text(), "hell");
    }

    #[test]
    fn test_selection_change_resets_typing_buffers() {
        let mut engine = engine_with("hello");
        engine.select(
            vec![Range::collapsed(Position::new(vec![0], 5))],
            false,
        );
        engine.delete_backward(DeleteOptions::default()).unwrap();
        assert_eq!(engine.delete_backward_command().buffer().size(), 1);

        engine.select(
            vec![Range::collapsed(Position::new(vec![0], 0))],
            false,
        );
        assert_eq!(engine.delete_backward_command().buffer().size(), 0);
    }

    #[test]
    fn test_insert_text_through_the_engine() {
        let mut engine = engine_with("helo");
        engine.select(
            vec![Range::collapsed(Position::new(vec![0], 3))],
            false,
        );
        engine.insert_text("l").unwrap();
        assert_eq!(engine.last_render().flat_text(), "hello");
        assert_eq!(engine.insert_command().buffer().size(), 1);
    }
}
