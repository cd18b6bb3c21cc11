//! Reconciliation of observed surface mutations back into the model.
//!
//! The editing surface sometimes changes on its own: native typing through
//! the composition caret, spell-checker rewrites, IME output. The surface
//! reports those changes as a batch of [`ViewMutation`] records, but the
//! records only locate the damage; the surface itself is the source of truth
//! for the new content. One reconciliation pass reduces the batch to a
//! single minimal text edit against the model, applies it in one
//! transaction, and asks the surface to re-render so the view converges back
//! onto the model.

use log::debug;

use crate::delta::{TextEdit, diff};
use crate::model::{Document, ModelError, ModelNode, Range};
use crate::view::{ViewMutation, ViewNode, ViewPosition, common_ancestor, flat_offset_within};

/// Read access to the live editing surface during a reconciliation pass.
pub trait EditingSurface {
    /// The actual current children of `node` on the surface, or `None` when
    /// the surface cannot resolve the node.
    ///
    /// Mutation records describe `node` as it was captured; this is the
    /// post-mutation ground truth.
    fn observed_children(&self, node: &ViewNode) -> Option<Vec<ViewNode>>;

    /// Asks the surface to re-render from the model once the pass is over.
    /// Also used to restore the surface after a batch is discarded, since
    /// the surface diverged from the model either way.
    fn request_render(&mut self);
}

/// What a reconciliation pass did to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Zero model writes: empty batch, churn-only records, or a discarded
    /// degraded batch.
    Unchanged,
    /// Exactly one minimal text edit was applied.
    Patched,
}

/// Runs one reconciliation pass over a mutation batch.
///
/// `render_root` is the view tree the mutations were observed against; it
/// must be the last render of `doc`'s root. `hint` is the caret observed on
/// the surface at mutation time, mapped into the model when it falls inside
/// the reconciled region.
pub fn reconcile(
    doc: &mut Document,
    render_root: &ViewNode,
    surface: &mut dyn EditingSurface,
    mutations: &[ViewMutation],
    hint: Option<&ViewPosition>,
) -> Result<ReconcileOutcome, ModelError> {
    if mutations.is_empty() {
        return Ok(ReconcileOutcome::Unchanged);
    }

    let content: Vec<&ViewMutation> = mutations
        .iter()
        .filter(|record| record.is_content_change())
        .collect();
    if content.is_empty() {
        // Attribute churn or identity-only shuffling; the surface may still
        // have drifted structurally, so put it back.
        debug!("reconcile: batch carries no content change");
        surface.request_render();
        return Ok(ReconcileOutcome::Unchanged);
    }

    let nodes: Vec<ViewNode> = content.iter().map(|record| record.node().clone()).collect();
    let Some(ancestor) = common_ancestor(&nodes) else {
        // Disjoint mutation sites; declining to guess, drop the batch.
        debug!("reconcile: mutated nodes share no ancestor, discarding batch");
        surface.request_render();
        return Ok(ReconcileOutcome::Unchanged);
    };
    let region = if ancestor.is_text() {
        match ancestor.parent() {
            Some(parent) => parent,
            None => {
                debug!("reconcile: mutated text node is detached, discarding batch");
                surface.request_render();
                return Ok(ReconcileOutcome::Unchanged);
            }
        }
    } else {
        ancestor
    };

    let Some(index_path) = region.index_path_from(render_root) else {
        debug!("reconcile: region is outside the rendered tree, discarding batch");
        surface.request_render();
        return Ok(ReconcileOutcome::Unchanged);
    };
    let model_path = model_path_for_view_path(doc, &index_path)?;
    let model_text = doc.flattened_text(&model_path)?;

    let edit = match text_fast_path(&content, &region) {
        Some(edit) => edit,
        None => {
            let Some(observed) = surface.observed_children(&region) else {
                debug!("reconcile: surface cannot resolve the region, discarding batch");
                surface.request_render();
                return Ok(ReconcileOutcome::Unchanged);
            };
            let observed_text: String = observed.iter().map(ViewNode::flat_text).collect();
            match diff(&model_text, &observed_text) {
                Some(edit) => edit,
                None => {
                    // Pure restructuring; the model already holds this text.
                    debug!("reconcile: flattened text is unchanged");
                    surface.request_render();
                    return Ok(ReconcileOutcome::Unchanged);
                }
            }
        }
    };

    let start = doc.position_at_flat_offset(&model_path, edit.start)?;
    let end = doc.position_at_flat_offset(&model_path, edit.end())?;
    let range = Range::new(start, end);
    let caret_offset = hint
        .and_then(|hint| flat_offset_within(&region, &hint.node, hint.offset))
        .map(|flat| edit.map_offset(flat));

    doc.transact(|writer| {
        writer.replace(&range, &edit.inserted_text)?;
        if let Some(flat) = caret_offset {
            let caret = writer.document().position_at_flat_offset(&model_path, flat)?;
            writer.set_selection(vec![Range::collapsed(caret)], false);
        }
        Ok(())
    })?;

    debug!(
        "reconcile: -{} +{} char(s) at flat offset {}",
        edit.deleted_len(),
        edit.inserted_len(),
        edit.start
    );
    surface.request_render();
    Ok(ReconcileOutcome::Patched)
}

/// The single-text-record shortcut: when the whole batch is one changed
/// text run, the record itself pins the edit location, so identical text
/// elsewhere in the region cannot mislead the diff.
fn text_fast_path(content: &[&ViewMutation], region: &ViewNode) -> Option<TextEdit> {
    let [
        ViewMutation::Text {
            node,
            old_text,
            new_text,
        },
    ] = content
    else {
        return None;
    };
    let base = flat_offset_within(region, node, 0)?;
    diff(old_text, new_text).map(|edit| edit.at_base(base))
}

/// Translates a child-index path in the rendered view into a model offset
/// path. The render is node-for-node isomorphic to the model, so every step
/// must land on an element.
fn model_path_for_view_path(doc: &Document, index_path: &[usize]) -> Result<Vec<usize>, ModelError> {
    let mut el = doc.root();
    let mut path = Vec::with_capacity(index_path.len());
    for &idx in index_path {
        if idx >= el.children.len() {
            return Err(ModelError::InvalidPath(path));
        }
        let offset = el.offset_of_child(idx);
        match &el.children[idx] {
            ModelNode::Element(child) => {
                path.push(offset);
                el = child;
            }
            ModelNode::Text(_) => return Err(ModelError::InvalidPath(path)),
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelElement, Position, Schema};

    struct FakeSurface {
        observed: Option<(ViewNode, Vec<ViewNode>)>,
        renders: usize,
    }

    impl FakeSurface {
        fn new() -> Self {
            Self {
                observed: None,
                renders: 0,
            }
        }

        fn observing(region: &ViewNode, children: Vec<ViewNode>) -> Self {
            Self {
                observed: Some((region.clone(), children)),
                renders: 0,
            }
        }
    }

    impl EditingSurface for FakeSurface {
        fn observed_children(&self, node: &ViewNode) -> Option<Vec<ViewNode>> {
            let (region, children) = self.observed.as_ref()?;
            region.ptr_eq(node).then(|| children.clone())
        }

        fn request_render(&mut self) {
            self.renders += 1;
        }
    }

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.register_block("paragraph");
        schema.register_inline("italic");
        schema.register_inline("link");
        schema
    }

    fn doc_and_render(text: &str) -> (Document, ViewNode, ViewNode) {
        let doc = Document::new(
            ModelElement::with_children(
                "$root",
                vec![ModelNode::element("paragraph", vec![ModelNode::text(text)])],
            ),
            schema(),
        );
        let view_text = ViewNode::text(text);
        let paragraph = ViewNode::element("p", vec![view_text.clone()]);
        let root = ViewNode::element("div", vec![paragraph]);
        (doc, root, view_text)
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let (mut doc, root, _) = doc_and_render("text");
        let mut surface = FakeSurface::new();
        let outcome = reconcile(&mut doc, &root, &mut surface, &[], None).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(surface.renders, 0);
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_text_fast_path_patches_one_character() {
        let (mut doc, root, view_text) = doc_and_render("Foo bar aple");
        let mut surface = FakeSurface::new();
        let mutations = [ViewMutation::Text {
            node: view_text,
            old_text: "Foo bar aple".into(),
            new_text: "Foo bar apple".into(),
        }];

        let outcome = reconcile(&mut doc, &root, &mut surface, &mutations, None).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Patched);
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "Foo bar apple");
        assert_eq!(surface.renders, 1);
    }

    #[test]
    fn test_hint_selection_maps_through_the_edit() {
        let (mut doc, root, view_text) = doc_and_render("text");
        let mut surface = FakeSurface::new();
        let mutations = [ViewMutation::Text {
            node: view_text.clone(),
            old_text: "text".into(),
            new_text: "textx".into(),
        }];
        let hint = ViewPosition::new(view_text, 0);

        reconcile(&mut doc, &root, &mut surface, &mutations, Some(&hint)).unwrap();

        // Prefix-preserving mapping keeps the caret before the text.
        assert_eq!(
            doc.selection().primary_range().start(),
            &Position::new(vec![0], 0)
        );
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "textx");
    }

    #[test]
    fn test_structural_restructuring_without_text_change_is_discarded() {
        // <p><i><a>text</a></i> became <p><a><i>text</i></a>: same text.
        let text = ViewNode::text("text");
        let link = ViewNode::element("a", vec![text.clone()]);
        let italic = ViewNode::element("i", vec![link]);
        let paragraph = ViewNode::element("p", vec![italic.clone()]);
        let root = ViewNode::element("div", vec![paragraph.clone()]);

        let mut doc = Document::new(
            ModelElement::with_children(
                "$root",
                vec![ModelNode::element(
                    "paragraph",
                    vec![ModelNode::element(
                        "italic",
                        vec![ModelNode::element("link", vec![ModelNode::text("text")])],
                    )],
                )],
            ),
            schema(),
        );

        let flipped = ViewNode::element("a", vec![ViewNode::element("i", vec![ViewNode::text("text")])]);
        let mut surface = FakeSurface::observing(&paragraph, vec![flipped]);
        let mutations = [ViewMutation::Children {
            node: paragraph.clone(),
            old_children: paragraph.children().to_vec(),
            new_children: surface.observed.as_ref().unwrap().1.clone(),
        }];

        let outcome = reconcile(&mut doc, &root, &mut surface, &mutations, None).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(doc.version(), 0);
        assert_eq!(surface.renders, 1);
    }

    #[test]
    fn test_structural_path_patches_only_the_new_text() {
        // Wrapper flip plus one appended character: only the character lands
        // in the model, the model's own structure survives.
        let text = ViewNode::text("text");
        let link = ViewNode::element("a", vec![text.clone()]);
        let italic = ViewNode::element("i", vec![link]);
        let paragraph = ViewNode::element("p", vec![italic.clone()]);
        let root = ViewNode::element("div", vec![paragraph.clone()]);

        let mut doc = Document::new(
            ModelElement::with_children(
                "$root",
                vec![ModelNode::element(
                    "paragraph",
                    vec![ModelNode::element(
                        "italic",
                        vec![ModelNode::element("link", vec![ModelNode::text("text")])],
                    )],
                )],
            ),
            schema(),
        );

        let flipped = ViewNode::element(
            "a",
            vec![ViewNode::element("i", vec![ViewNode::text("textx")])],
        );
        let mut surface = FakeSurface::observing(&paragraph, vec![flipped]);
        let mutations = [ViewMutation::Children {
            node: paragraph.clone(),
            old_children: paragraph.children().to_vec(),
            new_children: surface.observed.as_ref().unwrap().1.clone(),
        }];

        let outcome = reconcile(&mut doc, &root, &mut surface, &mutations, None).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Patched);
        // The character went inside the existing nesting.
        assert_eq!(doc.flattened_text(&[0, 0, 0]).unwrap(), "textx");
        let italic_el = doc.element_at(&[0, 0]).unwrap();
        assert_eq!(italic_el.name, "italic");
    }

    #[test]
    fn test_disjoint_ancestors_discard_the_batch() {
        let (mut doc, root, view_text) = doc_and_render("text");
        let detached = ViewNode::text("elsewhere");
        let mut surface = FakeSurface::new();
        let mutations = [
            ViewMutation::Text {
                node: view_text,
                old_text: "text".into(),
                new_text: "texts".into(),
            },
            ViewMutation::Text {
                node: detached,
                old_text: "elsewhere".into(),
                new_text: "elsewheres".into(),
            },
        ];

        let outcome = reconcile(&mut doc, &root, &mut surface, &mutations, None).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "text");
        assert_eq!(surface.renders, 1);
    }

    #[test]
    fn test_churn_only_batch_requests_a_restoring_render() {
        let (mut doc, root, view_text) = doc_and_render("text");
        let mut surface = FakeSurface::new();
        let mutations = [ViewMutation::Text {
            node: view_text,
            old_text: "text".into(),
            new_text: "text".into(),
        }];

        let outcome = reconcile(&mut doc, &root, &mut surface, &mutations, None).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(doc.version(), 0);
        assert_eq!(surface.renders, 1);
    }
}
