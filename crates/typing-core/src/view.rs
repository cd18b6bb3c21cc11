//! Lightweight rendered-view tree and mutation records.
//!
//! The view tree mirrors what the editing surface currently shows. Nodes are
//! immutable per render and linked upward through weak parent references, so
//! the reconciler can walk from any mutated node to the common ancestor
//! without the core ever owning the tree. [`ViewMutation`] is the payload the
//! surface delivers when it observes low-level changes (typing through the
//! native caret, spell-checker rewrites, IME output).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

enum ViewKind {
    Element {
        name: String,
        children: Vec<ViewNode>,
    },
    Text {
        data: String,
    },
}

struct ViewInner {
    kind: ViewKind,
    parent: RefCell<Weak<ViewInner>>,
}

/// A node of the rendered view tree: an element with ordered children or a
/// text run. Cheap to clone (reference counted); compared by identity via
/// [`ptr_eq`](Self::ptr_eq).
#[derive(Clone)]
pub struct ViewNode {
    inner: Rc<ViewInner>,
}

impl ViewNode {
    /// Creates an element node, adopting `children`.
    pub fn element(name: impl Into<String>, children: Vec<ViewNode>) -> Self {
        let node = Self {
            inner: Rc::new(ViewInner {
                kind: ViewKind::Element {
                    name: name.into(),
                    children,
                },
                parent: RefCell::new(Weak::new()),
            }),
        };
        if let ViewKind::Element { children, .. } = &node.inner.kind {
            for child in children {
                *child.inner.parent.borrow_mut() = Rc::downgrade(&node.inner);
            }
        }
        node
    }

    /// Creates a text node.
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ViewInner {
                kind: ViewKind::Text { data: data.into() },
                parent: RefCell::new(Weak::new()),
            }),
        }
    }

    /// `true` for text nodes.
    pub fn is_text(&self) -> bool {
        matches!(self.inner.kind, ViewKind::Text { .. })
    }

    /// Element name, or `None` for text nodes.
    pub fn name(&self) -> Option<&str> {
        match &self.inner.kind {
            ViewKind::Element { name, .. } => Some(name),
            ViewKind::Text { .. } => None,
        }
    }

    /// Text data, or `None` for elements.
    pub fn text_data(&self) -> Option<&str> {
        match &self.inner.kind {
            ViewKind::Text { data } => Some(data),
            ViewKind::Element { .. } => None,
        }
    }

    /// Ordered children; empty for text nodes.
    pub fn children(&self) -> &[ViewNode] {
        match &self.inner.kind {
            ViewKind::Element { children, .. } => children,
            ViewKind::Text { .. } => &[],
        }
    }

    /// The parent node, if this node is attached to a tree.
    pub fn parent(&self) -> Option<ViewNode> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| ViewNode { inner })
    }

    /// Identity comparison: same underlying node.
    pub fn ptr_eq(&self, other: &ViewNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Flattened text of the subtree.
    pub fn flat_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    /// Length of the flattened text in `char`s.
    pub fn flat_len(&self) -> usize {
        match &self.inner.kind {
            ViewKind::Text { data } => data.chars().count(),
            ViewKind::Element { children, .. } => children.iter().map(ViewNode::flat_len).sum(),
        }
    }

    fn collect_text(&self, out: &mut String) {
        match &self.inner.kind {
            ViewKind::Text { data } => out.push_str(data),
            ViewKind::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// This node and all its ancestors, bottom-up.
    pub fn ancestors_with_self(&self) -> Vec<ViewNode> {
        let mut chain = vec![self.clone()];
        let mut cursor = self.clone();
        while let Some(parent) = cursor.parent() {
            chain.push(parent.clone());
            cursor = parent;
        }
        chain
    }

    /// Child-index path of this node below `root`, or `None` if the node is
    /// not attached under `root`.
    pub fn index_path_from(&self, root: &ViewNode) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut cursor = self.clone();
        while !cursor.ptr_eq(root) {
            let parent = cursor.parent()?;
            let idx = parent
                .children()
                .iter()
                .position(|child| child.ptr_eq(&cursor))?;
            path.push(idx);
            cursor = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Structural equality: same shape, names, and text, ignoring identity.
    pub fn content_eq(&self, other: &ViewNode) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (&self.inner.kind, &other.inner.kind) {
            (ViewKind::Text { data: a }, ViewKind::Text { data: b }) => a == b,
            (
                ViewKind::Element {
                    name: a,
                    children: ca,
                },
                ViewKind::Element {
                    name: b,
                    children: cb,
                },
            ) => {
                a == b
                    && ca.len() == cb.len()
                    && ca.iter().zip(cb.iter()).all(|(x, y)| x.content_eq(y))
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner.kind {
            ViewKind::Text { data } => write!(f, "ViewText({data:?})"),
            ViewKind::Element { name, children } => {
                write!(f, "ViewElement({name:?}, {children:?})")
            }
        }
    }
}

/// Deepest node that is an ancestor (or self) of every node in `nodes`.
pub fn common_ancestor(nodes: &[ViewNode]) -> Option<ViewNode> {
    let (first, rest) = nodes.split_first()?;
    let mut chain = first.ancestors_with_self();
    for node in rest {
        let node_chain = node.ancestors_with_self();
        let keep_from = chain
            .iter()
            .position(|candidate| node_chain.iter().any(|other| other.ptr_eq(candidate)))?;
        chain.drain(..keep_from);
    }
    chain.into_iter().next()
}

/// A caret observed on the editing surface: a node plus an offset (a child
/// index inside elements, a `char` offset inside text).
#[derive(Debug, Clone)]
pub struct ViewPosition {
    /// The node the caret sits in.
    pub node: ViewNode,
    /// Offset within the node.
    pub offset: usize,
}

impl ViewPosition {
    /// Creates a view position.
    pub fn new(node: ViewNode, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// One observed low-level change, as captured by the editing surface.
#[derive(Debug, Clone)]
pub enum ViewMutation {
    /// A text run changed in place.
    Text {
        /// The mutated text node.
        node: ViewNode,
        /// Its text before the change.
        old_text: String,
        /// Its text after the change.
        new_text: String,
    },
    /// An element's child list changed.
    Children {
        /// The mutated element.
        node: ViewNode,
        /// Children before the change.
        old_children: Vec<ViewNode>,
        /// Children after the change.
        new_children: Vec<ViewNode>,
    },
}

impl ViewMutation {
    /// The node the mutation was recorded on.
    pub fn node(&self) -> &ViewNode {
        match self {
            ViewMutation::Text { node, .. } => node,
            ViewMutation::Children { node, .. } => node,
        }
    }

    /// `true` when the record describes an actual content difference, not
    /// just churn (identical text, or child lists equal element-wise).
    pub fn is_content_change(&self) -> bool {
        match self {
            ViewMutation::Text { old_text, new_text, .. } => old_text != new_text,
            ViewMutation::Children {
                old_children,
                new_children,
                ..
            } => {
                old_children.len() != new_children.len()
                    || old_children
                        .iter()
                        .zip(new_children.iter())
                        .any(|(old, new)| !old.content_eq(new))
            }
        }
    }
}

/// Flattened-text offset of `(node, offset)` within the subtree rooted at
/// `region`, or `None` when the position is outside the region.
pub fn flat_offset_within(region: &ViewNode, node: &ViewNode, offset: usize) -> Option<usize> {
    if region.ptr_eq(node) {
        return Some(match &region.inner.kind {
            ViewKind::Text { data } => offset.min(data.chars().count()),
            ViewKind::Element { children, .. } => children
                .iter()
                .take(offset)
                .map(ViewNode::flat_len)
                .sum(),
        });
    }
    let mut acc = 0;
    for child in region.children() {
        if let Some(inner) = flat_offset_within(child, node, offset) {
            return Some(acc + inner);
        }
        acc += child.flat_len();
    }
    None
}
