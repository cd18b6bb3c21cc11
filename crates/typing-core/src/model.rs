//! Tree document model: nodes, positions, ranges, selection, transactions.
//!
//! The model is a tree of named elements and text runs. Offsets inside an
//! element count **model offsets**: a text run occupies one offset per
//! `char`, a child element occupies exactly one offset. A [`Position`] is a
//! container path (each step a model offset addressing an element start)
//! plus an offset inside that container, which makes positions cheaply
//! comparable across tree depths.
//!
//! All mutation goes through [`Document::transact`]: the closure gets a
//! [`Writer`], the resulting tree is validated against the [`Schema`], and
//! any error rolls the document (including its selection) back to the state
//! before the pass.

use std::collections::BTreeSet;

use thiserror::Error;

/// Error type for model operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A path did not address an element in the tree.
    #[error("no element at model path {0:?}")]
    InvalidPath(Vec<usize>),
    /// An offset fell outside the addressed container.
    #[error("offset {offset} does not exist in the element at {path:?}")]
    InvalidOffset {
        /// Container path of the failed lookup.
        path: Vec<usize>,
        /// The out-of-range offset.
        offset: usize,
    },
    /// The tree produced by a transaction violates the schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

/// One node of the model tree: a named element or a text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelNode {
    /// An element with ordered children.
    Element(ModelElement),
    /// A run of text.
    Text(String),
}

impl ModelNode {
    /// Convenience constructor for a text run.
    pub fn text(data: impl Into<String>) -> Self {
        ModelNode::Text(data.into())
    }

    /// Convenience constructor for an element node.
    pub fn element(name: impl Into<String>, children: Vec<ModelNode>) -> Self {
        ModelNode::Element(ModelElement::with_children(name, children))
    }

    /// Size of this node in model offsets: text length in `char`s, or 1 for
    /// an element.
    pub fn offset_size(&self) -> usize {
        match self {
            ModelNode::Element(_) => 1,
            ModelNode::Text(data) => data.chars().count(),
        }
    }

    /// Length in `char`s of the flattened text of this subtree.
    pub fn flat_len(&self) -> usize {
        match self {
            ModelNode::Element(el) => el.children.iter().map(ModelNode::flat_len).sum(),
            ModelNode::Text(data) => data.chars().count(),
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            ModelNode::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
            ModelNode::Text(data) => out.push_str(data),
        }
    }
}

/// An element of the model tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelElement {
    /// Element name, matched against the [`Schema`] registries.
    pub name: String,
    /// Ordered children.
    pub children: Vec<ModelNode>,
}

impl ModelElement {
    /// Creates an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Creates an element with the given children.
    pub fn with_children(name: impl Into<String>, children: Vec<ModelNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Total size of the children in model offsets.
    pub fn max_offset(&self) -> usize {
        self.children.iter().map(ModelNode::offset_size).sum()
    }

    /// Concatenated text of the whole subtree.
    pub fn flattened_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Finds the child covering `offset`, returning its index and start
    /// offset. `None` when `offset >= max_offset()`.
    pub fn child_at_offset(&self, offset: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (idx, child) in self.children.iter().enumerate() {
            let end = start + child.offset_size();
            if offset < end {
                return Some((idx, start));
            }
            start = end;
        }
        None
    }

    /// Index of the child whose start offset is exactly `offset`.
    fn child_index_starting_at(&self, offset: usize) -> Option<usize> {
        let (idx, start) = self.child_at_offset(offset)?;
        (start == offset).then_some(idx)
    }

    /// Model offset at which the child with index `idx` starts.
    pub fn offset_of_child(&self, idx: usize) -> usize {
        self.children[..idx].iter().map(ModelNode::offset_size).sum()
    }

    /// Removes the content in `[from, to)` model offsets. Text runs are
    /// trimmed, fully covered children are dropped. Elements are atomic:
    /// an element child is removed when its single offset falls in range.
    fn remove_span(&mut self, from: usize, to: usize) {
        if from >= to {
            return;
        }
        let mut kept = Vec::with_capacity(self.children.len());
        let mut start = 0;
        for child in self.children.drain(..) {
            let size = child.offset_size();
            let end = start + size;
            let (c_start, c_end) = (start, end);
            start = end;

            if c_end <= from || c_start >= to {
                kept.push(child);
                continue;
            }
            match child {
                ModelNode::Element(_) => {
                    // fully covered (size is 1)
                }
                ModelNode::Text(data) => {
                    let keep_head = from.saturating_sub(c_start).min(size);
                    let keep_tail_from = (to - c_start).min(size);
                    let mut remainder: String = data.chars().take(keep_head).collect();
                    remainder.extend(data.chars().skip(keep_tail_from));
                    if !remainder.is_empty() {
                        kept.push(ModelNode::Text(remainder));
                    }
                }
            }
        }
        self.children = kept;
        self.normalize();
    }

    /// Merges adjacent text runs and drops empty ones.
    fn normalize(&mut self) {
        let mut merged: Vec<ModelNode> = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            match child {
                ModelNode::Text(data) if data.is_empty() => {}
                ModelNode::Text(data) => {
                    if let Some(ModelNode::Text(prev)) = merged.last_mut() {
                        prev.push_str(&data);
                    } else {
                        merged.push(ModelNode::Text(data));
                    }
                }
                element => merged.push(element),
            }
        }
        self.children = merged;
    }

    fn insert_text_at(&mut self, offset: usize, text: &str) {
        enum Spot {
            InText(usize, usize),
            Before(usize),
        }

        let mut spot = Spot::Before(self.children.len());
        let mut start = 0;
        for (idx, child) in self.children.iter().enumerate() {
            let size = child.offset_size();
            let end = start + size;
            match child {
                ModelNode::Text(_) if offset >= start && offset <= end => {
                    spot = Spot::InText(idx, offset - start);
                    break;
                }
                _ if offset == start => {
                    spot = Spot::Before(idx);
                    break;
                }
                _ => {}
            }
            start = end;
        }

        match spot {
            Spot::InText(idx, char_off) => {
                if let ModelNode::Text(data) = &mut self.children[idx] {
                    let byte = data
                        .char_indices()
                        .nth(char_off)
                        .map(|(b, _)| b)
                        .unwrap_or(data.len());
                    data.insert_str(byte, text);
                }
            }
            Spot::Before(idx) => {
                self.children.insert(idx, ModelNode::Text(text.to_string()));
            }
        }
        self.normalize();
    }
}

/// An immutable coordinate in the model tree.
///
/// `path` addresses the container element: each step is a model offset that
/// must land on an element start in the parent. `offset` is the model offset
/// inside that container. Positions order lexicographically over the
/// flattened `(path…, offset)` sequence, which matches document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    path: Vec<usize>,
    offset: usize,
}

impl Position {
    /// Creates a position inside the container addressed by `path`.
    pub fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Container path; empty for positions directly in the root.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Model offset inside the container.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.path.iter().chain(std::iter::once(&self.offset));
        let rhs = other.path.iter().chain(std::iter::once(&other.offset));
        lhs.cmp(rhs)
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered pair of positions (`start <= end`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    start: Position,
    end: Position,
}

impl Range {
    /// Creates a range. Panics if `start > end`; an inverted range indicates
    /// a bug in the caller, not a runtime condition.
    pub fn new(start: Position, end: Position) -> Self {
        assert!(start <= end, "range start must not be after its end");
        Self { start, end }
    }

    /// Creates a collapsed range (a caret).
    pub fn collapsed(at: Position) -> Self {
        Self {
            start: at.clone(),
            end: at,
        }
    }

    /// Range start.
    pub fn start(&self) -> &Position {
        &self.start
    }

    /// Range end.
    pub fn end(&self) -> &Position {
        &self.end
    }

    /// `true` when start equals end.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Decomposes the range into minimal flat sub-ranges: maximal runs of
    /// sibling content at a single depth, in document order. A collapsed
    /// range yields none.
    ///
    /// The decomposition never cuts into the spine elements on either side;
    /// content strictly between the boundary positions is covered exactly
    /// once.
    pub fn minimal_flat_ranges(&self, doc: &Document) -> Result<Vec<Range>, ModelError> {
        if self.is_collapsed() {
            return Ok(Vec::new());
        }
        let sp = self.start.path();
        let ep = self.end.path();
        if sp == ep {
            return Ok(vec![self.clone()]);
        }
        let common = common_prefix_len(sp, ep);
        let mut out = Vec::new();

        // Climb from the start container, covering each container's suffix.
        let mut path = sp.to_vec();
        let mut offset = self.start.offset();
        while path.len() > common {
            let max = doc.element_at(&path)?.max_offset();
            if offset < max {
                out.push(Range::new(
                    Position::new(path.clone(), offset),
                    Position::new(path.clone(), max),
                ));
            }
            let element_start = path.pop().expect("path is non-empty");
            offset = element_start + 1;
        }

        // Siblings between the two spines at the common depth.
        let boundary = if ep.len() == common {
            self.end.offset()
        } else {
            ep[common]
        };
        if offset < boundary {
            out.push(Range::new(
                Position::new(path.clone(), offset),
                Position::new(path, boundary),
            ));
        }

        // Descend along the end spine, covering each container's prefix.
        for depth in (common + 1)..=ep.len() {
            let container = ep[..depth].to_vec();
            let until = if depth == ep.len() {
                self.end.offset()
            } else {
                ep[depth]
            };
            if until > 0 {
                out.push(Range::new(
                    Position::new(container.clone(), 0),
                    Position::new(container, until),
                ));
            }
        }
        Ok(out)
    }
}

fn common_prefix_len(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// The document-owned cursor: one or more ranges plus a directionality flag.
///
/// The selection lives as long as the document; it is only ever mutated or
/// reset, never destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<Range>,
    backward: bool,
}

impl Selection {
    /// Creates a selection from explicit ranges. An empty range list
    /// collapses to the document start.
    pub fn new(ranges: Vec<Range>, backward: bool) -> Self {
        let ranges = if ranges.is_empty() {
            vec![Range::collapsed(Position::new(Vec::new(), 0))]
        } else {
            ranges
        };
        Self { ranges, backward }
    }

    /// The primary (first) range.
    pub fn primary_range(&self) -> &Range {
        &self.ranges[0]
    }

    /// All ranges.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// `true` when the anchor is after the focus.
    pub fn is_backward(&self) -> bool {
        self.backward
    }

    /// `true` when every range is collapsed.
    pub fn is_collapsed(&self) -> bool {
        self.ranges.iter().all(Range::is_collapsed)
    }

    /// Replaces the selection's ranges and directionality.
    pub fn set_ranges(&mut self, ranges: Vec<Range>, backward: bool) {
        *self = Selection::new(ranges, backward);
    }

    /// Collapses the selection to a single caret.
    pub fn collapse_to(&mut self, at: Position) {
        self.set_ranges(vec![Range::collapsed(at)], false);
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::new(Vec::new(), false)
    }
}

/// Structural rules the document tree must satisfy.
///
/// Element names fall into three registries: *blocks* (text containers such
/// as paragraphs and headings, with undo-visible boundaries), *inlines*
/// (formatting wrappers the caret crosses freely), and *isolating* elements
/// (captions, cells; never crossed by selection extension). Unregistered
/// names are treated as inline wrappers for caret movement but may not hold
/// text directly.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    blocks: BTreeSet<String>,
    inlines: BTreeSet<String>,
    isolating: BTreeSet<String>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a block-level text container.
    pub fn register_block(&mut self, name: impl Into<String>) {
        self.blocks.insert(name.into());
    }

    /// Registers an inline formatting wrapper.
    pub fn register_inline(&mut self, name: impl Into<String>) {
        self.inlines.insert(name.into());
    }

    /// Registers an isolating element; selection extension never crosses
    /// its boundary.
    pub fn register_isolating(&mut self, name: impl Into<String>) {
        self.isolating.insert(name.into());
    }

    /// `true` if `name` is a registered block.
    pub fn is_block(&self, name: &str) -> bool {
        self.blocks.contains(name)
    }

    /// `true` if `name` is a registered inline wrapper.
    pub fn is_inline(&self, name: &str) -> bool {
        self.inlines.contains(name)
    }

    /// `true` if `name` isolates its content.
    pub fn is_isolating(&self, name: &str) -> bool {
        self.isolating.contains(name)
    }

    fn validate(&self, root: &ModelElement) -> Result<(), ModelError> {
        self.validate_element(root)
    }

    fn validate_element(&self, el: &ModelElement) -> Result<(), ModelError> {
        for child in &el.children {
            match child {
                ModelNode::Text(_) => {
                    if !self.is_block(&el.name)
                        && !self.is_inline(&el.name)
                        && !self.is_isolating(&el.name)
                    {
                        return Err(ModelError::SchemaViolation(format!(
                            "text is not allowed directly inside <{}>",
                            el.name
                        )));
                    }
                }
                ModelNode::Element(inner) => {
                    if self.is_inline(&el.name) && self.is_block(&inner.name) {
                        return Err(ModelError::SchemaViolation(format!(
                            "block <{}> is not allowed inside inline <{}>",
                            inner.name, el.name
                        )));
                    }
                    self.validate_element(inner)?;
                }
            }
        }
        Ok(())
    }
}

/// The document: root tree, live selection, schema, and a version counter
/// bumped by every committed transaction.
#[derive(Debug, Clone)]
pub struct Document {
    root: ModelElement,
    selection: Selection,
    schema: Schema,
    version: u64,
}

impl Document {
    /// Creates a document over `root`, with the selection collapsed at the
    /// root start.
    pub fn new(root: ModelElement, schema: Schema) -> Self {
        Self {
            root,
            selection: Selection::default(),
            schema,
            version: 0,
        }
    }

    /// The root element.
    pub fn root(&self) -> &ModelElement {
        &self.root
    }

    /// The document schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The live selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Number of committed transactions.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Moves the selection in response to user interaction. This is the one
    /// mutation allowed outside a transaction: it touches no content.
    pub fn select(&mut self, ranges: Vec<Range>, backward: bool) {
        self.selection.set_ranges(ranges, backward);
    }

    /// Resolves a container path to its element.
    pub fn element_at(&self, path: &[usize]) -> Result<&ModelElement, ModelError> {
        let mut cur = &self.root;
        for &step in path {
            let idx = cur
                .child_index_starting_at(step)
                .ok_or_else(|| ModelError::InvalidPath(path.to_vec()))?;
            match &cur.children[idx] {
                ModelNode::Element(el) => cur = el,
                ModelNode::Text(_) => return Err(ModelError::InvalidPath(path.to_vec())),
            }
        }
        Ok(cur)
    }

    fn element_at_mut(&mut self, path: &[usize]) -> Result<&mut ModelElement, ModelError> {
        let mut cur = &mut self.root;
        for &step in path {
            let idx = cur
                .child_index_starting_at(step)
                .ok_or_else(|| ModelError::InvalidPath(path.to_vec()))?;
            match &mut cur.children[idx] {
                ModelNode::Element(el) => cur = el,
                ModelNode::Text(_) => return Err(ModelError::InvalidPath(path.to_vec())),
            }
        }
        Ok(cur)
    }

    /// Flattened text of the subtree at `path`.
    pub fn flattened_text(&self, path: &[usize]) -> Result<String, ModelError> {
        Ok(self.element_at(path)?.flattened_text())
    }

    /// Maps a flattened-text offset within the subtree at `container` to a
    /// model position, descending into nested elements. An offset landing on
    /// a text-run boundary attaches to the earlier run.
    pub fn position_at_flat_offset(
        &self,
        container: &[usize],
        flat_offset: usize,
    ) -> Result<Position, ModelError> {
        let mut cur = self.element_at(container)?;
        let mut path = container.to_vec();
        let mut remaining = flat_offset;
        'down: loop {
            let mut model_off = 0;
            for idx in 0..cur.children.len() {
                let span = cur.children[idx].flat_len();
                if remaining <= span {
                    match &cur.children[idx] {
                        ModelNode::Text(_) => {
                            return Ok(Position::new(path, model_off + remaining));
                        }
                        ModelNode::Element(el) => {
                            if span == 0 && remaining == 0 {
                                return Ok(Position::new(path, model_off));
                            }
                            path.push(model_off);
                            cur = el;
                            continue 'down;
                        }
                    }
                }
                remaining -= span;
                model_off += cur.children[idx].offset_size();
            }
            if remaining == 0 {
                return Ok(Position::new(path, model_off));
            }
            return Err(ModelError::InvalidOffset {
                path,
                offset: flat_offset,
            });
        }
    }

    /// Counts the atomic items a range covers: individual characters in text
    /// runs plus one per covered child element. Element-boundary markers are
    /// not counted.
    pub fn item_count(&self, range: &Range) -> Result<usize, ModelError> {
        let mut count = 0;
        for flat in range.minimal_flat_ranges(self)? {
            let el = self.element_at(flat.start().path())?;
            let (from, to) = (flat.start().offset(), flat.end().offset());
            let mut start = 0;
            for child in &el.children {
                let end = start + child.offset_size();
                if end > from && start < to {
                    count += match child {
                        ModelNode::Text(_) => end.min(to) - start.max(from),
                        ModelNode::Element(_) => 1,
                    };
                }
                start = end;
            }
        }
        Ok(count)
    }

    /// Runs `f` against a [`Writer`] as one atomic pass: on success the tree
    /// is schema-validated and the version bumped; on any error the document
    /// and selection roll back to their pre-pass state.
    pub fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut Writer<'_>) -> Result<T, ModelError>,
    ) -> Result<T, ModelError> {
        let root_snapshot = self.root.clone();
        let selection_snapshot = self.selection.clone();

        let result = f(&mut Writer { doc: self }).and_then(|value| {
            self.schema.validate(&self.root)?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                self.version += 1;
                Ok(value)
            }
            Err(err) => {
                self.root = root_snapshot;
                self.selection = selection_snapshot;
                Err(err)
            }
        }
    }

    fn insert_text(&mut self, at: &Position, text: &str) -> Result<Position, ModelError> {
        let inserted = text.chars().count();
        if inserted == 0 {
            return Ok(at.clone());
        }
        let el = self.element_at_mut(at.path())?;
        if at.offset() > el.max_offset() {
            return Err(ModelError::InvalidOffset {
                path: at.path().to_vec(),
                offset: at.offset(),
            });
        }
        el.insert_text_at(at.offset(), text);
        Ok(Position::new(at.path().to_vec(), at.offset() + inserted))
    }

    fn delete_content(&mut self, range: &Range, merge: bool) -> Result<Position, ModelError> {
        if range.is_collapsed() {
            return Ok(range.start().clone());
        }
        let flats = range.minimal_flat_ranges(self)?;
        // Deleting back-to-front keeps the paths of earlier flat ranges valid.
        for flat in flats.iter().rev() {
            let el = self.element_at_mut(flat.start().path())?;
            if flat.end().offset() > el.max_offset() {
                return Err(ModelError::InvalidOffset {
                    path: flat.start().path().to_vec(),
                    offset: flat.end().offset(),
                });
            }
            el.remove_span(flat.start().offset(), flat.end().offset());
        }

        let sp = range.start().path();
        let ep = range.end().path();
        let common = common_prefix_len(sp, ep);
        if merge && common < sp.len() && common < ep.len() {
            // The end spine shifted left during deletion: at the common depth
            // it now sits right after the start spine element, and below that
            // every container's prefix was removed.
            let mut shifted = sp[..=common].to_vec();
            shifted[common] = sp[common] + 1;
            shifted.extend(std::iter::repeat_n(0, ep.len() - common - 1));
            self.merge_containers(sp, &shifted, common)?;
        }
        Ok(range.start().clone())
    }

    /// Moves what is left of the end container into the start container and
    /// drops emptied spine elements, so that removing a block boundary joins
    /// the two adjacent blocks.
    fn merge_containers(
        &mut self,
        start_path: &[usize],
        end_path: &[usize],
        common: usize,
    ) -> Result<(), ModelError> {
        let target = self.block_prefix(start_path)?;
        let source = self.block_prefix(end_path)?;
        if source.len() <= common {
            return Ok(());
        }

        // Detach the source element.
        let source_offset = *source.last().expect("checked above");
        let source_parent = source[..source.len() - 1].to_vec();
        let orphans = {
            let parent = self.element_at_mut(&source_parent)?;
            let idx = parent
                .child_index_starting_at(source_offset)
                .ok_or_else(|| ModelError::InvalidPath(source.clone()))?;
            match parent.children.remove(idx) {
                ModelNode::Element(el) => el.children,
                text @ ModelNode::Text(_) => {
                    // Not a container; put it back and merge nothing.
                    let parent = self.element_at_mut(&source_parent)?;
                    let idx = parent
                        .child_index_starting_at(source_offset)
                        .unwrap_or(parent.children.len());
                    parent.children.insert(idx, text);
                    return Ok(());
                }
            }
        };

        if target.len() < source.len() && source[..target.len()] == target[..] {
            // The start block contains the end block: unwrap in place.
            let parent = self.element_at_mut(&source_parent)?;
            let at = parent
                .child_index_starting_at(source_offset)
                .unwrap_or(parent.children.len());
            for (i, node) in orphans.into_iter().enumerate() {
                parent.children.insert(at + i, node);
            }
            parent.normalize();
        } else {
            let block = self.element_at_mut(&target)?;
            block.children.extend(orphans);
            block.normalize();
        }

        // Drop emptied ancestors of the removed container.
        let mut path = source_parent;
        while path.len() > common {
            if !self.element_at(&path)?.children.is_empty() {
                break;
            }
            let offset = *path.last().expect("length checked");
            let parent_path = path[..path.len() - 1].to_vec();
            let parent = self.element_at_mut(&parent_path)?;
            if let Some(idx) = parent.child_index_starting_at(offset) {
                parent.children.remove(idx);
            }
            path = parent_path;
        }
        Ok(())
    }

    /// Longest prefix of `path` addressing a block element; the full path
    /// when no ancestor is a registered block.
    fn block_prefix(&self, path: &[usize]) -> Result<Vec<usize>, ModelError> {
        for depth in (1..=path.len()).rev() {
            let el = self.element_at(&path[..depth])?;
            if self.schema.is_block(&el.name) {
                return Ok(path[..depth].to_vec());
            }
        }
        Ok(path.to_vec())
    }
}

/// Mutable access to a document, handed out only by [`Document::transact`].
pub struct Writer<'a> {
    doc: &'a mut Document,
}

impl Writer<'_> {
    /// Read access to the document mid-transaction.
    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Inserts text at a position; returns the position after the inserted
    /// text.
    pub fn insert_text(&mut self, at: &Position, text: &str) -> Result<Position, ModelError> {
        self.doc.insert_text(at, text)
    }

    /// Deletes the content covered by `range`. With `merge` set, removing a
    /// block boundary joins the two adjacent blocks instead of leaving an
    /// empty successor. Returns the collapsed position at the merge point.
    pub fn delete_content(&mut self, range: &Range, merge: bool) -> Result<Position, ModelError> {
        self.doc.delete_content(range, merge)
    }

    /// Replaces the content of `range` with `text`; returns the position
    /// after the replacement.
    pub fn replace(&mut self, range: &Range, text: &str) -> Result<Position, ModelError> {
        let at = self.doc.delete_content(range, true)?;
        self.doc.insert_text(&at, text)
    }

    /// Replaces the live selection.
    pub fn set_selection(&mut self, ranges: Vec<Range>, backward: bool) {
        self.doc.selection.set_ranges(ranges, backward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph_schema() -> Schema {
        let mut schema = Schema::new();
        schema.register_block("paragraph");
        schema.register_inline("italic");
        schema.register_inline("link");
        schema
    }

    fn two_paragraph_doc() -> Document {
        let root = ModelElement::with_children(
            "$root",
            vec![
                ModelNode::element("paragraph", vec![ModelNode::text("foo")]),
                ModelNode::element("paragraph", vec![ModelNode::text("bar")]),
            ],
        );
        Document::new(root, paragraph_schema())
    }

    #[test]
    fn test_position_ordering_follows_document_order() {
        let before = Position::new(vec![0], 2);
        let after = Position::new(vec![1], 0);
        assert!(before < after);

        let parent = Position::new(vec![0], 1);
        let inside_deeper = Position::new(vec![0, 1], 0);
        assert!(parent < inside_deeper);
    }

    #[test]
    fn test_flat_ranges_same_container() {
        let doc = two_paragraph_doc();
        let range = Range::new(Position::new(vec![0], 1), Position::new(vec![0], 3));
        let flats = range.minimal_flat_ranges(&doc).unwrap();
        assert_eq!(flats, vec![range]);
    }

    #[test]
    fn test_flat_ranges_across_blocks() {
        let doc = two_paragraph_doc();
        let range = Range::new(Position::new(vec![0], 1), Position::new(vec![1], 2));
        let flats = range.minimal_flat_ranges(&doc).unwrap();
        assert_eq!(
            flats,
            vec![
                Range::new(Position::new(vec![0], 1), Position::new(vec![0], 3)),
                Range::new(Position::new(vec![1], 0), Position::new(vec![1], 2)),
            ]
        );
        assert_eq!(doc.item_count(&range).unwrap(), 4);
    }

    #[test]
    fn test_block_boundary_range_covers_nothing() {
        let doc = two_paragraph_doc();
        let range = Range::new(Position::new(vec![0], 3), Position::new(vec![1], 0));
        assert!(range.minimal_flat_ranges(&doc).unwrap().is_empty());
        assert_eq!(doc.item_count(&range).unwrap(), 0);
    }

    #[test]
    fn test_item_count_includes_covered_elements_once() {
        let root = ModelElement::with_children(
            "$root",
            vec![ModelNode::element(
                "paragraph",
                vec![
                    ModelNode::text("ab"),
                    ModelNode::element("italic", vec![ModelNode::text("cd")]),
                    ModelNode::text("ef"),
                ],
            )],
        );
        let doc = Document::new(root, paragraph_schema());
        // Covers "b", the whole <italic> (one item), and "e".
        let range = Range::new(Position::new(vec![0], 1), Position::new(vec![0], 4));
        assert_eq!(doc.item_count(&range).unwrap(), 3);
    }

    #[test]
    fn test_delete_within_one_text_run() {
        let mut doc = two_paragraph_doc();
        let range = Range::new(Position::new(vec![0], 1), Position::new(vec![0], 3));
        let at = doc.transact(|w| w.delete_content(&range, true)).unwrap();
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "f");
        assert_eq!(at, Position::new(vec![0], 1));
    }

    #[test]
    fn test_delete_across_blocks_merges_them() {
        let mut doc = two_paragraph_doc();
        let range = Range::new(Position::new(vec![0], 2), Position::new(vec![1], 1));
        doc.transact(|w| w.delete_content(&range, true)).unwrap();
        assert_eq!(doc.root().children.len(), 1);
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "foar");
    }

    #[test]
    fn test_delete_boundary_only_range_merges_blocks() {
        let mut doc = two_paragraph_doc();
        let range = Range::new(Position::new(vec![0], 3), Position::new(vec![1], 0));
        let at = doc.transact(|w| w.delete_content(&range, true)).unwrap();
        assert_eq!(doc.root().children.len(), 1);
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "foobar");
        assert_eq!(at, Position::new(vec![0], 3));
    }

    #[test]
    fn test_delete_without_merge_keeps_blocks() {
        let mut doc = two_paragraph_doc();
        let range = Range::new(Position::new(vec![0], 2), Position::new(vec![1], 1));
        doc.transact(|w| w.delete_content(&range, false)).unwrap();
        assert_eq!(doc.root().children.len(), 2);
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "fo");
        assert_eq!(doc.flattened_text(&[1]).unwrap(), "ar");
    }

    #[test]
    fn test_delete_inside_inline_wrapper() {
        let root = ModelElement::with_children(
            "$root",
            vec![ModelNode::element(
                "paragraph",
                vec![
                    ModelNode::text("ab"),
                    ModelNode::element("italic", vec![ModelNode::text("cd")]),
                    ModelNode::text("ef"),
                ],
            )],
        );
        let mut doc = Document::new(root, paragraph_schema());
        // From inside the italic to inside the trailing text.
        let range = Range::new(Position::new(vec![0, 2], 1), Position::new(vec![0], 4));
        doc.transact(|w| w.delete_content(&range, true)).unwrap();
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "abcf");
    }

    #[test]
    fn test_insert_text_merges_adjacent_runs() {
        let mut doc = two_paragraph_doc();
        let after = doc
            .transact(|w| w.insert_text(&Position::new(vec![0], 3), "!"))
            .unwrap();
        assert_eq!(doc.flattened_text(&[0]).unwrap(), "foo!");
        assert_eq!(after, Position::new(vec![0], 4));
        assert_eq!(doc.element_at(&[0]).unwrap().children.len(), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_schema_violation() {
        let mut doc = two_paragraph_doc();
        let before = doc.root().clone();
        let result = doc.transact(|w| {
            // Text directly under the root is rejected at commit.
            w.insert_text(&Position::new(vec![], 0), "loose")?;
            Ok(())
        });
        assert!(matches!(result, Err(ModelError::SchemaViolation(_))));
        assert_eq!(doc.root(), &before);
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_transaction_rolls_back_selection() {
        let mut doc = two_paragraph_doc();
        doc.select(vec![Range::collapsed(Position::new(vec![0], 1))], false);
        let before = doc.selection().clone();
        let _ = doc.transact(|w| {
            w.set_selection(vec![Range::collapsed(Position::new(vec![1], 2))], true);
            Err::<(), _>(ModelError::SchemaViolation("forced".into()))
        });
        assert_eq!(doc.selection(), &before);
    }

    #[test]
    fn test_position_at_flat_offset_descends_into_wrappers() {
        let root = ModelElement::with_children(
            "$root",
            vec![ModelNode::element(
                "paragraph",
                vec![ModelNode::element(
                    "link",
                    vec![ModelNode::element("italic", vec![ModelNode::text("text")])],
                )],
            )],
        );
        let doc = Document::new(root, paragraph_schema());
        let end = doc.position_at_flat_offset(&[0], 4).unwrap();
        assert_eq!(end, Position::new(vec![0, 0, 0], 4));
        let start = doc.position_at_flat_offset(&[0], 0).unwrap();
        assert_eq!(start, Position::new(vec![0, 0, 0], 0));
    }

    #[test]
    fn test_position_at_flat_offset_attaches_to_earlier_run() {
        let root = ModelElement::with_children(
            "$root",
            vec![ModelNode::element(
                "paragraph",
                vec![
                    ModelNode::element("italic", vec![ModelNode::text("ab")]),
                    ModelNode::text("cd"),
                ],
            )],
        );
        let doc = Document::new(root, paragraph_schema());
        // Offset 2 is the boundary: it lands at the end of the italic run.
        let at = doc.position_at_flat_offset(&[0], 2).unwrap();
        assert_eq!(at, Position::new(vec![0, 0], 2));
    }

    #[test]
    fn test_position_at_flat_offset_out_of_range() {
        let doc = two_paragraph_doc();
        assert!(doc.position_at_flat_offset(&[0], 17).is_err());
    }
}
