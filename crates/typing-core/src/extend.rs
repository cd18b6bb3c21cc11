//! Selection extension: turning a caret into a deletable range.
//!
//! Mirrors a cursor key-press rather than the deletion itself: given a
//! collapsed range, a direction, and a unit, the caret's boundary is moved
//! by exactly one unit (a grapheme cluster, a word-boundary step, a whole
//! embedded object, or a block boundary) and the caller decides what to do
//! with the covered content. Inline wrappers are crossed transparently;
//! isolating elements and the document edges are never crossed.

use unicode_segmentation::UnicodeSegmentation;

use crate::model::{Document, ModelElement, ModelNode, Position, Range};

/// Direction a delete consumes content in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the end of the document (the <kbd>Delete</kbd> key).
    Forward,
    /// Towards the start of the document (the <kbd>Backspace</kbd> key).
    Backward,
}

/// Granularity of one extension step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    /// One extended grapheme cluster; never splits a surrogate pair or a
    /// combining sequence.
    #[default]
    Character,
    /// Up to the nearest word boundary (UAX #29 default rules).
    Word,
}

/// Extends a collapsed range by one unit in `direction`, in place.
///
/// If the range is not collapsed, or no content exists in that direction
/// (document edge, isolating boundary), the range is left untouched.
pub fn extend_selection(doc: &Document, range: &mut Range, direction: Direction, unit: Unit) {
    if !range.is_collapsed() {
        return;
    }
    let caret = range.start().clone();
    let target = match direction {
        Direction::Backward => previous_unit(doc, &caret, unit),
        Direction::Forward => next_unit(doc, &caret, unit),
    };
    if let Some(target) = target {
        *range = match direction {
            Direction::Backward => Range::new(target, caret),
            Direction::Forward => Range::new(caret, target),
        };
    }
}

/// Position one unit before `caret`, or `None` at a hard boundary.
fn previous_unit(doc: &Document, caret: &Position, unit: Unit) -> Option<Position> {
    let schema = doc.schema();
    let mut path = caret.path().to_vec();
    let mut offset = caret.offset();
    let mut crossed_block = false;

    loop {
        let container = doc.element_at(&path).ok()?;

        if offset == 0 {
            if path.is_empty() {
                return None; // document start
            }
            if schema.is_isolating(&container.name) {
                return None;
            }
            let leaving_block = schema.is_block(&container.name);
            offset = path.pop().expect("path is non-empty");
            crossed_block |= leaving_block;
            continue;
        }

        let (idx, start) = container
            .child_at_offset(offset - 1)
            .expect("offset is within the container");
        match &container.children[idx] {
            ModelNode::Text(data) => {
                if crossed_block {
                    // The crossed boundary is the unit; consume no text.
                    return Some(Position::new(path, offset));
                }
                let upto = offset - start;
                let stepped = match unit {
                    Unit::Character => grapheme_step_back(data, upto),
                    Unit::Word => word_step_back(data, upto),
                };
                return Some(Position::new(path, start + stepped));
            }
            ModelNode::Element(el) => {
                if schema.is_isolating(&el.name) {
                    // Embedded objects are consumed whole.
                    return Some(Position::new(path, offset - 1));
                }
                if crossed_block || schema.is_block(&el.name) {
                    path.push(start);
                    return Some(block_end(doc, path, el));
                }
                // Inline wrapper: walk inside and keep going.
                path.push(start);
                offset = el.max_offset();
            }
        }
    }
}

/// Position one unit after `caret`, or `None` at a hard boundary.
fn next_unit(doc: &Document, caret: &Position, unit: Unit) -> Option<Position> {
    let schema = doc.schema();
    let mut path = caret.path().to_vec();
    let mut offset = caret.offset();
    let mut crossed_block = false;

    loop {
        let container = doc.element_at(&path).ok()?;

        if offset >= container.max_offset() {
            if path.is_empty() {
                return None; // document end
            }
            if schema.is_isolating(&container.name) {
                return None;
            }
            let leaving_block = schema.is_block(&container.name);
            let element_start = path.pop().expect("path is non-empty");
            offset = element_start + 1;
            crossed_block |= leaving_block;
            continue;
        }

        let (idx, start) = container
            .child_at_offset(offset)
            .expect("offset is below max_offset");
        match &container.children[idx] {
            ModelNode::Text(data) => {
                if crossed_block {
                    return Some(Position::new(path, offset));
                }
                let from = offset - start;
                let stepped = match unit {
                    Unit::Character => grapheme_step_forward(data, from),
                    Unit::Word => word_step_forward(data, from),
                };
                return Some(Position::new(path, start + stepped));
            }
            ModelNode::Element(el) => {
                if schema.is_isolating(&el.name) {
                    return Some(Position::new(path, offset + 1));
                }
                if crossed_block || schema.is_block(&el.name) {
                    path.push(start);
                    return Some(block_start(doc, path, el));
                }
                path.push(start);
                offset = 0;
            }
        }
    }
}

/// Deepest end position inside `el`, descending through trailing blocks.
fn block_end(doc: &Document, mut path: Vec<usize>, el: &ModelElement) -> Position {
    let mut cur = el;
    loop {
        let max = cur.max_offset();
        if max == 0 {
            return Position::new(path, 0);
        }
        let (idx, start) = cur.child_at_offset(max - 1).expect("max is positive");
        match &cur.children[idx] {
            ModelNode::Element(inner) if doc.schema().is_block(&inner.name) => {
                path.push(start);
                cur = inner;
            }
            _ => return Position::new(path, max),
        }
    }
}

/// Deepest start position inside `el`, descending through leading blocks.
fn block_start(doc: &Document, mut path: Vec<usize>, el: &ModelElement) -> Position {
    let mut cur = el;
    loop {
        if cur.children.is_empty() {
            return Position::new(path, 0);
        }
        match &cur.children[0] {
            ModelNode::Element(inner) if doc.schema().is_block(&inner.name) => {
                path.push(0);
                cur = inner;
            }
            _ => return Position::new(path, 0),
        }
    }
}

fn grapheme_step_back(text: &str, upto: usize) -> usize {
    let prefix: String = text.chars().take(upto).collect();
    let last = prefix
        .graphemes(true)
        .next_back()
        .map(|g| g.chars().count())
        .unwrap_or(1);
    upto.saturating_sub(last)
}

fn grapheme_step_forward(text: &str, from: usize) -> usize {
    let rest: String = text.chars().skip(from).collect();
    let first = rest
        .graphemes(true)
        .next()
        .map(|g| g.chars().count())
        .unwrap_or(1);
    from + first
}

/// Word-boundary `char` offsets of `text`, including both ends.
fn word_boundaries(text: &str) -> Vec<usize> {
    let mut bounds = vec![0];
    let mut acc = 0;
    for word in text.split_word_bounds() {
        acc += word.chars().count();
        bounds.push(acc);
    }
    bounds
}

fn word_step_back(text: &str, upto: usize) -> usize {
    word_boundaries(text)
        .into_iter()
        .filter(|&b| b < upto)
        .next_back()
        .unwrap_or(0)
}

fn word_step_forward(text: &str, from: usize) -> usize {
    let len = text.chars().count();
    word_boundaries(text)
        .into_iter()
        .find(|&b| b > from)
        .unwrap_or(len)
}
