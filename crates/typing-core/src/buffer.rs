//! Undo-batch change buffer.
//!
//! Typing and deleting produce a bursty stream of single-character edits.
//! Grouping every keystroke into its own undo step makes undo useless, and
//! grouping an entire session into one step makes it destructive. The
//! [`ChangeBuffer`] sits in between: it accumulates a count of atomic content
//! changes and closes the current [`Batch`] once a configured limit is
//! reached, so the undo collaborator sees step boundaries every `limit`
//! characters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle identifying one undo/redo grouping unit.
///
/// Model operations tagged with the same `Batch` are undone and redone
/// together. Handles are only ever compared for identity; ids are unique
/// across all buffers in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Batch(u64);

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(0);

impl Batch {
    fn fresh() -> Self {
        Batch(NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Groups a stream of atomic content changes into undo batches.
///
/// A fresh batch is created lazily on the first [`batch`](Self::batch) access
/// after the previous one closed. Feeding change counts through
/// [`input`](Self::input) rotates the batch when the running total reaches
/// the configured limit.
#[derive(Debug)]
pub struct ChangeBuffer {
    limit: usize,
    size: usize,
    current: Option<Batch>,
    locked: bool,
}

impl ChangeBuffer {
    /// Creates a buffer that rotates after `limit` accumulated changes.
    ///
    /// A limit of zero is treated as one: every change gets its own batch.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            size: 0,
            current: None,
            locked: false,
        }
    }

    /// The configured rotation threshold.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of changes accumulated in the currently open batch.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the currently open batch, creating one if none is open.
    pub fn batch(&mut self) -> Batch {
        *self.current.get_or_insert_with(Batch::fresh)
    }

    /// Records that `change_count` atomic content changes happened in the
    /// open batch.
    ///
    /// When the running total reaches the limit the batch is closed; the next
    /// [`batch`](Self::batch) access returns a new handle. `input(0)` is a
    /// valid no-op and never forces rotation.
    pub fn input(&mut self, change_count: usize) {
        self.size += change_count;
        if self.size >= self.limit {
            self.reset();
        }
    }

    /// Closes the open batch and clears the accumulated count.
    ///
    /// Called internally on rotation; also the right reaction to an external
    /// model change that should break the typing coalescing (unless the
    /// buffer is [locked](Self::lock)).
    pub fn reset(&mut self) {
        self.current = None;
        self.size = 0;
    }

    /// Marks the start of a self-inflicted model change, so that change
    /// notifications bouncing back do not reset the buffer.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Ends the scope opened by [`lock`](Self::lock).
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// `true` while the buffer's own edits are in flight.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}
