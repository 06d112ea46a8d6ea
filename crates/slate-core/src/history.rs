//! Linear undo history over element-sequence snapshots.

use crate::element::Element;

/// Maximum number of retained snapshots; the oldest is dropped beyond this.
pub const MAX_HISTORY: usize = 50;

/// A linear snapshot stack with a cursor.
///
/// Pushing after an undo truncates everything above the cursor - standard
/// linear undo with no redo-branch preservation. Snapshots are deep copies;
/// callers never observe aliasing with the live sequence.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Vec<Element>>,
    cursor: usize,
}

impl History {
    /// Start a history whose baseline is the given sequence.
    pub fn new(initial: Vec<Element>) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
        }
    }

    /// Record a snapshot of the sequence after a completed gesture.
    pub fn push(&mut self, elements: &[Element]) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(elements.to_vec());
        if self.snapshots.len() > MAX_HISTORY {
            self.snapshots.remove(0);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot. Returns the sequence to restore, or `None`
    /// when already at the baseline.
    pub fn undo(&mut self) -> Option<Vec<Element>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Step forward one snapshot. Returns the sequence to restore, or `None`
    /// when already at the top.
    pub fn redo(&mut self) -> Option<Vec<Element>> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.snapshots[self.cursor].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// The snapshot at the current cursor.
    pub fn current(&self) -> &[Element] {
        &self.snapshots[self.cursor]
    }
}
