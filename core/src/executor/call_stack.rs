//! Call stack of pending frames
//!
//! The stack only grows through [`CallStack::add`] and only shrinks by moving
//! the cursor back. Frames above the cursor are logically discarded and are
//! physically dropped by the next `add`, so a bulk unwind (return, break) is a
//! single cursor move.

use super::types::Frame;

#[derive(Debug)]
pub struct CallStack {
    frames: Vec<Frame>,
    /// Index of the top frame, `-1` when empty
    cursor: isize,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            cursor: -1,
        }
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor < 0
    }

    /// Number of live frames
    pub fn depth(&self) -> usize {
        (self.cursor + 1) as usize
    }

    /// Push a frame at `cursor + 1`, dropping anything logically discarded above it
    pub fn add(&mut self, frame: Frame) {
        let next = (self.cursor + 1) as usize;
        self.frames.truncate(next);
        self.frames.push(frame);
        self.cursor += 1;
    }

    pub fn peek(&self) -> Option<&Frame> {
        if self.cursor < 0 {
            return None;
        }
        self.frames.get(self.cursor as usize)
    }

    pub fn peek_mut(&mut self) -> Option<&mut Frame> {
        if self.cursor < 0 {
            return None;
        }
        self.frames.get_mut(self.cursor as usize)
    }

    /// Remove the top frame
    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.peek().cloned()?;
        self.cursor -= 1;
        Some(frame)
    }

    /// Move the cursor back to `cursor`, discarding every frame above it
    ///
    /// The cursor never moves forward here; a larger value is ignored.
    pub fn set_cursor(&mut self, cursor: isize) {
        if cursor < self.cursor {
            self.cursor = cursor.max(-1);
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.cursor = -1;
    }

    /// Frames physically retained, including logically discarded ones
    pub fn retained(&self) -> usize {
        self.frames.len()
    }
}
