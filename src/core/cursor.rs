// Forward-only position into a shared sequence.

/// Position of one enumerator instance. Only moves forward, except for
/// [`Cursor::reset`]; clones copy the position and diverge afterwards.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Cursor {
    pos: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self { pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move forward by `count`, saturating rather than wrapping.
    pub fn advance(&mut self, count: usize) {
        self.pos = self.pos.saturating_add(count);
    }

    /// Move forward by up to `count` without passing `end`. Returns how far it moved.
    pub fn advance_within(&mut self, count: usize, end: usize) -> usize {
        let moved = end.saturating_sub(self.pos).min(count);
        self.pos += moved;
        moved
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }
}
