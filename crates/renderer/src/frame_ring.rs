//! Fixed-size ring of frame slots.

/// Cycles through a fixed set of slots, one per frame in flight.
///
/// The index starts at zero and moves forward once per frame, so after `K`
/// calls to [`advance`](Self::advance) it equals `K mod N`.
#[derive(Debug)]
pub struct FrameRing<T> {
    frames: Vec<T>,
    index: usize,
}

impl<T> FrameRing<T> {
    /// # Panics
    ///
    /// Panics if `frames` is empty.
    pub fn new(frames: Vec<T>) -> Self {
        assert!(!frames.is_empty(), "frame ring needs at least one slot");
        Self { frames, index: 0 }
    }

    /// Moves to the next slot and returns it.
    pub fn advance(&mut self) -> &mut T {
        self.index = (self.index + 1) % self.frames.len();
        &mut self.frames[self.index]
    }

    #[inline]
    pub fn current(&self) -> &T {
        &self.frames[self.index]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.frames[self.index]
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.frames.iter()
    }
}
