//! Fixed circular sequence of sinks or sources.

/// Round-robin scheduler over a fixed, non-empty set of slots.
///
/// `next` is deterministic given the call count, which is the only
/// scheduling the striping engine needs. The ring is populated once at
/// construction and treated as read-only structure afterwards; callers
/// that share a ring across threads serialize through their own lock
/// (the fragment writer already does).
pub struct Ring<T> {
    slots: Vec<T>,
    cursor: usize,
}

impl<T> Ring<T> {
    /// Build from a fixed set of slots.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is empty. An empty ring means zero configured
    /// backends; handing out a default value instead would silently
    /// swallow the misconfiguration.
    #[must_use]
    pub fn new(slots: Vec<T>) -> Self {
        assert!(!slots.is_empty(), "ring constructed with zero slots");
        Self { slots, cursor: 0 }
    }

    /// Next slot in round-robin order, wrapping after the last.
    pub fn next(&mut self) -> &mut T {
        let index = self.cursor % self.slots.len();
        self.cursor = self.cursor.wrapping_add(1);
        &mut self.slots[index]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: construction rejects empty rings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_in_order() {
        let mut ring = Ring::new(vec!['a', 'b', 'c']);
        let seen: Vec<char> = (0..7).map(|_| *ring.next()).collect();
        assert_eq!(seen, ['a', 'b', 'c', 'a', 'b', 'c', 'a']);
    }

    #[test]
    fn single_slot_repeats() {
        let mut ring = Ring::new(vec![42]);
        assert_eq!(*ring.next(), 42);
        assert_eq!(*ring.next(), 42);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    #[should_panic(expected = "zero slots")]
    fn empty_ring_panics() {
        let _ring: Ring<u8> = Ring::new(Vec::new());
    }
}
