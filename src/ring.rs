//! Fixed-capacity ring buffer
//!
//! Backs the centroid history and the emotion window. Storage is allocated once
//! at construction; once full, each push overwrites the oldest slot in place.

/// Index-based FIFO with a hard capacity
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    /// Index of the oldest element once the buffer is full
    start: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer. A capacity of zero is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            start: 0,
            capacity,
        }
    }

    /// Append a value, returning the evicted oldest value when full
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.slots[self.start], value);
        self.start = (self.start + 1) % self.capacity;
        Some(evicted)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let len = self.slots.len();
        (0..len).map(move |i| &self.slots[(self.start + i) % len])
    }

    /// Most recently pushed value
    pub fn last(&self) -> Option<&T> {
        let len = self.slots.len();
        if len == 0 {
            return None;
        }
        Some(&self.slots[(self.start + len - 1) % len])
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.start = 0;
    }
}
