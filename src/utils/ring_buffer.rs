/// A fixed-capacity circular buffer keeping the most recent elements.
///
/// Once full, every push overwrites the oldest element. Iteration always
/// runs from oldest to newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// The stored elements, grows up to `capacity` and is then overwritten in place.
    data: Vec<T>,
    /// Maximum number of elements.
    capacity: usize,
    /// The index of the oldest element once the buffer is full.
    index: usize,
    /// Total number of pushes.
    count: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity can not be zero");
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            index: 0,
            count: 0,
        }
    }

    /// Returns the maximum number of elements
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of stored elements, at most the capacity
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of pushes since creation
    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if nothing was pushed yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` once the buffer holds `capacity` elements
    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Pushes a value, overwriting the oldest one if the buffer is full.
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The overwritten element, if any
    pub fn push(&mut self, value: T) -> Option<T> {
        self.count += 1;
        if self.is_full() {
            let overwritten = core::mem::replace(&mut self.data[self.index], value);
            self.index = (self.index + 1) % self.capacity;
            Some(overwritten)
        } else {
            self.data.push(value);
            None
        }
    }

    /// Returns an iterator over the elements from oldest to newest, `.rev()` for newest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let len = self.data.len();
        (0..len).map(move |i| &self.data[(self.index + i) % len])
    }

    /// Returns the most recently pushed element
    pub fn last(&self) -> Option<&T> {
        let len = self.data.len();
        if len == 0 {
            return None;
        }
        self.data.get((self.index + len - 1) % len)
    }

    /// Returns the elements from oldest to newest, each passed through `transform`
    pub fn get<U, F>(&self, transform: F) -> Vec<U>
    where
        F: FnMut(&T) -> U,
    {
        self.iter().map(transform).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn test_new_and_capacity() {
        let buf: RingBuffer<i32> = RingBuffer::new(4);
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
        assert!(!buf.is_full());
    }

    #[test]
    fn test_push_overwrite() {
        let mut buf = RingBuffer::new(2);
        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), None);
        assert!(buf.is_full());

        assert_eq!(buf.push(3), Some(1));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.push(4), Some(2));

        let elems: Vec<_> = buf.iter().copied().collect();
        assert_eq!(elems, vec![3, 4]);
        assert_eq!(buf.last(), Some(&4));
    }

    #[test]
    fn test_get_transforms_in_insertion_order() {
        let mut buf = RingBuffer::new(3);
        buf.push("a".to_string());
        buf.push("bb".to_string());
        assert_eq!(buf.get(|s| s.len()), vec![1, 2]);

        buf.push("ccc".to_string());
        buf.push("dddd".to_string());
        assert_eq!(buf.get(|s| s.len()), vec![2, 3, 4]);
    }

    #[test]
    fn test_reverse_iteration_is_newest_first() {
        let mut buf = RingBuffer::new(3);
        (1..=5).for_each(|v| {
            buf.push(v);
        });
        let newest_first: Vec<_> = buf.iter().rev().copied().collect();
        assert_eq!(newest_first, vec![5, 4, 3]);
        assert_eq!(buf.iter().len(), 3);
    }

    #[test]
    fn test_len_is_min_of_pushes_and_capacity() {
        for capacity in [1, 3, 8] {
            for pushes in 0..20 {
                let mut buf = RingBuffer::new(capacity);
                (1..=pushes).for_each(|v| {
                    buf.push(v);
                });
                let elems: Vec<_> = buf.iter().copied().collect();
                assert_eq!(elems.len(), pushes.min(capacity));
                assert_eq!(buf.count(), pushes);
                if pushes > capacity {
                    assert_eq!(elems[0], pushes - capacity + 1);
                }
                if pushes > 0 {
                    assert_eq!(elems[elems.len() - 1], pushes);
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "capacity can not be zero")]
    fn test_zero_capacity() {
        let _buf: RingBuffer<i32> = RingBuffer::new(0);
    }
}
