use num_traits::Float;

use crate::IndexedBucket;

/// Groups pushes into consecutive, non-overlapping buckets of an integer index space.
///
/// A bucket spans `size` index units starting at the index that opened it.
/// There is no explicit close: a bucket is reported as closed only by the
/// push that falls outside its range, so the last partial bucket stays open
/// until the next push (or until a caller drains it through [`TumblingWindow::bucket`]).
///
/// Indexes are expected to be non-decreasing. A push with index `0` always
/// restarts the window at `0` without reporting the open bucket; an index
/// that legitimately maps to `0` (e.g. the epoch) is therefore treated as a
/// restart too.
#[derive(Debug, Clone)]
pub struct TumblingWindow<T> {
    /// Index span of a bucket
    size: i64,
    /// Dimension of the pushed values
    dim: usize,
    /// Index of the currently open bucket
    last_index: i64,
    /// Currently open bucket
    bucket: IndexedBucket<T>,
}

impl<T: Float + Default> TumblingWindow<T> {
    /// Creates a window with buckets spanning `size` index units.
    ///
    /// # Arguments
    ///
    /// * `size` - The index range of each bucket
    /// * `dim` - The number of values in every push
    pub fn new(size: i64, dim: usize) -> Self {
        Self {
            size,
            dim,
            last_index: 0,
            bucket: IndexedBucket::new(0, dim),
        }
    }

    /// Adds values at the given index.
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the sample, non-decreasing across calls
    /// * `values` - One value per dimension
    ///
    /// # Returns
    ///
    /// * `Option<IndexedBucket<T>>` - The bucket this push closed, if it held any samples
    pub fn push(&mut self, index: i64, values: &[T]) -> Option<IndexedBucket<T>> {
        let mut closed = None;

        if index == 0 {
            self.restart(index);
        } else if self.size > 0 && index >= self.last_index + self.size {
            let previous = self.restart(index);
            if previous.size() > 0 {
                closed = Some(previous);
            }
        }

        self.bucket.push(self.last_index, values);
        closed
    }

    fn restart(&mut self, index: i64) -> IndexedBucket<T> {
        self.last_index = index;
        core::mem::replace(&mut self.bucket, IndexedBucket::new(index, self.dim))
    }

    /// Returns the index of the bucket currently accumulating
    #[inline]
    pub const fn current(&self) -> i64 {
        self.last_index
    }

    /// Returns the index at which the next bucket opens
    #[inline]
    pub const fn next(&self) -> i64 {
        self.last_index + self.size
    }

    /// Returns the index span of a bucket
    #[inline]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// Returns the currently open bucket
    #[inline]
    pub fn bucket(&self) -> &IndexedBucket<T> {
        &self.bucket
    }
}
