use num_traits::Float;

use crate::StreamStats;

/// A fixed number of independent [`StreamStats`], pushed in lock-step.
///
/// Every push carries exactly one value per dimension.
#[derive(Debug, Clone)]
pub struct StatsVector<T> {
    /// One accumulator per dimension
    stats: Vec<StreamStats<T>>,
}

impl<T: Float + Default> StatsVector<T> {
    /// Creates a vector of `dim` empty accumulators.
    pub fn new(dim: usize) -> Self {
        Self {
            stats: (0..dim).map(|_| StreamStats::new()).collect(),
        }
    }

    /// Returns the number of dimensions
    #[inline]
    pub fn dim(&self) -> usize {
        self.stats.len()
    }

    /// Pushes each value into the accumulator of the same dimension.
    ///
    /// # Panics
    ///
    /// If `values.len()` differs from the vector dimension.
    pub fn push(&mut self, values: &[T]) {
        assert_eq!(
            values.len(),
            self.stats.len(),
            "inconsistent dimensions {} vs {}",
            values.len(),
            self.stats.len()
        );
        self.stats
            .iter_mut()
            .zip(values)
            .for_each(|(stats, value)| {
                stats.push(*value);
            });
    }

    /// Returns the per-dimension statistics
    #[inline]
    pub fn stats(&self) -> &[StreamStats<T>] {
        &self.stats
    }

    /// Returns the number of pushes, all dimensions share it
    #[inline]
    pub fn size(&self) -> usize {
        self.stats.first().map_or(0, StreamStats::count)
    }

    /// Takes a snapshot of the statistics.
    ///
    /// # Returns
    ///
    /// * `(Vec<StreamStats<T>>, Vec<StreamStats<T>>)` - The full statistics, and
    ///   a flattened copy where every dimension collapses to a single sample of its mean
    pub fn flush(&self) -> (Vec<StreamStats<T>>, Vec<StreamStats<T>>) {
        let flat = self
            .stats
            .iter()
            .map(|stats| StreamStats::flat(stats.avg()))
            .collect();
        (self.stats.clone(), flat)
    }
}

/// A [`StatsVector`] bound to a slot index.
///
/// Pushes for any other index are dropped, which keeps late or mismatched
/// samples out of the aggregate.
#[derive(Debug, Clone)]
pub struct IndexedBucket<T> {
    index: i64,
    stats: StatsVector<T>,
}

impl<T: Float + Default> IndexedBucket<T> {
    /// Creates an empty bucket for the given slot index and dimension.
    pub fn new(index: i64, dim: usize) -> Self {
        Self {
            index,
            stats: StatsVector::new(dim),
        }
    }

    /// Pushes the values if `index` matches the bucket index.
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if the index did not match and nothing was pushed
    pub fn push(&mut self, index: i64, values: &[T]) -> bool {
        if index != self.index {
            return false;
        }
        self.stats.push(values);
        true
    }

    /// Returns the slot index
    #[inline]
    pub const fn index(&self) -> i64 {
        self.index
    }

    /// Returns the number of pushes accepted by the bucket
    #[inline]
    pub fn size(&self) -> usize {
        self.stats.size()
    }

    /// Returns the underlying statistics
    #[inline]
    pub fn values(&self) -> &StatsVector<T> {
        &self.stats
    }

    /// See [`StatsVector::flush`]
    #[inline]
    pub fn flush(&self) -> (Vec<StreamStats<T>>, Vec<StreamStats<T>>) {
        self.stats.flush()
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn pushes_each_dimension() {
        let mut vector = StatsVector::new(2);
        vector.push(&[1.0, 10.0]);
        vector.push(&[3.0, 30.0]);
        assert_eq!(vector.dim(), 2);
        assert_eq!(vector.size(), 2);
        assert_approx_eq!(vector.stats()[0].avg(), 2.0);
        assert_approx_eq!(vector.stats()[1].avg(), 20.0);
    }

    #[test]
    #[should_panic(expected = "inconsistent dimensions")]
    fn dimension_mismatch_panics() {
        let mut vector = StatsVector::new(2);
        vector.push(&[1.0]);
    }

    #[test]
    fn flush_returns_full_and_flat_snapshots() {
        let mut vector = StatsVector::new(1);
        vector.push(&[2.0]);
        vector.push(&[6.0]);
        let (full, flat) = vector.flush();
        assert_eq!(full[0].count(), 2);
        assert_approx_eq!(full[0].variance(), 4.0);
        assert_eq!(flat[0].count(), 1);
        assert_approx_eq!(flat[0].avg(), 4.0);
        assert_approx_eq!(flat[0].first(), 4.0);
        assert_approx_eq!(flat[0].last(), 4.0);
        assert_eq!(flat[0].variance(), 0.0);
    }

    #[test]
    fn bucket_rejects_foreign_index() {
        let mut bucket = IndexedBucket::new(5, 1);
        assert!(bucket.push(5, &[1.0]));
        assert!(!bucket.push(6, &[100.0]));
        assert_eq!(bucket.index(), 5);
        assert_eq!(bucket.size(), 1);
        assert_approx_eq!(bucket.values().stats()[0].avg(), 1.0);
    }

    #[test]
    fn empty_bucket_has_zero_size() {
        let bucket: IndexedBucket<f64> = IndexedBucket::new(0, 3);
        assert_eq!(bucket.size(), 0);
        let empty: StatsVector<f64> = StatsVector::new(0);
        assert_eq!(empty.size(), 0);
    }
}
