use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::Kbn;

/// Online statistics over an unbounded stream of values of a single dimension.
///
/// Mean and variance are maintained with Welford's incremental algorithm, the
/// running sum with Kahan-Babuska-Neumaier compensated summation. The
/// exponential moving average uses the adaptive weight `2 / count`, so it
/// becomes less responsive as more samples accumulate.
///
/// A `StreamStats` is only ever mutated through [`StreamStats::push`]; windows
/// start a fresh instance whenever a bucket closes.
#[derive(Debug, Clone)]
pub struct StreamStats<T> {
    /// Number of pushed values
    count: usize,
    /// Number of pushed non-zero values
    size: usize,
    /// Sum of pushed values
    sum: Kbn<T>,
    /// First pushed value
    first: T,
    /// Most recent pushed value
    last: T,
    /// Smallest pushed value
    min: T,
    /// Largest pushed value
    max: T,
    /// Running mean
    mean: T,
    /// Sum of squared differences from the mean
    d_squared: T,
    /// Exponential moving average
    ema: T,
}

impl<T: Float + Default> Default for StreamStats<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float + Default> StreamStats<T> {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self {
            count: 0,
            size: 0,
            sum: Kbn::default(),
            first: T::zero(),
            last: T::zero(),
            min: T::zero(),
            max: T::zero(),
            mean: T::zero(),
            d_squared: T::zero(),
            ema: T::zero(),
        }
    }

    /// Creates an accumulator that looks like a single sample of `value`.
    ///
    /// Every statistic collapses onto `value`: the variance is zero and the
    /// mean, ema, first, last, min and max all equal it.
    pub fn flat(value: T) -> Self {
        let mut sum = Kbn::default();
        sum += value;
        Self {
            count: 1,
            size: usize::from(value != T::zero()),
            sum,
            first: value,
            last: value,
            min: value,
            max: value,
            mean: value,
            d_squared: T::zero(),
            ema: value,
        }
    }

    #[inline]
    fn n(&self) -> T {
        T::from(self.count).unwrap_or_else(T::nan)
    }

    /// Adds a value to the accumulator.
    ///
    /// Any float is accepted, `NaN` and infinities propagate through the
    /// derived statistics.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to add
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The statistics object
    pub fn push(&mut self, value: T) -> &mut Self {
        self.count += 1;
        if value != T::zero() {
            self.size += 1;
        }
        self.sum += value;

        let n = self.n();
        let mean = self.mean + (value - self.mean) / n;
        self.d_squared = self.d_squared + (value - mean) * (value - self.mean);
        self.mean = mean;

        let w = (T::one() + T::one()) / n;
        self.ema = value * w + self.ema * (T::one() - w);

        if self.count == 1 {
            self.first = value;
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.last = value;
        self
    }

    /// Returns the number of pushed values
    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns the number of pushed values that were not zero
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the sum of all pushed values
    #[inline]
    pub fn sum(&self) -> T {
        self.sum.total()
    }

    /// Returns the running mean
    #[inline]
    pub fn avg(&self) -> T {
        self.mean
    }

    /// Returns the adaptive exponential moving average
    #[inline]
    pub fn ema(&self) -> T {
        self.ema
    }

    /// Returns the first pushed value
    #[inline]
    pub fn first(&self) -> T {
        self.first
    }

    /// Returns the most recent pushed value
    #[inline]
    pub fn last(&self) -> T {
        self.last
    }

    /// Returns the smallest pushed value
    #[inline]
    pub fn min(&self) -> T {
        self.min
    }

    /// Returns the largest pushed value
    #[inline]
    pub fn max(&self) -> T {
        self.max
    }

    /// Returns the difference between the last and the first value
    #[inline]
    pub fn diff(&self) -> T {
        self.last - self.first
    }

    /// Returns the change from first to last value as a percentage of the mean
    ///
    /// A zero mean yields an infinite or `NaN` ratio.
    pub fn ratio(&self) -> T {
        let hundred = T::from(100.0).unwrap_or_else(T::nan);
        hundred * self.diff() / self.mean
    }

    /// Returns the population variance
    ///
    /// # Returns
    ///
    /// * `T` - Sum of squared differences divided by `count`, `NaN` when empty
    pub fn variance(&self) -> T {
        self.d_squared / self.n()
    }

    /// Returns the population standard deviation
    pub fn stdev(&self) -> T {
        self.variance().sqrt()
    }

    /// Returns the sample variance
    ///
    /// # Returns
    ///
    /// * `T` - Sum of squared differences divided by `count - 1`
    pub fn sample_variance(&self) -> T {
        self.d_squared / (self.n() - T::one())
    }

    /// Returns the sample standard deviation
    pub fn sample_stdev(&self) -> T {
        self.sample_variance().sqrt()
    }
}

/// Serializable summary of a [`StreamStats`], as published to consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    /// Number of samples
    pub count: usize,
    /// Mean value
    #[serde(rename = "value")]
    pub mean: f64,
    /// Change from first to last as a percentage of the mean
    pub ratio: f64,
    /// First value
    pub first: f64,
    /// Last value
    pub last: f64,
    /// Population standard deviation
    #[serde(rename = "std")]
    pub std_dev: f64,
    /// Adaptive exponential moving average
    pub ema: f64,
}

impl Data {
    /// Summarizes every stats entry of a slice.
    pub fn from_stats<T: Float + Default>(stats: &[StreamStats<T>]) -> Vec<Data> {
        stats.iter().map(Data::from).collect()
    }
}

impl<T: Float + Default> From<&StreamStats<T>> for Data {
    fn from(stats: &StreamStats<T>) -> Self {
        let f = |v: T| v.to_f64().unwrap_or(f64::NAN);
        Data {
            count: stats.count(),
            mean: f(stats.avg()),
            ratio: f(stats.ratio()),
            first: f(stats.first()),
            last: f(stats.last()),
            std_dev: f(stats.stdev()),
            ema: f(stats.ema()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn two_pass_variance(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
    }

    fn assert_matches_two_pass(values: &[f64]) {
        let mut stats = StreamStats::new();
        values.iter().for_each(|v| {
            stats.push(*v);
        });
        let expected = two_pass_variance(values);
        let tolerance = 1e-9 * expected.abs().max(1.0);
        assert_approx_eq!(stats.variance(), expected, tolerance);
        assert_eq!(stats.count(), values.len());
    }

    #[test]
    fn default_is_empty_accumulator() {
        let mut stats: StreamStats<f32> = StreamStats::default();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.sum(), 0.0);
        stats.push(4.0);
        assert_eq!(stats.avg(), 4.0);
        assert_eq!(stats.min(), 4.0);
    }

    #[test]
    fn variance_matches_two_pass_for_increasing_series() {
        for len in [2, 3, 10, 100, 1_000, 10_000] {
            let values: Vec<f64> = (0..len).map(|i| i as f64 * 0.5 + 10.0).collect();
            assert_matches_two_pass(&values);
        }
    }

    #[test]
    fn variance_matches_two_pass_for_decreasing_series() {
        for len in [2, 7, 500, 10_000] {
            let values: Vec<f64> = (0..len).map(|i| 1_000.0 - i as f64 * 1.25).collect();
            assert_matches_two_pass(&values);
        }
    }

    #[test]
    fn variance_matches_two_pass_for_constant_series() {
        for len in [2, 50, 10_000] {
            let values = vec![42.5; len];
            assert_matches_two_pass(&values);
        }
        let mut stats = StreamStats::new();
        (0..10).for_each(|_| {
            stats.push(3.0);
        });
        assert_eq!(stats.variance(), 0.0);
    }

    #[test]
    fn variance_matches_two_pass_for_sinusoidal_series() {
        for len in [2, 64, 1_000, 10_000] {
            let values: Vec<f64> = (0..len)
                .map(|i| 100.0 + 5.0 * (i as f64 / 10.0).sin())
                .collect();
            assert_matches_two_pass(&values);
        }
    }

    #[test]
    fn sample_variance_divides_by_count_minus_one() {
        let mut stats = StreamStats::new();
        [25.4, 26.2, 26.0].iter().for_each(|v| {
            stats.push(*v);
        });
        assert_approx_eq!(stats.variance(), 0.1156, 0.0001);
        assert_approx_eq!(stats.sample_variance(), 0.1733, 0.0001);
        assert_approx_eq!(stats.stdev(), 0.3399, 0.0001);
        assert_approx_eq!(stats.sample_stdev(), 0.4163, 0.0001);
    }

    #[test]
    fn ema_uses_adaptive_weight() {
        let mut stats = StreamStats::new();
        stats.push(1.0);
        assert_approx_eq!(stats.ema(), 2.0);
        stats.push(2.0);
        assert_approx_eq!(stats.ema(), 2.0);
        stats.push(3.0);
        assert_approx_eq!(stats.ema(), 8.0 / 3.0);
    }

    #[test]
    fn tracks_range_and_ratio() {
        let mut stats = StreamStats::new();
        [1.0, 3.0, 2.0].iter().for_each(|v| {
            stats.push(*v);
        });
        assert_eq!(stats.first(), 1.0);
        assert_eq!(stats.last(), 2.0);
        assert_eq!(stats.min(), 1.0);
        assert_eq!(stats.max(), 3.0);
        assert_eq!(stats.sum(), 6.0);
        assert_approx_eq!(stats.avg(), 2.0);
        assert_approx_eq!(stats.diff(), 1.0);
        assert_approx_eq!(stats.ratio(), 50.0);
    }

    #[test]
    fn max_is_seeded_from_first_sample() {
        let mut stats = StreamStats::new();
        [-5.0, -2.0, -9.0].iter().for_each(|v| {
            stats.push(*v);
        });
        assert_eq!(stats.max(), -2.0);
        assert_eq!(stats.min(), -9.0);
    }

    #[test]
    fn size_counts_only_non_zero_values() {
        let mut stats = StreamStats::new();
        [0.0, 1.0, 0.0, 2.0].iter().for_each(|v| {
            stats.push(*v);
        });
        assert_eq!(stats.count(), 4);
        assert_eq!(stats.size(), 2);
    }

    #[test]
    fn zero_mean_ratio_is_not_finite() {
        let mut stats = StreamStats::new();
        stats.push(-1.0).push(1.0);
        assert!(!stats.ratio().is_finite());
    }

    #[test]
    fn nan_propagates() {
        let mut stats = StreamStats::new();
        stats.push(1.0).push(f64::NAN);
        assert!(stats.avg().is_nan());
        assert!(stats.variance().is_nan());
    }

    #[test]
    fn flat_collapses_onto_value() {
        let flat = StreamStats::flat(7.5_f64);
        assert_eq!(flat.count(), 1);
        assert_eq!(flat.avg(), 7.5);
        assert_eq!(flat.ema(), 7.5);
        assert_eq!(flat.first(), 7.5);
        assert_eq!(flat.last(), 7.5);
        assert_eq!(flat.variance(), 0.0);
        assert_eq!(flat.ratio(), 0.0);
    }

    #[test]
    fn data_summarizes_stats() {
        let mut stats = StreamStats::new();
        stats.push(2.0_f64).push(4.0);
        let data = Data::from_stats(&[stats]);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].count, 2);
        assert_approx_eq!(data[0].mean, 3.0);
        assert_approx_eq!(data[0].std_dev, 1.0);
        assert_approx_eq!(data[0].first, 2.0);
        assert_approx_eq!(data[0].last, 4.0);
    }
}
