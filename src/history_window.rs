use core::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BufferError, Result, RingBuffer, TimeBucket, WallClockWindow, polynomial};

/// Seconds per unit of the synthetic time axis used by [`SlidingHistoryWindow::extract`].
const INTERVAL_SECONDS: f64 = 60.0;

/// Snapshot of one dimension of a [`TimeBucket`], with values relative to the bucket mean.
///
/// A zero mean makes the relative fields infinite or `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowView {
    /// Start of the bucket
    pub time: DateTime<Utc>,
    /// Number of samples in the bucket
    pub count: usize,
    /// Mean value
    pub value: f64,
    /// Distance of the ema from the mean, in percent of the mean
    pub ema_diff: f64,
    /// Difference between last and first value
    pub diff: f64,
    /// Change from first to last value, in percent of the mean
    pub ratio: f64,
    /// Standard deviation in percent of the mean
    #[serde(rename = "std")]
    pub std_dev: f64,
    /// Number of samples pushed to this dimension
    pub density: usize,
}

impl TimeBucket {
    /// Builds the view of the given dimension.
    ///
    /// # Panics
    ///
    /// If `index` is not a dimension of the bucket.
    pub fn view(&self, index: usize) -> TimeWindowView {
        let stats = &self.bucket.values().stats()[index];
        let avg = stats.avg();
        TimeWindowView {
            time: self.time,
            count: self.size(),
            value: avg,
            ema_diff: 100.0 * (stats.ema() - avg) / avg,
            diff: stats.diff(),
            ratio: stats.ratio(),
            std_dev: 100.0 * stats.stdev() / avg,
            density: stats.count(),
        }
    }
}

/// Extracts the mean value of a view
pub fn avg(view: &TimeWindowView) -> f64 {
    view.value
}

/// Extracts the ratio of a view
pub fn ratio(view: &TimeWindowView) -> f64 {
    view.ratio
}

/// Transform returning the views of the first `dim` dimensions of a bucket.
pub fn stats_window(dim: usize) -> impl Fn(&TimeBucket) -> Vec<TimeWindowView> {
    move |bucket: &TimeBucket| (0..dim).map(|i| bucket.view(i)).collect()
}

/// Transform returning the number of samples of a bucket.
pub fn window_density(bucket: &TimeBucket) -> usize {
    bucket.bucket.values().stats().first().map_or(0, |s| s.count())
}

/// A series extracted from the window, with the polynomial fitted to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    /// Coefficients in ascending powers of x
    pub coefficients: Vec<f64>,
    /// Time axis, in minutes since the oldest retained bucket
    pub xs: Vec<f64>,
    /// Extracted values
    pub ys: Vec<f64>,
}

/// Keeps the last `size` closed buckets of a [`WallClockWindow`].
///
/// Series queries ([`extract`](Self::extract), [`polynomial`](Self::polynomial),
/// [`values`](Self::values)) append the still open bucket as the most recent
/// point, so they reflect the freshest, incomplete data as well.
#[derive(Debug, Clone)]
pub struct SlidingHistoryWindow {
    window: WallClockWindow,
    buckets: RingBuffer<TimeBucket>,
}

impl SlidingHistoryWindow {
    /// Creates a history of `size` buckets of the given duration and dimension.
    ///
    /// # Panics
    ///
    /// If `size` is zero or `duration` is shorter than a second.
    pub fn new(duration: Duration, size: usize, dim: usize) -> Self {
        Self {
            window: WallClockWindow::new(duration, dim),
            buckets: RingBuffer::new(size),
        }
    }

    /// Adds values at the given time.
    ///
    /// # Returns
    ///
    /// * `Option<TimeBucket>` - The bucket this push closed, which is also retained in the history
    pub fn push(&mut self, t: DateTime<Utc>, values: &[f64]) -> Option<TimeBucket> {
        let bucket = self.window.push(t, values)?;
        self.buckets.push(bucket.clone());
        Some(bucket)
    }

    /// Returns the retained closed buckets, oldest first, passed through `transform`
    pub fn get<U, F>(&self, transform: F) -> Vec<U>
    where
        F: FnMut(&TimeBucket) -> U,
    {
        self.buckets.get(transform)
    }

    /// Returns the number of retained closed buckets
    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the underlying wall-clock window
    #[inline]
    pub fn window(&self) -> &WallClockWindow {
        &self.window
    }

    /// Extracts a value from the given dimension of every closed bucket, without the open one.
    pub fn buffer<F>(&self, index: usize, extract: F) -> Vec<f64>
    where
        F: Fn(&TimeWindowView) -> f64,
    {
        self.buckets.get(|bucket| extract(&bucket.view(index)))
    }

    /// Extracts a two dimensional series from the given dimension.
    ///
    /// The x axis is the bucket time in minutes, relative to the oldest
    /// retained bucket. The open bucket is appended as the last point.
    ///
    /// # Errors
    ///
    /// [`BufferError::NoHistory`] if no bucket has closed yet.
    pub fn extract<F>(&self, index: usize, extract: F) -> Result<(Vec<f64>, Vec<f64>)>
    where
        F: Fn(&TimeWindowView) -> f64,
    {
        let Some(first) = self.buckets.iter().next() else {
            return Err(BufferError::NoHistory);
        };
        let t0 = first.time.timestamp() as f64 / INTERVAL_SECONDS;

        let current = self.window.current_bucket();
        let (xs, ys): (Vec<f64>, Vec<f64>) = self
            .buckets
            .iter()
            .chain(core::iter::once(&current))
            .map(|bucket| {
                let view = bucket.view(index);
                let x = view.time.timestamp() as f64 / INTERVAL_SECONDS - t0;
                (x, extract(&view))
            })
            .unzip();
        Ok((xs, ys))
    }

    /// Fits a polynomial of the given degree over the extracted series.
    ///
    /// # Errors
    ///
    /// [`BufferError::NoHistory`] if no bucket has closed yet,
    /// [`BufferError::NotEnoughBuckets`] if the series has fewer than `degree + 1` points.
    pub fn polynomial<F>(&self, index: usize, extract: F, degree: usize) -> Result<Trend>
    where
        F: Fn(&TimeWindowView) -> f64,
    {
        let (xs, ys) = self.extract(index, extract)?;
        if ys.len() < degree + 1 {
            return Err(BufferError::NotEnoughBuckets {
                have: ys.len(),
                need: degree + 1,
                degree,
            });
        }
        let coefficients = polynomial::fit(&xs, &ys, degree)?;
        tracing::trace!(?xs, ?ys, ?coefficients, degree, "polynomial fit");
        Ok(Trend {
            coefficients,
            xs,
            ys,
        })
    }

    /// Returns only the values of the extracted series.
    pub fn values<F>(&self, index: usize, extract: F) -> Result<Vec<f64>>
    where
        F: Fn(&TimeWindowView) -> f64,
    {
        self.extract(index, extract).map(|(_, ys)| ys)
    }
}
