use core::time::Duration;

use chrono::{DateTime, Utc};

use crate::{IndexedBucket, TumblingWindow};

/// A closed (or open) bucket of a [`WallClockWindow`], tagged with its start time.
#[derive(Debug, Clone)]
pub struct TimeBucket {
    /// The bucket statistics
    pub bucket: IndexedBucket<f64>,
    /// Wall-clock start of the bucket, `index * duration`
    pub time: DateTime<Utc>,
}

impl TimeBucket {
    /// Returns the number of samples in the bucket
    #[inline]
    pub fn size(&self) -> usize {
        self.bucket.size()
    }
}

/// Converts seconds since the epoch to a timestamp, saturating to the epoch when out of range.
pub(crate) fn unix_time(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

/// Classic tumbling time buckets: samples are grouped by `unix_seconds / duration`.
///
/// Timestamps must be non-decreasing; a timestamp that goes back across a
/// bucket boundary is not detected. As with [`TumblingWindow`], a bucket is
/// reported closed by the first push that lands in a later bucket.
#[derive(Debug, Clone)]
pub struct WallClockWindow {
    /// Index of the last closed bucket
    index: i64,
    /// Bucket width in seconds
    duration: i64,
    window: TumblingWindow<f64>,
}

impl WallClockWindow {
    /// Creates a window of buckets `duration` wide.
    ///
    /// # Panics
    ///
    /// If `duration` is shorter than one second.
    pub fn new(duration: Duration, dim: usize) -> Self {
        let duration = duration.as_secs() as i64;
        assert!(duration > 0, "duration must be at least one second");
        Self {
            index: 0,
            duration,
            window: TumblingWindow::new(1, dim),
        }
    }

    /// Adds values at the given time.
    ///
    /// # Returns
    ///
    /// * `Option<TimeBucket>` - The bucket this push closed, if any
    pub fn push(&mut self, t: DateTime<Utc>, values: &[f64]) -> Option<TimeBucket> {
        let index = t.timestamp() / self.duration;
        let bucket = self.window.push(index, values)?;
        self.index = bucket.index();
        let time = unix_time(bucket.index() * self.duration);
        tracing::trace!(index = bucket.index(), size = bucket.size(), %time, "time bucket closed");
        Some(TimeBucket { bucket, time })
    }

    /// Returns the currently open bucket with its start time
    pub fn current_bucket(&self) -> TimeBucket {
        let bucket = self.window.bucket().clone();
        let time = unix_time(bucket.index() * self.duration);
        TimeBucket { bucket, time }
    }

    /// Returns the start time of the bucket `iterations` after the last closed one.
    pub fn next(&self, iterations: i64) -> DateTime<Utc> {
        unix_time((self.index + iterations + 1) * self.duration)
    }

    /// Returns the bucket width in seconds
    #[inline]
    pub const fn duration(&self) -> i64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        unix_time(seconds)
    }

    #[test]
    fn buckets_by_wall_clock() {
        let mut window = WallClockWindow::new(Duration::from_secs(60), 1);
        let start = 1_599_999_960;
        assert!(window.push(at(start), &[1.0]).is_none());
        assert!(window.push(at(start + 30), &[3.0]).is_none());

        let Some(closed) = window.push(at(start + 70), &[10.0]) else {
            panic!("minute boundary should close the bucket");
        };
        assert_eq!(closed.size(), 2);
        assert_eq!(closed.time, at(1_599_999_960));
        assert_approx_eq!(closed.bucket.values().stats()[0].avg(), 2.0);

        let open = window.current_bucket();
        assert_eq!(open.size(), 1);
        assert_eq!(open.time, at(1_600_000_020));
        assert_eq!(window.next(0), at(1_600_000_020));
        assert_eq!(window.next(2), at(1_600_000_140));
    }

    #[test]
    fn skipped_intervals_do_not_emit_empty_buckets() {
        let mut window = WallClockWindow::new(Duration::from_secs(10), 1);
        window.push(at(1_000), &[1.0]);
        let closed = window.push(at(1_100), &[2.0]);
        assert!(closed.is_some());
        let closed = window.push(at(1_200), &[3.0]);
        let Some(bucket) = closed else {
            panic!("expected a closed bucket");
        };
        assert_eq!(bucket.time, at(1_100));
    }

    #[test]
    #[should_panic(expected = "duration must be at least one second")]
    fn sub_second_duration_panics() {
        let _ = WallClockWindow::new(Duration::from_millis(500), 1);
    }
}
