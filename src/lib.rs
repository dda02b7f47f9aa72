#![doc = include_str!("../README.md")]
#![deny(
    unsafe_code,
    unused_imports,
    unused_variables,
    unused_must_use,
    missing_docs,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented
)]
#![allow(clippy::len_without_is_empty)]

pub(crate) type Kbn<T> = compensated_summation::KahanBabuskaNeumaier<T>;

mod utils;
pub use utils::RingBuffer;

mod error;
pub use error::{BufferError, Result};

mod stream_stats;
pub use stream_stats::{Data, StreamStats};

mod bucket;
pub use bucket::{IndexedBucket, StatsVector};

mod tumbling_window;
pub use tumbling_window::TumblingWindow;

mod time_window;
pub use time_window::{TimeBucket, WallClockWindow};

mod history_window;
pub use history_window::{
    SlidingHistoryWindow, TimeWindowView, Trend, avg, ratio, stats_window, window_density,
};

pub mod polynomial;

mod interval_window;
pub use interval_window::{IntervalWindow, IntervalWindowConfig, StatsMessage};

mod batch_window;
pub use batch_window::BatchWindow;

mod sequence;
pub use sequence::{
    DELIMITER, HmmConfig, ModelSnapshot, Prediction, Predictions, Sequence, SequenceModel,
    State, StateMap, Status,
};
