use core::time::Duration;
use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, warn};

use crate::{Data, StreamStats, TumblingWindow};

/// Configuration of an [`IntervalWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalWindowConfig {
    /// Identifier copied into every message
    pub id: String,
    /// Number of values in every push
    pub dim: usize,
    /// Flush interval
    pub duration: Duration,
    /// Flush once more than `limit` samples arrived, instead of on a timer. `0` disables it.
    #[serde(default)]
    pub limit: usize,
    /// Re-emit the last aggregate for intervals without samples
    #[serde(default)]
    pub echo: bool,
}

impl IntervalWindowConfig {
    /// Creates a timer driven configuration without echo.
    pub fn new(id: impl Into<String>, dim: usize, duration: Duration) -> Self {
        Self {
            id: id.into(),
            dim,
            duration,
            limit: 0,
            echo: false,
        }
    }

    /// Switches to count driven flushing.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Enables echo of the last aggregate on empty intervals.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }
}

/// The aggregate of one interval, as published by an [`IntervalWindow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsMessage {
    /// `false` when the interval had no samples and echo is disabled; consumers should skip it
    pub ok: bool,
    /// Time of the first sample of the interval; empty intervals advance the previous time by `duration`
    pub time: DateTime<Utc>,
    /// Window identifier
    pub id: String,
    /// Window interval
    pub duration: Duration,
    /// Number of dimensions
    pub dim: usize,
    /// Per-dimension statistics
    #[serde(skip)]
    pub stats: Vec<StreamStats<f64>>,
    /// Per-dimension summary
    pub data: Vec<Data>,
}

impl StatsMessage {
    fn empty(config: &IntervalWindowConfig, time: DateTime<Utc>) -> Self {
        Self {
            ok: false,
            time,
            id: config.id.clone(),
            duration: config.duration,
            dim: config.dim,
            stats: Vec::new(),
            data: Vec::new(),
        }
    }
}

fn advance(time: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| time.checked_add_signed(delta))
        .unwrap_or(time)
}

#[derive(Debug)]
struct State {
    /// Accumulator of the current interval, created by its first sample
    window: Option<TumblingWindow<f64>>,
    /// Time of the first sample of the current interval
    time: DateTime<Utc>,
    /// Samples pushed in the current interval
    count: usize,
    /// Flat echo of the last non-empty aggregate
    last_message: StatsMessage,
    /// Output channel, `None` once closed
    tx: Option<mpsc::Sender<StatsMessage>>,
}

#[derive(Debug)]
struct Shared {
    config: IntervalWindowConfig,
    state: Mutex<State>,
    closed: AtomicBool,
    /// Wakes a send blocked on a full channel when the window closes
    shutdown: Notify,
}

impl Shared {
    async fn flush(&self) {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await;
    }

    async fn flush_locked(&self, state: &mut State) {
        if state.tx.is_none() {
            debug!(id = %self.config.id, "flush on closed interval window");
            return;
        }

        let count = core::mem::take(&mut state.count);
        let message = match state.window.take() {
            Some(window) if count > 0 => {
                let (stats, flat) = window.bucket().flush();
                let message = StatsMessage {
                    ok: true,
                    time: state.time,
                    id: self.config.id.clone(),
                    duration: self.config.duration,
                    dim: self.config.dim,
                    data: Data::from_stats(&stats),
                    stats,
                };
                state.last_message = StatsMessage {
                    data: Data::from_stats(&flat),
                    stats: flat,
                    ..message.clone()
                };
                debug!(id = %self.config.id, count, "interval flushed");
                message
            }
            _ if self.config.echo => {
                let mut echo = state.last_message.clone();
                echo.ok = true;
                echo.time = advance(echo.time, self.config.duration);
                state.last_message = echo.clone();
                debug!(id = %self.config.id, "empty interval, echoing last aggregate");
                echo
            }
            _ => {
                state.time = advance(state.time, self.config.duration);
                debug!(id = %self.config.id, "empty interval");
                StatsMessage::empty(&self.config, state.time)
            }
        };

        let shutdown = self.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();

        // The lock stays held across the send: a slow consumer delays the next flush.
        let delivered = match &state.tx {
            Some(tx) if !self.closed.load(Ordering::Acquire) => tokio::select! {
                result = tx.send(message) => Some(result.is_ok()),
                () = &mut shutdown => None,
            },
            _ => None,
        };
        match delivered {
            Some(true) => {}
            Some(false) => {
                warn!(id = %self.config.id, "interval window consumer is gone, stopping output");
                state.tx = None;
            }
            None => {
                debug!(id = %self.config.id, "interval window closed while sending");
                state.tx = None;
            }
        }
    }
}

async fn run(shared: Weak<Shared>, period: Duration) {
    loop {
        tokio::time::sleep(period).await;
        let Some(window) = shared.upgrade() else {
            break;
        };
        if window.closed.load(Ordering::Acquire) {
            break;
        }
        window.flush().await;
    }
    debug!("interval timer stopped");
}

/// Aggregates pushes per interval and publishes them on a channel.
///
/// Without a limit, a background task flushes every `duration`; with a
/// limit, a flush happens whenever a push takes the interval over it and no
/// timer runs. Every flush emits exactly one [`StatsMessage`]:
///
/// - the interval aggregate, if samples were pushed
/// - otherwise, with echo enabled, the flat copy of the last aggregate with
///   its time advanced by `duration` and `ok == true`
/// - otherwise a message with `ok == false`
///
/// The output channel holds a single message, so a slow consumer holds back
/// both pushes and the timer instead of messages being dropped.
#[derive(Debug)]
pub struct IntervalWindow {
    shared: Arc<Shared>,
}

impl IntervalWindow {
    /// Creates the window and, unless a limit is set, spawns its timer.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// If the window is timer driven and `duration` is zero.
    pub fn new(config: IntervalWindowConfig) -> (Self, mpsc::Receiver<StatsMessage>) {
        assert!(
            config.limit > 0 || !config.duration.is_zero(),
            "interval duration can not be zero"
        );
        let (tx, rx) = mpsc::channel(1);
        let now = Utc::now();
        let last_message = StatsMessage {
            ok: true,
            time: now,
            id: config.id.clone(),
            duration: config.duration,
            dim: config.dim,
            stats: (0..config.dim).map(|_| StreamStats::new()).collect(),
            data: vec![Data::default(); config.dim],
        };
        let period = config.duration;
        let timed = config.limit == 0;
        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(State {
                window: None,
                time: now,
                count: 0,
                last_message,
                tx: Some(tx),
            }),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });
        if timed {
            tokio::spawn(run(Arc::downgrade(&shared), period));
        }
        (Self { shared }, rx)
    }

    /// Returns the window configuration
    pub fn config(&self) -> &IntervalWindowConfig {
        &self.shared.config
    }

    /// Adds values to the current interval.
    ///
    /// The first sample of an interval sets the interval time. With a limit
    /// configured, the push that exceeds it flushes the interval.
    ///
    /// # Panics
    ///
    /// If `values.len()` differs from the configured dimension.
    pub async fn push(&self, t: DateTime<Utc>, values: &[f64]) {
        let config = &self.shared.config;
        let mut state = self.shared.state.lock().await;
        if state.window.is_none() {
            let size = config.duration.as_secs().max(1) as i64;
            state.window = Some(TumblingWindow::new(size, config.dim));
            state.time = t;
        }
        if let Some(window) = state.window.as_mut() {
            window.push(1, values);
        }
        state.count += 1;

        if config.limit > 0 && state.count > config.limit {
            self.shared.flush_locked(&mut state).await;
        }
    }

    /// Emits the current interval now, see [`IntervalWindow`] for the message contents.
    pub async fn flush(&self) {
        self.shared.flush().await;
    }

    /// Closes the output channel and stops the timer.
    ///
    /// A flush blocked on a consumer that stopped reading gives up its
    /// message, so closing never waits on the consumer. Messages already in
    /// the channel are still delivered. Pushes and flushes after closing
    /// emit nothing.
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.shutdown.notify_waiters();
        let mut state = self.shared.state.lock().await;
        state.tx = None;
    }
}
