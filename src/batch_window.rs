use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{IntervalWindow, IntervalWindowConfig, RingBuffer, StatsMessage};

/// An [`IntervalWindow`] that publishes its last `size` messages at once.
///
/// Each upstream message is appended to a ring of `size` messages and the
/// whole ring, oldest first, is sent downstream. The output closes once the
/// inner window is closed and its messages are relayed.
#[derive(Debug)]
pub struct BatchWindow {
    window: IntervalWindow,
    size: usize,
}

impl BatchWindow {
    /// Creates the window and spawns its relay task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// If `size` is zero, or for the same reasons as [`IntervalWindow::new`].
    pub fn new(config: IntervalWindowConfig, size: usize) -> (Self, mpsc::Receiver<Vec<StatsMessage>>) {
        let batch = RingBuffer::new(size);
        let (window, upstream) = IntervalWindow::new(config);
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(relay(upstream, tx, batch));
        (Self { window, size }, rx)
    }

    /// Returns the number of messages in a full batch
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the configuration of the inner window
    pub fn config(&self) -> &IntervalWindowConfig {
        self.window.config()
    }

    /// See [`IntervalWindow::push`]
    pub async fn push(&self, t: DateTime<Utc>, values: &[f64]) {
        self.window.push(t, values).await;
    }

    /// See [`IntervalWindow::flush`]
    pub async fn flush(&self) {
        self.window.flush().await;
    }

    /// See [`IntervalWindow::close`]
    pub async fn close(&self) {
        self.window.close().await;
    }
}

async fn relay(
    mut upstream: mpsc::Receiver<StatsMessage>,
    tx: mpsc::Sender<Vec<StatsMessage>>,
    mut batch: RingBuffer<StatsMessage>,
) {
    while let Some(message) = upstream.recv().await {
        batch.push(message);
        if tx.send(batch.get(StatsMessage::clone)).await.is_err() {
            debug!("batch consumer is gone");
            break;
        }
    }
    debug!(count = batch.count(), "batch relay stopped");
}
