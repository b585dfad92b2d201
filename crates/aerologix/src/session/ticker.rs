//! Periodic recomputation of elapsed session time.
//!
//! The ticker is an owned resource: it is acquired when live feedback is
//! wanted and released by [`Ticker::stop`] or by dropping it. Each tick
//! refreshes every active session and sends the snapshot to the receiver.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::{FlightSession, SessionTracker};

/// Default interval between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// A running tick task.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a task that ticks `tracker` every `period` and forwards snapshots.
    ///
    /// The first tick fires immediately. The task ends when the ticker is
    /// stopped or dropped, or when `tx`'s receiver goes away.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(
        tracker: SessionTracker,
        period: Duration,
        tx: mpsc::Sender<Vec<FlightSession>>,
    ) -> Self {
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let snapshot = tracker.tick();
                trace!("Tick with {} active session(s)", snapshot.len());
                if tx.send(snapshot).await.is_err() {
                    debug!("Tick receiver closed, stopping ticker");
                    break;
                }
            }
        });

        Self {
            period,
            handle: Some(handle),
        }
    }

    /// Interval between ticks.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Check if the tick task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking and wait for the task to end.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            debug!("Ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SubmissionFlow;

    const FAST: Duration = Duration::from_millis(5);

    async fn recv(rx: &mut mpsc::Receiver<Vec<FlightSession>>) -> Vec<FlightSession> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("tick did not arrive")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_ticker_delivers_snapshots() {
        let tracker = SessionTracker::new();
        tracker.start("C-GABC", SubmissionFlow::Owner).unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let ticker = Ticker::spawn(tracker.clone(), FAST, tx);
        assert!(ticker.is_running());
        assert_eq!(ticker.period(), FAST);

        let snapshot = recv(&mut rx).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].aircraft_id, "C-GABC");
        assert_eq!(snapshot[0].elapsed_minutes, 0);

        ticker.stop().await;
    }

    #[tokio::test]
    async fn test_ticker_sees_sessions_started_later() {
        let tracker = SessionTracker::new();
        let (tx, mut rx) = mpsc::channel(4);
        let ticker = Ticker::spawn(tracker.clone(), FAST, tx);

        assert!(recv(&mut rx).await.is_empty());
        tracker.start("C-FXYZ", SubmissionFlow::Owner).unwrap();

        loop {
            if !recv(&mut rx).await.is_empty() {
                break;
            }
        }
        ticker.stop().await;
    }

    #[tokio::test]
    async fn test_ticker_ends_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let ticker = Ticker::spawn(SessionTracker::new(), FAST, tx);
        drop(rx);

        tokio::time::timeout(Duration::from_secs(2), async {
            while ticker.is_running() {
                tokio::time::sleep(FAST).await;
            }
        })
        .await
        .expect("ticker kept running");
    }

    #[tokio::test]
    async fn test_stop_closes_channel() {
        let (tx, mut rx) = mpsc::channel(16);
        let ticker = Ticker::spawn(SessionTracker::new(), FAST, tx);
        let _ = recv(&mut rx).await;

        ticker.stop().await;
        // Drain whatever was buffered; the sender is gone once the task ends.
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_drop_stops_ticker() {
        let (tx, mut rx) = mpsc::channel(16);
        let ticker = Ticker::spawn(SessionTracker::new(), FAST, tx);
        let _ = recv(&mut rx).await;

        drop(ticker);
        tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await
        .expect("channel stayed open after drop");
    }

    #[tokio::test]
    async fn test_zero_period_is_clamped() {
        let (tx, _rx) = mpsc::channel(1);
        let ticker = Ticker::spawn(SessionTracker::new(), Duration::ZERO, tx);
        assert_eq!(ticker.period(), Duration::from_millis(1));
    }
}
