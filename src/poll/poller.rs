use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use utoipa::ToSchema;

use crate::trail::{Advisory, CacheError, Fix, TrailCache};

pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Most recent full view of the trail. Each poll replaces the previous
/// snapshot wholesale; consumers never see partial updates.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TrailSnapshot {
    /// Newest first.
    pub fixes: Vec<Fix>,
    pub advisory: Option<Advisory>,
    /// `None` until the first poll has completed.
    pub polled_at: Option<DateTime<Utc>>,
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Rereads the trail on a fixed cadence and publishes each snapshot over
/// a watch channel. Polls once immediately on spawn.
pub struct Poller {
    worker: Option<WorkerHandle>,
}

impl Poller {
    pub fn spawn(
        cache: Arc<TrailCache>,
        poll_interval: Duration,
    ) -> (Self, watch::Receiver<TrailSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(TrailSnapshot::default());
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_poll_loop(cache, poll_interval, snapshot_tx, stop_rx));

        (
            Poller {
                worker: Some(WorkerHandle { stop_tx, join }),
            },
            snapshot_rx,
        )
    }

    /// Halt polling. Idempotent; the pending tick is released, not awaited.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }
}

async fn run_poll_loop(
    cache: Arc<TrailCache>,
    poll_interval: Duration,
    snapshot_tx: watch::Sender<TrailSnapshot>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        let snapshot = poll_once(&cache).await;
        if snapshot_tx.send(snapshot).is_err() {
            break;
        }

        tokio::select! {
            _ = &mut stop_rx => break,
            // No consumers left means no reason to keep the timer alive.
            _ = snapshot_tx.closed() => break,
            _ = sleep(poll_interval) => {}
        }
    }
}

async fn poll_once(cache: &TrailCache) -> TrailSnapshot {
    let (fixes, advisory) = match cache.try_read().await {
        Ok(fixes) => (fixes, None),
        Err(CacheError::Unavailable) => (Vec::new(), Some(Advisory::StoreUnavailable)),
        Err(e) => {
            log::warn!("trail poll degraded to empty: {}", e);
            (Vec::new(), None)
        }
    };

    TrailSnapshot {
        fixes,
        advisory,
        polled_at: Some(Utc::now()),
    }
}
