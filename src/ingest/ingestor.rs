use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use utoipa::ToSchema;

use crate::trail::{Advisory, CacheError, Fix, TrailCache};

use super::source::SourceEvent;
use super::throttle::Throttle;

/// Live view of the ingest worker, republished on every source event.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct IngestStatus {
    /// Latest fix seen, whether or not it was persisted.
    pub live: Option<Fix>,
    /// Fixes admitted to the trail by the write throttle.
    pub admitted: u64,
    /// Fixes dropped by the write throttle.
    pub dropped: u64,
    pub advisory: Option<Advisory>,
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Owns the subscription from the fix source into the trail cache: admits
/// at most one append per write window and surfaces everything else on the
/// live status path.
pub struct Ingestor {
    worker: Option<WorkerHandle>,
}

impl Ingestor {
    /// Spawn the ingest worker. The returned receiver observes
    /// [`IngestStatus`] updates, starting from `IngestStatus::default()`.
    pub fn spawn(
        cache: Arc<TrailCache>,
        events: mpsc::Receiver<SourceEvent>,
        write_window: Duration,
    ) -> (Self, watch::Receiver<IngestStatus>) {
        let (status_tx, status_rx) = watch::channel(IngestStatus::default());
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_ingest_loop(
            cache,
            events,
            write_window,
            status_tx,
            stop_rx,
        ));

        (
            Ingestor {
                worker: Some(WorkerHandle { stop_tx, join }),
            },
            status_rx,
        )
    }

    /// Unsubscribe from the source. Idempotent; no appends are issued
    /// after this returns.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }
}

async fn run_ingest_loop(
    cache: Arc<TrailCache>,
    mut events: mpsc::Receiver<SourceEvent>,
    write_window: Duration,
    status_tx: watch::Sender<IngestStatus>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut throttle = Throttle::new(write_window);
    let mut status = IngestStatus::default();

    loop {
        let event = tokio::select! {
            _ = &mut stop_rx => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break, // source closed
            },
        };

        match event {
            SourceEvent::Fix(fix) => {
                status.live = Some(fix.clone());
                if throttle.admit(Instant::now()) {
                    status.admitted += 1;
                    match cache.try_append(fix).await {
                        Ok(_) => status.advisory = None,
                        Err(e) => {
                            // Cadence is unaffected; only this write is lost.
                            log::warn!("admitted fix was not cached: {}", e);
                            status.advisory = Some(append_advisory(&e));
                        }
                    }
                } else {
                    status.dropped += 1;
                    log::debug!("fix dropped by write throttle");
                }
            }
            SourceEvent::Error(message) => {
                log::warn!("fix source error: {}", message);
                status.advisory = Some(Advisory::Source(message));
            }
        }

        let _ = status_tx.send(status.clone());
    }
}

fn append_advisory(e: &CacheError) -> Advisory {
    match e {
        CacheError::Unavailable => Advisory::StoreUnavailable,
        _ => Advisory::CacheWriteFailed,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::time::advance;

    use super::*;
    use crate::ingest::throttle::WRITE_WINDOW;
    use crate::store::{KvStore, MemoryStore, StoreError};

    struct RejectingStore;

    #[async_trait]
    impl KvStore for RejectingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("set rejected".into()))
        }
    }

    fn fix(n: i64) -> Fix {
        Fix {
            latitude: 48.2,
            longitude: 16.37,
            altitude: None,
            accuracy: None,
            timestamp: n,
        }
    }

    /// Let the worker drain its queue under the paused clock.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn spawn_over_memory() -> (
        Arc<TrailCache>,
        mpsc::Sender<SourceEvent>,
        Ingestor,
        watch::Receiver<IngestStatus>,
    ) {
        let cache = Arc::new(TrailCache::new(Some(Arc::new(MemoryStore::new()))));
        let (tx, rx) = mpsc::channel(64);
        let (ingestor, status_rx) = Ingestor::spawn(cache.clone(), rx, WRITE_WINDOW);
        (cache, tx, ingestor, status_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_one_window_caches_one_fix() {
        let (cache, tx, mut ingestor, status_rx) = spawn_over_memory();

        for n in 0..50i64 {
            tx.send(SourceEvent::Fix(fix(n))).await.unwrap();
            settle().await;
            advance(Duration::from_millis(100)).await;
        }

        assert_eq!(cache.read().await.len(), 1);
        let status = status_rx.borrow().clone();
        assert_eq!(status.admitted, 1);
        assert_eq!(status.dropped, 49);
        assert_eq!(status.live.unwrap().timestamp, 49);

        ingestor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn admits_again_after_the_window_elapses() {
        let (cache, tx, mut ingestor, _status_rx) = spawn_over_memory();

        tx.send(SourceEvent::Fix(fix(1))).await.unwrap();
        settle().await;
        advance(Duration::from_millis(4_900)).await;

        tx.send(SourceEvent::Fix(fix(2))).await.unwrap();
        settle().await;
        advance(Duration::from_millis(200)).await;

        tx.send(SourceEvent::Fix(fix(3))).await.unwrap();
        settle().await;

        let stamps: Vec<i64> = cache.read().await.iter().map(|f| f.timestamp).collect();
        assert_eq!(stamps, vec![3, 1]);

        ingestor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_fix_is_admitted_no_matter_how_long_idle() {
        let (cache, tx, mut ingestor, _status_rx) = spawn_over_memory();

        advance(Duration::from_secs(3600)).await;
        tx.send(SourceEvent::Fix(fix(9))).await.unwrap();
        settle().await;

        assert_eq!(cache.read().await.len(), 1);
        ingestor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn downstream_failure_reports_advisory_and_keeps_cadence() {
        let cache = Arc::new(TrailCache::new(Some(Arc::new(RejectingStore))));
        let (tx, rx) = mpsc::channel(64);
        let (mut ingestor, status_rx) = Ingestor::spawn(cache, rx, WRITE_WINDOW);

        tx.send(SourceEvent::Fix(fix(1))).await.unwrap();
        settle().await;

        let status = status_rx.borrow().clone();
        assert_eq!(status.admitted, 1);
        assert_eq!(status.advisory, Some(Advisory::CacheWriteFailed));

        advance(Duration::from_millis(5_100)).await;
        tx.send(SourceEvent::Fix(fix(2))).await.unwrap();
        settle().await;

        // Still admitting on schedule after the failure.
        let status = status_rx.borrow().clone();
        assert_eq!(status.admitted, 2);
        assert_eq!(status.advisory, Some(Advisory::CacheWriteFailed));

        ingestor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn absent_store_reports_unavailable_advisory() {
        let cache = Arc::new(TrailCache::new(None));
        let (tx, rx) = mpsc::channel(64);
        let (mut ingestor, status_rx) = Ingestor::spawn(cache.clone(), rx, WRITE_WINDOW);

        tx.send(SourceEvent::Fix(fix(1))).await.unwrap();
        settle().await;

        let status = status_rx.borrow().clone();
        assert_eq!(status.advisory, Some(Advisory::StoreUnavailable));
        assert_eq!(status.live.unwrap().timestamp, 1);
        assert!(cache.read().await.is_empty());

        ingestor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn source_errors_surface_unchanged_and_do_not_persist() {
        let (cache, tx, mut ingestor, status_rx) = spawn_over_memory();

        tx.send(SourceEvent::Error("gps permission denied".into()))
            .await
            .unwrap();
        settle().await;

        let status = status_rx.borrow().clone();
        assert_eq!(
            status.advisory,
            Some(Advisory::Source("gps permission denied".into()))
        );
        assert!(cache.read().await.is_empty());

        // A later successful append clears the advisory.
        tx.send(SourceEvent::Fix(fix(1))).await.unwrap();
        settle().await;
        assert_eq!(status_rx.borrow().advisory, None);

        ingestor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_halts_appends() {
        let (cache, tx, mut ingestor, _status_rx) = spawn_over_memory();

        tx.send(SourceEvent::Fix(fix(1))).await.unwrap();
        settle().await;
        assert_eq!(cache.read().await.len(), 1);

        ingestor.stop().await;
        ingestor.stop().await;

        advance(Duration::from_secs(30)).await;
        assert!(tx.send(SourceEvent::Fix(fix(2))).await.is_err());
        assert_eq!(cache.read().await.len(), 1);
    }
}
