//! Supervised station feed.
//!
//! Holds the latest station list and keeps it fresh with a background task
//! that polls the backend on a fixed interval. Pages can also ask for an
//! immediate refresh after an action that changes station counters.
//!
//! Fetches can overlap (a slow poll and an on-demand refresh, say). Each one
//! draws a sequence number before it starts, and its result is applied only
//! if nothing newer has been applied since, so a slow response never
//! clobbers a fresher one. Dropping or shutting down the [`FeedSupervisor`]
//! aborts the polling task together with any fetch it has in flight.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::domain::{Station, StationId};

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Somewhere stations can be fetched from.
pub trait StationSource: Send + Sync + 'static {
    fn fetch_stations(&self) -> impl Future<Output = Result<Vec<Station>, ApiError>> + Send;
}

impl StationSource for ApiClient {
    fn fetch_stations(&self) -> impl Future<Output = Result<Vec<Station>, ApiError>> + Send {
        ApiClient::fetch_stations(self)
    }
}

/// The station list as of one applied fetch.
#[derive(Debug, Clone, Default)]
pub struct StationSnapshot {
    pub stations: Arc<Vec<Station>>,
    /// When the applied fetch completed; `None` before the first one.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Sequence number of the applied fetch; 0 before the first one.
    pub sequence: u64,
}

impl StationSnapshot {
    pub fn is_loaded(&self) -> bool {
        self.sequence > 0
    }

    pub fn find(&self, id: &StationId) -> Option<&Station> {
        self.stations.iter().find(|s| &s.id == id)
    }
}

/// What happened to a refresh's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The result replaced the snapshot; carries the station count.
    Applied(usize),
    /// A newer result had already been applied; this one was discarded.
    Stale,
}

struct FeedInner<S> {
    source: S,
    snapshot: RwLock<StationSnapshot>,
    next_sequence: AtomicU64,
}

/// Shared, periodically refreshed station list.
pub struct StationFeed<S = ApiClient> {
    inner: Arc<FeedInner<S>>,
}

impl<S> Clone for StationFeed<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StationSource> StationFeed<S> {
    /// Create an empty feed. Nothing is fetched until [`refresh`](Self::refresh)
    /// or [`spawn`](Self::spawn) is called.
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                source,
                snapshot: RwLock::new(StationSnapshot::default()),
                next_sequence: AtomicU64::new(0),
            }),
        }
    }

    /// The latest applied snapshot.
    pub async fn snapshot(&self) -> StationSnapshot {
        self.inner.snapshot.read().await.clone()
    }

    /// Fetch stations now.
    ///
    /// On failure the current snapshot is kept and the error returned.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let stations = self.inner.source.fetch_stations().await?;

        let mut guard = self.inner.snapshot.write().await;
        if sequence <= guard.sequence {
            debug!(sequence, applied = guard.sequence, "discarding stale station response");
            return Ok(RefreshOutcome::Stale);
        }

        let count = stations.len();
        *guard = StationSnapshot {
            stations: Arc::new(stations),
            fetched_at: Some(Utc::now()),
            sequence,
        };
        Ok(RefreshOutcome::Applied(count))
    }

    /// Start polling every `interval`, beginning immediately.
    pub fn spawn(&self, interval: Duration) -> FeedSupervisor {
        let feed = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match feed.refresh().await {
                    Ok(RefreshOutcome::Applied(count)) => {
                        debug!(count, "refreshed stations")
                    }
                    Ok(RefreshOutcome::Stale) => {}
                    Err(e) => warn!(error = %e, "station refresh failed"),
                }
            }
        });

        info!(interval_secs = interval.as_secs_f64(), "station feed started");
        FeedSupervisor {
            handle: Some(handle),
        }
    }
}

/// Owns a feed's polling task.
///
/// The task stops when this is dropped or [`shutdown`](Self::shutdown).
pub struct FeedSupervisor {
    handle: Option<JoinHandle<()>>,
}

impl FeedSupervisor {
    /// Stop polling and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Aborted tasks resolve to a cancellation error; that is the expected outcome
            let _ = handle.await;
            info!("station feed stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for FeedSupervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
