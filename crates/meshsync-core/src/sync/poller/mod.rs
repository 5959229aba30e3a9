//! Remote zone polling.
//!
//! One `RemoteZonePoller` per remote zone. Each runs a single sequential loop
//! on its own task:
//!
//! 1. wait for the next tick (first tick fires immediately, ticks missed while
//!    a fetch was running are skipped, never queued)
//! 2. resolve the zone's peer pool and pick one peer at random
//! 3. fetch its state under a deadline
//! 4. emit the fresh state, or the last good one when the fetch failed
//!
//! A last good state older than `cache_duration` is dropped; the poller then
//! emits `None` once, telling consumers the zone has nothing to serve.
//!
//! Because the loop is sequential there is at most one fetch in flight per
//! zone and emissions are totally ordered. The last good state lives in the
//! loop itself, so nothing else can write it.

mod zones;

#[cfg(test)]
mod tests;

pub use zones::RemoteZones;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use meshsync_types::error::SyncError;
use meshsync_types::models::{MultiZoneState, SyncConfig, ZoneState};
use rand::Rng;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use super::latest::{latest_slot, LatestSender};
use super::metrics;
use super::source::{ControlPlaneClient, ControlPlaneInstanceFetcher, ZoneSource, ZoneStateChanges};
use super::task::AbortOnDrop;

/// Result of one tick.
#[derive(Debug)]
enum PollOutcome {
    Fetched(ZoneState),
    /// Discovery knows no peer for the zone right now
    NoInstances,
    /// Peer pool could not be resolved; the cache is not served
    Unresolved(SyncError),
    /// Peer did not deliver a state; the cache is served
    Failed(SyncError),
}

struct CachedState {
    state: ZoneState,
    stored_at: Instant,
}

pub struct RemoteZonePoller {
    zone: String,
    interval: Duration,
    request_timeout: Duration,
    cache_duration: Duration,
    fetcher: Arc<dyn ControlPlaneInstanceFetcher>,
    client: Arc<dyn ControlPlaneClient>,
}

impl RemoteZonePoller {
    pub fn new(
        zone: impl Into<String>,
        config: &SyncConfig,
        fetcher: Arc<dyn ControlPlaneInstanceFetcher>,
        client: Arc<dyn ControlPlaneClient>,
    ) -> Self {
        Self {
            zone: zone.into(),
            interval: config.polling_interval(),
            request_timeout: config.request_timeout(),
            cache_duration: config.cache_duration(),
            fetcher,
            client,
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Spawn the polling loop. Dropping (or cancelling) the returned stream stops it.
    pub fn start(self) -> ZoneStateStream {
        let zone = self.zone.clone();
        let (tx, rx) = latest_slot(format!("poller:{zone}"));
        let handle = tokio::spawn(self.run(tx));
        ZoneStateStream { zone, updates: rx.into_stream(), task: Some(AbortOnDrop(handle)) }
    }

    async fn run(self, tx: LatestSender<Option<ZoneState>>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cache: Option<CachedState> = None;

        info!(
            "[Sync] 🔄 Polling zone {} every {:?} (timeout {:?})",
            self.zone, self.interval, self.request_timeout
        );

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let started = Instant::now();
            // The fetch runs on its own task: if this loop is aborted mid-fetch the
            // call still completes, but its result has nowhere to go.
            let fetch = tokio::spawn(poll_zone(
                self.zone.clone(),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.client),
                self.request_timeout,
            ));
            let outcome = match fetch.await {
                Ok(outcome) => outcome,
                Err(e) => PollOutcome::Failed(SyncError::StateFetch {
                    zone: self.zone.clone(),
                    uri: String::new(),
                    message: format!("fetch task failed: {e}"),
                }),
            };
            metrics::record_sync_duration(&self.zone, started.elapsed());

            let emitted = match outcome {
                PollOutcome::Fetched(state) => {
                    metrics::record_sync_success(&self.zone);
                    debug!(
                        zone = %self.zone,
                        services = state.services_state.len(),
                        "[Sync] state fetched"
                    );
                    cache = Some(CachedState { state: state.clone(), stored_at: Instant::now() });
                    Some(Some(state))
                }
                PollOutcome::NoInstances => {
                    debug!(zone = %self.zone, "[Sync] no control plane instances, skipping tick");
                    self.expire(&mut cache)
                }
                PollOutcome::Unresolved(err) => {
                    metrics::record_sync_error(&err);
                    warn!(zone = %self.zone, "[Sync] {}", err);
                    self.expire(&mut cache)
                }
                PollOutcome::Failed(err) => {
                    metrics::record_sync_error(&err);
                    warn!(zone = %self.zone, "[Sync] {}", err);
                    match self.expire(&mut cache) {
                        Some(expired) => Some(expired),
                        None => cache.as_ref().map(|cached| Some(cached.state.clone())),
                    }
                }
            };

            if let Some(state) = emitted {
                if tx.send(state).is_err() {
                    break;
                }
            }
        }

        debug!(zone = %self.zone, "[Sync] poller stopped");
    }

    /// Drop the last good state once it is older than `cache_duration`.
    ///
    /// Returns `Some(None)` on the tick the entry expires, `None` otherwise.
    fn expire(&self, cache: &mut Option<CachedState>) -> Option<Option<ZoneState>> {
        let expired = cache.as_ref().is_some_and(|c| c.stored_at.elapsed() >= self.cache_duration);
        if !expired {
            return None;
        }
        *cache = None;
        info!(zone = %self.zone, "[Sync] last good state expired after {:?}, zone dropped", self.cache_duration);
        Some(None)
    }
}

async fn poll_zone(
    zone: String,
    fetcher: Arc<dyn ControlPlaneInstanceFetcher>,
    client: Arc<dyn ControlPlaneClient>,
    request_timeout: Duration,
) -> PollOutcome {
    let instances = match fetcher.instances(&zone).await {
        Ok(instances) => instances,
        Err(e) => {
            return PollOutcome::Unresolved(SyncError::InstanceResolution {
                zone,
                message: e.to_string(),
            })
        }
    };

    let Some(uri) = choose_instance(&instances) else {
        return PollOutcome::NoInstances;
    };

    let timeout_ms = u64::try_from(request_timeout.as_millis()).unwrap_or(u64::MAX);
    match tokio::time::timeout(request_timeout, client.get_state(uri)).await {
        Ok(Ok(state)) => {
            PollOutcome::Fetched(ZoneState::remote(state.remove_services_without_instances(), zone))
        }
        Ok(Err(e)) if e.is_timeout() => PollOutcome::Failed(SyncError::Timeout { zone, timeout_ms }),
        Ok(Err(e)) => PollOutcome::Failed(SyncError::StateFetch {
            zone,
            uri: uri.to_string(),
            message: e.to_string(),
        }),
        Err(_) => PollOutcome::Failed(SyncError::Timeout { zone, timeout_ms }),
    }
}

/// Uniformly random peer; no stickiness.
fn choose_instance(instances: &[Url]) -> Option<&Url> {
    if instances.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..instances.len());
    instances.get(idx)
}

/// Output of a running poller.
///
/// `Some` carries a fresh or cached zone state; `None` means the cached state
/// expired and the zone currently has nothing to serve.
pub struct ZoneStateStream {
    zone: String,
    updates: BoxStream<'static, Option<ZoneState>>,
    task: Option<AbortOnDrop<()>>,
}

impl ZoneStateStream {
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Stop the poller. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            drop(task);
            metrics::record_sync_cancelled(&self.zone);
            warn!(zone = %self.zone, "[Sync] Cancelling cross-zone sync");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_none()
    }
}

impl Stream for ZoneStateStream {
    type Item = Option<ZoneState>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.task.is_none() {
            return Poll::Ready(None);
        }
        this.updates.poll_next_unpin(cx)
    }
}

impl Drop for ZoneStateStream {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Aggregator source backed by one remote zone poller.
///
/// Starts with an empty state so the aggregator's cold-start gate never waits
/// on a zone that cannot be reached, then emits only changed values. An
/// expired zone goes back to the empty state.
pub struct RemoteZoneStateChanges {
    poller: RemoteZonePoller,
}

impl RemoteZoneStateChanges {
    pub fn new(poller: RemoteZonePoller) -> Self {
        Self { poller }
    }
}

impl ZoneStateChanges for RemoteZoneStateChanges {
    fn into_source(self) -> ZoneSource {
        let name = format!("remote:{}", self.poller.zone());
        let poller = self.poller;

        ZoneSource::new(
            name,
            async_stream::stream! {
                let mut updates = poller.start();
                let mut last = MultiZoneState::empty();
                yield Ok(last.clone());

                while let Some(update) = updates.next().await {
                    let next = update.map_or_else(MultiZoneState::empty, MultiZoneState::from);
                    if next != last {
                        last = next.clone();
                        yield Ok(next);
                    }
                }
            },
        )
    }
}
