use super::*;
use crate::sync::source::BoxError;
use async_trait::async_trait;
use meshsync_client::ClientError;
use meshsync_types::models::{ServiceInstance, ServiceInstances, ServicesState};
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone)]
enum Step {
    State(ServicesState),
    Delayed(Duration, ServicesState),
    Error,
}

/// Scripted peer: plays `script` in order, then repeats `fallback` forever.
struct FakeClient {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    uris: Mutex<BTreeSet<String>>,
}

impl FakeClient {
    fn new(script: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            uris: Mutex::new(BTreeSet::new()),
        })
    }
}

#[async_trait]
impl ControlPlaneClient for FakeClient {
    async fn get_state(&self, uri: &Url) -> Result<ServicesState, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uris.lock().insert(uri.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let step = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        let result = match step {
            Step::State(state) => Ok(state),
            Step::Delayed(delay, state) => {
                tokio::time::sleep(delay).await;
                Ok(state)
            }
            Step::Error => Err(ClientError::Connection("connection refused".to_string())),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Peer pool that succeeds `ok_calls` times, then fails.
struct FakeFetcher {
    uris: Vec<Url>,
    ok_calls: usize,
    calls: AtomicUsize,
}

impl FakeFetcher {
    fn healthy(uris: &[&str]) -> Arc<Self> {
        Self::failing_after(uris, usize::MAX)
    }

    fn failing_after(uris: &[&str], ok_calls: usize) -> Arc<Self> {
        Arc::new(Self {
            uris: uris.iter().filter_map(|u| Url::parse(u).ok()).collect(),
            ok_calls,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ControlPlaneInstanceFetcher for FakeFetcher {
    async fn instances(&self, _zone: &str) -> Result<Vec<Url>, BoxError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.ok_calls {
            return Err("discovery unavailable".into());
        }
        Ok(self.uris.clone())
    }
}

fn state_with(service: &str) -> ServicesState {
    std::iter::once(ServiceInstances::new(
        service,
        vec![ServiceInstance::new(format!("{service}-1"), "10.0.0.1", 8080, ["lorem"])],
    ))
    .collect()
}

fn config(timeout_ms: u64) -> SyncConfig {
    SyncConfig {
        enabled: true,
        connection_timeout_ms: timeout_ms / 2,
        read_timeout_ms: timeout_ms / 2,
        ..SyncConfig::default()
    }
}

fn service_names(state: &ZoneState) -> Vec<String> {
    state.services_state.service_names().cloned().collect()
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_is_immediate() {
    let client = FakeClient::new(vec![], Step::State(state_with("echo")));
    let poller =
        RemoteZonePoller::new("dc2", &config(1000), FakeFetcher::healthy(&["http://a"]), client);

    let mut stream = poller.start();
    let state = tokio::time::timeout(Duration::from_millis(10), stream.next())
        .await
        .unwrap()
        .flatten()
        .unwrap();

    assert_eq!(state.zone, "dc2");
    assert_eq!(state.locality, meshsync_types::models::Locality::Remote);
    assert_eq!(service_names(&state), vec!["echo"]);
}

#[tokio::test(start_paused = true)]
async fn test_serves_cached_state_when_fetch_fails() {
    let client = FakeClient::new(vec![Step::State(state_with("echo"))], Step::Error);
    let poller = RemoteZonePoller::new(
        "dc2",
        &config(1000),
        FakeFetcher::healthy(&["http://a"]),
        Arc::clone(&client) as Arc<dyn ControlPlaneClient>,
    );

    let mut stream = poller.start();
    for _ in 0..5 {
        let state = stream.next().await.flatten().unwrap();
        assert_eq!(service_names(&state), vec!["echo"]);
    }
    assert!(client.calls.load(Ordering::SeqCst) >= 5);
}

#[tokio::test(start_paused = true)]
async fn test_cache_expires() {
    let client = FakeClient::new(vec![Step::State(state_with("echo"))], Step::Error);
    let sync = SyncConfig { cache_duration_secs: 3, ..config(1000) };
    let poller = RemoteZonePoller::new("dc2", &sync, FakeFetcher::healthy(&["http://a"]), client);

    let mut stream = poller.start();
    let mut updates = Vec::new();
    while let Ok(Some(update)) = tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
        updates.push(update);
    }

    // fresh state at t=0, cached copies at t=1 and t=2, expiry marker at t=3
    assert_eq!(updates.len(), 4);
    assert!(updates[..3].iter().all(Option::is_some));
    assert_eq!(updates[3], None);
}

#[tokio::test(start_paused = true)]
async fn test_expired_zone_leaves_combined_state() {
    use crate::sync::aggregator::StateAggregator;
    use crate::sync::source::ZoneSource;

    let client = FakeClient::new(vec![Step::State(state_with("echo"))], Step::Error);
    let sync = SyncConfig { cache_duration_secs: 3, ..config(1000) };
    let poller = RemoteZonePoller::new("dc2", &sync, FakeFetcher::healthy(&["http://a"]), client);
    let local = ZoneSource::new(
        "local",
        futures::stream::once(async { Ok(MultiZoneState::from(ZoneState::local(state_with("billing"), "dc1"))) })
            .chain(futures::stream::pending()),
    );

    let mut combined = StateAggregator::default()
        .combine(vec![local, RemoteZoneStateChanges::new(poller).into_source()]);

    let mut seen = Vec::new();
    while let Ok(Some(state)) = tokio::time::timeout(Duration::from_secs(10), combined.next()).await {
        seen.push(state.zone_names().map(ToString::to_string).collect::<Vec<_>>());
    }

    assert!(seen.contains(&vec!["dc1".to_string(), "dc2".to_string()]));
    assert_eq!(seen.last().unwrap(), &vec!["dc1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_no_emission_without_a_successful_poll() {
    let client = FakeClient::new(vec![], Step::Error);
    let poller = RemoteZonePoller::new(
        "dc2",
        &config(1000),
        FakeFetcher::healthy(&["http://a"]),
        Arc::clone(&client) as Arc<dyn ControlPlaneClient>,
    );

    let mut stream = poller.start();
    assert!(tokio::time::timeout(Duration::from_secs(5), stream.next()).await.is_err());
    assert!(client.calls.load(Ordering::SeqCst) >= 5);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out_and_next_tick_retries() {
    let client = FakeClient::new(
        vec![Step::Delayed(Duration::from_secs(10), state_with("stale"))],
        Step::State(state_with("fresh")),
    );
    let poller =
        RemoteZonePoller::new("dc2", &config(1000), FakeFetcher::healthy(&["http://a"]), client);

    let mut stream = poller.start();
    let state = tokio::time::timeout(Duration::from_secs(3), stream.next()).await.unwrap().flatten().unwrap();
    assert_eq!(service_names(&state), vec!["fresh"]);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_ticks_are_dropped() {
    let client = FakeClient::new(vec![], Step::Delayed(Duration::from_millis(3500), state_with("echo")));
    let poller = RemoteZonePoller::new(
        "dc2",
        &config(20_000),
        FakeFetcher::healthy(&["http://a"]),
        Arc::clone(&client) as Arc<dyn ControlPlaneClient>,
    );

    let _stream = poller.start();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);
    // fetches start at t=0, t=4 and t=8; ticks in between are skipped
    assert_eq!(client.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_resolution_failure_contributes_nothing() {
    let client = FakeClient::new(vec![], Step::State(state_with("echo")));
    let fetcher = FakeFetcher::failing_after(&["http://a"], 1);
    let poller = RemoteZonePoller::new(
        "dc2",
        &config(1000),
        Arc::clone(&fetcher) as Arc<dyn ControlPlaneInstanceFetcher>,
        client,
    );

    let mut stream = poller.start();
    assert!(stream.next().await.is_some());
    assert!(tokio::time::timeout(Duration::from_secs(5), stream.next()).await.is_err());
    assert!(fetcher.calls.load(Ordering::SeqCst) > 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_pool_skips_tick() {
    let client = FakeClient::new(vec![], Step::State(state_with("echo")));
    let poller = RemoteZonePoller::new(
        "dc2",
        &config(1000),
        FakeFetcher::healthy(&[]),
        Arc::clone(&client) as Arc<dyn ControlPlaneClient>,
    );

    let mut stream = poller.start();
    assert!(tokio::time::timeout(Duration::from_secs(3), stream.next()).await.is_err());
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_services_without_instances_are_dropped() {
    let mut state = state_with("echo");
    state.add("idle");
    let client = FakeClient::new(vec![], Step::State(state));
    let poller =
        RemoteZonePoller::new("dc2", &config(1000), FakeFetcher::healthy(&["http://a"]), client);

    let mut stream = poller.start();
    let state = stream.next().await.flatten().unwrap();
    assert_eq!(service_names(&state), vec!["echo"]);
}

#[tokio::test(start_paused = true)]
async fn test_peers_chosen_at_random() {
    let client = FakeClient::new(vec![], Step::State(state_with("echo")));
    let poller = RemoteZonePoller::new(
        "dc2",
        &config(1000),
        FakeFetcher::healthy(&["http://a", "http://b"]),
        Arc::clone(&client) as Arc<dyn ControlPlaneClient>,
    );

    let _stream = poller.start();
    tokio::time::sleep(Duration::from_secs(40)).await;

    assert_eq!(client.uris.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_is_idempotent_and_discards_in_flight_result() {
    let client = FakeClient::new(vec![], Step::Delayed(Duration::from_secs(2), state_with("echo")));
    let poller = RemoteZonePoller::new(
        "dc2",
        &config(20_000),
        FakeFetcher::healthy(&["http://a"]),
        Arc::clone(&client) as Arc<dyn ControlPlaneClient>,
    );

    let mut stream = poller.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);

    stream.cancel();
    stream.cancel();
    assert!(stream.is_cancelled());

    tokio::time::sleep(Duration::from_secs(5)).await;
    // the in-flight call ran to completion, nothing new was started
    assert_eq!(client.completed.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_remote_source_starts_empty_and_skips_repeats() {
    let client = FakeClient::new(vec![Step::State(state_with("echo"))], Step::Error);
    let poller =
        RemoteZonePoller::new("dc2", &config(1000), FakeFetcher::healthy(&["http://a"]), client);

    let source = RemoteZoneStateChanges::new(poller).into_source();
    assert_eq!(source.name(), "remote:dc2");
    let (_, mut stream) = source.into_parts();

    assert_eq!(stream.next().await.unwrap().unwrap(), MultiZoneState::empty());
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.zone_names().collect::<Vec<_>>(), vec!["dc2"]);

    // cached repeats of the same state are not re-emitted
    assert!(tokio::time::timeout(Duration::from_secs(5), stream.next()).await.is_err());
}
