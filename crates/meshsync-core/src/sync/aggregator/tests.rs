use super::*;
use meshsync_types::error::SyncError;
use meshsync_types::models::{ServiceInstance, ServiceInstances, ServicesState, ZoneState};
use std::time::Duration;

const QUIET: Duration = Duration::from_secs(1);

fn zone_state(zone: &str, service: &str, local: bool) -> MultiZoneState {
    let services: ServicesState = std::iter::once(ServiceInstances::new(
        service,
        vec![ServiceInstance::new(format!("{service}-1"), "10.0.0.1", 8080, ["lorem"])],
    ))
    .collect();
    let state = if local {
        ZoneState::local(services, zone)
    } else {
        ZoneState::remote(services, zone)
    };
    MultiZoneState::from(state)
}

fn channel_source(name: &str) -> (mpsc::Sender<SourceItem>, ZoneSource) {
    let (tx, rx) = mpsc::channel(16);
    (tx, ZoneSource::new(name, ReceiverStream::new(rx)))
}

fn services_in(state: &MultiZoneState, zone: &str) -> Vec<String> {
    state
        .zone(zone)
        .map(|z| z.services_state.service_names().cloned().collect())
        .unwrap_or_default()
}

async fn quiet(stream: &mut MultiZoneStream) -> bool {
    tokio::time::timeout(QUIET, stream.next()).await.is_err()
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_every_source_before_emitting() {
    let (local_tx, local) = channel_source("local");
    let (remote_tx, remote) = channel_source("remote:dc2");
    let mut combined = StateAggregator::default().combine(vec![local, remote]);

    local_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    assert!(quiet(&mut combined).await);

    remote_tx.send(Ok(zone_state("dc2", "echo", false))).await.unwrap();
    let state = combined.next().await.unwrap();

    assert_eq!(state.zone_names().collect::<Vec<_>>(), vec!["dc1", "dc2"]);
}

#[tokio::test(start_paused = true)]
async fn test_each_change_uses_latest_of_other_sources() {
    let (local_tx, local) = channel_source("local");
    let (remote_tx, remote) = channel_source("remote:dc2");
    let mut combined = StateAggregator::default().combine(vec![local, remote]);

    local_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    remote_tx.send(Ok(zone_state("dc2", "echo", false))).await.unwrap();
    combined.next().await.unwrap();

    remote_tx.send(Ok(zone_state("dc2", "billing", false))).await.unwrap();
    let state = combined.next().await.unwrap();

    assert_eq!(services_in(&state, "dc1"), vec!["echo"]);
    assert_eq!(services_in(&state, "dc2"), vec!["billing"]);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_state_not_reemitted() {
    let (local_tx, local) = channel_source("local");
    let (remote_tx, remote) = channel_source("remote:dc2");
    let mut combined = StateAggregator::default().combine(vec![local, remote]);

    local_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    remote_tx.send(Ok(zone_state("dc2", "echo", false))).await.unwrap();
    combined.next().await.unwrap();

    local_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    remote_tx.send(Ok(zone_state("dc2", "echo", false))).await.unwrap();

    assert!(quiet(&mut combined).await);
}

#[tokio::test(start_paused = true)]
async fn test_source_error_is_not_propagated() {
    let (local_tx, local) = channel_source("local");
    let (remote_tx, remote) = channel_source("remote:dc2");
    let mut combined = StateAggregator::default().combine(vec![local, remote]);

    local_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    remote_tx
        .send(Err(SyncError::SourceFault {
            source_name: "remote:dc2".to_string(),
            message: "boom".to_string(),
        }))
        .await
        .unwrap();
    remote_tx.send(Ok(zone_state("dc2", "echo", false))).await.unwrap();

    let state = combined.next().await.unwrap();
    assert_eq!(state.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_silent_zone_does_not_block_healthy_ones() {
    let (local_tx, local) = channel_source("local");
    // what a remote source looks like before its zone ever answers
    let unreachable = ZoneSource::new(
        "remote:dc3",
        futures::stream::once(async { Ok(MultiZoneState::empty()) }).chain(futures::stream::pending()),
    );
    let (remote_tx, remote) = channel_source("remote:dc2");
    let mut combined = StateAggregator::default().combine(vec![local, unreachable, remote]);

    local_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    remote_tx.send(Ok(zone_state("dc2", "echo", false))).await.unwrap();

    let state = combined.next().await.unwrap();
    assert_eq!(state.zone_names().collect::<Vec<_>>(), vec!["dc1", "dc2"]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_sources_leave_stream_open() {
    let (local_tx, local) = channel_source("local");
    let mut combined = StateAggregator::default().combine(vec![local]);

    local_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    drop(local_tx);

    assert!(combined.next().await.is_some());
    assert!(quiet(&mut combined).await);
    assert!(!combined.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_burst_on_one_source_does_not_starve_another() {
    let (fast_tx, fast) = channel_source("local");
    let (slow_tx, slow) = channel_source("remote:dc2");
    let mut combined = StateAggregator::default().combine(vec![fast, slow]);

    slow_tx.send(Ok(zone_state("dc2", "before", false))).await.unwrap();
    let burst = tokio::spawn(async move {
        for i in 0..500 {
            if fast_tx.send(Ok(zone_state("dc1", &format!("v{i}"), true))).await.is_err() {
                break;
            }
        }
        fast_tx
    });
    slow_tx.send(Ok(zone_state("dc2", "after", false))).await.unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(30), async {
        while let Some(state) = combined.next().await {
            if services_in(&state, "dc2") == vec!["after"] {
                return true;
            }
        }
        false
    })
    .await;

    assert_eq!(seen.ok(), Some(true));
    burst.abort();
}

#[tokio::test(start_paused = true)]
async fn test_latest_wins_delivers_newest_value() {
    let (local_tx, local) = channel_source("local");
    let (remote_tx, remote) = channel_source("remote:dc2");
    let mut combined =
        StateAggregator::new(AggregationMode::LatestWins).combine(vec![local, remote]);

    remote_tx.send(Ok(zone_state("dc2", "echo", false))).await.unwrap();
    for i in 0..10 {
        local_tx.send(Ok(zone_state("dc1", &format!("v{i}"), true))).await.unwrap();
    }

    let mut last = None;
    while let Ok(Some(state)) = tokio::time::timeout(QUIET, combined.next()).await {
        last = Some(state);
    }

    let last = last.unwrap();
    assert_eq!(services_in(&last, "dc1"), vec!["v9"]);
    assert_eq!(services_in(&last, "dc2"), vec!["echo"]);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_zone_keeps_first_source() {
    let (first_tx, first) = channel_source("local");
    let (second_tx, second) = channel_source("remote:dc1");
    let mut combined = StateAggregator::default().combine(vec![first, second]);

    first_tx.send(Ok(zone_state("dc1", "echo", true))).await.unwrap();
    second_tx.send(Ok(zone_state("dc1", "other", false))).await.unwrap();

    let state = combined.next().await.unwrap();
    assert_eq!(state.len(), 1);
    assert_eq!(services_in(&state, "dc1"), vec!["echo"]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_sources() {
    let (local_tx, local) = channel_source("local");
    let (remote_tx, remote) = channel_source("remote:dc2");
    let mut combined = StateAggregator::default().combine(vec![local, remote]);

    combined.cancel();
    combined.cancel();

    assert!(combined.is_cancelled());
    assert!(combined.next().await.is_none());
    // source tasks were aborted, dropping the receiving ends
    assert!(tokio::time::timeout(QUIET, local_tx.closed()).await.is_ok());
    assert!(tokio::time::timeout(QUIET, remote_tx.closed()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_no_sources_never_emits() {
    let mut combined = StateAggregator::default().combine(Vec::new());
    assert!(quiet(&mut combined).await);
}
