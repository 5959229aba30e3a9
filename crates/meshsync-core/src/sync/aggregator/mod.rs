//! Combines every zone source into one deduplicated `MultiZoneState` stream.
//!
//! Topology:
//!
//! ```text
//! source 1 ──► task ──► [read-ahead 1] ──┐
//! source 2 ──► task ──► [read-ahead 1] ──┼──► StreamMap ──► join task ──► [output] ──► MultiZoneStream
//! source N ──► task ──► [read-ahead 1] ──┘
//! ```
//!
//! Each source is drained on its own task so a burst on one source can never
//! hold up delivery from another. In `CombineLatest` mode the read-ahead and
//! the output are bounded channels of capacity 1; in `LatestWins` mode both
//! are most-recent-wins slots whose overwrites are counted.

#[cfg(test)]
mod tests;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use meshsync_types::models::{AggregationMode, MultiZoneState};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamMap;
use tracing::{debug, info, trace, warn};

use super::latest::{latest_slot, LatestSender};
use super::metrics;
use super::source::{SourceItem, ZoneSource};
use super::task::AbortOnDrop;

const OUTPUT_STAGE: &str = "aggregator";

#[derive(Debug, Clone, Copy, Default)]
pub struct StateAggregator {
    mode: AggregationMode,
}

impl StateAggregator {
    pub fn new(mode: AggregationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Start combining `sources`.
    ///
    /// Nothing is emitted until every source has produced a value; after that
    /// every source emission yields one combined state unless it equals the
    /// previous one. Must be called inside a tokio runtime.
    pub fn combine(&self, sources: Vec<ZoneSource>) -> MultiZoneStream {
        let mut tasks = Vec::with_capacity(sources.len() + 1);
        let mut inputs: StreamMap<usize, BoxStream<'static, SourceItem>> = StreamMap::new();
        let mut names = Vec::with_capacity(sources.len());

        for (idx, source) in sources.into_iter().enumerate() {
            let (name, stream) = source.into_parts();
            let (task, input) = self.spawn_source(&name, stream);
            tasks.push(task);
            inputs.insert(idx, input);
            names.push(name);
        }

        info!("[Aggregator] Combining {} sources in {} mode: {:?}", names.len(), self.mode, names);

        let (output, updates) = match self.mode {
            AggregationMode::CombineLatest => {
                let (tx, rx) = mpsc::channel(1);
                (Output::Bounded(tx), ReceiverStream::new(rx).boxed())
            }
            AggregationMode::LatestWins => {
                let (tx, rx) = latest_slot(OUTPUT_STAGE);
                (Output::Latest(tx), rx.into_stream())
            }
        };

        tasks.push(AbortOnDrop(tokio::spawn(join(names, inputs, output))));

        MultiZoneStream { updates, tasks, cancelled: false }
    }

    fn spawn_source(
        &self,
        name: &str,
        mut stream: BoxStream<'static, SourceItem>,
    ) -> (AbortOnDrop<()>, BoxStream<'static, SourceItem>) {
        match self.mode {
            AggregationMode::CombineLatest => {
                let (tx, rx) = mpsc::channel(1);
                let handle = tokio::spawn(async move {
                    while let Some(item) = stream.next().await {
                        if tx.send(item).await.is_err() {
                            break;
                        }
                    }
                });
                (AbortOnDrop(handle), ReceiverStream::new(rx).boxed())
            }
            AggregationMode::LatestWins => {
                let (tx, rx) = latest_slot(format!("source:{name}"));
                let handle = tokio::spawn(async move {
                    while let Some(item) = stream.next().await {
                        if tx.send(item).is_err() {
                            break;
                        }
                    }
                });
                (AbortOnDrop(handle), rx.into_stream())
            }
        }
    }
}

enum Output {
    Bounded(mpsc::Sender<MultiZoneState>),
    Latest(LatestSender<MultiZoneState>),
}

impl Output {
    /// `false` once the consumer is gone.
    async fn send(&self, state: MultiZoneState) -> bool {
        match self {
            Self::Bounded(tx) => tx.send(state).await.is_ok(),
            Self::Latest(tx) => tx.send(state).is_ok(),
        }
    }
}

async fn join(
    names: Vec<String>,
    mut inputs: StreamMap<usize, BoxStream<'static, SourceItem>>,
    output: Output,
) {
    let mut latest: Vec<Option<MultiZoneState>> = vec![None; names.len()];
    let mut waiting = names.len();
    let mut last_emitted: Option<MultiZoneState> = None;

    while let Some((idx, item)) = inputs.next().await {
        let state = match item {
            Ok(state) => state,
            Err(err) => {
                metrics::record_source_error(&names[idx]);
                warn!(source = %names[idx], "[Aggregator] source error ignored: {}", err);
                continue;
            }
        };

        if latest[idx].is_none() {
            waiting -= 1;
            if waiting > 0 {
                debug!(source = %names[idx], "[Aggregator] first value, waiting for {} more sources", waiting);
            }
        }
        latest[idx] = Some(state);

        if waiting > 0 {
            continue;
        }

        let combined = MultiZoneState::concat(latest.iter().flatten());
        let total: usize = latest.iter().flatten().map(MultiZoneState::len).sum();
        if total != combined.len() {
            debug!(
                "[Aggregator] {} duplicate zone states dropped, first occurrence kept",
                total - combined.len()
            );
        }

        if last_emitted.as_ref() == Some(&combined) {
            trace!("[Aggregator] combined state unchanged, not emitting");
            continue;
        }
        last_emitted = Some(combined.clone());

        if !output.send(combined).await {
            debug!("[Aggregator] consumer gone, stopping");
            return;
        }
    }

    // Every source is exhausted; keep the output open without emitting again.
    debug!("[Aggregator] all sources exhausted");
    std::future::pending::<()>().await;
}

/// The combined, deduplicated state stream.
///
/// Dropping it (or calling [`MultiZoneStream::cancel`]) stops the join task and
/// every source task, which in turn stops the pollers feeding them.
pub struct MultiZoneStream {
    updates: BoxStream<'static, MultiZoneState>,
    tasks: Vec<AbortOnDrop<()>>,
    cancelled: bool,
}

impl MultiZoneStream {
    /// Safe to call any number of times.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.tasks.clear();
        info!("[Aggregator] combined stream cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Stream for MultiZoneStream {
    type Item = MultiZoneState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        this.updates.poll_next_unpin(cx)
    }
}

impl Drop for MultiZoneStream {
    fn drop(&mut self) {
        self.cancel();
    }
}
