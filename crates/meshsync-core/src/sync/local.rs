//! Local zone source fed by the embedding application's discovery watch.

use futures::StreamExt;
use meshsync_types::models::{MultiZoneState, ServicesState, ZoneState};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::source::{ZoneSource, ZoneStateChanges};

/// Wraps the discovery watch's channel.
///
/// `None` in the channel means discovery has not delivered its first
/// snapshot yet.
#[derive(Debug, Clone)]
pub struct LocalZoneStateChanges {
    zone: String,
    receiver: watch::Receiver<Option<ServicesState>>,
}

impl LocalZoneStateChanges {
    pub fn new(zone: impl Into<String>, receiver: watch::Receiver<Option<ServicesState>>) -> Self {
        Self { zone: zone.into(), receiver }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Most recent local snapshot, if any.
    pub fn latest(&self) -> Option<ServicesState> {
        self.receiver.borrow().clone()
    }

    pub fn is_initial_state_loaded(&self) -> bool {
        self.receiver.borrow().is_some()
    }
}

impl ZoneStateChanges for LocalZoneStateChanges {
    fn into_source(self) -> ZoneSource {
        let zone = self.zone;
        let mut last: Option<MultiZoneState> = None;

        let stream = WatchStream::new(self.receiver).filter_map(move |snapshot| {
            let next = snapshot.map(|state| MultiZoneState::from(ZoneState::local(state, zone.clone())));
            let changed = match (&next, &last) {
                (Some(next), Some(last)) => next != last,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if changed {
                last.clone_from(&next);
            }
            futures::future::ready(next.filter(|_| changed).map(Ok))
        });

        ZoneSource::new("local", stream)
    }
}
