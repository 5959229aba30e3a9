//! Collaborators and stream types shared by the pollers and the aggregator.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::Stream;
use meshsync_client::{ClientError, ControlPlaneHttpClient};
use meshsync_types::error::SyncError;
use meshsync_types::models::{MultiZoneState, ServicesState};
use std::collections::HashMap;
use url::Url;

/// Error type of pluggable collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves the peer control-plane instances of a zone (usually via service discovery).
#[async_trait]
pub trait ControlPlaneInstanceFetcher: Send + Sync {
    async fn instances(&self, zone: &str) -> Result<Vec<Url>, BoxError>;
}

/// Fetches the full service state served by one peer.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    async fn get_state(&self, uri: &Url) -> Result<ServicesState, ClientError>;
}

#[async_trait]
impl ControlPlaneClient for ControlPlaneHttpClient {
    async fn get_state(&self, uri: &Url) -> Result<ServicesState, ClientError> {
        ControlPlaneHttpClient::get_state(self, uri).await
    }
}

/// Fixed zone → peers table, for static deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticInstanceFetcher {
    instances: HashMap<String, Vec<Url>>,
}

impl StaticInstanceFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, zone: impl Into<String>, instances: Vec<Url>) -> Self {
        self.instances.insert(zone.into(), instances);
        self
    }

    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }
}

#[async_trait]
impl ControlPlaneInstanceFetcher for StaticInstanceFetcher {
    async fn instances(&self, zone: &str) -> Result<Vec<Url>, BoxError> {
        Ok(self.instances.get(zone).cloned().unwrap_or_default())
    }
}

pub type SourceItem = Result<MultiZoneState, SyncError>;

/// One named input of the aggregator.
pub struct ZoneSource {
    name: String,
    stream: BoxStream<'static, SourceItem>,
}

impl ZoneSource {
    pub fn new<S>(name: impl Into<String>, stream: S) -> Self
    where
        S: Stream<Item = SourceItem> + Send + 'static,
    {
        Self { name: name.into(), stream: Box::pin(stream) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, BoxStream<'static, SourceItem>) {
        (self.name, self.stream)
    }
}

impl std::fmt::Debug for ZoneSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneSource").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Anything that can feed zone states into the aggregator.
pub trait ZoneStateChanges {
    fn into_source(self) -> ZoneSource;
}
