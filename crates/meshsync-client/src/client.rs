use crate::config::ClientConfig;
use crate::error::ClientError;
use meshsync_types::models::{ServiceInstances, ServicesState};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Fetches service state from peer control planes.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ControlPlaneHttpClient {
    client: Client,
    config: ClientConfig,
}

impl ControlPlaneHttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(config.connection_timeout)
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    /// `GET {uri}/state`
    pub async fn get_state(&self, uri: &Url) -> Result<ServicesState, ClientError> {
        let url = endpoint(uri, &["state"])?;
        self.get_json(url).await
    }

    /// `GET {uri}/state/{service_name}`; `None` when the peer does not know the service.
    pub async fn get_service_state(
        &self,
        uri: &Url,
        service_name: &str,
    ) -> Result<Option<ServiceInstances>, ClientError> {
        let url = endpoint(uri, &["state", service_name])?;
        match self.get_json(url).await {
            Ok(instances) => Ok(Some(instances)),
            Err(ClientError::ServerError { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        tracing::trace!("GET {}", url);

        let resp = self.client.get(url).send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::ServerError { status: status.as_u16(), message });
        }
        if status == StatusCode::NO_CONTENT {
            return Err(ClientError::InvalidResponse("empty body".to_string()));
        }

        let body = resp.bytes().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(
                u64::try_from(self.config.request_timeout().as_millis()).unwrap_or(u64::MAX),
            )
        } else if e.is_connect() {
            ClientError::Connection(e.to_string())
        } else {
            ClientError::Request(e)
        }
    }
}

/// Append path segments to a base URI, keeping any path prefix it carries.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl(format!("{base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
