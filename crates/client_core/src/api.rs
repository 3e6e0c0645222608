use std::{marker::PhantomData, sync::Arc, time::Duration};

use async_trait::async_trait;
use loader::LoadSource;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    error::FetchFailure,
    protocol::{ListQuery, Page},
};
use tracing::{debug, warn};
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON client for the dashboard's REST backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let raw = base_url.trim();
        let mut base_url = Url::parse(raw).map_err(|source| ClientError::InvalidBaseUrl {
            url: raw.to_string(),
            source,
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedScheme(base_url.scheme().to_string()));
        }
        // relative joins would otherwise drop the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, FetchFailure> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| FetchFailure::from_message(format!("invalid request path '{path}': {err}")))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchFailure> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "api: GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(failure_from_reqwest)?;
        decode_response(response).await
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, FetchFailure> {
        self.get_json(resource, &query.to_query_pairs()).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, FetchFailure> {
    let status = response.status();
    if !status.is_success() {
        let data = response
            .bytes()
            .await
            .ok()
            .and_then(|body| serde_json::from_slice::<Value>(&body).ok());
        warn!(status = status.as_u16(), "api: request rejected");
        return Err(FetchFailure::from_response(status.as_u16(), data));
    }

    response.json::<T>().await.map_err(failure_from_reqwest)
}

pub fn failure_from_reqwest(err: reqwest::Error) -> FetchFailure {
    match err.status() {
        Some(status) => FetchFailure::from_response(status.as_u16(), None),
        None => FetchFailure::from_message(err.to_string()),
    }
}

/// One paginated list endpoint, loadable by a [`loader::LoadDriver`].
pub struct ListResource<T> {
    client: Arc<ApiClient>,
    resource: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> ListResource<T> {
    pub fn new(client: Arc<ApiClient>, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into(),
            _item: PhantomData,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

#[async_trait]
impl<T> LoadSource<ListQuery> for ListResource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = Page<T>;

    async fn fetch(&self, key: &ListQuery) -> Result<Page<T>, FetchFailure> {
        self.client.list(&self.resource, key).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
