//! HTTP implementation of [`VolumeApi`] against the Linode v4 API.

mod error;

use std::fmt;
use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{ApiFuture, VolumeApi};
use crate::resource::{AttachRequest, ComputeNode, Page, Volume, VolumeId};

pub use error::ApiError;

/// Public Linode API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.linode.com/v4";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the subset of the Linode API used by the hook.
///
/// Every request carries the configured bearer token.
#[derive(Clone)]
pub struct LinodeClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for LinodeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinodeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LinodeClient {
    /// Creates a client for `base_url` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be
    /// initialised (for example when no TLS backend is available).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| ApiError::transport("build client", &err))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        })
    }

    /// Returns the API root requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| ApiError::transport(operation, &err))?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "linode api responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            operation: operation.to_owned(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(operation, %url, "GET");
        let response = self.send(operation, self.http.get(&url)).await?;
        let text = response
            .text()
            .await
            .map_err(|err| ApiError::transport(operation, &err))?;
        serde_json::from_str(&text).map_err(|err| ApiError::Decode {
            operation: operation.to_owned(),
            message: err.to_string(),
        })
    }

    async fn post<B: Serialize + Sync>(
        &self,
        operation: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!(operation, %url, "POST");
        let mut request = self.http.post(&url);
        if let Some(payload) = body {
            request = request.json(payload);
        }
        self.send(operation, request).await.map(|_| ())
    }
}

impl VolumeApi for LinodeClient {
    type Error = ApiError;

    fn list_nodes(&self, page: u32) -> ApiFuture<'_, Page<ComputeNode>, Self::Error> {
        Box::pin(async move {
            self.get_json("list instances", &format!("linode/instances?page={page}"))
                .await
        })
    }

    fn list_volumes(&self, page: u32) -> ApiFuture<'_, Page<Volume>, Self::Error> {
        Box::pin(async move {
            self.get_json("list volumes", &format!("volumes?page={page}"))
                .await
        })
    }

    fn get_volume(&self, volume: VolumeId) -> ApiFuture<'_, Volume, Self::Error> {
        Box::pin(async move {
            self.get_json("get volume", &format!("volumes/{volume}"))
                .await
        })
    }

    fn detach_volume(&self, volume: VolumeId) -> ApiFuture<'_, (), Self::Error> {
        Box::pin(async move {
            self.post::<()>("detach volume", &format!("volumes/{volume}/detach"), None)
                .await
        })
    }

    fn attach_volume<'a>(
        &'a self,
        volume: VolumeId,
        request: &'a AttachRequest,
    ) -> ApiFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.post(
                "attach volume",
                &format!("volumes/{volume}/attach"),
                Some(request),
            )
            .await
        })
    }
}
