use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::credential::Credential;
use crate::error::ApiError;

/// JSON client for the remote REST backend.
///
/// Attaches the caller's bearer token when there is one and a fresh
/// `X-Request-Id` on every call.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Client(format!("invalid base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Client(format!("{base_url} cannot be a base url")));
        }

        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&'static str, String)],
        credential: &Credential,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, segments, credential)?.query(params);
        send(builder).await
    }

    pub async fn post<B, T>(
        &self,
        segments: &[&str],
        body: &B,
        credential: &Credential,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, segments, credential)?.json(body);
        send(builder).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Client(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        credential: &Credential,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let request_id = Uuid::new_v4().to_string();
        debug!(%method, %url, request_id = %request_id, authenticated = credential.bearer_token().is_some(), "Calling attendance store");

        let mut builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-request-id", request_id);

        if let Some(token) = credential.bearer_token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }
}

async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let response = builder.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        let message = error_message(status, &body);
        warn!(status = status.as_u16(), message = %message, "Attendance store rejected request");
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Message for a non-2xx answer: the body's `message` when it is JSON and has
/// one, `Error <code>` when it is JSON without one, otherwise the status text.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Error {}", status.as_u16())),
        Err(_) => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Error {}", status.as_u16())),
    }
}
