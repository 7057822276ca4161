use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header::HeaderMap, redirect::Policy};

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Raw response body
    pub body: Vec<u8>,
}

/// Failures reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No complete response arrived within the timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be sent or its response could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint answered {status}: {body}")]
    Status {
        /// HTTP status
        status: StatusCode,
        /// Response body, lossily decoded
        body: String,
    },
}

/// Sends an encoded body to a URL and returns the raw response.
///
/// Redirects, connection pooling and any other HTTP policy are the implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` with `headers`, giving up after `timeout`.
    async fn send(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        (**self).send(url, headers, body, timeout).await
    }
}

/// [`Transport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Create a transport following redirects the way browsers do.
    pub fn new() -> Result<Self, TransportError> {
        let http = Client::builder().redirect(Policy::limited(10)).build()?;
        Ok(Self { http })
    }

    /// Wrap an already configured client.
    pub const fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let request = self.http.post(url.clone()).headers(headers).body(body);
        let (status, body) = tokio::time::timeout(timeout, async {
            let resp = request.send().await?;
            let status = resp.status();
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        })
        .await
        .map_err(|_| TransportError::Timeout(timeout))??;

        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(TransportResponse { status, body: body.to_vec() })
    }
}
