use std::time::Duration;

use config::Opts;
use gate::{Permit, RateGate};
use reqwest::{
    Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    encode::{JSON_CONTENT_TYPE, encode},
    error::SubmitError,
    transport::{HttpTransport, Transport},
};

/// Posts documents to a single endpoint, never starting more requests per window than the gate
/// admits.
#[derive(Debug)]
pub struct DocumentSubmitter<T = HttpTransport> {
    gate: RateGate,
    transport: T,
    endpoint: Url,
    timeout: Duration,
}

impl DocumentSubmitter<HttpTransport> {
    /// Build a submitter talking HTTP to the endpoint and quota described by `opts`.
    pub fn from_opts(opts: &Opts) -> eyre::Result<Self> {
        let gate = RateGate::new(opts.gate.request_limit, opts.gate.period())?;
        let transport = HttpTransport::new()?;
        Ok(Self::new(gate, transport, opts.endpoint.url.clone(), opts.endpoint.request_timeout()))
    }
}

impl<T: Transport> DocumentSubmitter<T> {
    /// Create a new [`DocumentSubmitter`].
    pub const fn new(gate: RateGate, transport: T, endpoint: Url, timeout: Duration) -> Self {
        Self { gate, transport, endpoint, timeout }
    }

    /// Encode `document`, wait for a slot and post it, returning the raw response body.
    pub async fn submit<D>(&self, document: &D) -> Result<Vec<u8>, SubmitError>
    where
        D: Serialize + ?Sized,
    {
        let body = encode(document).map_err(SubmitError::Encoding)?;
        let permit = self.gate.acquire().await.map_err(SubmitError::Cancelled)?;
        self.send(body, permit).await
    }

    /// Like [`DocumentSubmitter::submit`], but the wait for a slot ends once `cancel` fires.
    ///
    /// Cancellation only affects the wait. A request already admitted runs to completion.
    pub async fn submit_with_cancel<D: Serialize + ?Sized>(
        &self,
        document: &D,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SubmitError> {
        let body = encode(document).map_err(SubmitError::Encoding)?;
        let permit = self.gate.acquire_with_cancel(cancel).await.map_err(SubmitError::Cancelled)?;
        self.send(body, permit).await
    }

    // The permit is owned by this call and dropped on every return path.
    async fn send(&self, body: Vec<u8>, _permit: Permit) -> Result<Vec<u8>, SubmitError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let len = body.len();
        match self.transport.send(&self.endpoint, headers, body, self.timeout).await {
            Ok(resp) => {
                debug!(
                    status = %resp.status,
                    sent = len,
                    received = resp.body.len(),
                    "document submitted"
                );
                Ok(resp.body)
            }
            Err(e) => {
                warn!(error = %e, url = %self.endpoint, "document submission failed");
                Err(SubmitError::Transport(e))
            }
        }
    }

    /// The gate shared by every submission.
    pub const fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// The endpoint documents are posted to.
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Shut the gate down. Pending and later submissions fail with [`SubmitError::Cancelled`].
    pub async fn shutdown(&self) {
        self.gate.shutdown().await;
    }
}
