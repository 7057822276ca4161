use gate::GateError;

use crate::transport::TransportError;

/// Errors returned by [`crate::DocumentSubmitter::submit`].
///
/// Nothing is retried internally. Whatever the variant, the gate slot has already been handed back
/// by the time the caller sees it.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The document could not be serialized. No slot was taken and nothing was sent.
    #[error("failed to encode document: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The caller stopped waiting for a slot, or the gate was shut down. Nothing was sent.
    #[error("submission not admitted: {0}")]
    Cancelled(#[source] GateError),

    /// The transport reported a failure after the request was admitted.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
}
