//! Rate limited submission of CRPT documents.
//!
//! Every call to [`DocumentSubmitter::submit`] encodes a document to JSON, waits for a slot in the
//! shared [`gate::RateGate`] and posts the body to the configured endpoint. The slot is handed
//! back on every exit path.

/// Document model posted to the CRPT API
pub mod document;
/// JSON encoding of outgoing documents
pub mod encode;
/// Submission errors
pub mod error;
/// The gated submitter
pub mod submitter;
/// HTTP transport collaborator
pub mod transport;

pub use document::{Description, Document, Product};
pub use error::SubmitError;
pub use submitter::DocumentSubmitter;
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
