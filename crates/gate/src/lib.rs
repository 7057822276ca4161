//! Fixed window admission gate bounding calls to a single external endpoint.

/// Gate error taxonomy
pub mod error;
/// The rate gate and its scoped permit
pub mod rate_gate;

pub use error::GateError;
pub use rate_gate::{Permit, RateGate};
