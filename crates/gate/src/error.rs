/// Errors returned while waiting for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The gate was constructed with an unusable quota window.
    #[error("invalid gate configuration: {0}")]
    InvalidConfig(&'static str),

    /// The caller gave up before a slot was granted. No slot was taken.
    #[error("admission cancelled while waiting for a slot")]
    Cancelled,

    /// The gate has been shut down and admits no further callers.
    #[error("rate gate is closed")]
    Closed,
}
