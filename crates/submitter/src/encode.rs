use serde::Serialize;

/// Content type of every encoded body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Encode `document` to its JSON wire representation.
///
/// Dates are written as ISO-8601 strings. The output only depends on the input value.
pub fn encode<D: Serialize + ?Sized>(document: &D) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(document)
}
