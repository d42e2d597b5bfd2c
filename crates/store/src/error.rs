//! Document store error types.

use thiserror::Error;

/// Errors raised by the document store boundary.
///
/// Absence of a document is not an error: lookups report it as `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Failed to build a client for the configured endpoint.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request never produced a response (transport failure).
    #[error("Request error: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("Store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The addressed index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The response body could not be interpreted.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn index_not_found(index: impl Into<String>) -> Self {
        Self::IndexNotFound(index.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// The engine refused the request itself (4xx), as opposed to failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (400..500).contains(status))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_includes_body() {
        let err = StoreError::status(503, "cluster_block_exception");
        assert_eq!(
            err.to_string(),
            "Store responded with status 503: cluster_block_exception"
        );
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn client_statuses_are_rejections() {
        assert!(StoreError::status(400, "illegal_argument_exception").is_rejection());
        assert!(!StoreError::status(503, "unavailable").is_rejection());
        assert!(!StoreError::index_not_found("books").is_rejection());
        assert!(!StoreError::request("connection refused").is_rejection());
    }
}
