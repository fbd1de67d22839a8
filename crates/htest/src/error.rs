//! Error types.

use thiserror::Error;

/// Errors raised while building, dispatching, or decoding a test exchange.
///
/// The fluent API never returns these directly; they are converted into
/// [`Failure`](crate::Failure)s and handed to the active
/// [`Reporter`](crate::Reporter).
#[derive(Debug, Error)]
pub enum HtestError {
    /// The request path could not be parsed into a request target.
    #[error("malformed request target '{target}': {reason}")]
    MalformedRequestTarget {
        /// The offending path.
        target: String,
        /// Parser message.
        reason: String,
    },

    /// A header name or value is not valid HTTP.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader {
        /// Header name as supplied by the caller.
        name: String,
        /// Parser message.
        reason: String,
    },

    /// Reading a request or response body failed.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A form body could not be url-encoded.
    #[error("form encoding error: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// XML decoding failed.
    #[error("XML error: {0}")]
    Xml(String),

    /// The response content type has no matching decoder.
    #[error("unsupported content type for binding: {0}")]
    UnsupportedContentType(String),

    /// The handler under test panicked.
    #[error("handler panicked: {0}")]
    HandlerPanic(String),

    /// The handler returned an error instead of a response.
    #[error("handler failed: {0}")]
    Handler(String),

    /// A request was sent from a client with no handler bound.
    #[error("no handler bound to client")]
    NoHandler,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<quick_xml::DeError> for HtestError {
    fn from(e: quick_xml::DeError) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<quick_xml::Error> for HtestError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

/// Result type for fallible internals.
pub type HtestResult<T> = Result<T, HtestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HtestError::MalformedRequestTarget {
            target: "http://[::1".to_string(),
            reason: "invalid authority".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed request target 'http://[::1': invalid authority"
        );

        let err = HtestError::UnsupportedContentType("text/html".to_string());
        assert_eq!(
            err.to_string(),
            "unsupported content type for binding: text/html"
        );
    }

    #[test]
    fn test_json_error_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = HtestError::from(json_err);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
