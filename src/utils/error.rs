//! Error types for the avswitch engine
//!
//! The reconciliation path itself never fails: missing elements and timed
//! out waits are ordinary states handled with `Option` and retries. Errors
//! here cover the edges around it - snapshot parsing, selector syntax,
//! bridge message decoding, and I/O in the demo binary.

use thiserror::Error;

/// Main error type for avswitch operations
#[derive(Debug, Error)]
pub enum AvswitchError {
    /// Page snapshot could not be parsed into a document
    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    /// Selector string could not be parsed
    #[error("selector parse error: {0}")]
    Selector(String),

    /// Bridge message could not be decoded
    #[error("message decode error: {0}")]
    Message(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for avswitch operations
pub type Result<T> = std::result::Result<T, AvswitchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        let err = AvswitchError::HtmlParse("unexpected end of input".into());
        assert_eq!(err.to_string(), "HTML parse error: unexpected end of input");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AvswitchError = parse_err.into();
        assert!(matches!(err, AvswitchError::Message(_)));
    }
}
