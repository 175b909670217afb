use thiserror::Error;

/// Failures of the model fallback that callers need to tell apart
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The model could not be loaded. Retried on the next request.
    #[error("model '{model}' is unavailable: {reason}")]
    Unavailable { model: String, reason: String },

    /// A completion request failed after the model was loaded
    #[error("completion request failed: {0}")]
    Request(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ModelError::Unavailable {
            model: "functiongemma-270m-it".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "model 'functiongemma-270m-it' is unavailable: connection refused"
        );
        assert_eq!(
            ModelError::Request("timeout".to_string()).to_string(),
            "completion request failed: timeout"
        );
    }
}
