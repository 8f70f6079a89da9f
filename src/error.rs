//! Connector error types
//!
//! One error enum covering the four failure classes of the connector:
//! binding/configuration resolution, credential assembly, transport
//! (network failures, HTTP errors, SOAP faults), and diagnostics
//! serialization. Diagnostics failures are deliberately a separate class:
//! a payload that cannot be rendered for logging must never be confused
//! with a failed remote call.

use thiserror::Error;

/// Error that can occur during connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Configuration errors
    /// Transport binding could not be resolved (unparseable endpoint URL,
    /// unreadable or malformed override file, missing named binding).
    #[error("binding resolution failed: {message}")]
    ConfigResolution { message: String },

    // Credential errors
    /// A required configuration parameter is absent.
    #[error("missing configuration parameter '{name}'")]
    MissingParameter { name: String },

    /// The secure-string facility failed to decrypt a secret value.
    #[error("secret decryption failed: {message}")]
    Decrypt { message: String },

    // Transport errors
    /// The remote call failed: network error, HTTP error status, or a
    /// malformed/oversized response body.
    #[error("transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service answered with a SOAP fault.
    #[error("service fault {code}: {message}")]
    ServiceFault { code: String, message: String },

    // Diagnostics errors
    /// A payload could not be serialized for diagnostic logging.
    #[error("diagnostics serialization failed: {message}")]
    Diagnostics { message: String },
}

impl ConnectorError {
    /// Check if this error belongs to the transport class (a failure
    /// surfaced by the remote call itself).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConnectorError::Transport { .. } | ConnectorError::ServiceFault { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConfigResolution { .. } => "CONFIG_RESOLUTION",
            ConnectorError::MissingParameter { .. } => "MISSING_PARAMETER",
            ConnectorError::Decrypt { .. } => "DECRYPT_FAILED",
            ConnectorError::Transport { .. } => "TRANSPORT",
            ConnectorError::ServiceFault { .. } => "SERVICE_FAULT",
            ConnectorError::Diagnostics { .. } => "DIAGNOSTICS",
        }
    }

    // Convenience constructors

    /// Create a binding-resolution error.
    pub fn config_resolution(message: impl Into<String>) -> Self {
        ConnectorError::ConfigResolution {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        ConnectorError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error with source.
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a service-fault error.
    pub fn service_fault(code: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::ServiceFault {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a diagnostics error.
    pub fn diagnostics(message: impl Into<String>) -> Self {
        ConnectorError::Diagnostics {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ConnectorError::transport("refused").is_transport());
        assert!(ConnectorError::service_fault("soap:Server", "boom").is_transport());
        assert!(!ConnectorError::config_resolution("bad url").is_transport());
        assert!(!ConnectorError::diagnostics("bad payload").is_transport());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ConnectorError::config_resolution("x").error_code(),
            "CONFIG_RESOLUTION"
        );
        assert_eq!(
            ConnectorError::MissingParameter {
                name: "Username".to_string()
            }
            .error_code(),
            "MISSING_PARAMETER"
        );
        assert_eq!(ConnectorError::transport("x").error_code(), "TRANSPORT");
        assert_eq!(
            ConnectorError::service_fault("c", "m").error_code(),
            "SERVICE_FAULT"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::MissingParameter {
            name: "Client".to_string(),
        };
        assert_eq!(err.to_string(), "missing configuration parameter 'Client'");

        let err = ConnectorError::service_fault("soap:Client", "invalid credentials");
        assert_eq!(
            err.to_string(),
            "service fault soap:Client: invalid credentials"
        );
    }

    #[test]
    fn test_error_with_source() {
        let source = std::io::Error::other("connection reset");
        let err = ConnectorError::transport_with_source("request failed", source);

        if let ConnectorError::Transport { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("Expected Transport variant");
        }
    }
}
