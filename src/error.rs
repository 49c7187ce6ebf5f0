//! Error types for the deferred signing library.
//!
//! This module defines all error types that can occur while preparing, signing and
//! finalizing a document.

use crate::signatures::SessionState;

/// Result type alias for deferred signing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during deferred signing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identity provider could not produce a usable certificate/key
    #[error("Certificate load failure: {0}")]
    CertificateLoadFailure(String),

    /// Requested hash or signature algorithm is not implemented
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A signing phase was invoked out of order
    #[error("Invalid state transition: cannot {operation} while session is {state}")]
    InvalidStateTransition {
        /// State the session was in
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Finished container does not fit in the reserved placeholder
    #[error("Placeholder too small: container is {container_len} bytes, reserved {reserved} bytes")]
    PlaceholderTooSmall {
        /// Length of the DER-encoded container
        container_len: usize,
        /// Reserved capacity in bytes
        reserved: usize,
    },

    /// Certificate does not correspond to the signing key
    #[error("Signer identity mismatch: {0}")]
    SignerIdentityMismatch(String),

    /// Private key is missing or unusable
    #[error("Key access error: {0}")]
    KeyAccess(String),

    /// Invalid document structure or byte range
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Named signature field does not exist in the document
    #[error("Signature field not found: {0}")]
    FieldNotFound(String),

    /// ASN.1 DER encoding or decoding error
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),

    /// RSA primitive error
    #[error("RSA error: {0}")]
    Crypto(#[from] rsa::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_too_small_error() {
        let err = Error::PlaceholderTooSmall {
            container_len: 4100,
            reserved: 4096,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("4100"));
        assert!(msg.contains("4096"));
    }

    #[test]
    fn test_invalid_state_transition_error() {
        let err = Error::InvalidStateTransition {
            state: SessionState::Unsigned,
            operation: "build the container",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Unsigned"));
        assert!(msg.contains("build the container"));
    }

    #[test]
    fn test_unsupported_algorithm_error() {
        let err = Error::UnsupportedAlgorithm("MD5".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Unsupported algorithm"));
        assert!(msg.contains("MD5"));
    }

    #[test]
    fn test_der_error_conversion() {
        let der_err = der::Error::from(der::ErrorKind::Failed);
        let err: Error = der_err.into();
        assert!(matches!(err, Error::Asn1(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
