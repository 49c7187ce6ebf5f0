//! Configuration for a signing session.

use crate::signatures::{
    DigestAlgorithm, SignatureContainerBuilder, SignatureFilter, SignatureMetadata,
    SignatureSubFilter, SignerIdentity,
};
use chrono::Utc;

/// Default container capacity reserved in the document, in bytes.
pub const DEFAULT_RESERVED_SIZE: usize = 32000;

/// Signing session configuration.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Name of the signature field to create.
    pub field_name: String,

    /// Digest algorithm for the byte-range digest and the signature.
    pub digest_algorithm: DigestAlgorithm,

    /// Container capacity reserved in phase 1.
    pub reserved_size: usize,

    /// Dictionary entries written with the placeholder.
    pub metadata: SignatureMetadata,

    /// Add a signing-time authenticated attribute to the container.
    pub include_signing_time: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SigningConfig {
    /// Create new configuration with defaults.
    ///
    /// The field name is derived from the current time, the reservation is
    /// [`DEFAULT_RESERVED_SIZE`] and the format is `Adobe.PPKLite` /
    /// `adbe.pkcs7.detached` over SHA-256.
    pub fn new() -> Self {
        Self {
            field_name: default_field_name(),
            digest_algorithm: DigestAlgorithm::Sha256,
            reserved_size: DEFAULT_RESERVED_SIZE,
            metadata: SignatureMetadata::new(
                SignatureFilter::AdobePpkLite,
                SignatureSubFilter::Pkcs7Detached,
            ),
            include_signing_time: false,
        }
    }

    /// Set the signature field name.
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Set the digest algorithm.
    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    /// Reserve a fixed container capacity.
    pub fn with_reserved_size(mut self, size: usize) -> Self {
        self.reserved_size = size;
        self
    }

    /// Reserve the capacity estimated for `identity` with this digest algorithm.
    pub fn with_reserved_size_for(mut self, identity: &SignerIdentity) -> Self {
        self.reserved_size = SignatureContainerBuilder::new(self.digest_algorithm)
            .with_signing_time(self.include_signing_time.then(Utc::now))
            .estimate_size(identity);
        self
    }

    /// Replace the dictionary metadata.
    pub fn with_metadata(mut self, metadata: SignatureMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Enable or disable the signing-time attribute.
    pub fn with_signing_time(mut self, enable: bool) -> Self {
        self.include_signing_time = enable;
        self
    }
}

/// Field name of the form `Signature_20240101T120000`.
pub fn default_field_name() -> String {
    format!("Signature_{}", Utc::now().format("%Y%m%dT%H%M%S"))
}
