//! External signature adapters.
//!
//! A document engine does not know how a signature is produced. It calls
//! [`ExternalSignature::modify_signing_dictionary`] before it serializes the
//! signature dictionary and [`ExternalSignature::sign`] with the bytes covered
//! by the ByteRange. Two adapters plug into that extension point:
//!
//! - [`DigestCapture`] (phase 1) records the digest of the covered bytes and
//!   returns an empty signature so the placeholder stays blank.
//! - [`DeferredInjection`] (phase 3) returns a container that was built earlier.

use super::session::SessionState;
use super::types::{
    DigestAlgorithm, DocumentDigest, SignatureContainer, SignatureFilter, SignatureMetadata,
    SignatureSubFilter,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Signature dictionary entries, before the engine serializes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureDictionary {
    /// `/Filter` name
    pub filter: Option<String>,
    /// `/SubFilter` name
    pub sub_filter: Option<String>,
    /// `/Name`
    pub name: Option<String>,
    /// `/Reason`
    pub reason: Option<String>,
    /// `/Location`
    pub location: Option<String>,
    /// `/ContactInfo`
    pub contact_info: Option<String>,
    /// `/M`
    pub signing_date: Option<DateTime<Utc>>,
}

impl SignatureDictionary {
    /// Dictionary pre-filled from signing metadata.
    pub fn from_metadata(metadata: &SignatureMetadata) -> Self {
        Self {
            filter: Some(metadata.filter.as_pdf_name().to_string()),
            sub_filter: Some(metadata.sub_filter.as_pdf_name().to_string()),
            name: metadata.name.clone(),
            reason: metadata.reason.clone(),
            location: metadata.location.clone(),
            contact_info: metadata.contact_info.clone(),
            signing_date: metadata.signing_date,
        }
    }

    /// Set `/Filter`.
    pub fn set_filter(&mut self, filter: &SignatureFilter) {
        self.filter = Some(filter.as_pdf_name().to_string());
    }

    /// Set `/SubFilter`.
    pub fn set_sub_filter(&mut self, sub_filter: SignatureSubFilter) {
        self.sub_filter = Some(sub_filter.as_pdf_name().to_string());
    }
}

/// Phase 1 adapter: captures the digest of the signed byte ranges.
#[derive(Debug)]
pub struct DigestCapture {
    algorithm: DigestAlgorithm,
    filter: SignatureFilter,
    sub_filter: SignatureSubFilter,
    digest: Option<DocumentDigest>,
    used: bool,
}

impl DigestCapture {
    /// Capture adapter for `algorithm` that writes the given filter and sub-filter.
    pub fn new(
        algorithm: DigestAlgorithm,
        filter: SignatureFilter,
        sub_filter: SignatureSubFilter,
    ) -> Self {
        Self {
            algorithm,
            filter,
            sub_filter,
            digest: None,
            used: false,
        }
    }

    /// Digest algorithm applied to the signed bytes.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    fn sign(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if self.used {
            log::warn!("Digest capture adapter invoked twice");
            return Err(Error::InvalidStateTransition {
                state: SessionState::Prepared,
                operation: "capture a second digest",
            });
        }
        self.used = true;
        let digest = DocumentDigest::compute(self.algorithm, data);
        log::debug!(
            "Captured {} digest over {} bytes",
            self.algorithm.name(),
            data.len()
        );
        self.digest = Some(digest);
        Ok(Vec::new())
    }

    fn modify_signing_dictionary(&self, dict: &mut SignatureDictionary) {
        dict.set_filter(&self.filter);
        dict.set_sub_filter(self.sub_filter);
    }

    /// Take the captured digest out of the adapter.
    pub(crate) fn take_digest(&mut self) -> Option<DocumentDigest> {
        self.digest.take()
    }
}

/// Phase 3 adapter: hands a precomputed container back to the engine.
#[derive(Debug, Clone)]
pub struct DeferredInjection {
    container: Vec<u8>,
}

impl DeferredInjection {
    /// Injection adapter for a finished container.
    pub fn new(container: &SignatureContainer) -> Self {
        Self {
            container: container.as_bytes().to_vec(),
        }
    }

    /// Injection adapter for raw container bytes.
    pub fn from_bytes(container: Vec<u8>) -> Self {
        Self { container }
    }

    /// Length of the container in bytes.
    pub fn container_len(&self) -> usize {
        self.container.len()
    }
}

/// External signature handed to a [`DocumentEngine`](crate::engine::DocumentEngine).
#[derive(Debug)]
pub enum ExternalSignature {
    /// Digest capture during placeholder reservation
    Capture(DigestCapture),
    /// Container injection during finalization
    Inject(DeferredInjection),
}

impl ExternalSignature {
    /// Produce the signature bytes for the data covered by the ByteRange.
    ///
    /// The capture adapter returns an empty vector; the injection adapter
    /// returns its container and ignores `data`.
    pub fn sign(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            ExternalSignature::Capture(capture) => capture.sign(data),
            ExternalSignature::Inject(inject) => Ok(inject.container.clone()),
        }
    }

    /// Adjust the signature dictionary before the engine writes it.
    pub fn modify_signing_dictionary(&self, dict: &mut SignatureDictionary) {
        match self {
            ExternalSignature::Capture(capture) => capture.modify_signing_dictionary(dict),
            ExternalSignature::Inject(_) => {},
        }
    }

    /// Capture adapter, if this is one.
    pub fn as_capture_mut(&mut self) -> Option<&mut DigestCapture> {
        match self {
            ExternalSignature::Capture(capture) => Some(capture),
            ExternalSignature::Inject(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> ExternalSignature {
        ExternalSignature::Capture(DigestCapture::new(
            DigestAlgorithm::Sha256,
            SignatureFilter::AdobePpkLite,
            SignatureSubFilter::Pkcs7Detached,
        ))
    }

    #[test]
    fn test_capture_returns_empty_signature() {
        let mut adapter = capture();
        let sig = adapter.sign(b"abc").unwrap();
        assert!(sig.is_empty());

        let digest = adapter.as_capture_mut().unwrap().take_digest().unwrap();
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_capture_rejects_second_call() {
        let mut adapter = capture();
        adapter.sign(b"first").unwrap();
        let result = adapter.sign(b"second");
        assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
    }

    #[test]
    fn test_capture_writes_filter_entries() {
        let adapter = ExternalSignature::Capture(DigestCapture::new(
            DigestAlgorithm::Sha256,
            SignatureFilter::Custom("Example.Handler".to_string()),
            SignatureSubFilter::CadesDetached,
        ));
        let mut dict = SignatureDictionary::default();
        adapter.modify_signing_dictionary(&mut dict);
        assert_eq!(dict.filter.as_deref(), Some("Example.Handler"));
        assert_eq!(dict.sub_filter.as_deref(), Some("ETSI.CAdES.detached"));
    }

    #[test]
    fn test_inject_returns_container_verbatim() {
        let mut adapter = ExternalSignature::Inject(DeferredInjection::from_bytes(vec![1, 2, 3]));
        assert_eq!(adapter.sign(b"ignored").unwrap(), vec![1, 2, 3]);
        assert_eq!(adapter.sign(b"").unwrap(), vec![1, 2, 3]);
        assert!(adapter.as_capture_mut().is_none());
    }

    #[test]
    fn test_inject_leaves_dictionary_untouched() {
        let adapter = ExternalSignature::Inject(DeferredInjection::from_bytes(vec![0x30]));
        let metadata = SignatureMetadata::default().with_reason("Approval");
        let mut dict = SignatureDictionary::from_metadata(&metadata);
        let before = dict.clone();
        adapter.modify_signing_dictionary(&mut dict);
        assert_eq!(dict, before);
    }
}
