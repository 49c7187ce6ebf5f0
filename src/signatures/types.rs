//! Digital signature types and data structures.
//!
//! This module defines the core types shared by the signing phases: digest
//! algorithms, signature format identifiers, the captured digest, the finished
//! container, the placeholder reservation and verification reports.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use der::asn1::ObjectIdentifier;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::ops::Range;

/// OID for SHA-1: 1.3.14.3.2.26
const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
/// OID for SHA-256: 2.16.840.1.101.3.4.2.1
const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
/// OID for SHA-384: 2.16.840.1.101.3.4.2.2
const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
/// OID for SHA-512: 2.16.840.1.101.3.4.2.3
const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

const OID_SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const OID_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const OID_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const OID_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

/// Digest algorithm used for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DigestAlgorithm {
    /// SHA-1 (deprecated, but still common in legacy PDFs)
    Sha1,
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => OID_SHA1,
            DigestAlgorithm::Sha256 => OID_SHA256,
            DigestAlgorithm::Sha384 => OID_SHA384,
            DigestAlgorithm::Sha512 => OID_SHA512,
        }
    }

    /// OID of `<hash>WithRSAEncryption` for this digest.
    pub fn rsa_signature_oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => OID_SHA1_WITH_RSA,
            DigestAlgorithm::Sha256 => OID_SHA256_WITH_RSA,
            DigestAlgorithm::Sha384 => OID_SHA384_WITH_RSA,
            DigestAlgorithm::Sha512 => OID_SHA512_WITH_RSA,
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Digest output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Parse an algorithm name such as `SHA256`, `SHA-256` or `sha256`.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SHA1" => Ok(DigestAlgorithm::Sha1),
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
        }
    }

    /// Look up a digest algorithm by its OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ]
        .into_iter()
        .find(|alg| alg.oid() == *oid)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest OID {}", oid)))
    }

    /// Compute the digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Signature handler (the `/Filter` entry).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignatureFilter {
    /// Adobe.PPKLite - the standard public-key handler
    #[default]
    AdobePpkLite,
    /// Any other handler name
    Custom(String),
}

impl SignatureFilter {
    /// Get the PDF name for this filter.
    pub fn as_pdf_name(&self) -> &str {
        match self {
            SignatureFilter::AdobePpkLite => "Adobe.PPKLite",
            SignatureFilter::Custom(name) => name.as_str(),
        }
    }
}

/// Signature sub-filter type (signature format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SignatureSubFilter {
    /// adbe.pkcs7.detached - PKCS#7 detached signature
    #[default]
    Pkcs7Detached,
    /// adbe.pkcs7.sha1 - PKCS#7 with SHA-1 digest
    Pkcs7Sha1,
    /// ETSI.CAdES.detached - PAdES CAdES signature
    CadesDetached,
}

impl SignatureSubFilter {
    /// Get the PDF name for this sub-filter.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SignatureSubFilter::Pkcs7Detached => "adbe.pkcs7.detached",
            SignatureSubFilter::Pkcs7Sha1 => "adbe.pkcs7.sha1",
            SignatureSubFilter::CadesDetached => "ETSI.CAdES.detached",
        }
    }

    /// Parse a PDF name into a sub-filter type.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "adbe.pkcs7.detached" => Some(SignatureSubFilter::Pkcs7Detached),
            "adbe.pkcs7.sha1" => Some(SignatureSubFilter::Pkcs7Sha1),
            "ETSI.CAdES.detached" => Some(SignatureSubFilter::CadesDetached),
            _ => None,
        }
    }
}

/// Entries written into the signature dictionary when the placeholder is reserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureMetadata {
    /// Signature handler (`/Filter`)
    pub filter: SignatureFilter,
    /// Signature format (`/SubFilter`)
    pub sub_filter: SignatureSubFilter,
    /// Name of the signer (if different from certificate CN)
    pub name: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Location where the document was signed
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Signing date written as `/M`
    pub signing_date: Option<DateTime<Utc>>,
}

impl SignatureMetadata {
    /// Metadata with the given filter and sub-filter and nothing else.
    pub fn new(filter: SignatureFilter, sub_filter: SignatureSubFilter) -> Self {
        Self {
            filter,
            sub_filter,
            ..Default::default()
        }
    }

    /// Set the reason for signing.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the contact information.
    pub fn with_contact_info(mut self, contact: impl Into<String>) -> Self {
        self.contact_info = Some(contact.into());
        self
    }

    /// Set the signer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record a signing date in the dictionary.
    pub fn with_signing_date(mut self, date: DateTime<Utc>) -> Self {
        self.signing_date = Some(date);
        self
    }
}

/// Digest of the document bytes outside the placeholder window.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentDigest {
    algorithm: DigestAlgorithm,
    bytes: Vec<u8>,
}

impl DocumentDigest {
    /// Compute the digest of `data`.
    pub fn compute(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        Self {
            algorithm,
            bytes: algorithm.digest(data),
        }
    }

    /// Wrap digest bytes produced elsewhere.
    pub fn from_bytes(algorithm: DigestAlgorithm, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != algorithm.output_len() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{} digest must be {} bytes, got {}",
                algorithm.name(),
                algorithm.output_len(),
                bytes.len()
            )));
        }
        Ok(Self { algorithm, bytes })
    }

    /// Algorithm that produced this digest.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl std::fmt::Debug for DocumentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentDigest({}:{})", self.algorithm.name(), self.to_hex())
    }
}

/// How a container was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerProfile {
    /// Signature computed over the DER-encoded authenticated attributes
    Conformant,
    /// Known-invalid: raw digest signed directly, attributes left unsigned
    RawDigestNonConformant,
}

/// A DER-encoded detached CMS `ContentInfo` carrying `SignedData`.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureContainer {
    bytes: Vec<u8>,
    digest_algorithm: DigestAlgorithm,
    profile: ContainerProfile,
}

impl SignatureContainer {
    pub(crate) fn new(
        bytes: Vec<u8>,
        digest_algorithm: DigestAlgorithm,
        profile: ContainerProfile,
    ) -> Self {
        Self {
            bytes,
            digest_algorithm,
            profile,
        }
    }

    /// DER bytes of the container.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the container and return its DER bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Digest algorithm recorded in the container.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Construction path of this container.
    pub fn profile(&self) -> ContainerProfile {
        self.profile
    }
}

impl std::fmt::Debug for SignatureContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureContainer")
            .field("bytes", &format!("{} bytes", self.bytes.len()))
            .field("digest_algorithm", &self.digest_algorithm)
            .field("profile", &self.profile)
            .finish()
    }
}

/// Placeholder reserved for the signature container inside a document.
///
/// The window is the stretch of document bytes excluded from the digest. The
/// container capacity is the number of raw container bytes the window can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderReservation {
    /// Signature field name
    pub field_name: String,
    /// Byte offset of the window (the `<` opening the `/Contents` string)
    pub offset: usize,
    /// Length of the window in document bytes
    pub window_len: usize,
    /// Container capacity in bytes
    pub capacity: usize,
    /// `[offset1, length1, offset2, length2]` covering everything outside the window
    pub byte_range: [usize; 4],
}

impl PlaceholderReservation {
    /// Document byte range excluded from the digest.
    pub fn window(&self) -> Range<usize> {
        self.offset..self.offset + self.window_len
    }

    /// Check whether a container of `len` bytes fits.
    pub fn fits(&self, len: usize) -> bool {
        len <= self.capacity
    }
}

/// Information about an existing signature in a PDF.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignatureInfo {
    /// Signature field name
    pub field_name: Option<String>,
    /// Signature sub-filter type
    pub sub_filter: Option<SignatureSubFilter>,
    /// Digest algorithm used by the signer
    pub digest_algorithm: Option<DigestAlgorithm>,
    /// Signing time from the authenticated attributes
    pub signing_time: Option<String>,
    /// Byte range of the signed data
    pub byte_range: Vec<usize>,
    /// Certificate subject common name
    pub certificate_cn: Option<String>,
    /// Certificate issuer
    pub certificate_issuer: Option<String>,
    /// Certificate validity start
    pub valid_from: Option<String>,
    /// Certificate validity end
    pub valid_to: Option<String>,
}

/// Result of signature verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// Overall verification status
    pub status: VerificationStatus,
    /// Signature information
    pub signature_info: SignatureInfo,
    /// Verification messages (errors, warnings)
    pub messages: Vec<String>,
    /// Whether the signed bytes no longer match the message digest
    pub document_modified: bool,
    /// Whether the signature value verifies against the certificate key
    pub signature_valid: bool,
    /// Whether the certificate has expired
    pub certificate_expired: bool,
}

impl Default for VerificationResult {
    fn default() -> Self {
        Self {
            status: VerificationStatus::Unknown,
            signature_info: SignatureInfo::default(),
            messages: Vec::new(),
            document_modified: false,
            signature_valid: false,
            certificate_expired: false,
        }
    }
}

/// Verification status of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationStatus {
    /// Signature is valid
    Valid,
    /// Signature is invalid (cryptographically)
    Invalid,
    /// Signature validity is unknown
    Unknown,
    /// Signature is valid but the certificate raised warnings
    ValidWithWarnings,
}

impl VerificationStatus {
    /// Check if the status indicates a valid signature.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationStatus::Valid)
    }

    /// Check if the status indicates any form of validity (including warnings).
    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationStatus::Valid | VerificationStatus::ValidWithWarnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_algorithm_names() {
        assert_eq!(DigestAlgorithm::Sha256.name(), "SHA-256");
        assert_eq!(DigestAlgorithm::Sha1.name(), "SHA-1");
    }

    #[test]
    fn test_digest_algorithm_from_name() {
        assert_eq!(DigestAlgorithm::from_name("SHA256").unwrap(), DigestAlgorithm::Sha256);
        assert_eq!(DigestAlgorithm::from_name("sha-384").unwrap(), DigestAlgorithm::Sha384);
        assert_eq!("SHA_512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert!(matches!(
            DigestAlgorithm::from_name("MD5"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_digest_algorithm_oid_lookup() {
        for alg in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(DigestAlgorithm::from_oid(&alg.oid()).unwrap(), alg);
            assert_eq!(alg.digest(b"abc").len(), alg.output_len());
        }
        let rsa = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
        assert!(DigestAlgorithm::from_oid(&rsa).is_err());
    }

    #[test]
    fn test_sha256_known_vector() {
        let digest = DocumentDigest::compute(DigestAlgorithm::Sha256, b"abc");
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_from_bytes_checks_length() {
        assert!(DocumentDigest::from_bytes(DigestAlgorithm::Sha256, vec![0; 32]).is_ok());
        assert!(DocumentDigest::from_bytes(DigestAlgorithm::Sha256, vec![0; 20]).is_err());
    }

    #[test]
    fn test_sub_filter_names() {
        assert_eq!(SignatureSubFilter::Pkcs7Detached.as_pdf_name(), "adbe.pkcs7.detached");
        assert_eq!(
            SignatureSubFilter::from_pdf_name("adbe.pkcs7.detached"),
            Some(SignatureSubFilter::Pkcs7Detached)
        );
        assert_eq!(SignatureSubFilter::from_pdf_name("ETSI.RFC3161"), None);
    }

    #[test]
    fn test_filter_names() {
        assert_eq!(SignatureFilter::AdobePpkLite.as_pdf_name(), "Adobe.PPKLite");
        assert_eq!(SignatureFilter::Custom("Entrust.PPKEF".into()).as_pdf_name(), "Entrust.PPKEF");
    }

    #[test]
    fn test_metadata_builder() {
        let meta = SignatureMetadata::default()
            .with_reason("Approval")
            .with_location("Zurich");
        assert_eq!(meta.filter, SignatureFilter::AdobePpkLite);
        assert_eq!(meta.reason, Some("Approval".to_string()));
        assert_eq!(meta.location, Some("Zurich".to_string()));
        assert!(meta.signing_date.is_none());
    }

    #[test]
    fn test_reservation_window() {
        let reservation = PlaceholderReservation {
            field_name: "Sig1".to_string(),
            offset: 100,
            window_len: 50,
            capacity: 20,
            byte_range: [0, 100, 150, 30],
        };
        assert_eq!(reservation.window(), 100..150);
        assert!(reservation.fits(20));
        assert!(!reservation.fits(21));
    }

    #[test]
    fn test_verification_status() {
        assert!(VerificationStatus::Valid.is_valid());
        assert!(!VerificationStatus::Invalid.is_valid());
        assert!(VerificationStatus::ValidWithWarnings.is_ok());
        assert!(!VerificationStatus::Unknown.is_valid());
    }

    #[test]
    fn test_container_debug_hides_bytes() {
        let container = SignatureContainer::new(
            vec![0x30, 0x03, 0x02, 0x01, 0x01],
            DigestAlgorithm::Sha256,
            ContainerProfile::Conformant,
        );
        let debug = format!("{:?}", container);
        assert!(debug.contains("5 bytes"));
        assert_eq!(container.len(), 5);
    }
}
