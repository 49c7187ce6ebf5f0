//! Detached CMS (PKCS#7) SignedData construction.
//!
//! The container is assembled field by field from the `cms` types so that the
//! output depends only on the digest, the identity and the signing time. The
//! signature covers the DER encoding of the authenticated attribute set, as
//! RFC 5652 §5.4 requires.
//!
//! ## Structure
//!
//! ```text
//! ContentInfo
//!   contentType = id-signedData
//!   content = SignedData
//!     version = 1
//!     digestAlgorithms = { hash }
//!     encapContentInfo = { id-data }         (detached, no content)
//!     certificates = signer + chain
//!     signerInfos = {
//!       version = 1, issuerAndSerialNumber, hash,
//!       signedAttrs = { content-type, message-digest, [signing-time] },
//!       <hash>WithRSAEncryption, signature
//!     }
//! ```

use super::identity::SignerIdentity;
use super::types::{ContainerProfile, DigestAlgorithm, DocumentDigest, SignatureContainer};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedAttributes, SignedData, SignerIdentifier,
    SignerInfo, SignerInfos,
};
use der::asn1::{Any, Null, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::Encode;
use rsa::Pkcs1v15Sign;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;
use std::time::SystemTime;
use x509_cert::attr::Attribute;

/// id-data
pub(crate) const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// id-signedData
pub(crate) const OID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// id-contentType
pub(crate) const OID_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// id-messageDigest
pub(crate) const OID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// id-signingTime
pub(crate) const OID_SIGNING_TIME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
/// rsaEncryption
pub(crate) const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Fixed ASN.1 framing allowance used by [`SignatureContainerBuilder::estimate_size`].
const ASN1_OVERHEAD: usize = 512;

/// Builder for detached CMS SignedData containers.
#[derive(Debug, Clone)]
pub struct SignatureContainerBuilder {
    algorithm: DigestAlgorithm,
    signing_time: Option<DateTime<Utc>>,
}

impl SignatureContainerBuilder {
    /// Create a builder for `algorithm` without a signing-time attribute.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            signing_time: None,
        }
    }

    /// Add (or remove) the signing-time authenticated attribute.
    pub fn with_signing_time(mut self, signing_time: Option<DateTime<Utc>>) -> Self {
        self.signing_time = signing_time;
        self
    }

    /// Digest algorithm of the containers this builder produces.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Build a conformant detached container over `digest`.
    ///
    /// The RSA PKCS#1 v1.5 signature is computed over the DER `SET OF`
    /// encoding of the authenticated attributes.
    pub fn build(&self, digest: &DocumentDigest, identity: &SignerIdentity) -> Result<SignatureContainer> {
        self.check_inputs(digest, identity)?;

        let signed_attrs = self.signed_attributes(digest.as_bytes())?;
        let attrs_der = signed_attrs.to_der()?;
        let signature = sign_prehashed(identity, self.algorithm, &self.algorithm.digest(&attrs_der))?;

        let bytes = self.assemble(
            identity,
            signed_attrs,
            algorithm_identifier(self.algorithm.rsa_signature_oid())?,
            signature,
        )?;
        log::debug!(
            "Built {} container: {} bytes, {} certificate(s)",
            self.algorithm.name(),
            bytes.len(),
            identity.certificates().count()
        );
        Ok(SignatureContainer::new(bytes, self.algorithm, ContainerProfile::Conformant))
    }

    /// Build a known-invalid container from a re-hashed raw digest.
    ///
    /// The digest is hashed again and that value is signed directly, without
    /// signing the authenticated attributes. The attributes carry the
    /// re-hashed value and the signature algorithm is plain `rsaEncryption`.
    /// Standard verification always rejects the result.
    pub fn build_raw_digest_nonconformant(
        &self,
        digest: &DocumentDigest,
        identity: &SignerIdentity,
    ) -> Result<SignatureContainer> {
        self.check_inputs(digest, identity)?;
        log::warn!("Building non-conformant raw-digest container");

        let rehashed = self.algorithm.digest(digest.as_bytes());
        let signature = sign_prehashed(identity, self.algorithm, &self.algorithm.digest(&rehashed))?;
        let signed_attrs = self.signed_attributes(&rehashed)?;

        let bytes = self.assemble(
            identity,
            signed_attrs,
            algorithm_identifier(OID_RSA_ENCRYPTION)?,
            signature,
        )?;
        Ok(SignatureContainer::new(
            bytes,
            self.algorithm,
            ContainerProfile::RawDigestNonConformant,
        ))
    }

    /// Upper bound for the container size produced for `identity`.
    ///
    /// Sums the certificate encodings, the issuer name and serial number
    /// repeated in the signer info, the RSA signature, the digest and a fixed
    /// allowance for the ASN.1 framing and attributes.
    pub fn estimate_size(&self, identity: &SignerIdentity) -> usize {
        let certificates: usize = identity
            .certificates()
            .map(|cert| cert.to_der().map(|der| der.len()).unwrap_or(ASN1_OVERHEAD))
            .sum();
        let tbs = &identity.certificate().tbs_certificate;
        let signer_id = tbs
            .issuer
            .to_der()
            .map(|der| der.len())
            .unwrap_or(ASN1_OVERHEAD)
            + tbs.serial_number.as_bytes().len();

        certificates + signer_id + identity.key_size() + self.algorithm.output_len() + ASN1_OVERHEAD
    }

    fn check_inputs(&self, digest: &DocumentDigest, identity: &SignerIdentity) -> Result<()> {
        if digest.algorithm() != self.algorithm {
            return Err(Error::UnsupportedAlgorithm(format!(
                "digest computed with {} but container uses {}",
                digest.algorithm().name(),
                self.algorithm.name()
            )));
        }
        identity.check_key_pair()
    }

    fn signed_attributes(&self, message_digest: &[u8]) -> Result<SignedAttributes> {
        let mut attributes = vec![
            attribute(OID_CONTENT_TYPE, Any::encode_from(&OID_DATA)?)?,
            attribute(
                OID_MESSAGE_DIGEST,
                Any::encode_from(&OctetString::new(message_digest.to_vec())?)?,
            )?,
        ];
        if let Some(time) = self.signing_time {
            let utc = UtcTime::from_system_time(SystemTime::from(time))?;
            attributes.push(attribute(OID_SIGNING_TIME, Any::encode_from(&utc)?)?);
        }
        Ok(SetOfVec::try_from(attributes)?)
    }

    fn assemble(
        &self,
        identity: &SignerIdentity,
        signed_attrs: SignedAttributes,
        signature_algorithm: AlgorithmIdentifierOwned,
        signature: Vec<u8>,
    ) -> Result<Vec<u8>> {
        let digest_alg = algorithm_identifier(self.algorithm.oid())?;
        let signer_cert = identity.certificate();

        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: signer_cert.tbs_certificate.issuer.clone(),
                serial_number: signer_cert.tbs_certificate.serial_number.clone(),
            }),
            digest_alg: digest_alg.clone(),
            signed_attrs: Some(signed_attrs),
            signature_algorithm,
            signature: OctetString::new(signature)?,
            unsigned_attrs: None,
        };

        let certificates = identity
            .certificates()
            .cloned()
            .map(CertificateChoices::Certificate)
            .collect::<Vec<_>>();

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![digest_alg])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: OID_DATA,
                econtent: None,
            },
            certificates: Some(CertificateSet(SetOfVec::try_from(certificates)?)),
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info])?),
        };

        let content_info = ContentInfo {
            content_type: OID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };
        Ok(content_info.to_der()?)
    }
}

/// PKCS#1 v1.5 padding scheme carrying the DigestInfo prefix for `algorithm`.
pub(crate) fn pkcs1v15_scheme(algorithm: DigestAlgorithm) -> Pkcs1v15Sign {
    match algorithm {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

fn sign_prehashed(identity: &SignerIdentity, algorithm: DigestAlgorithm, hashed: &[u8]) -> Result<Vec<u8>> {
    Ok(identity.private_key().sign(pkcs1v15_scheme(algorithm), hashed)?)
}

/// Algorithm identifier with explicit NULL parameters.
fn algorithm_identifier(oid: ObjectIdentifier) -> Result<AlgorithmIdentifierOwned> {
    Ok(AlgorithmIdentifierOwned {
        oid,
        parameters: Some(Any::encode_from(&Null)?),
    })
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Result<Attribute> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Tag, Tagged};
    use std::sync::OnceLock;

    fn identity() -> &'static SignerIdentity {
        static IDENTITY: OnceLock<SignerIdentity> = OnceLock::new();
        IDENTITY.get_or_init(|| SignerIdentity::generate_self_signed("Container Test", 1024).unwrap())
    }

    fn decode(container: &SignatureContainer) -> SignedData {
        let content_info = ContentInfo::from_der(container.as_bytes()).unwrap();
        assert_eq!(content_info.content_type, OID_SIGNED_DATA);
        content_info.content.decode_as::<SignedData>().unwrap()
    }

    #[test]
    fn test_key_too_small_for_digest_is_crypto_error() {
        // A 512-bit modulus cannot hold a PKCS#1 v1.5 encoded SHA-512 DigestInfo
        let small = SignerIdentity::generate_self_signed("Small Key", 512).unwrap();
        let digest = DocumentDigest::compute(DigestAlgorithm::Sha512, b"document bytes");
        let result = SignatureContainerBuilder::new(DigestAlgorithm::Sha512).build(&digest, &small);
        assert!(matches!(result, Err(Error::Crypto(_))));
    }

    #[test]
    fn test_build_conformant_container() {
        let digest = DocumentDigest::compute(DigestAlgorithm::Sha256, b"document bytes");
        let container = SignatureContainerBuilder::new(DigestAlgorithm::Sha256)
            .build(&digest, identity())
            .unwrap();

        assert_eq!(container.profile(), ContainerProfile::Conformant);
        assert_eq!(container.as_bytes()[0], 0x30);

        let signed_data = decode(&container);
        assert_eq!(signed_data.version, CmsVersion::V1);
        assert!(signed_data.encap_content_info.econtent.is_none());
        assert_eq!(signed_data.certificates.as_ref().unwrap().0.len(), 1);

        let signer_info = signed_data.signer_infos.0.get(0).unwrap();
        assert_eq!(signer_info.digest_alg.oid, DigestAlgorithm::Sha256.oid());
        assert_eq!(
            signer_info.signature_algorithm.oid,
            DigestAlgorithm::Sha256.rsa_signature_oid()
        );
        assert_eq!(signer_info.signature.as_bytes().len(), identity().key_size());

        let attrs = signer_info.signed_attrs.as_ref().unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.to_der().unwrap()[0], 0x31);
        let md = attrs.iter().find(|a| a.oid == OID_MESSAGE_DIGEST).unwrap();
        let value = md.values.get(0).unwrap();
        assert_eq!(value.tag(), Tag::OctetString);
        assert_eq!(value.value(), digest.as_bytes());
    }

    #[test]
    fn test_signing_time_attribute() {
        let digest = DocumentDigest::compute(DigestAlgorithm::Sha256, b"x");
        let time = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let container = SignatureContainerBuilder::new(DigestAlgorithm::Sha256)
            .with_signing_time(Some(time))
            .build(&digest, identity())
            .unwrap();

        let signed_data = decode(&container);
        let attrs = signed_data.signer_infos.0.get(0).unwrap().signed_attrs.clone().unwrap();
        assert_eq!(attrs.len(), 3);
        assert!(attrs.iter().any(|a| a.oid == OID_SIGNING_TIME));
    }

    #[test]
    fn test_build_is_deterministic_without_time() {
        let digest = DocumentDigest::compute(DigestAlgorithm::Sha384, b"same input");
        let builder = SignatureContainerBuilder::new(DigestAlgorithm::Sha384);
        let first = builder.build(&digest, identity()).unwrap();
        let second = builder.build(&digest, identity()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let digest = DocumentDigest::compute(DigestAlgorithm::Sha1, b"x");
        let result = SignatureContainerBuilder::new(DigestAlgorithm::Sha256).build(&digest, identity());
        assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_nonconformant_container_shape() {
        let digest = DocumentDigest::compute(DigestAlgorithm::Sha256, b"document bytes");
        let container = SignatureContainerBuilder::new(DigestAlgorithm::Sha256)
            .build_raw_digest_nonconformant(&digest, identity())
            .unwrap();
        assert_eq!(container.profile(), ContainerProfile::RawDigestNonConformant);

        let signed_data = decode(&container);
        let signer_info = signed_data.signer_infos.0.get(0).unwrap();
        assert_eq!(signer_info.signature_algorithm.oid, OID_RSA_ENCRYPTION);

        let attrs = signer_info.signed_attrs.as_ref().unwrap();
        let md = attrs.iter().find(|a| a.oid == OID_MESSAGE_DIGEST).unwrap();
        let rehashed = DigestAlgorithm::Sha256.digest(digest.as_bytes());
        assert_eq!(md.values.get(0).unwrap().value(), rehashed.as_slice());
    }

    #[test]
    fn test_estimate_covers_actual_size() {
        let time = Utc::now();
        for alg in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha512] {
            let builder = SignatureContainerBuilder::new(alg).with_signing_time(Some(time));
            let digest = DocumentDigest::compute(alg, b"estimate");
            let container = builder.build(&digest, identity()).unwrap();
            let estimate = builder.estimate_size(identity());
            assert!(container.len() <= estimate, "{} > {}", container.len(), estimate);
            assert!(estimate < container.len() * 2);
        }
    }
}
