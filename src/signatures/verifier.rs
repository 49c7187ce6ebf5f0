//! PDF signature verification.
//!
//! This module checks detached CMS signatures against the bytes covered by
//! their ByteRange. Trust-chain building and revocation checks are not
//! performed; the embedded signer certificate is taken at face value.

use super::byterange::ByteRangeCalculator;
use super::container::{pkcs1v15_scheme, OID_MESSAGE_DIGEST, OID_SIGNED_DATA, OID_SIGNING_TIME};
use super::identity::certificate_public_key;
use super::types::{DigestAlgorithm, SignatureSubFilter, VerificationResult, VerificationStatus};
use crate::engine::{ByteRangeEngine, DocumentEngine};
use crate::error::Result;
use chrono::{TimeZone, Utc};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::UtcTime;
use der::{Decode, Encode, SliceReader};
use x509_cert::Certificate;

/// Line that opens a signature dictionary written by the engine.
const SIG_DICT_START: &[u8] = b"<<\n/Type /Sig\n";

/// `/SubFilter` key at the start of a dictionary line.
const SUB_FILTER_KEY: &[u8] = b"\n/SubFilter /";

/// Verifier for PDF digital signatures.
#[derive(Debug, Default, Clone)]
pub struct SignatureVerifier<E = ByteRangeEngine> {
    engine: E,
}

impl SignatureVerifier<ByteRangeEngine> {
    /// Create a verifier that locates fields with [`ByteRangeEngine`].
    pub fn new() -> Self {
        Self {
            engine: ByteRangeEngine::new(),
        }
    }
}

impl<E: DocumentEngine> SignatureVerifier<E> {
    /// Create a verifier that locates fields with `engine`.
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    /// Verify the signature stored in field `field_name`.
    ///
    /// Fails only when the field cannot be found or its placeholder is
    /// unreadable. A bad signature is reported through the result status.
    pub fn verify_field(&self, document: &[u8], field_name: &str) -> Result<VerificationResult> {
        let reservation = self.engine.locate_signature(document, field_name)?;

        if let Err(e) = ByteRangeCalculator::validate_byte_range(&reservation.byte_range, document.len())
        {
            let mut result = VerificationResult {
                status: VerificationStatus::Invalid,
                document_modified: true,
                ..VerificationResult::default()
            };
            result.signature_info.field_name = Some(field_name.to_string());
            result.signature_info.byte_range = reservation.byte_range.to_vec();
            result.messages.push(format!("ByteRange validation failed: {}", e));
            return Ok(result);
        }

        let signed_bytes = ByteRangeCalculator::extract_signed_bytes(document, &reservation.byte_range)?;
        let contents = ByteRangeCalculator::new(reservation.capacity)
            .read_contents(document, reservation.offset)?;

        let mut result = self.verify_container(&contents, &signed_bytes);
        result.signature_info.field_name = Some(field_name.to_string());
        result.signature_info.byte_range = reservation.byte_range.to_vec();
        result.signature_info.sub_filter = read_sub_filter(document, reservation.offset);

        log::info!("Verified field {}: {:?}", field_name, result.status);
        Ok(result)
    }

    /// Verify a DER container against the bytes it claims to sign.
    ///
    /// Bytes after the end of the DER structure (placeholder padding) are ignored.
    pub fn verify_container(&self, container: &[u8], signed_bytes: &[u8]) -> VerificationResult {
        let mut result = VerificationResult::default();

        let signed_data = match decode_signed_data(container) {
            Ok(signed_data) => signed_data,
            Err(message) => {
                result.status = VerificationStatus::Invalid;
                result.messages.push(message);
                return result;
            },
        };

        let Some(signer_info) = signed_data.signer_infos.0.get(0) else {
            result.status = VerificationStatus::Invalid;
            result.messages.push("Container has no signer info".to_string());
            return result;
        };

        let algorithm = match DigestAlgorithm::from_oid(&signer_info.digest_alg.oid) {
            Ok(algorithm) => algorithm,
            Err(e) => {
                result.status = VerificationStatus::Invalid;
                result.messages.push(e.to_string());
                return result;
            },
        };
        result.signature_info.digest_algorithm = Some(algorithm);

        let Some(certificate) = find_signer_certificate(&signed_data, signer_info) else {
            result.status = VerificationStatus::Invalid;
            result.messages.push("Signer certificate not embedded".to_string());
            return result;
        };
        describe_certificate(certificate, &mut result);

        let computed = algorithm.digest(signed_bytes);
        let (signed_content, message_digest) = match &signer_info.signed_attrs {
            Some(attrs) => {
                let message_digest = attrs
                    .iter()
                    .find(|attr| attr.oid == OID_MESSAGE_DIGEST)
                    .and_then(|attr| attr.values.get(0))
                    .map(|value| value.value().to_vec());
                result.signature_info.signing_time = attrs
                    .iter()
                    .find(|attr| attr.oid == OID_SIGNING_TIME)
                    .and_then(|attr| attr.values.get(0))
                    .and_then(|value| value.decode_as::<UtcTime>().ok())
                    .and_then(|time| {
                        Utc.timestamp_opt(time.to_unix_duration().as_secs() as i64, 0).single()
                    })
                    .map(|time| time.to_rfc3339());
                match attrs.to_der() {
                    Ok(der) => (der, message_digest),
                    Err(e) => {
                        result.status = VerificationStatus::Invalid;
                        result.messages.push(format!("Cannot encode signed attributes: {}", e));
                        return result;
                    },
                }
            },
            None => (signed_bytes.to_vec(), None),
        };

        if let Some(message_digest) = message_digest {
            if message_digest != computed {
                result.document_modified = true;
                result
                    .messages
                    .push("Message digest does not match the signed bytes".to_string());
            }
        } else if signer_info.signed_attrs.is_some() {
            result.document_modified = true;
            result.messages.push("Message digest attribute missing".to_string());
        }

        result.signature_valid = match certificate_public_key(certificate) {
            Ok(public_key) => {
                let hashed = algorithm.digest(&signed_content);
                public_key
                    .verify(pkcs1v15_scheme(algorithm), &hashed, signer_info.signature.as_bytes())
                    .is_ok()
            },
            Err(e) => {
                result.messages.push(e.to_string());
                false
            },
        };
        if !result.signature_valid {
            result
                .messages
                .push("Signature value does not verify with the signer certificate".to_string());
        }

        result.status = if !result.signature_valid || result.document_modified {
            VerificationStatus::Invalid
        } else if result.certificate_expired {
            result.messages.push("Certificate has expired".to_string());
            VerificationStatus::ValidWithWarnings
        } else {
            VerificationStatus::Valid
        };
        result
    }
}

fn decode_signed_data(container: &[u8]) -> std::result::Result<SignedData, String> {
    let mut reader =
        SliceReader::new(container).map_err(|e| format!("Malformed container: {}", e))?;
    let content_info =
        ContentInfo::decode(&mut reader).map_err(|e| format!("Malformed container: {}", e))?;
    if content_info.content_type != OID_SIGNED_DATA {
        return Err(format!("Unexpected content type {}", content_info.content_type));
    }
    content_info
        .content
        .decode_as::<SignedData>()
        .map_err(|e| format!("Malformed SignedData: {}", e))
}

fn find_signer_certificate<'a>(
    signed_data: &'a SignedData,
    signer_info: &SignerInfo,
) -> Option<&'a Certificate> {
    let certificates = signed_data.certificates.as_ref()?;
    certificates.0.iter().find_map(|choice| match choice {
        CertificateChoices::Certificate(cert) => {
            let tbs = &cert.tbs_certificate;
            let matches = match &signer_info.sid {
                SignerIdentifier::IssuerAndSerialNumber(id) => {
                    id.issuer == tbs.issuer && id.serial_number == tbs.serial_number
                },
                SignerIdentifier::SubjectKeyIdentifier(_) => false,
            };
            matches.then_some(cert)
        },
        _ => None,
    })
}

/// Fill the certificate fields of `result` from the signer certificate.
fn describe_certificate(certificate: &Certificate, result: &mut VerificationResult) {
    let der = match certificate.to_der() {
        Ok(der) => der,
        Err(e) => {
            result.messages.push(format!("Cannot encode certificate: {}", e));
            return;
        },
    };
    match x509_parser::parse_x509_certificate(&der) {
        Ok((_, cert)) => {
            let info = &mut result.signature_info;
            info.certificate_cn = cert
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
                .map(|cn| cn.to_string());
            info.certificate_issuer = Some(cert.issuer().to_string());
            info.valid_from = Some(cert.validity().not_before.to_string());
            info.valid_to = Some(cert.validity().not_after.to_string());
            result.certificate_expired = !cert.validity().is_valid();
        },
        Err(e) => {
            result.messages.push(format!("Cannot parse certificate: {}", e));
        },
    }
}

/// Read the `/SubFilter` name of the dictionary holding the placeholder at `offset`.
///
/// Only the dictionary enclosing `offset` is searched, from its opening line
/// up to the placeholder.
fn read_sub_filter(document: &[u8], offset: usize) -> Option<SignatureSubFilter> {
    let before = document.get(..offset)?;
    let dict_start = before
        .windows(SIG_DICT_START.len())
        .rposition(|window| window == SIG_DICT_START)?;
    let region = &before[dict_start..];
    let start = region
        .windows(SUB_FILTER_KEY.len())
        .position(|window| window == SUB_FILTER_KEY)?
        + SUB_FILTER_KEY.len();
    let name: Vec<u8> = region[start..]
        .iter()
        .take_while(|b| !b.is_ascii_whitespace() && **b != b'/')
        .copied()
        .collect();
    SignatureSubFilter::from_pdf_name(std::str::from_utf8(&name).ok()?)
}
