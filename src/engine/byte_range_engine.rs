//! Append-only signature engine.
//!
//! The engine appends two objects after the source bytes: a signature field
//! and the signature dictionary it points to.
//!
//! ```text
//! 12 0 obj
//! << /FT /Sig /T (Sig1) /V 13 0 R >>
//! endobj
//! 13 0 obj
//! <<
//! /Type /Sig
//! /Filter /Adobe.PPKLite
//! /SubFilter /adbe.pkcs7.detached
//! /Contents <0000...0000> /ByteRange [0000000000 0000000512 0000064570 0000000011]
//! >>
//! endobj
//! ```
//!
//! The placeholder window starts at the `<` of `/Contents` and ends after the
//! `]` of `/ByteRange`.
//!
//! Keeping `/ByteRange` inside the excluded window makes the digest
//! independent of the reserved size, since the offsets are only known once
//! the placeholder length is fixed. ISO 32000 validators expect the gap
//! between the two ranges to be exactly the `/Contents` hex string, so files
//! written by this engine verify with [`SignatureVerifier`] but are not
//! expected to validate in third-party PDF readers.
//!
//! Each dictionary entry starts on its own line and string values escape line
//! breaks, so `\n/Contents <` marks the placeholder and never free text.
//!
//! [`SignatureVerifier`]: crate::signatures::SignatureVerifier

use super::{DocumentEngine, PreparedDocument};
use crate::error::{Error, Result};
use crate::signatures::{
    ByteRangeCalculator, ExternalSignature, PlaceholderReservation, SignatureDictionary,
    SignatureMetadata,
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

lazy_static! {
    /// Regex for finding "N G obj" headers
    static ref RE_OBJ_PATTERN: regex::bytes::Regex =
        regex::bytes::Regex::new(r"(\d+)\s+(\d+)\s+obj").unwrap();
}

/// Reference [`DocumentEngine`] that appends the signature field to the document.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteRangeEngine;

impl ByteRangeEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }

    /// Highest object number declared in `document`, or 0.
    fn max_object_number(document: &[u8]) -> u32 {
        RE_OBJ_PATTERN
            .captures_iter(document)
            .filter_map(|capture| {
                let num = capture.get(1)?;
                std::str::from_utf8(num.as_bytes()).ok()?.parse::<u32>().ok()
            })
            .max()
            .unwrap_or(0)
    }

    /// Offset of the `/T (name)` entry of a signature field.
    fn find_field_marker(document: &[u8], field_name: &str) -> Option<usize> {
        let marker = format!("/T ({})", escape_pdf_string(field_name));
        let marker = marker.as_bytes();
        if marker.len() > document.len() {
            return None;
        }
        document.windows(marker.len()).rposition(|window| window == marker)
    }

    fn build_field_object(field_id: u32, sig_id: u32, field_name: &str) -> String {
        format!(
            "{} 0 obj\n<< /FT /Sig /T ({}) /V {} 0 R >>\nendobj\n",
            field_id,
            escape_pdf_string(field_name),
            sig_id
        )
    }

    /// Signature dictionary text up to and including `/Contents `.
    fn build_signature_head(sig_id: u32, dict: &SignatureDictionary) -> String {
        let mut head = format!("{} 0 obj\n<<\n/Type /Sig\n", sig_id);

        if let Some(ref filter) = dict.filter {
            head.push_str(&format!("/Filter /{}\n", filter));
        }
        if let Some(ref sub_filter) = dict.sub_filter {
            head.push_str(&format!("/SubFilter /{}\n", sub_filter));
        }
        if let Some(ref name) = dict.name {
            head.push_str(&format!("/Name ({})\n", escape_pdf_string(name)));
        }
        if let Some(ref reason) = dict.reason {
            head.push_str(&format!("/Reason ({})\n", escape_pdf_string(reason)));
        }
        if let Some(ref location) = dict.location {
            head.push_str(&format!("/Location ({})\n", escape_pdf_string(location)));
        }
        if let Some(ref contact) = dict.contact_info {
            head.push_str(&format!("/ContactInfo ({})\n", escape_pdf_string(contact)));
        }
        if let Some(date) = dict.signing_date {
            head.push_str(&format!("/M ({})\n", format_pdf_date(&date)));
        }

        head.push_str("/Contents ");
        head
    }
}

impl DocumentEngine for ByteRangeEngine {
    fn reserve_external_signature(
        &self,
        document: &[u8],
        field_name: &str,
        estimated_container_size: usize,
        metadata: &SignatureMetadata,
        adapter: &mut ExternalSignature,
    ) -> Result<PreparedDocument> {
        if field_name.is_empty() {
            return Err(Error::InvalidPdf("Signature field name must not be empty".to_string()));
        }
        if estimated_container_size == 0 {
            return Err(Error::InvalidPdf("Reserved container size must be positive".to_string()));
        }
        if Self::find_field_marker(document, field_name).is_some() {
            return Err(Error::InvalidPdf(format!(
                "Signature field {} already exists",
                field_name
            )));
        }

        let field_id = Self::max_object_number(document).saturating_add(1);
        let sig_id = field_id.saturating_add(1);

        let mut dict = SignatureDictionary::from_metadata(metadata);
        adapter.modify_signing_dictionary(&mut dict);

        let calc = ByteRangeCalculator::new(estimated_container_size);
        let mut output = Vec::with_capacity(document.len() + calc.window_len() + 512);
        output.extend_from_slice(document);
        if !document.ends_with(b"\n") {
            output.push(b'\n');
        }
        output.extend_from_slice(Self::build_field_object(field_id, sig_id, field_name).as_bytes());
        output.extend_from_slice(Self::build_signature_head(sig_id, &dict).as_bytes());

        let window_offset = output.len();
        output.extend_from_slice(calc.generate_placeholder().as_bytes());
        output.extend_from_slice(b"\n>>\nendobj\n");

        let byte_range = calc.calculate_byte_range(output.len(), window_offset);
        calc.write_byte_range(&mut output, window_offset, &byte_range)?;
        ByteRangeCalculator::validate_byte_range(&byte_range, output.len())?;

        log::debug!(
            "Reserved {} bytes for {} at offset {}, ByteRange {:?}",
            estimated_container_size,
            field_name,
            window_offset,
            byte_range
        );

        let signed_bytes = ByteRangeCalculator::extract_signed_bytes(&output, &byte_range)?;
        let signature = adapter.sign(&signed_bytes)?;
        calc.insert_signature(&mut output, window_offset, &signature)?;

        Ok(PreparedDocument {
            bytes: output,
            reservation: PlaceholderReservation {
                field_name: field_name.to_string(),
                offset: window_offset,
                window_len: calc.window_len(),
                capacity: estimated_container_size,
                byte_range,
            },
        })
    }

    fn finalize_deferred_signature(
        &self,
        prepared: &[u8],
        field_name: &str,
        adapter: &mut ExternalSignature,
    ) -> Result<Vec<u8>> {
        let reservation = self.locate_signature(prepared, field_name)?;
        ByteRangeCalculator::validate_byte_range(&reservation.byte_range, prepared.len())?;

        let signed_bytes = ByteRangeCalculator::extract_signed_bytes(prepared, &reservation.byte_range)?;
        let container = adapter.sign(&signed_bytes)?;

        let calc = ByteRangeCalculator::new(reservation.capacity);
        let mut output = prepared.to_vec();
        calc.insert_signature(&mut output, reservation.offset, &container)?;

        log::debug!(
            "Injected {} byte container into {} ({} bytes reserved)",
            container.len(),
            field_name,
            reservation.capacity
        );
        Ok(output)
    }

    fn locate_signature(&self, document: &[u8], field_name: &str) -> Result<PlaceholderReservation> {
        let marker = Self::find_field_marker(document, field_name)
            .ok_or_else(|| Error::FieldNotFound(field_name.to_string()))?;
        let offset = ByteRangeCalculator::find_contents_offset(document, marker).ok_or_else(|| {
            Error::InvalidPdf(format!("No /Contents placeholder for field {}", field_name))
        })?;

        let calc = ByteRangeCalculator::measure_contents(document, offset)?;
        let byte_range = calc.parse_byte_range(document, offset)?;
        if byte_range[1] != offset || byte_range[2] != offset + calc.window_len() {
            return Err(Error::InvalidPdf(format!(
                "ByteRange {:?} does not exclude the placeholder at {}",
                byte_range, offset
            )));
        }

        Ok(PlaceholderReservation {
            field_name: field_name.to_string(),
            offset,
            window_len: calc.window_len(),
            capacity: calc.capacity(),
            byte_range,
        })
    }
}

/// Escape special characters in a PDF string.
fn escape_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 10);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a time as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
fn format_pdf_date(date: &DateTime<Utc>) -> String {
    format!("D:{}Z", date.format("%Y%m%d%H%M%S"))
}
