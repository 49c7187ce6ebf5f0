//! ByteRange calculation for PDF signatures.
//!
//! PDF digital signatures use a ByteRange array to specify which portions
//! of the document are covered by the signature. The signature itself is
//! stored in a placeholder that is excluded from the signed bytes.
//!
//! ## ByteRange Format
//!
//! The ByteRange is an array of four integers:
//! `[offset1, length1, offset2, length2]`
//!
//! Where:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset where the placeholder window begins
//! - `offset2` = byte offset where the placeholder window ends
//! - `length2` = remaining bytes to end of file
//!
//! ## Placeholder window
//!
//! The window holds the hex-encoded `/Contents` string followed by the
//! `/ByteRange` entry itself:
//!
//! ```text
//! <3082...000000> /ByteRange [0000000000 0000001234 0000066294 0000000011]
//! ```
//!
//! Keeping the array inside the window means the hashed bytes do not depend on
//! the reserved size, only on the document and the dictionary head and tail.
//! Every integer is written with a fixed width of ten digits so the window
//! length is known before the offsets are.

use crate::error::{Error, Result};

/// Width of each ByteRange integer.
const BYTE_RANGE_DIGITS: usize = 10;

/// Largest offset representable with [`BYTE_RANGE_DIGITS`] digits.
const MAX_BYTE_RANGE_VALUE: u64 = 9_999_999_999;

/// `/Contents` key as written at the start of a signature dictionary line.
///
/// PDF strings written by the engine escape line feeds, so this sequence
/// cannot occur inside `/Name`, `/Reason` or other free-text entries.
const CONTENTS_KEY: &[u8] = b"\n/Contents <";

/// Calculator for PDF signature byte ranges.
#[derive(Debug, Clone, Copy)]
pub struct ByteRangeCalculator {
    /// Container capacity in raw bytes
    capacity: usize,
}

impl ByteRangeCalculator {
    /// Create a new ByteRange calculator for a container of up to `capacity` bytes.
    ///
    /// The `/Contents` string takes `capacity * 2 + 2` characters because the
    /// container is hex-encoded and enclosed in angle brackets.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Container capacity in raw bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of the `/Contents` hex string including the angle brackets.
    pub fn contents_len(&self) -> usize {
        self.capacity * 2 + 2
    }

    /// Length of the whole placeholder window.
    pub fn window_len(&self) -> usize {
        self.contents_len() + Self::format_byte_range(&[0; 4]).len()
    }

    /// Generate the placeholder window text.
    ///
    /// The `/Contents` string is all zeros and the ByteRange is zeroed; the
    /// real offsets are written by [`ByteRangeCalculator::write_byte_range`].
    pub fn generate_placeholder(&self) -> String {
        format!(
            "<{}>{}",
            "0".repeat(self.capacity * 2),
            Self::format_byte_range(&[0; 4])
        )
    }

    /// Calculate the ByteRange array given the position of the window.
    ///
    /// # Arguments
    ///
    /// * `file_size` - Total size of the document
    /// * `window_offset` - Byte offset where the window starts (the `<`)
    pub fn calculate_byte_range(&self, file_size: usize, window_offset: usize) -> [usize; 4] {
        let after_window = window_offset + self.window_len();
        [0, window_offset, after_window, file_size.saturating_sub(after_window)]
    }

    /// Format a ByteRange entry with fixed-width integers.
    pub fn format_byte_range(byte_range: &[usize; 4]) -> String {
        format!(
            " /ByteRange [{:0w$} {:0w$} {:0w$} {:0w$}]",
            byte_range[0],
            byte_range[1],
            byte_range[2],
            byte_range[3],
            w = BYTE_RANGE_DIGITS
        )
    }

    /// Write the ByteRange entry into the window at `window_offset`.
    pub fn write_byte_range(
        &self,
        data: &mut [u8],
        window_offset: usize,
        byte_range: &[usize; 4],
    ) -> Result<()> {
        if byte_range.iter().any(|&v| v as u64 > MAX_BYTE_RANGE_VALUE) {
            return Err(Error::InvalidPdf(format!(
                "ByteRange value exceeds {} digits: {:?}",
                BYTE_RANGE_DIGITS, byte_range
            )));
        }
        let entry = Self::format_byte_range(byte_range);
        let start = window_offset + self.contents_len();
        let end = start + entry.len();
        if end > data.len() {
            return Err(Error::InvalidPdf(
                "ByteRange entry would exceed file bounds".to_string(),
            ));
        }
        data[start..end].copy_from_slice(entry.as_bytes());
        Ok(())
    }

    /// Extract the bytes to be signed from a PDF file.
    ///
    /// This returns the concatenation of the two ranges specified by ByteRange.
    pub fn extract_signed_bytes(pdf_data: &[u8], byte_range: &[usize; 4]) -> Result<Vec<u8>> {
        let [offset1, length1, offset2, length2] = *byte_range;

        if offset1 + length1 > pdf_data.len() {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range exceeds file size: {} + {} > {}",
                offset1,
                length1,
                pdf_data.len()
            )));
        }
        if offset2 + length2 > pdf_data.len() {
            return Err(Error::InvalidPdf(format!(
                "ByteRange second range exceeds file size: {} + {} > {}",
                offset2,
                length2,
                pdf_data.len()
            )));
        }

        let mut signed_bytes = Vec::with_capacity(length1 + length2);
        signed_bytes.extend_from_slice(&pdf_data[offset1..offset1 + length1]);
        signed_bytes.extend_from_slice(&pdf_data[offset2..offset2 + length2]);

        Ok(signed_bytes)
    }

    /// Check that a ByteRange covers the entire document except the window.
    pub fn validate_byte_range(byte_range: &[usize; 4], file_size: usize) -> Result<()> {
        let [offset1, length1, offset2, length2] = *byte_range;

        if offset1 != 0 {
            return Err(Error::InvalidPdf(format!("ByteRange must start at 0, got {}", offset1)));
        }

        let actual_end = offset2 + length2;
        if actual_end != file_size {
            return Err(Error::InvalidPdf(format!(
                "ByteRange must end at file size {}, got {}",
                file_size, actual_end
            )));
        }

        if length1 > offset2 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                length1, offset2
            )));
        }

        Ok(())
    }

    /// Find the `/Contents` value position after `from`.
    ///
    /// This searches for `/Contents <` at the start of a line and returns the
    /// offset of the opening angle bracket. The search runs to the end of the
    /// data.
    pub fn find_contents_offset(pdf_data: &[u8], from: usize) -> Option<usize> {
        let search_window = pdf_data.get(from..)?;
        let pos = search_window
            .windows(CONTENTS_KEY.len())
            .position(|window| window == CONTENTS_KEY)?;
        Some(from + pos + CONTENTS_KEY.len() - 1)
    }

    /// Measure the `/Contents` hex string starting at `contents_offset`.
    ///
    /// Returns the calculator matching the string's capacity.
    pub fn measure_contents(pdf_data: &[u8], contents_offset: usize) -> Result<Self> {
        if pdf_data.get(contents_offset) != Some(&b'<') {
            return Err(Error::InvalidPdf(format!(
                "Expected '<' at /Contents offset {}",
                contents_offset
            )));
        }
        let hex_len = pdf_data[contents_offset + 1..]
            .iter()
            .position(|&b| b == b'>')
            .ok_or_else(|| Error::InvalidPdf("Unterminated /Contents string".to_string()))?;
        if hex_len % 2 != 0 {
            return Err(Error::InvalidPdf(format!(
                "/Contents string has odd length {}",
                hex_len
            )));
        }
        Ok(Self::new(hex_len / 2))
    }

    /// Parse the fixed-width ByteRange entry that follows the `/Contents` string.
    pub fn parse_byte_range(&self, pdf_data: &[u8], contents_offset: usize) -> Result<[usize; 4]> {
        let start = contents_offset + self.contents_len();
        let entry_len = Self::format_byte_range(&[0; 4]).len();
        let entry = pdf_data
            .get(start..start + entry_len)
            .ok_or_else(|| Error::InvalidPdf("ByteRange entry truncated".to_string()))?;
        let text = std::str::from_utf8(entry)
            .map_err(|_| Error::InvalidPdf("ByteRange entry is not ASCII".to_string()))?;
        let inner = text
            .strip_prefix(" /ByteRange [")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| Error::InvalidPdf(format!("Malformed ByteRange entry: {}", text)))?;

        let mut values = [0usize; 4];
        let mut parts = inner.split(' ');
        for value in values.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| Error::InvalidPdf("ByteRange has fewer than 4 values".to_string()))?;
            *value = part
                .parse()
                .map_err(|_| Error::InvalidPdf(format!("Invalid ByteRange value: {}", part)))?;
        }
        Ok(values)
    }

    /// Replace the `/Contents` placeholder with the actual container.
    ///
    /// The container is hex-encoded and right-padded with `0` to fill the
    /// reserved string.
    pub fn insert_signature(
        &self,
        pdf_data: &mut [u8],
        contents_offset: usize,
        container: &[u8],
    ) -> Result<()> {
        if container.len() > self.capacity {
            return Err(Error::PlaceholderTooSmall {
                container_len: container.len(),
                reserved: self.capacity,
            });
        }

        if contents_offset + self.contents_len() > pdf_data.len() {
            return Err(Error::InvalidPdf(
                "Signature insertion would exceed file bounds".to_string(),
            ));
        }

        let mut sig_value = String::with_capacity(self.contents_len());
        sig_value.push('<');
        sig_value.push_str(&hex::encode_upper(container));
        let padding_needed = (self.capacity - container.len()) * 2;
        sig_value.extend(std::iter::repeat('0').take(padding_needed));
        sig_value.push('>');

        pdf_data[contents_offset..contents_offset + self.contents_len()]
            .copy_from_slice(sig_value.as_bytes());

        Ok(())
    }

    /// Decode the `/Contents` string back into bytes, trailing padding included.
    pub fn read_contents(&self, pdf_data: &[u8], contents_offset: usize) -> Result<Vec<u8>> {
        let hex_digits = pdf_data
            .get(contents_offset + 1..contents_offset + self.contents_len() - 1)
            .ok_or_else(|| Error::InvalidPdf("/Contents string truncated".to_string()))?;
        hex::decode(hex_digits)
            .map_err(|e| Error::InvalidPdf(format!("Invalid /Contents hex: {}", e)))
    }
}

impl Default for ByteRangeCalculator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RESERVED_SIZE)
    }
}
