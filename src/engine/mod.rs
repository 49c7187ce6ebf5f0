//! Document mutation engines.
//!
//! The signing session never edits a document itself. It drives a
//! [`DocumentEngine`] through two calls:
//!
//! 1. [`DocumentEngine::reserve_external_signature`] writes a new signature
//!    field with an empty placeholder and hands the ByteRange bytes to a
//!    capture adapter.
//! 2. [`DocumentEngine::finalize_deferred_signature`] finds that placeholder
//!    again and writes the bytes returned by an injection adapter into it.
//!
//! [`ByteRangeEngine`] is the bundled implementation: it appends the field and
//! signature dictionary after the source bytes and does not rewrite
//! cross-reference tables.

mod byte_range_engine;

pub use byte_range_engine::ByteRangeEngine;

use crate::error::Result;
use crate::signatures::{ExternalSignature, PlaceholderReservation, SignatureMetadata};

/// Document bytes with an empty signature placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDocument {
    /// Full document bytes
    pub bytes: Vec<u8>,
    /// Where the placeholder was written
    pub reservation: PlaceholderReservation,
}

/// Engine capable of reserving and filling signature placeholders.
pub trait DocumentEngine {
    /// Add signature field `field_name` with room for a container of
    /// `estimated_container_size` bytes.
    ///
    /// `adapter.modify_signing_dictionary` runs before the dictionary is
    /// written and `adapter.sign` receives the bytes covered by the ByteRange.
    fn reserve_external_signature(
        &self,
        document: &[u8],
        field_name: &str,
        estimated_container_size: usize,
        metadata: &SignatureMetadata,
        adapter: &mut ExternalSignature,
    ) -> Result<PreparedDocument>;

    /// Fill the placeholder of `field_name` with the bytes returned by `adapter.sign`.
    ///
    /// Every byte outside the `/Contents` string is left unchanged.
    fn finalize_deferred_signature(
        &self,
        prepared: &[u8],
        field_name: &str,
        adapter: &mut ExternalSignature,
    ) -> Result<Vec<u8>>;

    /// Find the placeholder of an existing signature field.
    fn locate_signature(&self, document: &[u8], field_name: &str) -> Result<PlaceholderReservation>;
}
