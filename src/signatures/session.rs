//! Three-phase deferred signing session.
//!
//! ```text
//! Unsigned --prepare--> Prepared --sign--> Signed --finalize--> Finalized
//!     \                    \                  \
//!      +------------------- any error -------- +--> Failed
//! ```
//!
//! The digest, the reservation and the container are only reachable through
//! the session accessors, and only once the phase producing them has run.

use super::adapter::{DeferredInjection, DigestCapture, ExternalSignature};
use super::container::SignatureContainerBuilder;
use super::identity::SignerIdentity;
use super::types::{DocumentDigest, PlaceholderReservation, SignatureContainer};
use crate::config::SigningConfig;
use crate::engine::DocumentEngine;
use crate::error::{Error, Result};
use chrono::Utc;
use std::fmt;

/// Lifecycle state of a [`SigningSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing has run yet
    Unsigned,
    /// Placeholder reserved and digest captured
    Prepared,
    /// Container built
    Signed,
    /// Container injected; the signed document was returned
    Finalized,
    /// A phase failed; the session is unusable
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unsigned => "Unsigned",
            SessionState::Prepared => "Prepared",
            SessionState::Signed => "Signed",
            SessionState::Finalized => "Finalized",
            SessionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// One deferred signing run over one document.
///
/// # Example
///
/// ```no_run
/// use pdf_deferred_sign::{ByteRangeEngine, SignerIdentity, SigningConfig, SigningSession};
///
/// # fn main() -> pdf_deferred_sign::Result<()> {
/// let document = std::fs::read("input.pdf")?;
/// let identity = SignerIdentity::generate_self_signed("Example Signer", 2048)?;
/// let engine = ByteRangeEngine::new();
///
/// let mut session = SigningSession::new(SigningConfig::new().with_field_name("Sig1"));
/// session.prepare(&engine, &document)?;
/// session.sign(identity)?;
/// let signed = session.finalize(&engine)?;
/// std::fs::write("signed.pdf", signed)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SigningSession {
    config: SigningConfig,
    state: SessionState,
    prepared: Option<Vec<u8>>,
    reservation: Option<PlaceholderReservation>,
    digest: Option<DocumentDigest>,
    container: Option<SignatureContainer>,
}

impl SigningSession {
    /// Create a session in the `Unsigned` state.
    pub fn new(config: SigningConfig) -> Self {
        Self {
            config,
            state: SessionState::Unsigned,
            prepared: None,
            reservation: None,
            digest: None,
            container: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Digest captured in phase 1.
    pub fn digest(&self) -> Option<&DocumentDigest> {
        self.digest.as_ref()
    }

    /// Placeholder reserved in phase 1.
    pub fn reservation(&self) -> Option<&PlaceholderReservation> {
        self.reservation.as_ref()
    }

    /// Container built in phase 2.
    pub fn container(&self) -> Option<&SignatureContainer> {
        self.container.as_ref()
    }

    /// Intermediate document with the empty placeholder, kept until phase 3.
    pub fn prepared_document(&self) -> Option<&[u8]> {
        self.prepared.as_deref()
    }

    /// Phase 1: reserve the placeholder and capture the digest.
    pub fn prepare<E>(&mut self, engine: &E, document: &[u8]) -> Result<&DocumentDigest>
    where
        E: DocumentEngine + ?Sized,
    {
        self.expect_state(SessionState::Unsigned, "prepare the document")?;
        log::info!(
            "Preparing field {} ({} bytes reserved, {})",
            self.config.field_name,
            self.config.reserved_size,
            self.config.digest_algorithm.name()
        );

        let mut adapter = ExternalSignature::Capture(DigestCapture::new(
            self.config.digest_algorithm,
            self.config.metadata.filter.clone(),
            self.config.metadata.sub_filter,
        ));
        let prepared = engine
            .reserve_external_signature(
                document,
                &self.config.field_name,
                self.config.reserved_size,
                &self.config.metadata,
                &mut adapter,
            )
            .map_err(|e| self.fail(e))?;

        let digest = adapter
            .as_capture_mut()
            .and_then(|capture| capture.take_digest())
            .ok_or_else(|| {
                self.fail(Error::InvalidPdf(
                    "engine did not pass the signed bytes to the capture adapter".to_string(),
                ))
            })?;

        log::debug!(
            "Placeholder at offset {} ({} bytes), ByteRange {:?}",
            prepared.reservation.offset,
            prepared.reservation.window_len,
            prepared.reservation.byte_range
        );

        self.prepared = Some(prepared.bytes);
        self.reservation = Some(prepared.reservation);
        self.state = SessionState::Prepared;
        Ok(self.digest.insert(digest))
    }

    /// Phase 2: build a conformant container with `identity`.
    ///
    /// The identity, and with it the private key, is dropped before this returns.
    pub fn sign(&mut self, identity: SignerIdentity) -> Result<&SignatureContainer> {
        self.sign_with(identity, "sign", |builder, digest, identity| {
            builder.build(digest, identity)
        })
    }

    /// Phase 2 through the raw-digest path. The result never verifies.
    pub fn sign_nonconformant_raw_digest(
        &mut self,
        identity: SignerIdentity,
    ) -> Result<&SignatureContainer> {
        self.sign_with(identity, "sign with the raw digest", |builder, digest, identity| {
            builder.build_raw_digest_nonconformant(digest, identity)
        })
    }

    fn sign_with<F>(
        &mut self,
        identity: SignerIdentity,
        operation: &'static str,
        build: F,
    ) -> Result<&SignatureContainer>
    where
        F: FnOnce(&SignatureContainerBuilder, &DocumentDigest, &SignerIdentity) -> Result<SignatureContainer>,
    {
        self.expect_state(SessionState::Prepared, operation)?;
        let digest = match self.digest.as_ref() {
            Some(digest) => digest,
            None => {
                let state = self.state;
                return Err(self.fail(Error::InvalidStateTransition { state, operation }));
            },
        };

        let builder = SignatureContainerBuilder::new(self.config.digest_algorithm)
            .with_signing_time(self.config.include_signing_time.then(Utc::now));
        let built = build(&builder, digest, &identity);
        drop(identity);

        let container = built.map_err(|e| self.fail(e))?;
        log::info!(
            "Built {} byte container for field {}",
            container.len(),
            self.config.field_name
        );
        self.state = SessionState::Signed;
        Ok(self.container.insert(container))
    }

    /// Phase 3: inject the container and return the signed document.
    ///
    /// Fails with [`Error::PlaceholderTooSmall`] before the engine runs when the
    /// container exceeds the reservation.
    pub fn finalize<E>(&mut self, engine: &E) -> Result<Vec<u8>>
    where
        E: DocumentEngine + ?Sized,
    {
        self.expect_state(SessionState::Signed, "finalize")?;

        let (prepared, reservation, container) =
            match (&self.prepared, &self.reservation, &self.container) {
                (Some(prepared), Some(reservation), Some(container)) => {
                    (prepared, reservation, container)
                },
                _ => {
                    let state = self.state;
                    return Err(self.fail(Error::InvalidStateTransition {
                        state,
                        operation: "finalize",
                    }));
                },
            };

        if !reservation.fits(container.len()) {
            let err = Error::PlaceholderTooSmall {
                container_len: container.len(),
                reserved: reservation.capacity,
            };
            return Err(self.fail(err));
        }

        let mut adapter = ExternalSignature::Inject(DeferredInjection::new(container));
        let signed = engine
            .finalize_deferred_signature(prepared, &reservation.field_name, &mut adapter)
            .map_err(|e| self.fail(e))?;

        log::info!("Finalized field {} ({} bytes)", self.config.field_name, signed.len());
        self.prepared = None;
        self.container = None;
        self.state = SessionState::Finalized;
        Ok(signed)
    }

    fn expect_state(&mut self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        let state = self.state;
        log::warn!("Rejected '{}' in state {}", operation, state);
        Err(self.fail(Error::InvalidStateTransition { state, operation }))
    }

    /// Move to `Failed`, drop retained buffers and hand the error back.
    fn fail(&mut self, err: Error) -> Error {
        if self.state != SessionState::Finalized {
            log::warn!("Signing session for {} failed: {}", self.config.field_name, err);
            self.state = SessionState::Failed;
            self.prepared = None;
            self.reservation = None;
            self.digest = None;
            self.container = None;
        }
        err
    }
}

/// Run all three phases over `document` and return the signed bytes.
pub fn sign_document<E>(
    engine: &E,
    document: &[u8],
    identity: SignerIdentity,
    config: SigningConfig,
) -> Result<Vec<u8>>
where
    E: DocumentEngine + ?Sized,
{
    let mut session = SigningSession::new(config);
    session.prepare(engine, document)?;
    session.sign(identity)?;
    session.finalize(engine)
}
