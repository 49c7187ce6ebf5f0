//! Deferred PDF signing tool
//!
//! Signs a PDF in three phases (placeholder + digest, CMS container, injection)
//! and optionally verifies the result.
//!
//! Usage:
//!   cargo run --release --bin sign_deferred -- --input doc.pdf --output signed.pdf
//!   cargo run --release --bin sign_deferred -- --input doc.pdf --output signed.pdf \
//!       --identity signer.pem --password secret --field Sig1 --reserve 32000 \
//!       --algorithm SHA256 --signing-time --verify
//!
//! Without `--identity` an ephemeral self-signed identity is generated;
//! `--export-identity <pem>` saves it (key encrypted when `--password` is set).
//! `--raw-digest` builds the known-invalid raw-digest container instead of a
//! conformant one.

use chrono::Utc;
use pdf_deferred_sign::config::default_field_name;
use pdf_deferred_sign::{
    ByteRangeEngine, DigestAlgorithm, IdentityProvider, PemIdentityProvider, SignatureVerifier,
    SignerIdentity, SigningConfig, SigningSession,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use zeroize::Zeroizing;

/// Key size of the generated identity when no bundle is given.
const EPHEMERAL_KEY_BITS: usize = 2048;

struct SignArgs {
    input: PathBuf,
    output: PathBuf,
    identity: Option<PathBuf>,
    export_identity: Option<PathBuf>,
    password: Option<Zeroizing<String>>,
    field: String,
    reserve: Option<usize>,
    algorithm: DigestAlgorithm,
    signing_time: bool,
    raw_digest: bool,
    verify: bool,
}

impl SignArgs {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut input = None;
        let mut output = None;
        let mut identity = None;
        let mut export_identity = None;
        let mut password = None;
        let mut field = default_field_name();
        let mut reserve = None;
        let mut algorithm = DigestAlgorithm::Sha256;
        let mut signing_time = false;
        let mut raw_digest = false;
        let mut verify = false;

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--input" | "--output" | "--identity" | "--export-identity" | "--password"
                | "--field" | "--reserve" | "--algorithm" => {
                    i += 1;
                    let value = args
                        .get(i)
                        .ok_or_else(|| format!("{} requires a value", flag))?
                        .clone();
                    match flag {
                        "--input" => input = Some(PathBuf::from(value)),
                        "--output" => output = Some(PathBuf::from(value)),
                        "--identity" => identity = Some(PathBuf::from(value)),
                        "--export-identity" => export_identity = Some(PathBuf::from(value)),
                        "--password" => password = Some(Zeroizing::new(value)),
                        "--field" => field = value,
                        "--reserve" => {
                            reserve = Some(
                                value
                                    .parse()
                                    .map_err(|_| format!("Invalid --reserve value: {}", value))?,
                            );
                        },
                        _ => {
                            algorithm = value.parse().map_err(|e| format!("{}", e))?;
                        },
                    }
                },
                "--signing-time" => signing_time = true,
                "--raw-digest" => raw_digest = true,
                "--verify" => verify = true,
                other => return Err(format!("Unknown argument: {}", other)),
            }
            i += 1;
        }

        Ok(Self {
            input: input.ok_or("--input is required")?,
            output: output.ok_or("--output is required")?,
            identity,
            export_identity,
            password,
            field,
            reserve,
            algorithm,
            signing_time,
            raw_digest,
            verify,
        })
    }

    fn load_identity(&self) -> pdf_deferred_sign::Result<SignerIdentity> {
        match &self.identity {
            Some(path) => PemIdentityProvider::new()
                .load_identity(path, self.password.as_deref().map(|p| p.as_str())),
            None => {
                log::warn!("No --identity given, using an ephemeral self-signed identity");
                SignerIdentity::generate_self_signed("Deferred Signer", EPHEMERAL_KEY_BITS)
            },
        }
    }
}

fn run(args: &SignArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() {
        fs::remove_file(&args.output)?;
    }

    let document = fs::read(&args.input)?;
    let identity = args.load_identity()?;
    if let Some(path) = &args.export_identity {
        let bundle = identity.to_pem_bundle(args.password.as_deref().map(|p| p.as_str()))?;
        fs::write(path, bundle.as_bytes())?;
        log::info!("Exported signer identity to {}", path.display());
    }

    let mut config = SigningConfig::new()
        .with_field_name(args.field.clone())
        .with_digest_algorithm(args.algorithm)
        .with_signing_time(args.signing_time);
    config = match args.reserve {
        Some(size) => config.with_reserved_size(size),
        None => config.with_reserved_size_for(&identity),
    };
    if args.signing_time {
        config.metadata.signing_date = Some(Utc::now());
    }

    let engine = ByteRangeEngine::new();
    let mut session = SigningSession::new(config);

    let digest = session.prepare(&engine, &document)?;
    println!("Digest ({}): {}", digest.algorithm().name(), digest.to_hex());

    let container = if args.raw_digest {
        session.sign_nonconformant_raw_digest(identity)?
    } else {
        session.sign(identity)?
    };
    println!("Container: {} bytes", container.len());

    let signed = session.finalize(&engine)?;
    fs::write(&args.output, &signed)?;
    println!("Signed PDF written to {}", args.output.display());

    if args.verify {
        let report = SignatureVerifier::new().verify_field(&signed, &args.field)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match SignArgs::from_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "Usage: sign_deferred --input <pdf> --output <pdf> [--identity <pem>] \
                 [--export-identity <pem>] [--password <pw>] [--field <name>] \
                 [--reserve <bytes>] [--algorithm <hash>] [--signing-time] [--raw-digest] [--verify]"
            );
            return ExitCode::from(2);
        },
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
