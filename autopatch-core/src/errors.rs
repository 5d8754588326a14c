//! errors.rs - Custom error types for the autopatch-core library.
//!
//! Errors in the pure stages (fingerprint, merge, triage) indicate violated
//! preconditions and abort the batch. Remediation-side failures are expected
//! steady-state outcomes and live in their own typed enums under
//! [`crate::remediation`]; they never abort a batch.

use thiserror::Error;

/// This enum represents all possible error types in the `autopatch-core`
/// library outside the remediation pipeline.
///
/// `#[non_exhaustive]` signals that new variants may be added in future
/// versions without a breaking change.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AutopatchError {
    #[error("Failed to parse findings batch: {0}")]
    FindingsParseError(#[from] serde_json::Error),

    #[error("Invalid policy configuration: {0}")]
    PolicyError(String),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}
