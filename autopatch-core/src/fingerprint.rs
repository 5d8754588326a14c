// autopatch-core/src/fingerprint.rs
//! Stable identity for findings across scanners.
//!
//! Two reports describe the same real-world vulnerability when they agree on
//! repository, package (or rule id), vulnerability id, and file path. The
//! fingerprint deliberately ignores severity, advisory text, and scanner
//! identity, since those legitimately differ between reports of the same
//! issue. It also ignores the observed installed version: the same CVE seen
//! at two versions in one file is the same dependency mid-upgrade.

use crate::finding::RawFinding;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-hash identity of a finding. Equal fingerprints mean "the same
/// vulnerability", regardless of which scanner produced the report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint for a finding.
///
/// The identity components are case-folded and pipe-joined before hashing so
/// the same four logical values always produce the same id. Missing fields
/// participate as empty strings rather than errors.
pub fn fingerprint(finding: &RawFinding) -> Fingerprint {
    fingerprint_parts(
        &finding.repo,
        finding.subject(),
        &finding.cve,
        finding.file.as_deref().unwrap_or(""),
    )
}

/// Hashes the four identity components directly. This is what [`fingerprint`]
/// delegates to; the merger uses it to re-derive identities for records that
/// are already canonical.
pub fn fingerprint_parts(repo: &str, subject: &str, vuln_id: &str, file: &str) -> Fingerprint {
    let joined = [repo, subject, vuln_id, file]
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .join("|");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}
