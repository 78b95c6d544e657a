// arbiter-audit/src/verify.rs
// ============================================================================
// Module: Audit Chain Verification
// Description: Recomputes and checks the hash chain of a JSONL audit log,
//              optionally diffing it against a mirror file.
// Purpose: Back the `arbiter audit-verify` CLI command with a library
//          function that reports the first point of divergence.
// Dependencies: arbiter-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Verification re-derives every `record_hash` from its record's own
//! canonical JSON and checks `prev_hash` continuity across lines. When a
//! mirror path is given, the two files are additionally compared line by
//! line; any difference — including one flipped byte — is reported as the
//! first divergent line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use arbiter_core::fingerprint::fingerprint;
use arbiter_core::model::AuditRecord;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A verification failure, always anchored to the first offending line.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The file could not be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
    /// A line was not valid JSON or did not match [`AuditRecord`]'s shape.
    #[error("line {line} of {path} is not a valid audit record: {message}")]
    Malformed {
        /// Path being verified.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Underlying parse error message.
        message: String,
    },
    /// A record's `prev_hash` did not match the previous record's `record_hash`.
    #[error("line {line} of {path}: prev_hash does not match the previous record's record_hash")]
    ChainBroken {
        /// Path being verified.
        path: PathBuf,
        /// One-based line number of the offending record.
        line: usize,
    },
    /// A record's stored `record_hash` did not match its recomputed hash.
    #[error("line {line} of {path}: record_hash does not match the record's own content")]
    HashMismatch {
        /// Path being verified.
        path: PathBuf,
        /// One-based line number of the offending record.
        line: usize,
    },
    /// The mirror file has a different number of lines than the primary.
    #[error("mirror {mirror_path} has {mirror_lines} lines; primary {primary_path} has {primary_lines}")]
    MirrorLengthMismatch {
        /// Primary file path.
        primary_path: PathBuf,
        /// Number of lines in the primary file.
        primary_lines: usize,
        /// Mirror file path.
        mirror_path: PathBuf,
        /// Number of lines in the mirror file.
        mirror_lines: usize,
    },
    /// The mirror's line at this position differs byte-for-byte from the
    /// primary's.
    #[error("line {line}: mirror {mirror_path} diverges from primary {primary_path}")]
    MirrorDivergence {
        /// Primary file path.
        primary_path: PathBuf,
        /// Mirror file path.
        mirror_path: PathBuf,
        /// One-based line number of the first divergence.
        line: usize,
    },
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// A successful verification's summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of records checked in the primary file.
    pub records_verified: usize,
    /// Whether a mirror file was compared.
    pub mirror_checked: bool,
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verifies the hash chain of `path`, and, if `mirror_path` is given, checks
/// that the mirror is byte-for-byte identical to the primary.
///
/// # Errors
///
/// Returns the first [`VerifyError`] encountered: a malformed line, a broken
/// `prev_hash` link, a `record_hash` that does not match its own content, or
/// a mirror divergence.
pub fn verify_file(path: &Path, mirror_path: Option<&Path>) -> Result<VerifyReport, VerifyError> {
    let primary_lines = read_lines(path)?;
    let mut expected_prev = String::new();
    for (index, line) in primary_lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        let record: AuditRecord = serde_json::from_str(line).map_err(|err| VerifyError::Malformed {
            path: path.to_path_buf(),
            line: line_number,
            message: err.to_string(),
        })?;
        if record.prev_hash != expected_prev {
            return Err(VerifyError::ChainBroken {
                path: path.to_path_buf(),
                line: line_number,
            });
        }
        let recomputed = fingerprint(&record.hashable()).map_err(|err| VerifyError::Malformed {
            path: path.to_path_buf(),
            line: line_number,
            message: err.to_string(),
        })?;
        if recomputed != record.record_hash {
            return Err(VerifyError::HashMismatch {
                path: path.to_path_buf(),
                line: line_number,
            });
        }
        expected_prev = record.record_hash;
    }

    let records_verified = primary_lines.iter().filter(|line| !line.trim().is_empty()).count();

    let Some(mirror_path) = mirror_path else {
        return Ok(VerifyReport {
            records_verified,
            mirror_checked: false,
        });
    };

    let mirror_lines = read_lines(mirror_path)?;
    if mirror_lines.len() != primary_lines.len() {
        return Err(VerifyError::MirrorLengthMismatch {
            primary_path: path.to_path_buf(),
            primary_lines: primary_lines.len(),
            mirror_path: mirror_path.to_path_buf(),
            mirror_lines: mirror_lines.len(),
        });
    }
    for (index, (primary_line, mirror_line)) in primary_lines.iter().zip(mirror_lines.iter()).enumerate() {
        if primary_line != mirror_line {
            return Err(VerifyError::MirrorDivergence {
                primary_path: path.to_path_buf(),
                mirror_path: mirror_path.to_path_buf(),
                line: index + 1,
            });
        }
    }

    Ok(VerifyReport {
        records_verified,
        mirror_checked: true,
    })
}

/// Reads `path` into a vector of its lines, preserving empty trailing lines
/// as empty strings so line numbers stay aligned between files.
fn read_lines(path: &Path) -> Result<Vec<String>, VerifyError> {
    let contents = fs::read_to_string(path).map_err(|err| VerifyError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(contents.lines().map(str::to_string).collect())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
