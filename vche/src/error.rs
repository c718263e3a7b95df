use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the verifying decoder refused a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// The decrypted values or the tag digests disagree with the verification object.
    TagMismatch,
    /// The verification object was produced under a different key.
    KeyMismatch,
    /// Slot count or accumulated degree no longer matches.
    ShapeMismatch,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::TagMismatch => "tag mismatch",
            FailureReason::KeyMismatch => "key mismatch",
            FailureReason::ShapeMismatch => "shape mismatch",
        };
        f.write_str(s)
    }
}

/// Decode-time detection of a corrupted or forged computation.
///
/// This is an expected outcome of decoding, not a programming error:
/// callers must treat the decoded integers as untrusted whenever it is returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("verification failed ({reason}): {detail}")]
pub struct VerificationFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl VerificationFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn tag_mismatch(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::TagMismatch, detail)
    }

    pub fn key_mismatch(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::KeyMismatch, detail)
    }

    pub fn shape_mismatch(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::ShapeMismatch, detail)
    }
}

/// Errors raised while encoding, evaluating or decoding.
#[derive(Debug, Error)]
pub enum VcheError {
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("key mismatch: operands are bound to different keys")]
    KeyMismatch,

    #[error("missing evaluation key: {0}")]
    MissingKey(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Verification(#[from] VerificationFailure),
}

impl VcheError {
    /// The verification failure carried by this error, if any.
    pub fn verification_failure(&self) -> Option<&VerificationFailure> {
        match self {
            VcheError::Verification(failure) => Some(failure),
            _ => None,
        }
    }

    pub(crate) fn shape(detail: impl Into<String>) -> Self {
        VcheError::ShapeMismatch(detail.into())
    }
}

/// Log a decode-time rejection and lift it into [`VcheError`].
pub(crate) fn reject(failure: VerificationFailure) -> VcheError {
    warn!("{failure}");
    VcheError::Verification(failure)
}

impl From<bincode::Error> for VcheError {
    fn from(err: bincode::Error) -> Self {
        VcheError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VcheError>;
