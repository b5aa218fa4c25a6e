//! Error kinds for the MIL engine.
//!
//! Five kinds, matching the five failure classes a host can observe:
//! [`MilError::InvalidSpec`], [`MilError::InvalidState`],
//! [`MilError::InvalidArgument`], [`MilError::TransientMiss`] and
//! [`MilError::RuntimeWarn`]. Only the first three are meant to be
//! surfaced as hard failures to a caller; `TransientMiss` is logged at
//! debug level by call sites and `RuntimeWarn` is logged as a warning —
//! neither aborts the operation that raised it.

use thiserror::Error;

/// The error type returned by fallible MIL operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MilError {
    /// A gesture or pointer-type expression cannot be interpreted: bad
    /// syntax, a name collision, or an attempt to mutate an immutable
    /// property after gesture creation.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// An operation was attempted in the wrong lifecycle state (starting
    /// an already-started ink, releasing capture for an uncaptured
    /// pointer, cancelling a completed ink).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An out-of-range or otherwise nonsensical argument (zoom limits,
    /// timeouts below the allowed minimum, pointer counts that don't
    /// match a resize gesture's required two pointers).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A non-error: the recognition window expired, a conditional
    /// predicate returned `false`, or a pointer type went unmatched.
    /// Callers log this at debug level rather than treating it as a
    /// failure.
    #[error("transient miss: {0}")]
    TransientMiss(String),

    /// A recoverable anomaly the operation can continue past (focus
    /// could not be moved, a platform quirk was observed). Callers log
    /// this as a warning and proceed.
    #[error("runtime warning: {0}")]
    RuntimeWarn(String),
}

impl MilError {
    /// `true` for the two non-fatal kinds ([`TransientMiss`],
    /// [`RuntimeWarn`]) that a caller should log and continue past
    /// rather than propagate as a hard failure.
    ///
    /// [`TransientMiss`]: MilError::TransientMiss
    /// [`RuntimeWarn`]: MilError::RuntimeWarn
    #[must_use]
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, MilError::TransientMiss(_) | MilError::RuntimeWarn(_))
    }
}

/// Convenience alias used throughout the crate.
pub type MilResult<T> = Result<T, MilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_spec_display() {
        let err = MilError::InvalidSpec("unknown kind 'stylus'".into());
        assert_eq!(err.to_string(), "invalid spec: unknown kind 'stylus'");
    }

    #[test]
    fn test_non_fatal_classification() {
        assert!(MilError::TransientMiss("timeout".into()).is_non_fatal());
        assert!(MilError::RuntimeWarn("focus".into()).is_non_fatal());
        assert!(!MilError::InvalidSpec("x".into()).is_non_fatal());
        assert!(!MilError::InvalidState("x".into()).is_non_fatal());
        assert!(!MilError::InvalidArgument("x".into()).is_non_fatal());
    }
}
