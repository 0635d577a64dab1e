//! Error taxonomy for the stripefs workspace.
//!
//! One enum covers every failure the engine and the catalogs can report.
//! Two conditions from the striping protocol are deliberately *not* here:
//! a short write (a capped sink reached its per-fragment budget) and
//! end-of-stream (a descriptor's fragment list is exhausted). Both are
//! control signals, not failures, and travel in the success values of
//! the write/read calls instead.

use std::io;

/// Workspace-wide result alias.
pub type Result<T, E = StripeError> = std::result::Result<T, E>;

/// Every error condition in the striping engine and its catalogs.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// The referenced catalog location does not exist. Raised on open,
    /// remove, and rename of an unknown reference, and mid-read when a
    /// fragment's location is no longer resolvable.
    #[error("reference not found: {reference}")]
    NotFound { reference: String },

    /// Create was called on a reference already in use, or a registry
    /// rename targeted a name already registered.
    #[error("reference already exists: {reference}")]
    AlreadyExists { reference: String },

    /// A registry operation named a descriptor that is not present.
    #[error("unknown descriptor: {name}")]
    UnknownDescriptor { name: String },

    /// A write would exceed a backend's fixed capacity. Checked in full
    /// before any mutation: a failing write accepts zero bytes.
    #[error("capacity exceeded: {requested} bytes requested, {remaining} remaining")]
    CapacityExceeded { requested: usize, remaining: usize },

    /// The per-fragment budget is non-positive. A configuration error,
    /// distinct from `CapacityExceeded`.
    #[error("no space to write: fragment length must be at least 1")]
    NoSpaceToWrite,

    /// A descriptor with zero fragments was handed to a reader. An empty
    /// fragment list is the canonical broken/unreadable sentinel.
    #[error("empty descriptor: {name}")]
    EmptyDescriptor { name: String },

    /// Underlying filesystem failure from a directory-backed catalog.
    #[error("catalog I/O failure")]
    Io(#[from] io::Error),
}

/// A fragment write that failed partway. `written` counts the bytes the
/// sinks accepted before the failure; they are already recorded in the
/// descriptor.
#[derive(Debug, thiserror::Error)]
#[error("fragment write aborted after {written} bytes")]
pub struct WriteError {
    pub written: usize,
    #[source]
    pub source: StripeError,
}

/// A fragment read that failed partway. `filled` counts the bytes copied
/// into the caller's buffer before the failing fragment; they are valid.
#[derive(Debug, thiserror::Error)]
#[error("fragment read aborted after {filled} bytes")]
pub struct ReadError {
    pub filled: usize,
    #[source]
    pub source: StripeError,
}

impl StripeError {
    /// Wrap into a [`WriteError`] with the bytes already written.
    #[must_use]
    pub fn after_writing(self, written: usize) -> WriteError {
        WriteError {
            written,
            source: self,
        }
    }

    /// Wrap into a [`ReadError`] with the bytes already filled.
    #[must_use]
    pub fn after_filling(self, filled: usize) -> ReadError {
        ReadError {
            filled,
            source: self,
        }
    }
    /// Shorthand for [`StripeError::NotFound`].
    #[must_use]
    pub fn not_found(reference: impl Into<String>) -> Self {
        Self::NotFound {
            reference: reference.into(),
        }
    }

    /// Shorthand for [`StripeError::AlreadyExists`].
    #[must_use]
    pub fn already_exists(reference: impl Into<String>) -> Self {
        Self::AlreadyExists {
            reference: reference.into(),
        }
    }

    /// True for conditions that indicate a misconfigured session rather
    /// than a backend fault.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoSpaceToWrite)
    }
}
