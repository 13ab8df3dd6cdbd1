//! Error types for stowage.
//!
//! This module provides strongly-typed errors with actionable context.
//! All errors carry the identifiers needed to diagnose a failure after the
//! fact (paths, offsets, expected vs. actual sizes) without re-running the
//! operation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stowage operations.
#[derive(Error, Debug)]
pub enum StowageError {
    /// An operating-system call against the backing file failed.
    #[error("E001: I/O failure during {op} at {path}: {cause}")]
    Io {
        /// The path of the backing file.
        path: PathBuf,
        /// The operation that failed (open, truncate, mmap, flush, ...).
        op: &'static str,
        /// Reason for the failure.
        cause: String,
    },

    /// An existing backing file failed header validation.
    #[error("E002: Corrupt header at {path}: {cause}")]
    CorruptHeader {
        /// The path of the rejected file.
        path: PathBuf,
        /// Which check failed and what was found.
        cause: String,
    },

    /// A read's requested range falls outside the mapped region.
    #[error("E003: Read out of bounds: position {position} + offset {offset} + length {length} exceeds capacity {capacity}")]
    OutOfRange {
        /// Requested position within the payload region.
        position: u64,
        /// Requested length in bytes.
        length: u64,
        /// Additional offset applied to the position.
        offset: u64,
        /// Total capacity at the time of the request.
        capacity: u64,
    },

    /// An operation exceeds the single-operation size ceiling.
    #[error("E004: Operation exceeds size ceiling: requested {requested}, ceiling {ceiling}")]
    TooLarge {
        /// The offending quantity (a length, or a position too large to address).
        requested: u64,
        /// The bound that was exceeded.
        ceiling: u64,
    },

    /// An internal consistency check failed.
    ///
    /// These indicate a bug or undetected corruption, never caller error.
    #[error("E005: Internal invariant violated in {what}: expected {expected}, got {actual}")]
    InvariantViolation {
        /// The check that failed.
        what: &'static str,
        /// The value the invariant requires.
        expected: u64,
        /// The value actually observed.
        actual: u64,
    },
}

impl StowageError {
    /// Get the error code (e.g., "E001").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "E001",
            Self::CorruptHeader { .. } => "E002",
            Self::OutOfRange { .. } => "E003",
            Self::TooLarge { .. } => "E004",
            Self::InvariantViolation { .. } => "E005",
        }
    }

    /// Check if this error leaves the handle usable.
    ///
    /// Recoverable errors reject one request; the caller can correct the
    /// arguments and retry on the same handle.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::TooLarge { .. })
    }

    /// Check if this error indicates corrupt or inconsistent storage.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::CorruptHeader { .. } | Self::InvariantViolation { .. }
        )
    }
}

/// Result type alias using `StowageError`.
pub type Result<T> = std::result::Result<T, StowageError>;
