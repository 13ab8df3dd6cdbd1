//! Stowage Core Library
//!
//! This crate provides a growable, persistent, memory-mapped byte store:
//! one backing file per store, a fixed self-describing header, and
//! bounds-checked reads and writes addressed relative to the payload
//! region.
//!
//! # Key Components
//!
//! - **`MappedFile`**: the storage handle; shared reads, exclusive writes,
//!   in-place growth
//! - **Header codec**: fixed-width big-endian header with magic, version,
//!   and recorded capacity
//! - **`StowageError`**: typed failures with stable error codes
//!
//! # Example
//!
//! ```ignore
//! use stowage_core::MappedFile;
//!
//! let store = MappedFile::open_or_create("/tmp/stowage/data.bin")?;
//!
//! store.write(b"hello", 0)?;
//! let bytes = store.read(0, 5, 0)?;
//! assert_eq!(bytes, b"hello");
//!
//! store.close()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod store;

// Re-export key types at crate root for convenience
pub use error::{Result, StowageError};
pub use store::{
    FileHeader, HeaderLayout, MappedFile, FORMAT_VERSION, HEADER_SIZE, INITIAL_CAPACITY, MAGIC,
    MAX_IO_SIZE, MIN_PAYLOAD_SIZE,
};
