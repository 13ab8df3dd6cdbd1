//! Growable, memory-mapped byte storage.
//!
//! A store is a single backing file mapped into memory. The first
//! [`HEADER_SIZE`] bytes identify the file and record its size; everything
//! after is payload, addressed from position 0 by callers.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Header (40 bytes: magic, version, capacity, reserved)│
//! ├──────────────────────────────────────────────────────┤
//! │ Payload (byte-addressable, position 0 starts here)   │
//! │                                                      │
//! │        grows in place as writes land past the end    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Durability
//!
//! Every write flushes its touched range before returning, and every grow
//! rewrites and flushes the header, so the file on disk is self-describing
//! at all times. Closing flushes the whole mapping; crash consistency
//! beyond that is up to the caller.

mod file;
mod header;

pub use file::MappedFile;
pub use header::{FileHeader, HeaderLayout, FORMAT_VERSION, HEADER_SIZE, MAGIC};

/// Smallest usable payload region in bytes.
pub const MIN_PAYLOAD_SIZE: usize = 4096;

/// Capacity of a freshly created backing file: header plus minimum payload.
pub const INITIAL_CAPACITY: u64 = (HEADER_SIZE + MIN_PAYLOAD_SIZE) as u64;

/// Upper bound on a single read or write, in bytes.
pub const MAX_IO_SIZE: u64 = 1_000_000_000;
