//! Crate-wide error type.
//!
//! Mirrors the reference implementation's boolean-return convention for
//! recoverable failures (resource exhaustion, missing/duplicate lookups)
//! while invariant violations still go through `panic!`/`debug_assert!`
//! at the call site rather than being represented here — there is no
//! sensible recovery for a corrupted ring or a duplicate port number once
//! one is detected.

use core::fmt;

/// Recoverable failures surfaced by the public entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A port with this number already exists on the application.
    DuplicatePort,
    /// No port with this number exists on the application.
    UnknownPort,
    /// The attribute index is out of range for this application's table.
    InvalidIndex,
    /// Allocation of a new port or its machine array failed.
    OutOfMemory,
    /// The GMR multicast address table has no free slot and `find_unused`
    /// could not reclaim one.
    DatabaseFull,
    /// The PDU writer rejected a record (no space remaining in the buffer).
    PduFull,
    /// The PDU reader ran out of bytes mid-record.
    PduTruncated,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::DuplicatePort => "duplicate port number",
            Error::UnknownPort => "unknown port number",
            Error::InvalidIndex => "attribute index out of range",
            Error::OutOfMemory => "allocation failed",
            Error::DatabaseFull => "multicast address table full",
            Error::PduFull => "pdu buffer full",
            Error::PduTruncated => "pdu buffer truncated",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
