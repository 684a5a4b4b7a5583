//! Centralized error handling for wirecode.
//!
//! Every failure in the library is reported through [`WireError`]; nothing in the
//! encode or decode paths panics. The enum is `Clone` and `PartialEq` so tests and
//! callers can match on exact conditions.
//!
//! ## Error Categories
//!
//! - **Version** ([`WireError::Version`]): the stream header announces a protocol
//!   version newer than the reader accepts. The stream is rejected before any field
//!   is parsed.
//! - **Structure** ([`WireError::Structure`]): marker mismatches, negative counts,
//!   unbalanced scopes or lengths that cannot be right.
//! - **Buffer exhaustion** ([`WireError::BufferExhausted`]): a read asked for more
//!   bytes than remain before the buffer limit, i.e. truncated input.
//! - **Unknown tag** ([`WireError::UnknownTag`]): a tag byte that the protocol's
//!   table does not map.
//! - **Schema depth** ([`WireError::SchemaDepth`]): schema expansion went deeper
//!   than the configured bound, which signals a cyclic or degenerate type.
//!
//! A type that the dispatch registry cannot resolve is *not* an error: the object
//! walker falls back to structural recursion. Values that cannot be reconstructed
//! (for example an enum constant the reader does not know) are logged and the
//! field is left absent.
//!
//! ## Example
//!
//! ```rust
//! use wirecode::{WireError, Result};
//!
//! fn classify(res: Result<()>) -> &'static str {
//!     match res {
//!         Ok(()) => "ok",
//!         Err(WireError::Version { .. }) => "too new",
//!         Err(WireError::BufferExhausted { .. }) => "truncated",
//!         Err(_) => "broken",
//!     }
//! }
//! # assert_eq!(classify(Ok(())), "ok");
//! ```

use std::fmt;

/// A specialized `Result` type for wirecode operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// The master error enum covering all failure domains in wirecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The stream's protocol version is not accepted by this reader.
    Version {
        /// Producer identifier found in the stream header.
        producer: String,
        /// `(major, minor, micro)` announced by the stream.
        found: (u8, u8, u8),
        /// `(major, minor)` the reader accepts at most.
        accepted: (u8, u8),
    },

    /// The byte stream violates the wire layout.
    ///
    /// Examples: an end marker whose trailing byte is wrong, a negative element
    /// count, a scope closed under a different name than it was opened with.
    Structure(String),

    /// A read needed more bytes than remain before the buffer limit.
    BufferExhausted {
        /// Bytes the operation needed.
        requested: usize,
        /// Bytes that were left.
        remaining: usize,
    },

    /// A tag byte with no entry in the protocol's tag table.
    UnknownTag {
        /// Name of the protocol that rejected the byte.
        protocol: &'static str,
        /// The offending byte.
        byte: u8,
    },

    /// Schema expansion exceeded the recursion bound.
    SchemaDepth {
        /// The type whose expansion hit the bound.
        type_name: String,
        /// The configured bound.
        max_depth: usize,
    },

    /// String payload bytes were not valid UTF-8.
    Encoding(String),

    /// A codec was handed a value of a different Rust type than it was registered for.
    TypeMismatch {
        /// Field being encoded or decoded.
        field: String,
        /// Type the codec expects.
        expected: String,
    },

    /// Logic error inside the library. Please report it with a reproduction.
    Internal(String),
}

impl WireError {
    pub(crate) fn exhausted(requested: usize, remaining: usize) -> Self {
        Self::BufferExhausted {
            requested,
            remaining,
        }
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version {
                producer,
                found,
                accepted,
            } => write!(
                f,
                "Version Error: stream from '{producer}' is {}.{}.{}, reader accepts up to {}.{}",
                found.0, found.1, found.2, accepted.0, accepted.1
            ),
            Self::Structure(s) => write!(f, "Structure Error: {s}"),
            Self::BufferExhausted {
                requested,
                remaining,
            } => write!(
                f,
                "Buffer Exhausted: needed {requested} bytes, {remaining} remaining"
            ),
            Self::UnknownTag { protocol, byte } => {
                write!(f, "Unknown Tag: byte {byte:#04x} is not mapped by {protocol}")
            }
            Self::SchemaDepth {
                type_name,
                max_depth,
            } => write!(
                f,
                "Schema Error: expanding '{type_name}' exceeded the maximum depth of {max_depth}"
            ),
            Self::Encoding(s) => write!(f, "Encoding Error: {s}"),
            Self::TypeMismatch { field, expected } => {
                write!(f, "Type Mismatch: field '{field}' is not a {expected}")
            }
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<std::string::FromUtf8Error> for WireError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
