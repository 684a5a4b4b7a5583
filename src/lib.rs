//! # Wirecode
//!
//! A self-describing binary serialization engine for Rust objects.
//!
//! ## Overview
//!
//! Every field in a wirecode stream carries its own header: name, type tag and, where the
//! protocol records it, the payload length. A reader therefore does not need the writer's
//! type definitions to walk a stream. Fields it does not know are stepped over, fields it
//! expects but does not find keep their defaults, and two programs can evolve their types
//! independently.
//!
//! ### Key Features
//!
//! *   **Schema Trees:** Each type is described once. The description is expanded into an
//!     immutable tree (inherited base fields first, nested objects recursively) and cached
//!     for the life of the process.
//! *   **Two Protocols:** The native protocol records the length of every variable-size
//!     field. The compat protocol uses a single-byte tag table and entry counters, matching
//!     streams produced by the reference implementation's wire format.
//! *   **Pluggable Codecs:** Leaf fields are written by codecs looked up in a dispatch
//!     registry, by exact type first and by supertype second. Custom codecs can be registered
//!     for any type.
//! *   **Version Negotiation:** Stream headers carry a producer identifier and a
//!     `major.minor.micro` version. A reader rejects streams newer than it accepts.
//! *   **Two Buffers:** [`ByteBuffer`] moves values element by element; [`FastByteBuffer`]
//!     copies whole arrays as slices. Both produce identical bytes.
//!
//! ## Stream Layout
//!
//! ```text
//! [Root Start Marker] [Producer] [Description] [Major] [Minor] [Micro]
//!     [Field Header] [Payload]
//!     [Field Header] [Payload]
//!     [Start Marker "inner"] ... [End Marker "inner"]
//! [Root End Marker]
//! ```
//!
//! See [`format`] for the header layouts of each protocol.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wirecode::{Wirecode, WireObject, WireEnum};
//!
//! #[derive(Debug, Default, WireEnum)]
//! enum Mode { #[default] Idle, Running }
//!
//! #[derive(Debug, Default, WireObject)]
//! struct Status {
//!     mode: Mode,
//!     readings: Vec<f64>,
//!     #[wire(skip)]
//!     scratch: Vec<u8>,
//! }
//!
//! let bytes = Wirecode::encode(&Status::default())?;
//! let back: Status = Wirecode::decode(bytes)?;
//! ```
//!
//! Use [`Wirecode::builder`] to select the protocol, the buffer, the accepted version or a
//! custom codec registry, and [`Wirecode::inspect`] to print the field layout of any stream.
//!
//! ### Safety and Error Handling
//!
//! * **No Unsafe:** The crate forbids `unsafe` code.
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//!   Truncated or hostile input surfaces as an error, never as an out-of-bounds access.
//! * **Comprehensive Errors:** All failures correspond to a [`WireError`] variant.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// Lets generated code name `::wirecode` from inside this crate's own tests.
extern crate self as wirecode;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod buffer;
pub mod config;
pub mod data_type;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod inspector;
pub mod protocol;
pub mod reflect;
pub mod schema;
pub mod serialiser;
pub mod value;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
#[doc(hidden)]
pub mod rt;

// --- RE-EXPORTS ---

pub use api::{Wirecode, WirecodeBuilder};
pub use buffer::{ByteBuffer, FastByteBuffer, IoBuffer};
pub use config::{BufferKind, WireConfig};
pub use data_type::{Category, DataType};
pub use dispatch::{FieldCodec, KnownTypes};
pub use error::{Result, WireError};
pub use format::{FieldHeader, ParsedField, ProtocolInfo};
pub use inspector::{StreamInspector, StreamReport};
pub use protocol::{CompatProtocol, NativeProtocol, ProtocolKind, WireProtocol};
pub use reflect::{WireField, WireObject, WireReflect, WireType};
pub use schema::{SchemaCache, SchemaTree, TypeInfo, TypeRef};
pub use serialiser::ObjectSerialiser;
pub use value::{MultiArray, WireElement, WireEnum, WireValue};

// Re-export the derive macros so they are accessible as `wirecode::WireObject`
pub use wirecode_derive::{WireEnum, WireObject};
