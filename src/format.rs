//! Defines the logical layout of a wirecode stream.
//!
//! # Stream Layout
//! A stream is one root scope. It opens with a header block and is closed by the
//! root end marker; every field in between is prefixed by a field header:
//!
//! `[Root Start Marker] [Producer] [Description] [Major] [Minor] [Micro] [Field ...] [Root End Marker]`
//!
//! ## Field Anatomy
//! `[ Name ] [ Tag ] [ Length / Entry Count (optional) ] [ Payload ]`
//!
//! Which of the optional parts exist depends on the protocol and the tag; see
//! [`crate::protocol`]. Whatever the protocol, a decoded [`FieldHeader`] records
//! where its payload starts and how many bytes it spans, which is all a reader
//! needs to step over a field it does not understand.

use serde::Serialize;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::data_type::DataType;

/// Hash of a field name as used for schema matching.
///
/// xxHash64 with seed 0 over the UTF-8 bytes. The hash is never written to the
/// stream, so it only has to agree between a reader's schema and the names it parses.
pub fn hash_field_name(name: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(name.as_bytes());
    hasher.finish()
}

/// The decoded (or freshly written) prefix of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldHeader {
    /// Field name as it appears on the wire.
    pub name: String,
    /// [`hash_field_name`] of `name`.
    pub name_hash: u64,
    /// Protocol independent tag.
    pub data_type: DataType,
    /// Tag byte as written by the protocol that produced the stream.
    pub tag_byte: u8,
    /// Offset of the first byte of the header.
    pub header_start: usize,
    /// Offset of the first payload byte.
    pub data_start: usize,
    /// Payload size in bytes, `-1` when the stream does not record it.
    pub data_size: i32,
    /// Offset of the length placeholder, write side only.
    #[serde(skip)]
    pub(crate) length_offset: Option<usize>,
    /// Entry counter of a compat start marker.
    pub entries: Option<i32>,
}

impl FieldHeader {
    /// Creates a header with no size information yet.
    pub fn new(name: impl Into<String>, data_type: DataType, tag_byte: u8) -> Self {
        let name = name.into();
        Self {
            name_hash: hash_field_name(&name),
            name,
            data_type,
            tag_byte,
            header_start: 0,
            data_start: 0,
            data_size: -1,
            length_offset: None,
            entries: None,
        }
    }

    /// True if the payload size is recorded.
    pub fn has_known_size(&self) -> bool {
        self.data_size >= 0
    }

    /// Offset one past the last payload byte, when the size is known.
    pub fn data_end(&self) -> Option<usize> {
        usize::try_from(self.data_size)
            .ok()
            .map(|size| self.data_start + size)
    }

    /// True if this header opens a nested scope.
    pub fn is_start_marker(&self) -> bool {
        self.data_type == DataType::StartMarker
    }

    /// True if this header closes a nested scope.
    pub fn is_end_marker(&self) -> bool {
        self.data_type == DataType::EndMarker
    }

    /// True if `name` and `hash` identify this field.
    pub fn matches(&self, hash: u64, name: &str) -> bool {
        self.name_hash == hash && self.name == name
    }
}

/// One node of a parsed stream: a header plus, for scopes, its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedField {
    /// The field's header.
    pub header: FieldHeader,
    /// Fields of a nested scope, in stream order. The end marker is not a child.
    pub children: Vec<ParsedField>,
}

impl ParsedField {
    /// Wraps a header with no children.
    pub fn leaf(header: FieldHeader) -> Self {
        Self {
            header,
            children: Vec::new(),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Finds a direct child by name.
    pub fn child(&self, name: &str) -> Option<&ParsedField> {
        let hash = hash_field_name(name);
        self.children.iter().find(|c| c.header.matches(hash, name))
    }

    /// Follows a dot-separated path of child names.
    pub fn find(&self, path: &str) -> Option<&ParsedField> {
        path.split('.')
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Number of fields below this node, nested ones included.
    pub fn field_count(&self) -> usize {
        self.children.iter().map(|c| 1 + c.field_count()).sum()
    }

    /// Nesting depth of the deepest scope below this node.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .filter(|c| c.header.is_start_marker())
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }
}

/// Identity and version of the protocol that produced a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolInfo {
    /// Producer identifier, e.g. `wirecode-native`.
    pub producer: String,
    /// Free-text description written by the encoder.
    pub description: String,
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Micro version; never gates compatibility.
    pub micro: u8,
    /// Header of the root start marker.
    pub root: FieldHeader,
}

impl ProtocolInfo {
    /// `(major, minor, micro)`.
    pub fn version(&self) -> (u8, u8, u8) {
        (self.major, self.minor, self.micro)
    }

    /// True if a reader accepting up to `(major, minor)` may decode this stream.
    pub fn is_compatible(&self, major: u8, minor: u8) -> bool {
        self.major <= major && self.minor <= minor
    }
}
