// src/inspector.rs

//! Tools for inspecting the structure of wirecode streams.
//! Useful for debugging interop with other producers and for verifying layouts.

use serde::Serialize;

use crate::data_type::DataType;
use crate::error::Result;
use crate::format::ParsedField;
use crate::protocol::{ProtocolKind, WireProtocol, parse_stream};

/// A structural report of a stream.
#[derive(Debug, Serialize)]
pub struct StreamReport {
    /// Protocol the stream was parsed with.
    pub protocol: ProtocolKind,
    /// Producer identifier from the header block.
    pub producer: String,
    /// Description from the header block.
    pub description: String,
    /// `(major, minor, micro)`.
    pub version: (u8, u8, u8),
    /// Bytes consumed by the stream.
    pub total_size: usize,
    /// Fields below the root, nested ones included.
    pub field_count: usize,
    /// Deepest scope nesting below the root.
    pub max_depth: usize,
    /// The root scope.
    pub root: FieldReport,
}

/// One field of a stream.
#[derive(Debug, Serialize)]
pub struct FieldReport {
    /// Field name.
    pub name: String,
    /// Tag.
    pub data_type: DataType,
    /// Raw tag byte.
    pub tag_byte: u8,
    /// Offset of the header.
    pub offset: usize,
    /// Recorded payload size; `None` when the stream does not record it.
    pub data_size: Option<usize>,
    /// Entry counter of compat scopes.
    pub entries: Option<i32>,
    /// Fields of a nested scope.
    pub children: Vec<FieldReport>,
}

impl From<&ParsedField> for FieldReport {
    fn from(field: &ParsedField) -> Self {
        let header = &field.header;
        Self {
            name: header.name.clone(),
            data_type: header.data_type,
            tag_byte: header.tag_byte,
            offset: header.header_start,
            data_size: usize::try_from(header.data_size).ok(),
            entries: header.entries,
            children: field.children.iter().map(FieldReport::from).collect(),
        }
    }
}

/// The stream inspector tool.
#[derive(Debug)]
pub struct StreamInspector;

impl StreamInspector {
    /// Parses the stream behind `proto` and returns a structural report.
    ///
    /// Values are stepped over, not decoded, so unknown types and foreign producers
    /// can be inspected as long as the stream is well-formed.
    pub fn inspect(proto: &mut dyn WireProtocol) -> Result<StreamReport> {
        let start = proto.buffer().position();
        let (info, root) = parse_stream(proto)?;
        Ok(StreamReport {
            protocol: proto.kind(),
            version: info.version(),
            producer: info.producer,
            description: info.description,
            total_size: proto.buffer().position() - start,
            field_count: root.field_count(),
            max_depth: root.depth(),
            root: FieldReport::from(&root),
        })
    }
}

impl std::fmt::Display for StreamReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== WIRECODE STREAM REPORT ===")?;
        writeln!(f, "Protocol:   {:?}", self.protocol)?;
        writeln!(f, "Producer:   {}", self.producer)?;
        let (major, minor, micro) = self.version;
        writeln!(f, "Version:    {major}.{minor}.{micro}")?;
        writeln!(f, "Size:       {}b", self.total_size)?;
        writeln!(f, "Fields:     {} (depth {})", self.field_count, self.max_depth)?;
        writeln!(f, "\n[FIELD LAYOUT]")?;
        self.root.fmt_recursive(f, "", true)
    }
}

impl FieldReport {
    fn fmt_recursive(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> std::fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last { "    " } else { "│   " };
        let size = self
            .data_size
            .map(|s| format!("{s}b"))
            .unwrap_or_else(|| "?".to_string());
        let entries = self
            .entries
            .map(|e| format!(" | Entries: {e}"))
            .unwrap_or_default();

        writeln!(
            f,
            "{}{}{} [{}] Size: {} | Offset: {}{}",
            prefix, connector, self.name, self.data_type, size, self.offset, entries
        )?;

        for (i, child) in self.children.iter().enumerate() {
            let is_last_child = i + 1 == self.children.len();
            child.fmt_recursive(f, &format!("{prefix}{child_prefix}"), is_last_child)?;
        }
        Ok(())
    }
}
