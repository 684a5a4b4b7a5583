//! Wire protocols: how headers, markers and strings are laid out in a buffer.
//!
//! Both protocols share the field shape `[name][tag][...]` and the header block
//! `[root start marker][producer][description][major][minor][micro]`; they differ in
//! their tag tables, their string encoding and in what follows a tag:
//!
//! | | native | compat |
//! |---|---|---|
//! | strings and names | UTF-8 | ISO-8859-1 |
//! | arrays | length placeholder, then dims | dims only, size derived on read |
//! | collections, maps, enums | length placeholder, then dims | length placeholder, then dims |
//! | start marker | scope length | entry counter |
//!
//! A decoded [`FieldHeader`] hides the difference: `data_start` and `data_size` are
//! enough to step over any field whose size is recorded. The free functions in this
//! module ([`parse_stream`], [`skip_field`]) work on either protocol through the
//! [`WireProtocol`] trait.

mod compat;
mod native;

pub use compat::{COMPAT_PRODUCER, COMPAT_VERSION, CompatProtocol, compat_array_code, compat_code, compat_tag};
pub use native::{NATIVE_PRODUCER, NATIVE_VERSION, NativeProtocol};

use serde::Serialize;
use tracing::trace;

use crate::buffer::IoBuffer;
use crate::data_type::DataType;
use crate::error::{Result, WireError};
use crate::format::{FieldHeader, ParsedField, ProtocolInfo};

/// Deepest scope nesting a reader follows before declaring the stream broken.
pub const MAX_SCOPE_DEPTH: usize = 256;

/// Which protocol produced a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ProtocolKind {
    /// UTF-8 strings, scope lengths.
    #[default]
    Native,
    /// ISO-8859-1 strings, entry counters, the compat tag table.
    Compat,
}

impl ProtocolKind {
    /// Guesses the protocol from the first field of a stream.
    ///
    /// The root start marker is tagged `0` natively and `17` in compat.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let len = bytes.get(0..4).map(|raw| {
            let mut prefix = [0u8; 4];
            prefix.copy_from_slice(raw);
            i32::from_le_bytes(prefix)
        })?;
        let tag_offset = 4 + usize::try_from(len).ok()?;
        match bytes.get(tag_offset)? {
            0 => Some(Self::Native),
            17 => Some(Self::Compat),
            _ => None,
        }
    }
}

/// Encoder and decoder of one wire protocol over an [`IoBuffer`].
///
/// The trait is object safe; value codecs receive `&mut dyn WireProtocol`.
pub trait WireProtocol: std::fmt::Debug + Send {
    /// Which protocol this is.
    fn kind(&self) -> ProtocolKind;

    /// Producer identifier written into the header block.
    fn producer(&self) -> &'static str;

    /// `(major, minor, micro)` this implementation writes.
    fn version(&self) -> (u8, u8, u8);

    /// The underlying buffer.
    fn buffer(&self) -> &dyn IoBuffer;

    /// The underlying buffer, mutably.
    fn buffer_mut(&mut self) -> &mut dyn IoBuffer;

    /// Byte code of `data_type` in this protocol's table.
    fn tag_byte(&self, data_type: DataType) -> u8;

    /// Tag of a byte code in this protocol's table.
    fn tag_from_byte(&self, byte: u8) -> Result<DataType>;

    // --- write side ---

    /// Writes the header block and opens the root scope named `root`.
    fn put_header_info(&mut self, root: &str, description: &str) -> Result<FieldHeader> {
        let header = self.put_start_marker(root)?;
        let producer = self.producer();
        let (major, minor, micro) = self.version();
        self.put_string(producer);
        self.put_string(description);
        let buffer = self.buffer_mut();
        buffer.put_u8(major);
        buffer.put_u8(minor);
        buffer.put_u8(micro);
        Ok(header)
    }

    /// Writes `[name][tag]` and, where the protocol needs one for `data_type`, a
    /// length placeholder.
    fn put_field_header(&mut self, name: &str, data_type: DataType) -> Result<FieldHeader>;

    /// Writes a field header followed by `[i32 nDims][i32 dim ...]`.
    fn put_array_header(&mut self, name: &str, data_type: DataType, dims: &[usize]) -> Result<FieldHeader>;

    /// Completes a field: backpatches its length placeholder and records its size.
    fn finish_field(&mut self, header: &mut FieldHeader) -> Result<()> {
        let position = self.buffer().position();
        let size = position.saturating_sub(header.data_start);
        header.data_size = i32::try_from(size)
            .map_err(|_| WireError::structure(format!("field '{}' exceeds i32 length", header.name)))?;
        if let Some(offset) = header.length_offset {
            self.buffer_mut().put_i32_at(offset, header.data_size)?;
        }
        Ok(())
    }

    /// Opens a nested scope.
    fn put_start_marker(&mut self, name: &str) -> Result<FieldHeader>;

    /// Closes the innermost scope, which must have been opened under `name`.
    fn put_end_marker(&mut self, name: &str) -> Result<FieldHeader>;

    /// Writes a string in the protocol's encoding.
    fn put_string(&mut self, value: &str);

    /// Writes a string array in the protocol's encoding.
    fn put_string_array(&mut self, values: &[String]);

    /// Writes one tag byte.
    fn put_data_type(&mut self, data_type: DataType) {
        let byte = self.tag_byte(data_type);
        self.buffer_mut().put_u8(byte);
    }

    // --- read side ---

    /// Reads and validates the header block.
    ///
    /// Version compatibility is left to the caller.
    fn get_header_info(&mut self) -> Result<ProtocolInfo> {
        let root = self.get_field_header()?;
        if !root.is_start_marker() {
            return Err(WireError::structure(format!(
                "stream opens with {} '{}' instead of a start marker",
                root.data_type, root.name
            )));
        }
        let producer = self.get_string()?;
        let description = self.get_string()?;
        let buffer = self.buffer_mut();
        let major = buffer.get_u8()?;
        let minor = buffer.get_u8()?;
        let micro = buffer.get_u8()?;
        Ok(ProtocolInfo {
            producer,
            description,
            major,
            minor,
            micro,
            root,
        })
    }

    /// Reads the next field header; the position is left at `data_start`.
    fn get_field_header(&mut self) -> Result<FieldHeader>;

    /// Reads `[i32 nDims][i32 dim ...]`.
    fn get_array_dims(&mut self) -> Result<Vec<usize>> {
        let buffer = self.buffer_mut();
        let n = buffer.get_count(4)?;
        (0..n)
            .map(|_| {
                let dim = buffer.get_i32()?;
                usize::try_from(dim)
                    .map_err(|_| WireError::structure(format!("negative array dimension {dim}")))
            })
            .collect()
    }

    /// Reads a string in the protocol's encoding.
    fn get_string(&mut self) -> Result<String>;

    /// Reads a string array in the protocol's encoding.
    fn get_string_array(&mut self) -> Result<Vec<String>>;

    /// Reads one tag byte.
    fn get_data_type(&mut self) -> Result<DataType> {
        let byte = self.buffer_mut().get_u8()?;
        self.tag_from_byte(byte)
    }
}

/// Parses a whole stream into its header and field tree.
///
/// Non-scope fields are not decoded, only stepped over.
pub fn parse_stream(proto: &mut dyn WireProtocol) -> Result<(ProtocolInfo, ParsedField)> {
    let info = proto.get_header_info()?;
    let root = parse_scope(proto, info.root.clone(), 0)?;
    Ok((info, root))
}

/// Parses the fields of a scope whose start marker has just been read.
pub fn parse_scope(proto: &mut dyn WireProtocol, header: FieldHeader, depth: usize) -> Result<ParsedField> {
    if depth > MAX_SCOPE_DEPTH {
        return Err(WireError::structure(format!(
            "scope '{}' nested deeper than {MAX_SCOPE_DEPTH}",
            header.name
        )));
    }
    let mut node = ParsedField::leaf(header);
    loop {
        let child = proto.get_field_header()?;
        match child.data_type {
            DataType::EndMarker => {
                check_scope_end(&node.header, &child)?;
                break;
            }
            DataType::StartMarker => {
                let nested = parse_scope(proto, child, depth + 1)?;
                node.children.push(nested);
            }
            _ => {
                skip_payload(proto, &child)?;
                node.children.push(ParsedField::leaf(child));
            }
        }
    }
    check_scope_balance(proto, &node)?;
    Ok(node)
}

fn check_scope_end(scope: &FieldHeader, end: &FieldHeader) -> Result<()> {
    if scope.name != end.name {
        return Err(WireError::structure(format!(
            "scope '{}' closed by end marker '{}'",
            scope.name, end.name
        )));
    }
    Ok(())
}

/// Verifies a parsed scope against what its start marker announced.
fn check_scope_balance(proto: &dyn WireProtocol, node: &ParsedField) -> Result<()> {
    if let Some(entries) = node.header.entries {
        let expected = usize::try_from(entries - 1).unwrap_or(0);
        if node.children.len() != expected {
            return Err(WireError::structure(format!(
                "scope '{}' announced {entries} entries, found {} fields",
                node.header.name,
                node.children.len()
            )));
        }
    }
    if let Some(end) = node.header.data_end()
        && proto.buffer().position() != end
    {
        return Err(WireError::structure(format!(
            "scope '{}' ends at {}, its length says {end}",
            node.header.name,
            proto.buffer().position()
        )));
    }
    Ok(())
}

/// Steps over a field whose header has just been read, nested scopes included.
pub fn skip_field(proto: &mut dyn WireProtocol, header: FieldHeader) -> Result<()> {
    trace!(field = %header.name, data_type = %header.data_type, "skipping field");
    if header.is_start_marker() {
        parse_scope(proto, header, 0)?;
        return Ok(());
    }
    skip_payload(proto, &header)
}

/// Steps over the payload of a non-scope field.
///
/// Uses the recorded size when there is one and decodes element by element otherwise.
pub fn skip_payload(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<()> {
    match header.data_end() {
        Some(end) => {
            let limit = proto.buffer().limit();
            if end > limit {
                return Err(WireError::exhausted(end - header.data_start, limit.saturating_sub(header.data_start)));
            }
            proto.buffer_mut().set_position(end)
        }
        None => swallow(proto, header),
    }
}

/// Consumes a payload of unknown length by decoding it.
fn swallow(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<()> {
    trace!(field = %header.name, data_type = %header.data_type, "swallowing payload of unknown length");
    let data_type = header.data_type;
    match data_type {
        DataType::String => proto.get_string().map(drop),
        t if t.is_scalar() => swallow_fixed(proto, t),
        t if t.is_array() => {
            proto.get_array_dims()?;
            swallow_elements(proto, t.element_type().unwrap_or(DataType::Other))
        }
        t if t.is_collection() => {
            proto.get_array_dims()?;
            let element = proto.get_data_type()?;
            swallow_elements(proto, element)
        }
        DataType::Map => {
            proto.get_array_dims()?;
            let key = proto.get_data_type()?;
            let value = proto.get_data_type()?;
            swallow_elements(proto, key)?;
            swallow_elements(proto, value)
        }
        DataType::Enum => {
            proto.get_array_dims()?;
            for _ in 0..4 {
                proto.get_string()?;
            }
            proto.buffer_mut().get_i32().map(drop)
        }
        _ => Err(WireError::structure(format!(
            "field '{}' of type {data_type} has no recorded length and cannot be skipped",
            header.name
        ))),
    }
}

fn swallow_fixed(proto: &mut dyn WireProtocol, data_type: DataType) -> Result<()> {
    let size = data_type
        .primitive_size()
        .ok_or_else(|| WireError::Internal(format!("{data_type} has no fixed size")))?;
    proto.buffer_mut().skip(size)
}

fn swallow_elements(proto: &mut dyn WireProtocol, element: DataType) -> Result<()> {
    if element == DataType::String {
        return proto.get_string_array().map(drop);
    }
    let size = element.primitive_size().ok_or_else(|| {
        WireError::structure(format!("collection element type {element} cannot be skipped"))
    })?;
    let buffer = proto.buffer_mut();
    let count = buffer.get_count(size)?;
    buffer.skip(count * size)
}
