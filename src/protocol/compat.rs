//! The compat protocol.
//!
//! Shape-compatible with the native protocol but with the tag table, string
//! encoding and scope bookkeeping of the external format:
//!
//! ```text
//! field header: [iso string name][u8 tag]
//! array:        header + [i32 nDims][i32 dim ...] + [i32 count][elements]
//! compound:     header + [i32 length][i32 nDims][i32 dim ...] + tag specific payload
//! start marker: header + [i32 nEntries]
//! end marker:   [iso string name][u8 END][u8 END]
//! ```
//!
//! Arrays carry no length; the reader derives it from the dimension descriptor and
//! the element count. Every header written inside a scope, the scope's own end
//! marker included, bumps that scope's entry counter, which is backpatched when the
//! scope closes.

use tracing::trace;

use super::native::put_dims;
use super::{ProtocolKind, WireProtocol};
use crate::buffer::{IoBuffer, MIN_STRING_SIZE};
use crate::data_type::DataType;
use crate::error::{Result, WireError};
use crate::format::FieldHeader;

/// Producer identifier of the compat protocol.
pub const COMPAT_PRODUCER: &str = "wirecode-compat";

/// Version written by this implementation.
pub const COMPAT_VERSION: (u8, u8, u8) = (1, 0, 0);

const START_MARKER: u8 = 17;
const ARRAY_1D: u8 = 9;
const ARRAY_2D: u8 = 18;
const ARRAY_ND: u8 = 26;
const CHAR: u8 = 201;
const CHAR_ARRAY_1D: u8 = 202;
const CHAR_ARRAY_2D: u8 = 203;
const CHAR_ARRAY_ND: u8 = 204;

/// Scalar tags in table order; array codes are offsets into the same order.
const SCALARS: [DataType; 8] = [
    DataType::Bool,
    DataType::Byte,
    DataType::Short,
    DataType::Int,
    DataType::Long,
    DataType::Float,
    DataType::Double,
    DataType::String,
];

const COMPOUNDS: [(DataType, u8); 8] = [
    (DataType::Collection, 0xE0),
    (DataType::List, 0xE1),
    (DataType::Set, 0xE2),
    (DataType::Queue, 0xE3),
    (DataType::Map, 0xE4),
    (DataType::Enum, 0xE5),
    (DataType::Other, 0xFD),
    (DataType::EndMarker, 0xFE),
];

fn scalar_index(data_type: DataType) -> Option<u8> {
    SCALARS
        .iter()
        .position(|t| *t == data_type)
        .and_then(|i| u8::try_from(i).ok())
}

/// Compat byte code of a tag. Arrays get their 1-D code.
pub fn compat_code(data_type: DataType) -> u8 {
    compat_array_code(data_type, 1)
}

/// Compat byte code of a tag written with `dims` dimensions.
pub fn compat_array_code(data_type: DataType, dims: usize) -> u8 {
    if data_type == DataType::StartMarker {
        return START_MARKER;
    }
    if data_type == DataType::Char {
        return CHAR;
    }
    if data_type == DataType::CharArray {
        return match dims {
            0 | 1 => CHAR_ARRAY_1D,
            2 => CHAR_ARRAY_2D,
            _ => CHAR_ARRAY_ND,
        };
    }
    if let Some(i) = scalar_index(data_type) {
        return i;
    }
    if let Some(i) = data_type.element_type().and_then(scalar_index) {
        let base = match dims {
            0 | 1 => ARRAY_1D,
            2 => ARRAY_2D,
            _ => ARRAY_ND,
        };
        return base + i;
    }
    COMPOUNDS
        .iter()
        .find(|(t, _)| *t == data_type)
        .map_or(0xFD, |(_, code)| *code)
}

/// Tag of a compat byte code; all array codes of one element type map to one tag.
pub fn compat_tag(byte: u8) -> Result<DataType> {
    let unknown = WireError::UnknownTag {
        protocol: "compat",
        byte,
    };
    let array_of = |offset: u8| {
        SCALARS
            .get(usize::from(offset))
            .and_then(|t| t.array_type())
    };
    let found = match byte {
        0..=7 => SCALARS.get(usize::from(byte)).copied(),
        ARRAY_1D..=16 => array_of(byte - ARRAY_1D),
        START_MARKER => Some(DataType::StartMarker),
        ARRAY_2D..=25 => array_of(byte - ARRAY_2D),
        ARRAY_ND..=33 => array_of(byte - ARRAY_ND),
        CHAR => Some(DataType::Char),
        CHAR_ARRAY_1D..=CHAR_ARRAY_ND => Some(DataType::CharArray),
        _ => COMPOUNDS.iter().find(|(_, c)| *c == byte).map(|(t, _)| *t),
    };
    found.ok_or(unknown)
}

/// Compat protocol over any buffer implementation.
#[derive(Debug)]
pub struct CompatProtocol<B: IoBuffer> {
    buffer: B,
    scopes: Vec<FieldHeader>,
}

impl<B: IoBuffer> CompatProtocol<B> {
    /// Wraps a buffer.
    pub fn new(buffer: B) -> Self {
        Self {
            buffer,
            scopes: Vec::new(),
        }
    }

    /// Returns the buffer.
    pub fn into_buffer(self) -> B {
        self.buffer
    }

    /// Number of scopes opened and not yet closed on the write side.
    pub fn open_scopes(&self) -> usize {
        self.scopes.len()
    }

    /// Increments the entry counter of the innermost open scope.
    fn update_data_entry_count(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.entries = Some(scope.entries.unwrap_or(0) + 1);
        }
    }

    fn write_header(&mut self, name: &str, data_type: DataType, code: u8) -> Result<FieldHeader> {
        if let Some(c) = name.chars().find(|c| u32::from(*c) > 0xFF) {
            return Err(WireError::Encoding(format!(
                "name '{name}' holds {c:?}, which has no ISO-8859-1 byte"
            )));
        }
        let mut header = FieldHeader::new(name, data_type, code);
        header.header_start = self.buffer.position();
        self.buffer.put_string_iso8859(name);
        self.buffer.put_u8(code);
        self.update_data_entry_count();
        Ok(header)
    }

    fn read_length(&mut self, header: &mut FieldHeader) -> Result<()> {
        let length = self.buffer.get_i32()?;
        header.data_start = self.buffer.position();
        header.data_size = match length {
            l if l < 0 => -1,
            l if (l as usize) < header.data_type.min_payload_size() => {
                return Err(WireError::structure(format!(
                    "field '{}' of type {} records impossible length {length}",
                    header.name, header.data_type
                )));
            }
            l => l,
        };
        Ok(())
    }

    /// Measures an array payload without consuming it.
    fn measure_array(&mut self, data_type: DataType) -> Result<i32> {
        let start = self.buffer.position();
        let result = self.walk_array(data_type);
        let end = self.buffer.position();
        self.buffer.set_position(start)?;
        result?;
        i32::try_from(end - start)
            .map_err(|_| WireError::structure("array payload exceeds i32 length"))
    }

    fn walk_array(&mut self, data_type: DataType) -> Result<()> {
        self.get_array_dims()?;
        let element = data_type.element_type().unwrap_or(DataType::Other);
        if element == DataType::String {
            let count = self.buffer.get_count(MIN_STRING_SIZE)?;
            for _ in 0..count {
                let prefix = self.buffer.get_i32()?;
                let len = usize::try_from(prefix)
                    .ok()
                    .filter(|l| *l >= 1)
                    .ok_or_else(|| WireError::structure(format!("invalid string length prefix {prefix}")))?;
                self.buffer.skip(len)?;
            }
            return Ok(());
        }
        let size = element
            .primitive_size()
            .ok_or_else(|| WireError::Internal(format!("{data_type} has no element size")))?;
        let count = self.buffer.get_count(size)?;
        self.buffer.skip(count * size)
    }
}

impl<B: IoBuffer> WireProtocol for CompatProtocol<B> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Compat
    }

    fn producer(&self) -> &'static str {
        COMPAT_PRODUCER
    }

    fn version(&self) -> (u8, u8, u8) {
        COMPAT_VERSION
    }

    fn buffer(&self) -> &dyn IoBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut dyn IoBuffer {
        &mut self.buffer
    }

    fn tag_byte(&self, data_type: DataType) -> u8 {
        compat_code(data_type)
    }

    fn tag_from_byte(&self, byte: u8) -> Result<DataType> {
        compat_tag(byte)
    }

    fn put_field_header(&mut self, name: &str, data_type: DataType) -> Result<FieldHeader> {
        if data_type == DataType::StartMarker {
            return self.put_start_marker(name);
        }
        let mut header = self.write_header(name, data_type, compat_code(data_type))?;
        if data_type.is_compound() {
            header.length_offset = Some(self.buffer.position());
            self.buffer.put_i32(-1);
        }
        header.data_start = self.buffer.position();
        Ok(header)
    }

    fn put_array_header(&mut self, name: &str, data_type: DataType, dims: &[usize]) -> Result<FieldHeader> {
        let header = if data_type.is_array() {
            let mut header = self.write_header(name, data_type, compat_array_code(data_type, dims.len()))?;
            header.data_start = self.buffer.position();
            header
        } else {
            self.put_field_header(name, data_type)?
        };
        put_dims(&mut self.buffer, dims)?;
        Ok(header)
    }

    fn put_start_marker(&mut self, name: &str) -> Result<FieldHeader> {
        let mut header = self.write_header(name, DataType::StartMarker, START_MARKER)?;
        header.length_offset = Some(self.buffer.position());
        self.buffer.put_i32(0);
        header.data_start = self.buffer.position();
        header.entries = Some(0);
        trace!(scope = name, depth = self.scopes.len(), "scope opened");
        self.scopes.push(header.clone());
        Ok(header)
    }

    fn put_end_marker(&mut self, name: &str) -> Result<FieldHeader> {
        match self.scopes.last() {
            Some(scope) if scope.name == name => {}
            Some(scope) => {
                return Err(WireError::structure(format!(
                    "end marker '{name}' closes scope '{}'",
                    scope.name
                )));
            }
            None => {
                return Err(WireError::structure(format!(
                    "end marker '{name}' without an open scope"
                )));
            }
        }
        let end_code = compat_code(DataType::EndMarker);
        let mut end = self.write_header(name, DataType::EndMarker, end_code)?;
        self.buffer.put_u8(end_code);
        end.data_start = self.buffer.position();
        end.data_size = 0;

        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| WireError::Internal("scope vanished while closing".into()))?;
        let entries = scope.entries.unwrap_or(0);
        if let Some(offset) = scope.length_offset {
            self.buffer.put_i32_at(offset, entries)?;
        }
        trace!(scope = name, entries, "scope closed");
        Ok(end)
    }

    fn put_string(&mut self, value: &str) {
        self.buffer.put_string_iso8859(value);
    }

    fn put_string_array(&mut self, values: &[String]) {
        self.buffer.put_string_array_iso8859(values);
    }

    fn get_field_header(&mut self) -> Result<FieldHeader> {
        let header_start = self.buffer.position();
        let name = self.buffer.get_string_iso8859()?;
        let tag_byte = self.buffer.get_u8()?;
        let data_type = compat_tag(tag_byte)?;
        let mut header = FieldHeader::new(name, data_type, tag_byte);
        header.header_start = header_start;

        match data_type {
            DataType::EndMarker => {
                let trailing = self.buffer.get_u8()?;
                if trailing != tag_byte {
                    return Err(WireError::structure(format!(
                        "end marker '{}' carries {trailing:#04x} instead of {tag_byte:#04x}",
                        header.name
                    )));
                }
                header.data_start = self.buffer.position();
                header.data_size = 0;
            }
            DataType::StartMarker => {
                let entries = self.buffer.get_i32()?;
                if entries <= 0 {
                    return Err(WireError::structure(format!(
                        "scope '{}' announces {entries} entries",
                        header.name
                    )));
                }
                header.entries = Some(entries);
                header.data_start = self.buffer.position();
                header.data_size = -1;
            }
            DataType::String => {
                header.data_start = self.buffer.position();
                let prefix = self.buffer.get_i32_at(header.data_start)?;
                if prefix < 1 {
                    return Err(WireError::structure(format!(
                        "string field '{}' has length prefix {prefix}",
                        header.name
                    )));
                }
                header.data_size = prefix.saturating_add(4);
            }
            t if t.is_scalar() => {
                header.data_start = self.buffer.position();
                header.data_size = t
                    .primitive_size()
                    .and_then(|s| i32::try_from(s).ok())
                    .ok_or_else(|| WireError::Internal(format!("{t} has no fixed size")))?;
            }
            t if t.is_array() => {
                header.data_start = self.buffer.position();
                header.data_size = self.measure_array(t)?;
            }
            _ => self.read_length(&mut header)?,
        }
        Ok(header)
    }

    fn get_string(&mut self) -> Result<String> {
        self.buffer.get_string_iso8859()
    }

    fn get_string_array(&mut self) -> Result<Vec<String>> {
        self.buffer.get_string_array_iso8859()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteBuffer;
    use crate::protocol::parse_stream;

    #[test]
    fn tag_table_round_trips() {
        for t in DataType::ALL {
            let code = compat_code(t);
            assert_eq!(compat_tag(code), Ok(t), "{t}");
        }
        assert_eq!(compat_code(DataType::Bool), 0);
        assert_eq!(compat_code(DataType::String), 7);
        assert_eq!(compat_code(DataType::BoolArray), 9);
        assert_eq!(compat_code(DataType::StringArray), 16);
        assert_eq!(compat_code(DataType::Map), 0xE4);
    }

    #[test]
    fn multi_dimensional_codes_share_a_tag() {
        assert_eq!(compat_array_code(DataType::IntArray, 2), 21);
        assert_eq!(compat_array_code(DataType::IntArray, 3), 29);
        assert_eq!(compat_array_code(DataType::CharArray, 2), 203);
        assert_eq!(compat_tag(21), Ok(DataType::IntArray));
        assert_eq!(compat_tag(29), Ok(DataType::IntArray));
        assert_eq!(compat_tag(204), Ok(DataType::CharArray));
        assert_eq!(
            compat_tag(8),
            Err(WireError::UnknownTag {
                protocol: "compat",
                byte: 8
            })
        );
    }

    #[test]
    fn entry_counters_include_the_end_marker() -> Result<()> {
        let mut proto = CompatProtocol::new(ByteBuffer::with_capacity(64));
        let root = proto.put_header_info("root", "")?;
        let mut a = proto.put_field_header("a", DataType::Int)?;
        proto.buffer_mut().put_i32(1);
        proto.finish_field(&mut a)?;
        proto.put_start_marker("inner")?;
        proto.put_end_marker("inner")?;
        proto.put_end_marker("root")?;

        let offset = root.length_offset.unwrap_or_default();
        // "a", "inner" and the root end marker.
        assert_eq!(proto.buffer().get_i32_at(offset)?, 3);

        let mut buffer = proto.into_buffer();
        buffer.flip();
        let mut reader = CompatProtocol::new(buffer);
        let (info, tree) = parse_stream(&mut reader)?;
        assert_eq!(info.producer, COMPAT_PRODUCER);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[1].header.entries, Some(1));
        Ok(())
    }

    #[test]
    fn array_sizes_are_derived_on_read() -> Result<()> {
        let strings = vec!["ab".to_string(), "ç".to_string()];
        let mut proto = CompatProtocol::new(ByteBuffer::with_capacity(64));
        let mut s = proto.put_array_header("s", DataType::StringArray, &[2])?;
        proto.put_string_array(&strings);
        proto.finish_field(&mut s)?;
        let mut d = proto.put_array_header("d", DataType::DoubleArray, &[1, 2])?;
        proto.buffer_mut().put_f64_array(&[1.0, 2.0]);
        proto.finish_field(&mut d)?;

        let mut buffer = proto.into_buffer();
        buffer.flip();
        let mut reader = CompatProtocol::new(buffer);

        let header = reader.get_field_header()?;
        assert_eq!(header.data_size, s.data_size);
        assert_eq!(reader.get_array_dims()?, vec![2]);
        assert_eq!(reader.get_string_array()?, strings);

        let header = reader.get_field_header()?;
        assert_eq!(header.data_type, DataType::DoubleArray);
        assert_eq!(header.tag_byte, ARRAY_2D + 6);
        assert_eq!(header.data_size, d.data_size);
        Ok(())
    }

    #[test]
    fn non_positive_entry_count_is_fatal() {
        let mut buffer = ByteBuffer::with_capacity(16);
        buffer.put_string_iso8859("r");
        buffer.put_u8(START_MARKER);
        buffer.put_i32(0);
        buffer.flip();
        let mut reader = CompatProtocol::new(buffer);
        assert!(matches!(
            reader.get_field_header(),
            Err(WireError::Structure(_))
        ));
    }

    #[test]
    fn entry_count_mismatch_is_fatal() -> Result<()> {
        let mut proto = CompatProtocol::new(ByteBuffer::with_capacity(64));
        let root = proto.put_header_info("root", "")?;
        let mut a = proto.put_field_header("a", DataType::Bool)?;
        proto.buffer_mut().put_bool(false);
        proto.finish_field(&mut a)?;
        proto.put_end_marker("root")?;
        proto
            .buffer_mut()
            .put_i32_at(root.length_offset.unwrap_or_default(), 5)?;

        let mut buffer = proto.into_buffer();
        buffer.flip();
        let mut reader = CompatProtocol::new(buffer);
        assert!(matches!(
            parse_stream(&mut reader),
            Err(WireError::Structure(_))
        ));
        Ok(())
    }
}
