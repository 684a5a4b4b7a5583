//! The native protocol.
//!
//! ```text
//! field header: [string name][u8 tag]
//! scalar:       header + fixed-size payload
//! string:       header + [i32 len+1][bytes][0]
//! array:        header + [i32 length][i32 nDims][i32 dim ...] + [i32 count][elements]
//! compound:     header + [i32 length][i32 nDims][i32 dim ...] + tag specific payload
//! start marker: header + [i32 scope length]
//! end marker:   [string name][u8 END][u8 END]
//! ```
//!
//! Lengths are written as `-1` and backpatched once the payload is complete; a
//! start marker's length covers everything up to and including its end marker.

use tracing::trace;

use super::{ProtocolKind, WireProtocol};
use crate::buffer::IoBuffer;
use crate::data_type::DataType;
use crate::error::{Result, WireError};
use crate::format::FieldHeader;

/// Producer identifier of the native protocol.
pub const NATIVE_PRODUCER: &str = "wirecode-native";

/// Version written by this implementation.
pub const NATIVE_VERSION: (u8, u8, u8) = (1, 0, 0);

const UNKNOWN_LENGTH: i32 = -1;

/// Native protocol over any buffer implementation.
#[derive(Debug)]
pub struct NativeProtocol<B: IoBuffer> {
    buffer: B,
    scopes: Vec<FieldHeader>,
}

impl<B: IoBuffer> NativeProtocol<B> {
    /// Wraps a buffer; writing starts at its position, reading too.
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

    fn needs_length(data_type: DataType) -> bool {
        data_type.is_array() || data_type.is_compound() || data_type == DataType::StartMarker
    }
}

impl<B: IoBuffer> WireProtocol for NativeProtocol<B> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Native
    }

    fn producer(&self) -> &'static str {
        NATIVE_PRODUCER
    }

    fn version(&self) -> (u8, u8, u8) {
        NATIVE_VERSION
    }

    fn buffer(&self) -> &dyn IoBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut dyn IoBuffer {
        &mut self.buffer
    }

    fn tag_byte(&self, data_type: DataType) -> u8 {
        data_type.as_byte()
    }

    fn tag_from_byte(&self, byte: u8) -> Result<DataType> {
        DataType::from_byte(byte)
    }

    fn put_field_header(&mut self, name: &str, data_type: DataType) -> Result<FieldHeader> {
        let mut header = FieldHeader::new(name, data_type, data_type.as_byte());
        header.header_start = self.buffer.position();
        self.buffer.put_string(name);
        self.buffer.put_u8(header.tag_byte);
        if Self::needs_length(data_type) {
            header.length_offset = Some(self.buffer.position());
            self.buffer.put_i32(UNKNOWN_LENGTH);
        }
        header.data_start = self.buffer.position();
        Ok(header)
    }

    fn put_array_header(&mut self, name: &str, data_type: DataType, dims: &[usize]) -> Result<FieldHeader> {
        let header = self.put_field_header(name, data_type)?;
        put_dims(&mut self.buffer, dims)?;
        Ok(header)
    }

    fn put_start_marker(&mut self, name: &str) -> Result<FieldHeader> {
        let header = self.put_field_header(name, DataType::StartMarker)?;
        trace!(scope = name, depth = self.scopes.len(), "scope opened");
        self.scopes.push(header.clone());
        Ok(header)
    }

    fn put_end_marker(&mut self, name: &str) -> Result<FieldHeader> {
        let mut scope = self
            .scopes
            .pop()
            .ok_or_else(|| WireError::structure(format!("end marker '{name}' without an open scope")))?;
        if scope.name != name {
            return Err(WireError::structure(format!(
                "end marker '{name}' closes scope '{}'",
                scope.name
            )));
        }
        let end_byte = DataType::EndMarker.as_byte();
        let mut end = FieldHeader::new(name, DataType::EndMarker, end_byte);
        end.header_start = self.buffer.position();
        self.buffer.put_string(name);
        self.buffer.put_u8(end_byte);
        self.buffer.put_u8(end_byte);
        end.data_start = self.buffer.position();
        end.data_size = 0;
        self.finish_field(&mut scope)?;
        trace!(scope = name, length = scope.data_size, "scope closed");
        Ok(end)
    }

    fn put_string(&mut self, value: &str) {
        self.buffer.put_string(value);
    }

    fn put_string_array(&mut self, values: &[String]) {
        self.buffer.put_string_array(values);
    }

    fn get_field_header(&mut self) -> Result<FieldHeader> {
        let header_start = self.buffer.position();
        let name = self.buffer.get_string()?;
        let tag_byte = self.buffer.get_u8()?;
        let data_type = DataType::from_byte(tag_byte)?;
        let mut header = FieldHeader::new(name, data_type, tag_byte);
        header.header_start = header_start;

        if data_type == DataType::EndMarker {
            let trailing = self.buffer.get_u8()?;
            if trailing != tag_byte {
                return Err(WireError::structure(format!(
                    "end marker '{}' carries {trailing:#04x} instead of {tag_byte:#04x}",
                    header.name
                )));
            }
            header.data_start = self.buffer.position();
            header.data_size = 0;
            return Ok(header);
        }

        if Self::needs_length(data_type) {
            let length = self.buffer.get_i32()?;
            header.data_start = self.buffer.position();
            header.data_size = match length {
                l if l < 0 => UNKNOWN_LENGTH,
                l if (l as usize) < data_type.min_payload_size() => {
                    return Err(WireError::structure(format!(
                        "field '{}' of type {data_type} records impossible length {length}",
                        header.name
                    )));
                }
                l => l,
            };
            return Ok(header);
        }

        header.data_start = self.buffer.position();
        header.data_size = match data_type {
            DataType::String => {
                let prefix = self.buffer.get_i32_at(header.data_start)?;
                if prefix < 1 {
                    return Err(WireError::structure(format!(
                        "string field '{}' has length prefix {prefix}",
                        header.name
                    )));
                }
                prefix.saturating_add(4)
            }
            t => t
                .primitive_size()
                .and_then(|s| i32::try_from(s).ok())
                .ok_or_else(|| WireError::Internal(format!("{t} has no fixed size")))?,
        };
        Ok(header)
    }

    fn get_string(&mut self) -> Result<String> {
        self.buffer.get_string()
    }

    fn get_string_array(&mut self) -> Result<Vec<String>> {
        self.buffer.get_string_array()
    }
}

pub(super) fn put_dims<B: IoBuffer>(buffer: &mut B, dims: &[usize]) -> Result<()> {
    buffer.put_i32(to_wire_count(dims.len())?);
    for &dim in dims {
        buffer.put_i32(to_wire_count(dim)?);
    }
    Ok(())
}

fn to_wire_count(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| WireError::structure(format!("dimension {n} exceeds i32")))
}
