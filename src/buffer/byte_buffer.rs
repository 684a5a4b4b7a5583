//! The conservative buffer: one bounds-checked accessor per element.

use super::{DEFAULT_INITIAL_CAPACITY, IoBuffer, count_to_i32};
use crate::error::{Result, WireError};

/// Growable byte buffer whose array accessors go element by element.
///
/// Output is bit-identical to [`FastByteBuffer`](super::FastByteBuffer); use this one
/// when debugging a stream, since every element passes through the scalar path.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
}

impl ByteBuffer {
    /// Creates a buffer with [`DEFAULT_INITIAL_CAPACITY`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates a zero-filled buffer of `capacity` bytes, ready for writing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            position: 0,
            limit: capacity,
        }
    }

    /// Takes ownership of `bytes` for reading: position 0, limit at the end.
    pub fn wrap(bytes: Vec<u8>) -> Self {
        let limit = bytes.len();
        Self {
            data: bytes,
            position: 0,
            limit,
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.ensure_additional_capacity(bytes.len());
        let end = self.position + bytes.len();
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
        self.limit = self.limit.max(end);
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        if N > self.remaining() {
            return Err(WireError::exhausted(N, self.remaining()));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }
}

macro_rules! scalar_access {
    ($put:ident, $get:ident, $t:ty) => {
        fn $put(&mut self, value: $t) {
            self.write_bytes(&value.to_le_bytes());
        }

        fn $get(&mut self) -> Result<$t> {
            Ok(<$t>::from_le_bytes(self.read_bytes()?))
        }
    };
}

macro_rules! array_access {
    ($put:ident, $get:ident, $put_one:ident, $get_one:ident, $t:ty) => {
        fn $put(&mut self, values: &[$t]) {
            self.put_i32(count_to_i32(values.len()));
            for v in values {
                self.$put_one(*v);
            }
        }

        fn $get(&mut self) -> Result<Vec<$t>> {
            let count = self.get_count(std::mem::size_of::<$t>())?;
            (0..count).map(|_| self.$get_one()).collect()
        }
    };
}

impl IoBuffer for ByteBuffer {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.limit {
            return Err(WireError::structure(format!(
                "position {position} beyond limit {}",
                self.limit
            )));
        }
        self.position = position;
        Ok(())
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit > self.data.len() {
            return Err(WireError::structure(format!(
                "limit {limit} beyond capacity {}",
                self.data.len()
            )));
        }
        self.limit = limit;
        self.position = self.position.min(limit);
        Ok(())
    }

    fn clear(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.data.len() {
            self.data.resize(capacity, 0);
            self.limit = capacity;
        }
    }

    fn trim(&mut self) {
        self.data.truncate(self.limit);
        self.data.shrink_to_fit();
    }

    fn as_slice(&self) -> &[u8] {
        &self.data[..self.limit]
    }

    fn take_bytes(&mut self) -> Vec<u8> {
        let mut bytes = std::mem::take(&mut self.data);
        bytes.truncate(self.limit);
        self.position = 0;
        self.limit = 0;
        bytes
    }

    fn get_i32_at(&self, offset: usize) -> Result<i32> {
        let end = offset.saturating_add(4);
        if end > self.limit {
            return Err(WireError::exhausted(4, self.limit.saturating_sub(offset)));
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.data[offset..end]);
        Ok(i32::from_le_bytes(raw))
    }

    fn put_i32_at(&mut self, offset: usize, value: i32) -> Result<()> {
        let end = offset.saturating_add(4);
        if end > self.data.len() {
            return Err(WireError::exhausted(4, self.data.len().saturating_sub(offset)));
        }
        self.data[offset..end].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn put_bool(&mut self, value: bool) {
        self.put_u8(u8::from(value));
    }

    fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    scalar_access!(put_u8, get_u8, u8);
    scalar_access!(put_i8, get_i8, i8);
    scalar_access!(put_i16, get_i16, i16);
    scalar_access!(put_u16, get_u16, u16);
    scalar_access!(put_i32, get_i32, i32);
    scalar_access!(put_i64, get_i64, i64);
    scalar_access!(put_f32, get_f32, f32);
    scalar_access!(put_f64, get_f64, f64);

    array_access!(put_bool_array, get_bool_array, put_bool, get_bool, bool);
    array_access!(put_u8_array, get_u8_array, put_u8, get_u8, u8);
    array_access!(put_i8_array, get_i8_array, put_i8, get_i8, i8);
    array_access!(put_i16_array, get_i16_array, put_i16, get_i16, i16);
    array_access!(put_u16_array, get_u16_array, put_u16, get_u16, u16);
    array_access!(put_i32_array, get_i32_array, put_i32, get_i32, i32);
    array_access!(put_i64_array, get_i64_array, put_i64, get_i64, i64);
    array_access!(put_f32_array, get_f32_array, put_f32, get_f32, f32);
    array_access!(put_f64_array, get_f64_array, put_f64, get_f64, f64);

    fn put_raw(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }

    fn get_raw(&mut self, n: usize) -> Result<Vec<u8>> {
        if n > self.remaining() {
            return Err(WireError::exhausted(n, self.remaining()));
        }
        let out = self.data[self.position..self.position + n].to_vec();
        self.position += n;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_and_clear_move_the_window() {
        let mut buffer = ByteBuffer::with_capacity(32);
        buffer.put_i64(1);
        buffer.flip();
        assert_eq!(buffer.limit(), 8);
        assert_eq!(buffer.position(), 0);
        buffer.clear();
        assert_eq!(buffer.limit(), 32);
    }

    #[test]
    fn set_position_respects_the_limit() {
        let mut buffer = ByteBuffer::wrap(vec![0; 4]);
        assert!(buffer.set_position(4).is_ok());
        assert!(matches!(
            buffer.set_position(5),
            Err(WireError::Structure(_))
        ));
    }

    #[test]
    fn trim_shrinks_to_limit() {
        let mut buffer = ByteBuffer::with_capacity(1024);
        buffer.put_i32(9);
        buffer.flip();
        buffer.trim();
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.as_slice(), &[9, 0, 0, 0]);
    }
}
