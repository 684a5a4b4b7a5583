//! The bulk buffer: arrays are moved with a single bounds check per call.

use super::{DEFAULT_INITIAL_CAPACITY, IoBuffer, count_to_i32};
use crate::error::{Result, WireError};

/// Growable byte buffer that copies whole arrays through slice chunks.
///
/// The only unchecked step an element-wise loop would repeat, the capacity check,
/// happens once per array here. Everything stays in safe code.
#[derive(Debug, Clone, Default)]
pub struct FastByteBuffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
}

impl FastByteBuffer {
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

    /// Wraps an existing byte vector without copying it.
    pub fn wrap(bytes: Vec<u8>) -> Self {
        let limit = bytes.len();
        Self {
            data: bytes,
            position: 0,
            limit,
        }
    }

    /// Reserves `len` bytes at the cursor and hands them out for writing.
    fn claim(&mut self, len: usize) -> &mut [u8] {
        self.ensure_additional_capacity(len);
        let start = self.position;
        self.position += len;
        self.limit = self.limit.max(self.position);
        &mut self.data[start..start + len]
    }

    /// Consumes `len` bytes at the cursor.
    fn consume(&mut self, len: usize) -> Result<&[u8]> {
        if len > self.remaining() {
            return Err(WireError::exhausted(len, self.remaining()));
        }
        let start = self.position;
        self.position += len;
        Ok(&self.data[start..start + len])
    }
}

macro_rules! scalar_access {
    ($put:ident, $get:ident, $t:ty) => {
        fn $put(&mut self, value: $t) {
            self.claim(std::mem::size_of::<$t>())
                .copy_from_slice(&value.to_le_bytes());
        }

        fn $get(&mut self) -> Result<$t> {
            let mut raw = [0u8; std::mem::size_of::<$t>()];
            raw.copy_from_slice(self.consume(std::mem::size_of::<$t>())?);
            Ok(<$t>::from_le_bytes(raw))
        }
    };
}

macro_rules! bulk_array_access {
    ($put:ident, $get:ident, $t:ty) => {
        fn $put(&mut self, values: &[$t]) {
            const SIZE: usize = std::mem::size_of::<$t>();
            self.ensure_additional_capacity(4 + values.len() * SIZE);
            self.put_i32(count_to_i32(values.len()));
            let target = self.claim(values.len() * SIZE);
            for (chunk, v) in target.chunks_exact_mut(SIZE).zip(values) {
                chunk.copy_from_slice(&v.to_le_bytes());
            }
        }

        fn $get(&mut self) -> Result<Vec<$t>> {
            const SIZE: usize = std::mem::size_of::<$t>();
            let count = self.get_count(SIZE)?;
            let source = self.consume(count * SIZE)?;
            Ok(source
                .chunks_exact(SIZE)
                .map(|chunk| {
                    let mut raw = [0u8; SIZE];
                    raw.copy_from_slice(chunk);
                    <$t>::from_le_bytes(raw)
                })
                .collect())
        }
    };
}

impl IoBuffer for FastByteBuffer {
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
        let raw = self
            .data
            .get(offset..offset.saturating_add(4))
            .filter(|_| offset.saturating_add(4) <= self.limit)
            .ok_or_else(|| WireError::exhausted(4, self.limit.saturating_sub(offset)))?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(raw);
        Ok(i32::from_le_bytes(bytes))
    }

    fn put_i32_at(&mut self, offset: usize, value: i32) -> Result<()> {
        let available = self.data.len().saturating_sub(offset);
        let slot = self
            .data
            .get_mut(offset..offset.saturating_add(4))
            .ok_or_else(|| WireError::exhausted(4, available))?;
        slot.copy_from_slice(&value.to_le_bytes());
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

    fn put_bool_array(&mut self, values: &[bool]) {
        self.ensure_additional_capacity(4 + values.len());
        self.put_i32(count_to_i32(values.len()));
        for (slot, v) in self.claim(values.len()).iter_mut().zip(values) {
            *slot = u8::from(*v);
        }
    }

    fn get_bool_array(&mut self) -> Result<Vec<bool>> {
        let count = self.get_count(1)?;
        Ok(self.consume(count)?.iter().map(|b| *b != 0).collect())
    }

    fn put_u8_array(&mut self, values: &[u8]) {
        self.ensure_additional_capacity(4 + values.len());
        self.put_i32(count_to_i32(values.len()));
        self.claim(values.len()).copy_from_slice(values);
    }

    fn get_u8_array(&mut self) -> Result<Vec<u8>> {
        let count = self.get_count(1)?;
        Ok(self.consume(count)?.to_vec())
    }

    bulk_array_access!(put_i8_array, get_i8_array, i8);
    bulk_array_access!(put_i16_array, get_i16_array, i16);
    bulk_array_access!(put_u16_array, get_u16_array, u16);
    bulk_array_access!(put_i32_array, get_i32_array, i32);
    bulk_array_access!(put_i64_array, get_i64_array, i64);
    bulk_array_access!(put_f32_array, get_f32_array, f32);
    bulk_array_access!(put_f64_array, get_f64_array, f64);

    fn put_raw(&mut self, bytes: &[u8]) {
        self.claim(bytes.len()).copy_from_slice(bytes);
    }

    fn get_raw(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.consume(n)?.to_vec())
    }
}
