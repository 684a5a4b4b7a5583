//! Growable, position/limit-tracked byte containers.
//!
//! [`IoBuffer`] is the one interface both protocols write through. Two
//! implementations exist and produce bit-identical output:
//!
//! * [`ByteBuffer`]: every element goes through a bounds-checked scalar accessor.
//! * [`FastByteBuffer`]: arrays are moved with one bounds check and bulk slice copies,
//!   and an existing `Vec<u8>` can be wrapped without copying.
//!
//! ## Layout
//!
//! All multi-byte values are little-endian. Arrays and strings are always
//! length-prefixed:
//!
//! ```text
//! array:  [i32 count][element bytes ...]
//! string: [i32 len + 1][bytes ...][0x00]
//! ```
//!
//! The trailing zero keeps strings consumable by readers that expect
//! null-terminated text.
//!
//! ## Position, limit, capacity
//!
//! Writes happen at `position` and grow the buffer geometrically when they would
//! cross `capacity`; growing moves `limit` to the new capacity. Reads fail with
//! [`WireError::BufferExhausted`](crate::WireError::BufferExhausted) instead of
//! crossing `limit`. A buffer is single-writer: every mutating method takes
//! `&mut self`.

mod byte_buffer;
mod fast_buffer;

pub use byte_buffer::ByteBuffer;
pub use fast_buffer::FastByteBuffer;

use crate::error::{Result, WireError};

/// Default initial capacity for new buffers.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Byte substituted for characters outside ISO-8859-1.
const ISO8859_REPLACEMENT: u8 = b'?';

/// Interface shared by all byte buffer implementations.
pub trait IoBuffer: std::fmt::Debug + Send {
    // --- state ---

    /// Number of bytes the buffer can hold without growing.
    fn capacity(&self) -> usize;

    /// Offset of the next read or write.
    fn position(&self) -> usize;

    /// Moves the cursor. Fails if `position` is beyond the limit.
    fn set_position(&mut self, position: usize) -> Result<()>;

    /// Offset reads may not cross.
    fn limit(&self) -> usize;

    /// Moves the limit. Fails if `limit` is beyond the capacity.
    fn set_limit(&mut self, limit: usize) -> Result<()>;

    /// Position 0, limit = capacity. Contents are kept.
    fn clear(&mut self);

    /// Position 0, limit unchanged.
    fn reset(&mut self);

    /// Limit = position, position 0: switches from writing to reading.
    fn flip(&mut self);

    /// Bytes left between position and limit.
    fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.position())
    }

    /// True if at least one byte is left.
    fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Advances the position by `n` bytes.
    fn skip(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(WireError::exhausted(n, self.remaining()));
        }
        let target = self.position() + n;
        self.set_position(target)
    }

    // --- capacity management ---

    /// Grows the storage so it can hold at least `capacity` bytes.
    fn ensure_capacity(&mut self, capacity: usize);

    /// Makes room for `additional` bytes after the current position.
    ///
    /// Growth is geometric (at least doubling); the buffer never shrinks here.
    fn ensure_additional_capacity(&mut self, additional: usize) {
        let needed = self.position().saturating_add(additional);
        if needed > self.capacity() {
            let grown = self.capacity().saturating_mul(2).max(needed).max(16);
            self.ensure_capacity(grown);
        }
    }

    /// Shrinks the storage to the current limit.
    fn trim(&mut self);

    /// The bytes from 0 to the limit.
    fn as_slice(&self) -> &[u8];

    /// Moves the bytes from 0 to the limit out, leaving an empty buffer behind.
    fn take_bytes(&mut self) -> Vec<u8>;

    // --- absolute access, used for backpatching ---

    /// Reads an `i32` at `offset` without moving the position.
    fn get_i32_at(&self, offset: usize) -> Result<i32>;

    /// Overwrites an `i32` at `offset` without moving the position.
    fn put_i32_at(&mut self, offset: usize, value: i32) -> Result<()>;

    // --- scalars ---

    /// Writes a `bool` as one byte (0 or 1).
    fn put_bool(&mut self, value: bool);
    /// Reads a `bool`; any non-zero byte is `true`.
    fn get_bool(&mut self) -> Result<bool>;
    /// Writes one unsigned byte.
    fn put_u8(&mut self, value: u8);
    /// Reads one unsigned byte.
    fn get_u8(&mut self) -> Result<u8>;
    /// Writes one signed byte.
    fn put_i8(&mut self, value: i8);
    /// Reads one signed byte.
    fn get_i8(&mut self) -> Result<i8>;
    /// Writes an `i16`.
    fn put_i16(&mut self, value: i16);
    /// Reads an `i16`.
    fn get_i16(&mut self) -> Result<i16>;
    /// Writes a 16-bit char code unit.
    fn put_u16(&mut self, value: u16);
    /// Reads a 16-bit char code unit.
    fn get_u16(&mut self) -> Result<u16>;
    /// Writes an `i32`.
    fn put_i32(&mut self, value: i32);
    /// Reads an `i32`.
    fn get_i32(&mut self) -> Result<i32>;
    /// Writes an `i64`.
    fn put_i64(&mut self, value: i64);
    /// Reads an `i64`.
    fn get_i64(&mut self) -> Result<i64>;
    /// Writes an `f32`.
    fn put_f32(&mut self, value: f32);
    /// Reads an `f32`.
    fn get_f32(&mut self) -> Result<f32>;
    /// Writes an `f64`.
    fn put_f64(&mut self, value: f64);
    /// Reads an `f64`.
    fn get_f64(&mut self) -> Result<f64>;

    // --- arrays ---

    /// Writes `[i32 count][bool bytes]`.
    fn put_bool_array(&mut self, values: &[bool]);
    /// Reads a `bool` array.
    fn get_bool_array(&mut self) -> Result<Vec<bool>>;
    /// Writes `[i32 count][bytes]`.
    fn put_u8_array(&mut self, values: &[u8]);
    /// Reads a byte array.
    fn get_u8_array(&mut self) -> Result<Vec<u8>>;
    /// Writes `[i32 count][bytes]`.
    fn put_i8_array(&mut self, values: &[i8]);
    /// Reads a signed byte array.
    fn get_i8_array(&mut self) -> Result<Vec<i8>>;
    /// Writes `[i32 count][i16 ...]`.
    fn put_i16_array(&mut self, values: &[i16]);
    /// Reads an `i16` array.
    fn get_i16_array(&mut self) -> Result<Vec<i16>>;
    /// Writes `[i32 count][u16 ...]`.
    fn put_u16_array(&mut self, values: &[u16]);
    /// Reads a char array.
    fn get_u16_array(&mut self) -> Result<Vec<u16>>;
    /// Writes `[i32 count][i32 ...]`.
    fn put_i32_array(&mut self, values: &[i32]);
    /// Reads an `i32` array.
    fn get_i32_array(&mut self) -> Result<Vec<i32>>;
    /// Writes `[i32 count][i64 ...]`.
    fn put_i64_array(&mut self, values: &[i64]);
    /// Reads an `i64` array.
    fn get_i64_array(&mut self) -> Result<Vec<i64>>;
    /// Writes `[i32 count][f32 ...]`.
    fn put_f32_array(&mut self, values: &[f32]);
    /// Reads an `f32` array.
    fn get_f32_array(&mut self) -> Result<Vec<f32>>;
    /// Writes `[i32 count][f64 ...]`.
    fn put_f64_array(&mut self, values: &[f64]);
    /// Reads an `f64` array.
    fn get_f64_array(&mut self) -> Result<Vec<f64>>;

    /// Writes raw bytes with no prefix.
    fn put_raw(&mut self, bytes: &[u8]);
    /// Reads `n` raw bytes.
    fn get_raw(&mut self, n: usize) -> Result<Vec<u8>>;

    // --- strings ---

    /// Writes a UTF-8 string as `[i32 len+1][bytes][0]`.
    fn put_string(&mut self, value: &str) {
        put_terminated(self, value.as_bytes());
    }

    /// Reads a UTF-8 string.
    fn get_string(&mut self) -> Result<String> {
        let bytes = get_terminated(self)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Writes a string with one byte per character.
    ///
    /// Characters above U+00FF are replaced by `?`.
    fn put_string_iso8859(&mut self, value: &str) {
        let bytes: Vec<u8> = value
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(ISO8859_REPLACEMENT))
            .collect();
        put_terminated(self, &bytes);
    }

    /// Reads a one-byte-per-character string.
    fn get_string_iso8859(&mut self) -> Result<String> {
        let bytes = get_terminated(self)?;
        Ok(bytes.into_iter().map(char::from).collect())
    }

    /// Writes `[i32 count]` followed by each string in UTF-8.
    fn put_string_array(&mut self, values: &[String]) {
        self.put_i32(count_to_i32(values.len()));
        for v in values {
            self.put_string(v);
        }
    }

    /// Reads a UTF-8 string array.
    fn get_string_array(&mut self) -> Result<Vec<String>> {
        let count = self.get_count(MIN_STRING_SIZE)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.get_string()?);
        }
        Ok(out)
    }

    /// Writes `[i32 count]` followed by each string in ISO-8859-1.
    fn put_string_array_iso8859(&mut self, values: &[String]) {
        self.put_i32(count_to_i32(values.len()));
        for v in values {
            self.put_string_iso8859(v);
        }
    }

    /// Reads an ISO-8859-1 string array.
    fn get_string_array_iso8859(&mut self) -> Result<Vec<String>> {
        let count = self.get_count(MIN_STRING_SIZE)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.get_string_iso8859()?);
        }
        Ok(out)
    }

    /// Reads an `i32` element count and checks it against the remaining bytes.
    ///
    /// `min_element_size` is the smallest encoding of one element; a count that
    /// cannot fit is reported before anything is allocated.
    fn get_count(&mut self, min_element_size: usize) -> Result<usize> {
        let raw = self.get_i32()?;
        let count = usize::try_from(raw)
            .map_err(|_| WireError::structure(format!("negative element count {raw}")))?;
        let needed = count.saturating_mul(min_element_size);
        if needed > self.remaining() {
            return Err(WireError::exhausted(needed, self.remaining()));
        }
        Ok(count)
    }
}

/// Smallest possible encoded string: the length prefix plus the terminator.
pub(crate) const MIN_STRING_SIZE: usize = 5;

/// Converts a host-side length to the wire's `i32` count.
///
/// Lengths beyond `i32::MAX` cannot be represented; they saturate, and the reader
/// then fails with an exhaustion error rather than misreading silently.
pub(crate) fn count_to_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn put_terminated<B: IoBuffer + ?Sized>(buffer: &mut B, bytes: &[u8]) {
    buffer.ensure_additional_capacity(bytes.len() + MIN_STRING_SIZE);
    buffer.put_i32(count_to_i32(bytes.len() + 1));
    buffer.put_raw(bytes);
    buffer.put_u8(0);
}

fn get_terminated<B: IoBuffer + ?Sized>(buffer: &mut B) -> Result<Vec<u8>> {
    let raw = buffer.get_i32()?;
    let len = usize::try_from(raw)
        .ok()
        .filter(|l| *l >= 1)
        .ok_or_else(|| WireError::structure(format!("invalid string length prefix {raw}")))?;
    let bytes = buffer.get_raw(len - 1)?;
    buffer.skip(1)?;
    Ok(bytes)
}
