//! Encoder and decoder configuration.

use std::sync::Arc;

use crate::buffer::{ByteBuffer, DEFAULT_INITIAL_CAPACITY, FastByteBuffer};
use crate::dispatch::KnownTypes;
use crate::protocol::{CompatProtocol, NativeProtocol, ProtocolKind, WireProtocol};
use crate::schema::DEFAULT_MAX_DEPTH;
use crate::serialiser::DEFAULT_ACCEPTED_VERSION;

/// Which buffer implementation backs a protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BufferKind {
    /// [`ByteBuffer`]: element-by-element access.
    Checked,
    /// [`FastByteBuffer`]: bulk slice copies (Default).
    #[default]
    Fast,
}

/// Settings shared by encode, decode and inspect.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Protocol used for encoding, and for decoding when it cannot be detected.
    pub protocol: ProtocolKind,
    /// Buffer implementation.
    pub buffer: BufferKind,
    /// Initial capacity of encode buffers.
    pub initial_capacity: usize,
    /// Schema depth bound. A value other than [`DEFAULT_MAX_DEPTH`] uses a private
    /// schema cache instead of the process-wide one.
    pub max_schema_depth: usize,
    /// Highest `(major, minor)` accepted when decoding.
    pub accept_version: (u8, u8),
    /// Free-text description written into stream headers.
    pub description: String,
    /// Codec registry; `None` selects [`KnownTypes::global`].
    pub registry: Option<Arc<KnownTypes>>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::Native,
            buffer: BufferKind::Fast,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_schema_depth: DEFAULT_MAX_DEPTH,
            accept_version: DEFAULT_ACCEPTED_VERSION,
            description: String::new(),
            registry: None,
        }
    }
}

impl WireConfig {
    /// A protocol writing into a fresh buffer.
    pub(crate) fn writer(&self) -> Box<dyn WireProtocol> {
        match (self.protocol, self.buffer) {
            (ProtocolKind::Native, BufferKind::Checked) => {
                Box::new(NativeProtocol::new(ByteBuffer::with_capacity(self.initial_capacity)))
            }
            (ProtocolKind::Native, BufferKind::Fast) => {
                Box::new(NativeProtocol::new(FastByteBuffer::with_capacity(self.initial_capacity)))
            }
            (ProtocolKind::Compat, BufferKind::Checked) => {
                Box::new(CompatProtocol::new(ByteBuffer::with_capacity(self.initial_capacity)))
            }
            (ProtocolKind::Compat, BufferKind::Fast) => {
                Box::new(CompatProtocol::new(FastByteBuffer::with_capacity(self.initial_capacity)))
            }
        }
    }

    /// A protocol reading `bytes`, using `kind` instead of the configured protocol.
    pub(crate) fn reader(&self, kind: ProtocolKind, bytes: Vec<u8>) -> Box<dyn WireProtocol> {
        match (kind, self.buffer) {
            (ProtocolKind::Native, BufferKind::Checked) => Box::new(NativeProtocol::new(ByteBuffer::wrap(bytes))),
            (ProtocolKind::Native, BufferKind::Fast) => Box::new(NativeProtocol::new(FastByteBuffer::wrap(bytes))),
            (ProtocolKind::Compat, BufferKind::Checked) => Box::new(CompatProtocol::new(ByteBuffer::wrap(bytes))),
            (ProtocolKind::Compat, BufferKind::Fast) => Box::new(CompatProtocol::new(FastByteBuffer::wrap(bytes))),
        }
    }
}
