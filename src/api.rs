//! The high-level entry points.

use std::sync::Arc;

use crate::config::{BufferKind, WireConfig};
use crate::dispatch::KnownTypes;
use crate::error::Result;
use crate::format::ProtocolInfo;
use crate::inspector::{StreamInspector, StreamReport};
use crate::protocol::{ProtocolKind, WireProtocol};
use crate::reflect::WireObject;
use crate::schema::{DEFAULT_MAX_DEPTH, SchemaCache};
use crate::serialiser::ObjectSerialiser;

/// The main entry point for encoding and decoding objects.
///
/// The associated functions use the default configuration: native protocol,
/// [`FastByteBuffer`](crate::FastByteBuffer), the process-wide schema cache and
/// codec registry. Use [`Wirecode::builder`] for anything else.
#[derive(Debug)]
pub struct Wirecode;

impl Wirecode {
    /// Starts a configured encode/decode.
    pub fn builder() -> WirecodeBuilder {
        WirecodeBuilder::default()
    }

    /// Encodes `value` as a complete stream.
    pub fn encode<T: WireObject>(value: &T) -> Result<Vec<u8>> {
        Self::builder().encode(value)
    }

    /// Decodes a stream into a fresh `T`.
    pub fn decode<T: WireObject>(bytes: impl Into<Vec<u8>>) -> Result<T> {
        Self::builder().decode(bytes)
    }

    /// Decodes a stream into an existing value and returns the stream's header.
    pub fn decode_into<T: WireObject>(bytes: impl Into<Vec<u8>>, target: &mut T) -> Result<ProtocolInfo> {
        Self::builder().decode_into(bytes, target)
    }

    /// Parses a stream without decoding values and reports its layout.
    pub fn inspect(bytes: impl Into<Vec<u8>>) -> Result<StreamReport> {
        Self::builder().inspect(bytes)
    }
}

/// A configuration builder for encoding and decoding.
#[derive(Debug, Clone, Default)]
pub struct WirecodeBuilder {
    config: WireConfig,
}

impl WirecodeBuilder {
    /// Starts from an explicit configuration.
    pub fn from_config(config: WireConfig) -> Self {
        Self { config }
    }

    /// Selects the protocol written by `encode`.
    #[must_use]
    pub fn protocol(mut self, kind: ProtocolKind) -> Self {
        self.config.protocol = kind;
        self
    }

    /// Selects the buffer implementation.
    #[must_use]
    pub fn buffer(mut self, kind: BufferKind) -> Self {
        self.config.buffer = kind;
        self
    }

    /// Sets the initial capacity of encode buffers.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Sets the schema depth bound.
    #[must_use]
    pub fn max_schema_depth(mut self, depth: usize) -> Self {
        self.config.max_schema_depth = depth;
        self
    }

    /// Sets the highest `(major, minor)` accepted by `decode`.
    #[must_use]
    pub fn accept_version(mut self, major: u8, minor: u8) -> Self {
        self.config.accept_version = (major, minor);
        self
    }

    /// Sets the description written into stream headers.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    /// Uses a custom codec registry instead of the process-wide one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<KnownTypes>) -> Self {
        self.config.registry = Some(registry);
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    fn serialiser(&self) -> ObjectSerialiser {
        let schema = if self.config.max_schema_depth == DEFAULT_MAX_DEPTH {
            SchemaCache::global()
        } else {
            Arc::new(SchemaCache::new(self.config.max_schema_depth))
        };
        let registry = self
            .config
            .registry
            .clone()
            .unwrap_or_else(KnownTypes::global);
        let (major, minor) = self.config.accept_version;
        ObjectSerialiser::new(schema, registry)
            .with_description(self.config.description.clone())
            .with_accepted_version(major, minor)
    }

    fn reader(&self, bytes: impl Into<Vec<u8>>) -> Box<dyn WireProtocol> {
        let bytes = bytes.into();
        let kind = ProtocolKind::detect(&bytes).unwrap_or(self.config.protocol);
        self.config.reader(kind, bytes)
    }

    /// Encodes `value` as a complete stream.
    pub fn encode<T: WireObject>(&self, value: &T) -> Result<Vec<u8>> {
        let mut proto = self.config.writer();
        self.serialiser().serialise(proto.as_mut(), value)?;
        let buffer = proto.buffer_mut();
        buffer.flip();
        Ok(buffer.take_bytes())
    }

    /// Decodes a stream into a fresh `T`.
    pub fn decode<T: WireObject>(&self, bytes: impl Into<Vec<u8>>) -> Result<T> {
        let mut proto = self.reader(bytes);
        self.serialiser().deserialise(proto.as_mut())
    }

    /// Decodes a stream into an existing value and returns the stream's header.
    pub fn decode_into<T: WireObject>(&self, bytes: impl Into<Vec<u8>>, target: &mut T) -> Result<ProtocolInfo> {
        let mut proto = self.reader(bytes);
        self.serialiser().deserialise_into(proto.as_mut(), target)
    }

    /// Parses a stream without decoding values and reports its layout.
    pub fn inspect(&self, bytes: impl Into<Vec<u8>>) -> Result<StreamReport> {
        let mut proto = self.reader(bytes);
        StreamInspector::inspect(proto.as_mut())
    }
}
