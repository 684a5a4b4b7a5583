//! The generic object walker.
//!
//! Drives a [`WireProtocol`] from a type's [`SchemaTree`]: every schema node is
//! either handed to the codec the dispatch registry resolves for it, or, when
//! nothing resolves, written as a nested scope of its own fields.
//!
//! Reading is tolerant in the usual direction: fields the schema does not know,
//! fields whose tag disagrees with the schema and fields no codec can read are
//! skipped by length and the rest of the object is still filled in.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::data_type::DataType;
use crate::error::{Result, WireError};
use crate::format::{FieldHeader, ProtocolInfo};
use crate::protocol::{MAX_SCOPE_DEPTH, WireProtocol, skip_field};
use crate::dispatch::KnownTypes;
use crate::reflect::{WireObject, WireReflect};
use crate::schema::{FieldRef, SchemaCache, SchemaTree};

/// Highest `(major, minor)` a default serialiser accepts.
pub const DEFAULT_ACCEPTED_VERSION: (u8, u8) = (1, 0);

/// Writes and reads objects through their schema trees.
#[derive(Debug)]
pub struct ObjectSerialiser {
    schema: Arc<SchemaCache>,
    registry: Arc<KnownTypes>,
    learned: HashSet<u64>,
    description: String,
    accepted: (u8, u8),
}

impl Default for ObjectSerialiser {
    fn default() -> Self {
        Self::new(SchemaCache::global(), KnownTypes::global())
    }
}

impl ObjectSerialiser {
    /// Creates a serialiser over a schema cache and a codec registry.
    pub fn new(schema: Arc<SchemaCache>, registry: Arc<KnownTypes>) -> Self {
        Self {
            schema,
            registry,
            learned: HashSet::new(),
            description: String::new(),
            accepted: DEFAULT_ACCEPTED_VERSION,
        }
    }

    /// Sets the free-text description written into stream headers.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the highest `(major, minor)` accepted when reading.
    #[must_use]
    pub fn with_accepted_version(mut self, major: u8, minor: u8) -> Self {
        self.accepted = (major, minor);
        self
    }

    /// The codec registry in use.
    pub fn registry(&self) -> &Arc<KnownTypes> {
        &self.registry
    }

    fn tree_for<T: WireObject>(&mut self) -> Result<Arc<SchemaTree>> {
        let tree = self.schema.describe::<T>()?;
        if self.learned.insert(tree.hash()) {
            let added = self.registry.learn(&tree);
            trace!(type_name = tree.key().name, added, "leaf codecs learned");
        }
        Ok(tree)
    }

    /// Writes `value` as a complete stream: header block, fields, root end marker.
    pub fn serialise<T: WireObject>(&mut self, proto: &mut dyn WireProtocol, value: &T) -> Result<()> {
        let tree = self.tree_for::<T>()?;
        let root = tree.root();
        debug!(type_name = root.name(), protocol = ?proto.kind(), "serialising");
        proto.put_header_info(root.name(), &self.description)?;
        self.write_fields(proto, root, value)?;
        proto.put_end_marker(root.name())?;
        Ok(())
    }

    fn write_fields(&self, proto: &mut dyn WireProtocol, node: FieldRef<'_>, object: &dyn WireReflect) -> Result<()> {
        for child in node.children() {
            let name = child.name();
            let Some(field) = object.field(name) else {
                warn!(field = child.path(), "schema field has no accessor; not written");
                continue;
            };

            if let Some(codec) = self.registry.resolve(child.type_ref(), child.generics()) {
                match field.value_any() {
                    Some(value) => (codec.write)(proto, name, value)?,
                    None => trace!(field = child.path(), "absent; not written"),
                }
                continue;
            }

            match field.nested() {
                Some(nested) => {
                    proto.put_start_marker(name)?;
                    self.write_fields(proto, child, nested)?;
                    proto.put_end_marker(name)?;
                }
                None if field.value_any().is_none() || child.modifiers().optional => {
                    trace!(field = child.path(), "absent; not written");
                }
                None => warn!(
                    field = child.path(),
                    type_name = child.type_ref().name,
                    "no codec and no nested schema; not written"
                ),
            }
        }
        Ok(())
    }

    /// Reads a stream into a fresh `T`.
    pub fn deserialise<T: WireObject>(&mut self, proto: &mut dyn WireProtocol) -> Result<T> {
        let mut target = T::default();
        self.deserialise_into(proto, &mut target)?;
        Ok(target)
    }

    /// Reads a stream into an existing value. Fields absent from the stream keep
    /// their current values.
    pub fn deserialise_into<T: WireObject>(
        &mut self,
        proto: &mut dyn WireProtocol,
        target: &mut T,
    ) -> Result<ProtocolInfo> {
        let tree = self.tree_for::<T>()?;
        let info = proto.get_header_info()?;
        let (major, minor) = self.accepted;
        if !info.is_compatible(major, minor) {
            let found = info.version();
            return Err(WireError::Version {
                producer: info.producer,
                found,
                accepted: self.accepted,
            });
        }
        debug!(
            type_name = tree.root().name(),
            producer = %info.producer,
            version = ?info.version(),
            "deserialising"
        );
        self.read_fields(proto, tree.root(), &info.root, target, 0)?;
        Ok(info)
    }

    fn read_fields(
        &self,
        proto: &mut dyn WireProtocol,
        node: FieldRef<'_>,
        scope: &FieldHeader,
        object: &mut dyn WireReflect,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_SCOPE_DEPTH {
            return Err(WireError::structure(format!(
                "scope '{}' nested deeper than {MAX_SCOPE_DEPTH}",
                scope.name
            )));
        }
        let mut fields = 0usize;
        loop {
            let header = proto.get_field_header()?;
            if header.is_end_marker() {
                if header.name != scope.name {
                    return Err(WireError::structure(format!(
                        "scope '{}' closed by end marker '{}'",
                        scope.name, header.name
                    )));
                }
                break;
            }
            fields += 1;

            let Some(child) = node.find_child(header.name_hash, &header.name) else {
                debug!(field = %header.name, data_type = %header.data_type, "unknown field skipped");
                skip_field(proto, header)?;
                continue;
            };

            if header.is_start_marker() {
                match object.field_mut(child.name()).and_then(|f| f.nested_mut()) {
                    Some(nested) => self.read_fields(proto, child, &header, nested, depth + 1)?,
                    None => {
                        warn!(field = child.path(), "nested scope has no object to read into; skipped");
                        skip_field(proto, header)?;
                    }
                }
                continue;
            }

            // Object-typed fields carry whatever tag their registered codec writes.
            if child.data_type() != DataType::Other && !tags_compatible(child.data_type(), header.data_type) {
                warn!(
                    field = child.path(),
                    expected = %child.data_type(),
                    found = %header.data_type,
                    "tag mismatch; field skipped"
                );
                skip_field(proto, header)?;
                continue;
            }

            let Some(codec) = self.registry.resolve(child.type_ref(), child.generics()) else {
                warn!(field = child.path(), type_name = child.type_ref().name, "no codec; field skipped");
                skip_field(proto, header)?;
                continue;
            };
            let Some(field) = object.field_mut(child.name()) else {
                skip_field(proto, header)?;
                continue;
            };

            if !(codec.read)(proto, &header, field.value_any_mut())? {
                field.clear_value();
            }
            if let Some(end) = header.data_end() {
                proto.buffer_mut().set_position(end)?;
            }
        }

        if let Some(entries) = scope.entries
            && usize::try_from(entries - 1).ok() != Some(fields)
        {
            return Err(WireError::structure(format!(
                "scope '{}' announced {entries} entries, found {fields} fields",
                scope.name
            )));
        }
        Ok(())
    }
}

/// True if a field written as `found` may be read by a codec for `expected`.
///
/// Collection tags are interchangeable.
pub fn tags_compatible(expected: DataType, found: DataType) -> bool {
    expected == found || (expected.is_collection() && found.is_collection())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_tags_are_interchangeable() {
        assert!(tags_compatible(DataType::List, DataType::Set));
        assert!(tags_compatible(DataType::Int, DataType::Int));
        assert!(!tags_compatible(DataType::Int, DataType::Long));
        assert!(!tags_compatible(DataType::Map, DataType::List));
    }
}
