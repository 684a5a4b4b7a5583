//! The known-type dispatch registry.
//!
//! Maps a declared type (plus generic arguments) to the pair of functions that
//! write and read it as a single field. The object walker asks the registry first
//! and only recurses into a type's fields when nothing resolves.
//!
//! Registration order matters: resolution always returns the earliest matching
//! entry, which keeps the outcome deterministic.

use parking_lot::RwLock;
use std::any::Any;
use std::sync::{Arc, LazyLock};
use tracing::trace;

use crate::error::{Result, WireError};
use crate::format::FieldHeader;
use crate::protocol::WireProtocol;
use crate::schema::{SchemaTree, TypeRef};
use crate::value::{MultiArray, WireValue};

/// Writes one field: `(protocol, field name, value)`.
pub type WriteFn = fn(&mut dyn WireProtocol, &str, &dyn Any) -> Result<()>;

/// Reads one field into the slot. `Ok(false)` means the value could not be
/// reconstructed and the field should be left absent.
pub type ReadFn = fn(&mut dyn WireProtocol, &FieldHeader, &mut dyn Any) -> Result<bool>;

/// A registered codec for one (type, generic arguments) pair.
#[derive(Debug, Clone)]
pub struct FieldCodec {
    /// Type the codec handles.
    pub type_ref: TypeRef,
    /// Generic arguments the codec is constrained to; empty means unconstrained.
    pub generics: Vec<TypeRef>,
    /// Encoder.
    pub write: WriteFn,
    /// Decoder.
    pub read: ReadFn,
}

impl FieldCodec {
    /// Builds a codec from explicit functions.
    pub fn new(type_ref: TypeRef, generics: Vec<TypeRef>, write: WriteFn, read: ReadFn) -> Self {
        Self {
            type_ref,
            generics,
            write,
            read,
        }
    }

    /// The codec of a [`WireValue`] type.
    pub fn of<T: WireValue>() -> Self {
        Self::new(T::type_ref(), T::generics(), write_erased::<T>, read_erased::<T>)
    }

    /// True if the codec is registered under the same name and generics.
    pub fn same_key(&self, other: &FieldCodec) -> bool {
        self.type_ref.name == other.type_ref.name
            && self.generics.len() == other.generics.len()
            && self
                .generics
                .iter()
                .zip(&other.generics)
                .all(|(a, b)| a.name == b.name)
    }

    /// True if `requested` fits the codec's generic constraints.
    ///
    /// Lengths must agree and each requested argument must equal, or be assignable
    /// to, the codec's argument.
    pub fn accepts_generics(&self, requested: &[TypeRef]) -> bool {
        self.generics.len() == requested.len()
            && requested
                .iter()
                .zip(&self.generics)
                .all(|(r, own)| r.is_assignable_to(own))
    }
}

fn write_erased<T: WireValue>(proto: &mut dyn WireProtocol, name: &str, value: &dyn Any) -> Result<()> {
    let value = value
        .downcast_ref::<T>()
        .ok_or_else(|| WireError::TypeMismatch {
            field: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })?;
    value.write_value(proto, name)
}

fn read_erased<T: WireValue>(
    proto: &mut dyn WireProtocol,
    header: &FieldHeader,
    slot: &mut dyn Any,
) -> Result<bool> {
    let slot = slot
        .downcast_mut::<T>()
        .ok_or_else(|| WireError::TypeMismatch {
            field: header.name.clone(),
            expected: std::any::type_name::<T>().to_string(),
        })?;
    match T::read_value(proto, header)? {
        Some(value) => {
            *slot = value;
            Ok(true)
        }
        None => Ok(false),
    }
}

static GLOBAL: LazyLock<Arc<KnownTypes>> = LazyLock::new(|| Arc::new(KnownTypes::with_defaults()));

/// Ordered registry of field codecs.
#[derive(Debug, Default)]
pub struct KnownTypes {
    entries: RwLock<Vec<Arc<FieldCodec>>>,
}

macro_rules! register_element_types {
    ($registry:expr, $($t:ty),*) => {
        $( $registry.register(FieldCodec::of::<$t>()); )*
        $( $registry.register(FieldCodec::of::<Vec<$t>>()); )*
        $( $registry.register(FieldCodec::of::<MultiArray<$t>>()); )*
    };
}

impl KnownTypes {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding codecs for every scalar, `String`, and `Vec` and
    /// [`MultiArray`] of each of them.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        register_element_types!(registry, bool, i8, u8, i16, u16, i32, i64, f32, f64, String);
        registry
    }

    /// The process-wide registry.
    pub fn global() -> Arc<KnownTypes> {
        Arc::clone(&GLOBAL)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Appends a codec. Earlier entries keep precedence.
    pub fn register(&self, codec: FieldCodec) {
        trace!(type_name = codec.type_ref.name, "codec registered");
        self.entries.write().push(Arc::new(codec));
    }

    /// Appends a codec unless one with the same name and generics exists.
    ///
    /// Returns true if the codec was added.
    pub fn register_if_absent(&self, codec: FieldCodec) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.same_key(&codec)) {
            return false;
        }
        trace!(type_name = codec.type_ref.name, "codec registered");
        entries.push(Arc::new(codec));
        true
    }

    /// Registers the leaf codecs of `tree` that are not known yet.
    ///
    /// Returns how many were added.
    pub fn learn(&self, tree: &SchemaTree) -> usize {
        tree.iter()
            .filter_map(|field| field.codec().cloned())
            .filter(|codec| self.register_if_absent(codec.clone()))
            .count()
    }

    /// Picks the codec for a type and its generic arguments.
    pub fn resolve(&self, type_ref: &TypeRef, generics: &[TypeRef]) -> Option<Arc<FieldCodec>> {
        let entries = self.entries.read();

        let exact: Vec<&Arc<FieldCodec>> = entries
            .iter()
            .filter(|e| e.type_ref.name == type_ref.name)
            .collect();
        if !exact.is_empty() {
            if exact.len() == 1 || generics.is_empty() {
                return exact.first().map(|e| Arc::clone(e));
            }
            if let Some(found) = exact.iter().find(|e| e.accepts_generics(generics)) {
                return Some(Arc::clone(found));
            }
        }

        let assignable: Vec<&Arc<FieldCodec>> = entries
            .iter()
            .filter(|e| type_ref.is_a(e.type_ref.name))
            .collect();
        if assignable.is_empty() {
            return None;
        }
        if assignable.len() == 1 || generics.is_empty() {
            return assignable.first().map(|e| Arc::clone(e));
        }
        assignable
            .iter()
            .find(|e| e.accepts_generics(generics))
            .or_else(|| assignable.iter().find(|e| e.generics.is_empty()))
            .map(|e| Arc::clone(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::WireType;

    fn noop_write(_: &mut dyn WireProtocol, _: &str, _: &dyn Any) -> Result<()> {
        Ok(())
    }

    fn noop_read(_: &mut dyn WireProtocol, _: &FieldHeader, _: &mut dyn Any) -> Result<bool> {
        Ok(true)
    }

    fn codec(name: &'static str, generics: Vec<TypeRef>) -> FieldCodec {
        FieldCodec::new(TypeRef::new(name), generics, noop_write, noop_read)
    }

    #[test]
    fn defaults_cover_scalars_and_arrays() {
        let registry = KnownTypes::with_defaults();
        assert_eq!(registry.len(), 30);
        let vec = registry.resolve(&<Vec<f64>>::type_ref(), &<Vec<f64>>::generics());
        assert_eq!(
            vec.map(|c| c.generics.clone()),
            Some(vec![f64::type_ref()])
        );
        assert!(registry.resolve(&i32::type_ref(), &[]).is_some());
    }

    #[test]
    fn single_exact_entry_wins_regardless_of_generics() {
        let registry = KnownTypes::new();
        registry.register(codec("Pair", vec![TypeRef::new("i32")]));
        let found = registry.resolve(&TypeRef::new("Pair"), &[TypeRef::new("String")]);
        assert_eq!(found.map(|c| c.generics.clone()), Some(vec![TypeRef::new("i32")]));
    }

    #[test]
    fn exact_entries_are_filtered_by_generics() {
        let registry = KnownTypes::new();
        registry.register(codec("Pair", vec![TypeRef::new("i32")]));
        registry.register(codec("Pair", vec![TypeRef::new("String")]));
        let found = registry.resolve(&TypeRef::new("Pair"), &[TypeRef::new("String")]);
        assert_eq!(found.map(|c| c.generics.clone()), Some(vec![TypeRef::new("String")]));

        let first = registry.resolve(&TypeRef::new("Pair"), &[]);
        assert_eq!(first.map(|c| c.generics.clone()), Some(vec![TypeRef::new("i32")]));
    }

    #[test]
    fn supertypes_are_searched_in_registration_order() {
        let registry = KnownTypes::new();
        registry.register(codec("Collection", vec![TypeRef::new("i64")]));
        registry.register(codec("List", vec![]));
        let list = TypeRef::with_supertypes("LinkedList", &["Collection", "List"]);

        let found = registry.resolve(&list, &[TypeRef::new("i64")]);
        assert_eq!(found.map(|c| c.type_ref.name), Some("Collection"));

        let fallback = registry.resolve(&list, &[TypeRef::new("bool")]);
        assert_eq!(fallback.map(|c| c.type_ref.name), Some("List"));

        assert!(registry.resolve(&TypeRef::new("Unrelated"), &[]).is_none());
    }

    #[test]
    fn register_if_absent_keeps_the_first() {
        let registry = KnownTypes::new();
        assert!(registry.register_if_absent(codec("A", vec![])));
        assert!(!registry.register_if_absent(codec("A", vec![])));
        assert!(registry.register_if_absent(codec("A", vec![TypeRef::new("i8")])));
        assert_eq!(registry.len(), 2);
    }
}
