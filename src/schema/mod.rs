//! Per-type field descriptors.
//!
//! A type describes itself once through a [`TypeInfo`]: its [`TypeRef`], an optional
//! base whose fields are inherited, and one [`FieldInfo`] per field. `#[derive(WireObject)]`
//! writes this description; hand-written impls are possible but rarely needed.
//!
//! [`SchemaCache`] turns a description into an immutable [`SchemaTree`] and keeps it for the
//! life of the process, so the cost of walking the type is paid once per
//! (type, generic arguments) pair.

mod cache;
mod tree;

pub use cache::{DEFAULT_MAX_DEPTH, SchemaCache};
pub use tree::{FieldRef, SchemaTree};

use serde::Serialize;
use std::fmt;

use crate::data_type::DataType;
use crate::dispatch::FieldCodec;
use crate::reflect::WireType;

/// Type name of the universal empty base, which is never expanded.
pub const EMPTY_BASE_NAME: &str = "()";

/// A declared type: its name plus the names it is assignable to.
///
/// Supertypes play the role an inheritance chain would: the dispatch registry falls
/// back to them when no codec is registered under the exact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TypeRef {
    /// Fully qualified name for derived types, the plain Rust name for built-ins.
    pub name: &'static str,
    /// Names this type may stand in for, most specific first.
    pub supertypes: &'static [&'static str],
}

impl TypeRef {
    /// A type with no supertypes.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            supertypes: &[],
        }
    }

    /// A type assignable to each of `supertypes`.
    pub const fn with_supertypes(
        name: &'static str,
        supertypes: &'static [&'static str],
    ) -> Self {
        Self { name, supertypes }
    }

    /// True if a value of this type may be used where `target` is expected.
    pub fn is_assignable_to(&self, target: &TypeRef) -> bool {
        self.name == target.name || self.supertypes.contains(&target.name)
    }

    /// True if `name` is this type or one of its supertypes.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.supertypes.contains(&name)
    }

    /// Last `::` segment of the name.
    pub fn simple_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Cache key: type name plus ordered generic argument names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    /// Type name.
    pub name: &'static str,
    /// Generic argument names, in declaration order.
    pub generics: Vec<&'static str>,
}

impl TypeKey {
    /// Builds the key for a type and its generic arguments.
    pub fn new(type_ref: &TypeRef, generics: &[TypeRef]) -> Self {
        Self {
            name: type_ref.name,
            generics: generics.iter().map(|g| g.name).collect(),
        }
    }
}

/// Field modifiers that change how a field takes part in serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Modifiers {
    /// Never serialized (`#[wire(skip)]`).
    pub transient: bool,
    /// Belongs to the type rather than the instance; never serialized.
    pub is_static: bool,
    /// May be absent (`Option<T>`); absent values are not written.
    pub optional: bool,
}

impl Modifiers {
    /// True if the field is left out of the schema tree.
    pub fn is_excluded(&self) -> bool {
        self.transient || self.is_static
    }
}

/// Description of one declared field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Wire name (after `#[wire(rename)]`).
    pub name: &'static str,
    /// Declared type.
    pub type_ref: TypeRef,
    /// Generic arguments of the declared type.
    pub generics: Vec<TypeRef>,
    /// Tag the field is written with.
    pub data_type: DataType,
    /// Transient / static / optional flags.
    pub modifiers: Modifiers,
    /// Leaf codec, if the type has one.
    pub codec: Option<FieldCodec>,
    /// Lazily produced description of a nested object type.
    pub nested: fn() -> Option<TypeInfo>,
}

fn no_nested_info() -> Option<TypeInfo> {
    None
}

impl FieldInfo {
    /// Describes a field of type `T`.
    pub fn of<T: WireType>(name: &'static str) -> Self {
        Self {
            name,
            type_ref: T::type_ref(),
            generics: T::generics(),
            data_type: T::data_type(),
            modifiers: Modifiers {
                optional: T::optional(),
                ..Modifiers::default()
            },
            codec: T::codec(),
            nested: T::nested_info,
        }
    }

    /// Describes a field whose type takes no part in serialization.
    ///
    /// Used for `#[wire(skip)]` fields, whose types need not implement anything.
    pub fn opaque(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            type_ref: TypeRef::new(type_name),
            generics: Vec::new(),
            data_type: DataType::Other,
            modifiers: Modifiers::default(),
            codec: None,
            nested: no_nested_info,
        }
    }

    /// Marks the field transient.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.modifiers.transient = true;
        self
    }

    /// Marks the field static.
    #[must_use]
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }
}

/// Description of one type: identity, base and fields.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// The type itself.
    pub type_ref: TypeRef,
    /// Generic arguments, if the type is generic.
    pub generics: Vec<TypeRef>,
    /// Base type whose fields come first.
    pub base: Option<fn() -> TypeInfo>,
    /// Declared fields, in declaration order.
    pub fields: Vec<FieldInfo>,
}

impl TypeInfo {
    /// A type with fields and no base.
    pub fn new(type_ref: TypeRef, fields: Vec<FieldInfo>) -> Self {
        Self {
            type_ref,
            generics: Vec::new(),
            base: None,
            fields,
        }
    }

    /// Sets the base type.
    #[must_use]
    pub fn with_base(mut self, base: fn() -> TypeInfo) -> Self {
        self.base = Some(base);
        self
    }

    /// The universal base: no fields, never expanded.
    pub fn empty_base() -> Self {
        Self::new(TypeRef::new(EMPTY_BASE_NAME), Vec::new())
    }

    /// True for [`TypeInfo::empty_base`].
    pub fn is_empty_base(&self) -> bool {
        self.type_ref.name == EMPTY_BASE_NAME
    }

    /// Cache key of this description.
    pub fn key(&self) -> TypeKey {
        TypeKey::new(&self.type_ref, &self.generics)
    }
}
