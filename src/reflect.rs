//! Runtime reflection glue between user types and the object walker.
//!
//! Three layers:
//!
//! * [`WireType`]: static facts about a field type (name, tag, codec, nested schema)
//!   plus value access. Implemented for every supported built-in and by both derives.
//! * [`WireField`]: the object-safe view of a `WireType` value the walker holds.
//! * [`WireReflect`]: by-name field lookup on an object, generated by
//!   `#[derive(WireObject)]`.
//!
//! `Option<T>` and `Box<T>` are transparent: they describe themselves as `T`, an
//! absent option is not written, and reading a present field materializes it.

use std::any::Any;

use crate::data_type::DataType;
use crate::dispatch::FieldCodec;
use crate::schema::{TypeInfo, TypeRef};

/// Static description and value access for a field type.
pub trait WireType: Any + Sized {
    /// Declared type.
    fn type_ref() -> TypeRef;

    /// Generic arguments, empty for non-generic types.
    fn generics() -> Vec<TypeRef> {
        Vec::new()
    }

    /// Tag the value is written with.
    fn data_type() -> DataType;

    /// Leaf codec, when the type is written as a single field.
    fn codec() -> Option<FieldCodec> {
        None
    }

    /// Nested description, when the type is written as a scope of fields.
    fn nested_info() -> Option<TypeInfo> {
        None
    }

    /// True if the value may be absent.
    fn optional() -> bool {
        false
    }

    /// The value a leaf codec writes; `None` if absent.
    fn field_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    /// The slot a leaf codec reads into, created if absent.
    fn field_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    /// The nested object, if this is one and it is present.
    fn field_reflect(&self) -> Option<&dyn WireReflect> {
        None
    }

    /// The nested object to read into, created if absent.
    fn field_reflect_mut(&mut self) -> Option<&mut dyn WireReflect> {
        None
    }

    /// Marks the value absent after a failed reconstruction.
    ///
    /// Only optional types can express absence; for the others the value keeps
    /// whatever it held.
    fn clear(&mut self) {}
}

/// Object-safe access to a field value, implemented for every [`WireType`].
pub trait WireField {
    /// See [`WireType::field_any`].
    fn value_any(&self) -> Option<&dyn Any>;
    /// See [`WireType::field_any_mut`].
    fn value_any_mut(&mut self) -> &mut dyn Any;
    /// See [`WireType::field_reflect`].
    fn nested(&self) -> Option<&dyn WireReflect>;
    /// See [`WireType::field_reflect_mut`].
    fn nested_mut(&mut self) -> Option<&mut dyn WireReflect>;
    /// See [`WireType::clear`].
    fn clear_value(&mut self);
}

impl<T: WireType> WireField for T {
    fn value_any(&self) -> Option<&dyn Any> {
        self.field_any()
    }

    fn value_any_mut(&mut self) -> &mut dyn Any {
        self.field_any_mut()
    }

    fn nested(&self) -> Option<&dyn WireReflect> {
        self.field_reflect()
    }

    fn nested_mut(&mut self) -> Option<&mut dyn WireReflect> {
        self.field_reflect_mut()
    }

    fn clear_value(&mut self) {
        self.clear();
    }
}

/// By-name access to the fields of an object.
///
/// Names are wire names. Fields inherited through `#[wire(base)]` are reachable
/// through the derived object as well.
pub trait WireReflect {
    /// Looks a field up for writing.
    fn field(&self, name: &str) -> Option<&dyn WireField>;
    /// Looks a field up for reading.
    fn field_mut(&mut self, name: &str) -> Option<&mut dyn WireField>;
}

/// A type that can be the root of a stream.
///
/// Implemented by `#[derive(WireObject)]`.
pub trait WireObject: WireReflect + WireType + Default {
    /// Full description of the type.
    fn type_info() -> TypeInfo;
}

impl<T: WireType + Default> WireType for Option<T> {
    fn type_ref() -> TypeRef {
        T::type_ref()
    }

    fn generics() -> Vec<TypeRef> {
        T::generics()
    }

    fn data_type() -> DataType {
        T::data_type()
    }

    fn codec() -> Option<FieldCodec> {
        T::codec()
    }

    fn nested_info() -> Option<TypeInfo> {
        T::nested_info()
    }

    fn optional() -> bool {
        true
    }

    fn field_any(&self) -> Option<&dyn Any> {
        self.as_ref().and_then(|v| v.field_any())
    }

    fn field_any_mut(&mut self) -> &mut dyn Any {
        self.get_or_insert_with(T::default).field_any_mut()
    }

    fn field_reflect(&self) -> Option<&dyn WireReflect> {
        self.as_ref().and_then(|v| v.field_reflect())
    }

    fn field_reflect_mut(&mut self) -> Option<&mut dyn WireReflect> {
        self.get_or_insert_with(T::default).field_reflect_mut()
    }

    fn clear(&mut self) {
        *self = None;
    }
}

impl<T: WireType> WireType for Box<T> {
    fn type_ref() -> TypeRef {
        T::type_ref()
    }

    fn generics() -> Vec<TypeRef> {
        T::generics()
    }

    fn data_type() -> DataType {
        T::data_type()
    }

    fn codec() -> Option<FieldCodec> {
        T::codec()
    }

    fn nested_info() -> Option<TypeInfo> {
        T::nested_info()
    }

    fn optional() -> bool {
        T::optional()
    }

    fn field_any(&self) -> Option<&dyn Any> {
        (**self).field_any()
    }

    fn field_any_mut(&mut self) -> &mut dyn Any {
        (**self).field_any_mut()
    }

    fn field_reflect(&self) -> Option<&dyn WireReflect> {
        (**self).field_reflect()
    }

    fn field_reflect_mut(&mut self) -> Option<&mut dyn WireReflect> {
        (**self).field_reflect_mut()
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}
