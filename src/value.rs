//! Value codecs: how each supported Rust type is laid out as one field.
//!
//! | Rust type | tag | payload after the header |
//! |---|---|---|
//! | scalars | `Bool` .. `Double`, `Char` | fixed-size value |
//! | `String` | `String` | `[i32 len+1][bytes][0]` |
//! | `Vec<T>`, [`MultiArray<T>`] | `*Array` | `[dims][i32 count][elements]` |
//! | `LinkedList`, `VecDeque`, `HashSet`, `BTreeSet` | `List`, `Queue`, `Set` | `[dims][u8 element tag][element array]` |
//! | `HashMap`, `BTreeMap` | `Map` | `[dims][u8 key tag][u8 value tag][key array][value array]` |
//! | `#[derive(WireEnum)]` | `Enum` | `[dims][simple name][qualified name][constant list][selected][i32 ordinal]` |
//!
//! Collection and map elements must be [`WireElement`]s. Any collection tag decodes
//! into any collection type, so a `List` written by one side may be read as a
//! `HashSet` by the other.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;
use tracing::warn;

use crate::data_type::DataType;
use crate::dispatch::FieldCodec;
use crate::error::{Result, WireError};
use crate::format::FieldHeader;
use crate::protocol::WireProtocol;
use crate::reflect::WireType;
use crate::schema::TypeRef;

/// A type that is written and read as a single field.
pub trait WireValue: WireType {
    /// Writes header and payload under `name`.
    fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> Result<()>;

    /// Reads the payload of a field whose header has just been read.
    ///
    /// `Ok(None)` means the stream was well-formed but the value cannot be
    /// represented on this side; the field is then left absent.
    fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Self>>;
}

/// A scalar that can also be an array, collection or map element.
pub trait WireElement: WireValue + Clone + Default {
    /// Tag of a single value.
    const SCALAR: DataType;
    /// Tag of an array of values.
    const ARRAY: DataType;

    /// Writes the bare value.
    fn put_scalar(&self, proto: &mut dyn WireProtocol);
    /// Reads a bare value.
    fn get_scalar(proto: &mut dyn WireProtocol) -> Result<Self>;
    /// Writes `[i32 count][elements]`.
    fn put_elements(values: &[Self], proto: &mut dyn WireProtocol);
    /// Reads `[i32 count][elements]`.
    fn get_elements(proto: &mut dyn WireProtocol) -> Result<Vec<Self>>;
}

fn expect_tag(header: &FieldHeader, accepted: impl Fn(DataType) -> bool, expected: &str) -> Result<()> {
    if accepted(header.data_type) {
        Ok(())
    } else {
        Err(WireError::TypeMismatch {
            field: header.name.clone(),
            expected: expected.to_string(),
        })
    }
}

fn write_scalar<T: WireElement>(value: &T, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
    let mut header = proto.put_field_header(name, T::SCALAR)?;
    value.put_scalar(proto);
    proto.finish_field(&mut header)
}

fn read_scalar<T: WireElement>(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<T>> {
    expect_tag(header, |t| t == T::SCALAR, T::SCALAR.name())?;
    T::get_scalar(proto).map(Some)
}

macro_rules! primitive_element {
    ($t:ty, $name:literal, $supers:expr, $scalar:ident, $array:ident, $put:ident, $get:ident, $put_arr:ident, $get_arr:ident) => {
        impl WireType for $t {
            fn type_ref() -> TypeRef {
                TypeRef::with_supertypes($name, $supers)
            }

            fn data_type() -> DataType {
                DataType::$scalar
            }

            fn codec() -> Option<FieldCodec> {
                Some(FieldCodec::of::<Self>())
            }
        }

        impl WireValue for $t {
            fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
                write_scalar(self, proto, name)
            }

            fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Self>> {
                read_scalar(proto, header)
            }
        }

        impl WireElement for $t {
            const SCALAR: DataType = DataType::$scalar;
            const ARRAY: DataType = DataType::$array;

            fn put_scalar(&self, proto: &mut dyn WireProtocol) {
                proto.buffer_mut().$put(*self);
            }

            fn get_scalar(proto: &mut dyn WireProtocol) -> Result<Self> {
                proto.buffer_mut().$get()
            }

            fn put_elements(values: &[Self], proto: &mut dyn WireProtocol) {
                proto.buffer_mut().$put_arr(values);
            }

            fn get_elements(proto: &mut dyn WireProtocol) -> Result<Vec<Self>> {
                proto.buffer_mut().$get_arr()
            }
        }
    };
}

const NUMBER: &[&str] = &["Number"];

primitive_element!(bool, "bool", &[], Bool, BoolArray, put_bool, get_bool, put_bool_array, get_bool_array);
primitive_element!(i8, "i8", NUMBER, Byte, ByteArray, put_i8, get_i8, put_i8_array, get_i8_array);
primitive_element!(u8, "u8", NUMBER, Byte, ByteArray, put_u8, get_u8, put_u8_array, get_u8_array);
primitive_element!(i16, "i16", NUMBER, Short, ShortArray, put_i16, get_i16, put_i16_array, get_i16_array);
primitive_element!(u16, "u16", &[], Char, CharArray, put_u16, get_u16, put_u16_array, get_u16_array);
primitive_element!(i32, "i32", NUMBER, Int, IntArray, put_i32, get_i32, put_i32_array, get_i32_array);
primitive_element!(i64, "i64", NUMBER, Long, LongArray, put_i64, get_i64, put_i64_array, get_i64_array);
primitive_element!(f32, "f32", NUMBER, Float, FloatArray, put_f32, get_f32, put_f32_array, get_f32_array);
primitive_element!(f64, "f64", NUMBER, Double, DoubleArray, put_f64, get_f64, put_f64_array, get_f64_array);

impl WireType for String {
    fn type_ref() -> TypeRef {
        TypeRef::new("String")
    }

    fn data_type() -> DataType {
        DataType::String
    }

    fn codec() -> Option<FieldCodec> {
        Some(FieldCodec::of::<Self>())
    }
}

impl WireValue for String {
    fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
        write_scalar(self, proto, name)
    }

    fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Self>> {
        read_scalar(proto, header)
    }
}

impl WireElement for String {
    const SCALAR: DataType = DataType::String;
    const ARRAY: DataType = DataType::StringArray;

    fn put_scalar(&self, proto: &mut dyn WireProtocol) {
        proto.put_string(self);
    }

    fn get_scalar(proto: &mut dyn WireProtocol) -> Result<Self> {
        proto.get_string()
    }

    fn put_elements(values: &[Self], proto: &mut dyn WireProtocol) {
        proto.put_string_array(values);
    }

    fn get_elements(proto: &mut dyn WireProtocol) -> Result<Vec<Self>> {
        proto.get_string_array()
    }
}

// --- arrays ---

fn check_dims(dims: &[usize], len: usize, field: &str) -> Result<()> {
    let expected = dims.iter().try_fold(1usize, |acc, d| acc.checked_mul(*d));
    if expected == Some(len) {
        Ok(())
    } else {
        Err(WireError::structure(format!(
            "array '{field}' has dims {dims:?} but {len} elements"
        )))
    }
}

fn read_array<T: WireElement>(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<(Vec<usize>, Vec<T>)> {
    expect_tag(header, |t| t == T::ARRAY, T::ARRAY.name())?;
    let dims = proto.get_array_dims()?;
    let data = T::get_elements(proto)?;
    check_dims(&dims, data.len(), &header.name)?;
    Ok((dims, data))
}

impl<T: WireElement> WireType for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::with_supertypes("Vec", &["Collection", "List"])
    }

    fn generics() -> Vec<TypeRef> {
        vec![T::type_ref()]
    }

    fn data_type() -> DataType {
        T::ARRAY
    }

    fn codec() -> Option<FieldCodec> {
        Some(FieldCodec::of::<Self>())
    }
}

impl<T: WireElement> WireValue for Vec<T> {
    fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
        let mut header = proto.put_array_header(name, T::ARRAY, &[self.len()])?;
        T::put_elements(self, proto);
        proto.finish_field(&mut header)
    }

    fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Self>> {
        read_array(proto, header).map(|(_, data)| Some(data))
    }
}

/// A rectangular N-dimensional array stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiArray<T> {
    dims: Vec<usize>,
    data: Vec<T>,
}

impl<T> Default for MultiArray<T> {
    fn default() -> Self {
        Self {
            dims: vec![0],
            data: Vec::new(),
        }
    }
}

impl<T> MultiArray<T> {
    /// Builds an array, checking that `data` has exactly the product of `dims` elements.
    pub fn new(dims: Vec<usize>, data: Vec<T>) -> Result<Self> {
        check_dims(&dims, data.len(), "MultiArray")?;
        Ok(Self { dims, data })
    }

    /// Extent of each dimension.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Elements in row-major order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Consumes the array, returning its elements.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut flat = 0usize;
        for (i, d) in index.iter().zip(&self.dims) {
            if i >= d {
                return None;
            }
            flat = flat * d + i;
        }
        self.data.get(flat)
    }
}

impl<T: WireElement> WireType for MultiArray<T> {
    fn type_ref() -> TypeRef {
        TypeRef::new("MultiArray")
    }

    fn generics() -> Vec<TypeRef> {
        vec![T::type_ref()]
    }

    fn data_type() -> DataType {
        T::ARRAY
    }

    fn codec() -> Option<FieldCodec> {
        Some(FieldCodec::of::<Self>())
    }
}

impl<T: WireElement> WireValue for MultiArray<T> {
    fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
        let mut header = proto.put_array_header(name, T::ARRAY, &self.dims)?;
        T::put_elements(&self.data, proto);
        proto.finish_field(&mut header)
    }

    fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Self>> {
        let (dims, data) = read_array(proto, header)?;
        Ok(Some(Self { dims, data }))
    }
}

// --- collections ---

fn write_collection<T: WireElement>(
    proto: &mut dyn WireProtocol,
    name: &str,
    tag: DataType,
    items: &[T],
) -> Result<()> {
    let mut header = proto.put_array_header(name, tag, &[items.len()])?;
    proto.put_data_type(T::SCALAR);
    T::put_elements(items, proto);
    proto.finish_field(&mut header)
}

fn read_collection<T: WireElement>(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Vec<T>>> {
    expect_tag(header, DataType::is_collection, "collection")?;
    proto.get_array_dims()?;
    let element = proto.get_data_type()?;
    if element != T::SCALAR {
        warn!(
            field = %header.name,
            found = %element,
            expected = %T::SCALAR,
            "collection element type differs; field left absent"
        );
        return Ok(None);
    }
    T::get_elements(proto).map(Some)
}

macro_rules! collection {
    ($ty:ident, $name:literal, $supers:expr, $tag:ident, [$($bound:path),*]) => {
        impl<T: WireElement $(+ $bound)*> WireType for $ty<T> {
            fn type_ref() -> TypeRef {
                TypeRef::with_supertypes($name, $supers)
            }

            fn generics() -> Vec<TypeRef> {
                vec![T::type_ref()]
            }

            fn data_type() -> DataType {
                DataType::$tag
            }

            fn codec() -> Option<FieldCodec> {
                Some(FieldCodec::of::<Self>())
            }
        }

        impl<T: WireElement $(+ $bound)*> WireValue for $ty<T> {
            fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
                let items: Vec<T> = self.iter().cloned().collect();
                write_collection(proto, name, DataType::$tag, &items)
            }

            fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Self>> {
                Ok(read_collection::<T>(proto, header)?.map(|items| items.into_iter().collect()))
            }
        }
    };
}

collection!(LinkedList, "LinkedList", &["Collection", "List"], List, []);
collection!(VecDeque, "VecDeque", &["Collection", "Queue"], Queue, []);
collection!(HashSet, "HashSet", &["Collection", "Set"], Set, [Eq, Hash]);
collection!(BTreeSet, "BTreeSet", &["Collection", "Set"], Set, [Ord]);

// --- maps ---

fn write_map<K: WireElement, V: WireElement>(
    proto: &mut dyn WireProtocol,
    name: &str,
    keys: &[K],
    values: &[V],
) -> Result<()> {
    let mut header = proto.put_array_header(name, DataType::Map, &[keys.len()])?;
    proto.put_data_type(K::SCALAR);
    proto.put_data_type(V::SCALAR);
    K::put_elements(keys, proto);
    V::put_elements(values, proto);
    proto.finish_field(&mut header)
}

fn read_map<K: WireElement, V: WireElement>(
    proto: &mut dyn WireProtocol,
    header: &FieldHeader,
) -> Result<Option<(Vec<K>, Vec<V>)>> {
    expect_tag(header, |t| t == DataType::Map, "map")?;
    proto.get_array_dims()?;
    let key = proto.get_data_type()?;
    let value = proto.get_data_type()?;
    if key != K::SCALAR || value != V::SCALAR {
        warn!(
            field = %header.name,
            key = %key,
            value = %value,
            "map entry types differ; field left absent"
        );
        return Ok(None);
    }
    let keys = K::get_elements(proto)?;
    let values = V::get_elements(proto)?;
    if keys.len() != values.len() {
        return Err(WireError::structure(format!(
            "map '{}' has {} keys but {} values",
            header.name,
            keys.len(),
            values.len()
        )));
    }
    Ok(Some((keys, values)))
}

macro_rules! map {
    ($ty:ident, $name:literal, [$($bound:path),*]) => {
        impl<K: WireElement $(+ $bound)*, V: WireElement> WireType for $ty<K, V> {
            fn type_ref() -> TypeRef {
                TypeRef::with_supertypes($name, &["Map"])
            }

            fn generics() -> Vec<TypeRef> {
                vec![K::type_ref(), V::type_ref()]
            }

            fn data_type() -> DataType {
                DataType::Map
            }

            fn codec() -> Option<FieldCodec> {
                Some(FieldCodec::of::<Self>())
            }
        }

        impl<K: WireElement $(+ $bound)*, V: WireElement> WireValue for $ty<K, V> {
            fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
                let (keys, values): (Vec<K>, Vec<V>) =
                    self.iter().map(|(k, v)| (k.clone(), v.clone())).unzip();
                write_map(proto, name, &keys, &values)
            }

            fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<Self>> {
                Ok(read_map::<K, V>(proto, header)?
                    .map(|(keys, values)| keys.into_iter().zip(values).collect()))
            }
        }
    };
}

map!(HashMap, "HashMap", [Eq, Hash]);
map!(BTreeMap, "BTreeMap", [Ord]);

// --- enums ---

/// A unit-only enum written by constant name.
///
/// Implemented by `#[derive(WireEnum)]`.
pub trait WireEnum: Sized + 'static {
    /// Module-qualified type name.
    fn qualified_name() -> &'static str;

    /// Bare type name.
    fn simple_name() -> &'static str;

    /// Constant names in declaration order.
    fn constants() -> &'static [&'static str];

    /// Name of this constant.
    fn constant_name(&self) -> &'static str;

    /// Declaration index of this constant.
    fn ordinal(&self) -> i32;

    /// Looks a constant up by name.
    fn from_constant(name: &str) -> Option<Self>;

    /// The constants rendered as `[A, B, C]`.
    fn constant_list() -> String {
        format!("[{}]", Self::constants().join(", "))
    }
}

/// The payload of an enum field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumPayload {
    /// Bare type name of the writer's enum.
    pub simple_name: String,
    /// Module-qualified type name of the writer's enum.
    pub qualified_name: String,
    /// The writer's constants as `[A, B]`.
    pub constant_list: String,
    /// Selected constant.
    pub selected: String,
    /// Declaration index of the selected constant on the writer's side.
    pub ordinal: i32,
}

pub(crate) fn write_enum_payload<E: WireEnum>(
    value: &E,
    proto: &mut dyn WireProtocol,
    name: &str,
) -> Result<()> {
    let mut header = proto.put_array_header(name, DataType::Enum, &[1])?;
    proto.put_string(E::simple_name());
    proto.put_string(E::qualified_name());
    proto.put_string(&E::constant_list());
    proto.put_string(value.constant_name());
    proto.buffer_mut().put_i32(value.ordinal());
    proto.finish_field(&mut header)
}

pub(crate) fn read_enum_payload(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<EnumPayload> {
    expect_tag(header, |t| t == DataType::Enum, "enum")?;
    proto.get_array_dims()?;
    Ok(EnumPayload {
        simple_name: proto.get_string()?,
        qualified_name: proto.get_string()?,
        constant_list: proto.get_string()?,
        selected: proto.get_string()?,
        ordinal: proto.buffer_mut().get_i32()?,
    })
}
