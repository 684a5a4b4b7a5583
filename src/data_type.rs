//! The type-tag registry: every shape a field can take on the wire.
//!
//! The [`Category`] of a tag is protocol independent. Only the byte code differs
//! between protocols; [`DataType::as_byte`] and [`DataType::from_byte`] implement the
//! native table, the compat table is [`compat_code`](crate::protocol::compat_code) and
//! [`compat_tag`](crate::protocol::compat_tag).

use serde::Serialize;
use std::fmt;

use crate::error::{Result, WireError};

/// Structural class of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// Start or end of a nested scope.
    Marker,
    /// A single fixed-size value, or a single string.
    Scalar,
    /// A (possibly multi-dimensional) array of scalars.
    Array,
    /// Collections, maps, enums and anything else with inner structure.
    Compound,
}

/// A wire-level type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    /// Opens a nested scope.
    StartMarker,
    /// `bool`, one byte.
    Bool,
    /// `i8` / `u8`.
    Byte,
    /// `i16`.
    Short,
    /// `i32`.
    Int,
    /// `i64`.
    Long,
    /// `f32`.
    Float,
    /// `f64`.
    Double,
    /// A 16-bit code unit (`u16`).
    Char,
    /// Length-prefixed, zero-terminated string.
    String,
    /// Array of `Bool`.
    BoolArray,
    /// Array of `Byte`.
    ByteArray,
    /// Array of `Short`.
    ShortArray,
    /// Array of `Int`.
    IntArray,
    /// Array of `Long`.
    LongArray,
    /// Array of `Float`.
    FloatArray,
    /// Array of `Double`.
    DoubleArray,
    /// Array of `Char`.
    CharArray,
    /// Array of `String`.
    StringArray,
    /// Unordered bag of elements.
    Collection,
    /// A named constant out of a closed set.
    Enum,
    /// Ordered sequence.
    List,
    /// Key/value pairs.
    Map,
    /// FIFO sequence.
    Queue,
    /// Unique elements.
    Set,
    /// Escape hatch for anything not directly representable, usually a nested object.
    Other,
    /// Closes a nested scope.
    EndMarker,
}

impl DataType {
    /// Every tag, in native byte-code order.
    pub const ALL: [DataType; 27] = [
        Self::StartMarker,
        Self::Bool,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::Char,
        Self::String,
        Self::BoolArray,
        Self::ByteArray,
        Self::ShortArray,
        Self::IntArray,
        Self::LongArray,
        Self::FloatArray,
        Self::DoubleArray,
        Self::CharArray,
        Self::StringArray,
        Self::Collection,
        Self::Enum,
        Self::List,
        Self::Map,
        Self::Queue,
        Self::Set,
        Self::Other,
        Self::EndMarker,
    ];

    /// Returns the structural class of this tag.
    pub const fn category(self) -> Category {
        match self {
            Self::StartMarker | Self::EndMarker => Category::Marker,
            Self::Bool
            | Self::Byte
            | Self::Short
            | Self::Int
            | Self::Long
            | Self::Float
            | Self::Double
            | Self::Char
            | Self::String => Category::Scalar,
            Self::BoolArray
            | Self::ByteArray
            | Self::ShortArray
            | Self::IntArray
            | Self::LongArray
            | Self::FloatArray
            | Self::DoubleArray
            | Self::CharArray
            | Self::StringArray => Category::Array,
            Self::Collection
            | Self::Enum
            | Self::List
            | Self::Map
            | Self::Queue
            | Self::Set
            | Self::Other => Category::Compound,
        }
    }

    /// True for single values, strings included.
    pub const fn is_scalar(self) -> bool {
        matches!(self.category(), Category::Scalar)
    }

    /// True for the nine array tags.
    pub const fn is_array(self) -> bool {
        matches!(self.category(), Category::Array)
    }

    /// True for collections, maps, enums and `Other`.
    pub const fn is_compound(self) -> bool {
        matches!(self.category(), Category::Compound)
    }

    /// True for the four sequence-like compound tags.
    pub const fn is_collection(self) -> bool {
        matches!(
            self,
            Self::Collection | Self::List | Self::Set | Self::Queue
        )
    }

    /// Size in bytes of one primitive value.
    ///
    /// Arrays report the size of one element. Strings, string arrays, markers and
    /// compounds have no fixed size.
    pub const fn primitive_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Byte | Self::BoolArray | Self::ByteArray => Some(1),
            Self::Short | Self::Char | Self::ShortArray | Self::CharArray => Some(2),
            Self::Int | Self::Float | Self::IntArray | Self::FloatArray => Some(4),
            Self::Long | Self::Double | Self::LongArray | Self::DoubleArray => Some(8),
            _ => None,
        }
    }

    /// Smallest length a recorded payload of this tag can have.
    ///
    /// Arrays, collections, maps and enums start with a dimension count. A scope
    /// holds at least its end marker: `[i32 1][0][tag][tag]`. `Other` belongs to
    /// registered codecs and may be empty.
    pub const fn min_payload_size(self) -> usize {
        match self {
            Self::StartMarker => 7,
            Self::Other => 0,
            t if t.is_array() || t.is_compound() => 4,
            _ => 0,
        }
    }

    /// For array tags, the tag of one element.
    pub const fn element_type(self) -> Option<DataType> {
        match self {
            Self::BoolArray => Some(Self::Bool),
            Self::ByteArray => Some(Self::Byte),
            Self::ShortArray => Some(Self::Short),
            Self::IntArray => Some(Self::Int),
            Self::LongArray => Some(Self::Long),
            Self::FloatArray => Some(Self::Float),
            Self::DoubleArray => Some(Self::Double),
            Self::CharArray => Some(Self::Char),
            Self::StringArray => Some(Self::String),
            _ => None,
        }
    }

    /// For scalar tags, the matching array tag.
    pub const fn array_type(self) -> Option<DataType> {
        match self {
            Self::Bool => Some(Self::BoolArray),
            Self::Byte => Some(Self::ByteArray),
            Self::Short => Some(Self::ShortArray),
            Self::Int => Some(Self::IntArray),
            Self::Long => Some(Self::LongArray),
            Self::Float => Some(Self::FloatArray),
            Self::Double => Some(Self::DoubleArray),
            Self::Char => Some(Self::CharArray),
            Self::String => Some(Self::StringArray),
            _ => None,
        }
    }

    /// Native protocol byte code.
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::StartMarker => 0,
            Self::Bool => 1,
            Self::Byte => 2,
            Self::Short => 3,
            Self::Int => 4,
            Self::Long => 5,
            Self::Float => 6,
            Self::Double => 7,
            Self::Char => 8,
            Self::String => 9,
            Self::BoolArray => 101,
            Self::ByteArray => 102,
            Self::ShortArray => 103,
            Self::IntArray => 104,
            Self::LongArray => 105,
            Self::FloatArray => 106,
            Self::DoubleArray => 107,
            Self::CharArray => 108,
            Self::StringArray => 109,
            Self::Collection => 200,
            Self::Enum => 201,
            Self::List => 202,
            Self::Map => 203,
            Self::Queue => 204,
            Self::Set => 205,
            Self::Other => 0xFD,
            Self::EndMarker => 0xFE,
        }
    }

    /// Looks up a native protocol byte code.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_byte() == byte)
            .ok_or(WireError::UnknownTag {
                protocol: "native",
                byte,
            })
    }

    /// Short lowercase name used in reports and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StartMarker => "start_marker",
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::String => "string",
            Self::BoolArray => "bool_array",
            Self::ByteArray => "byte_array",
            Self::ShortArray => "short_array",
            Self::IntArray => "int_array",
            Self::LongArray => "long_array",
            Self::FloatArray => "float_array",
            Self::DoubleArray => "double_array",
            Self::CharArray => "char_array",
            Self::StringArray => "string_array",
            Self::Collection => "collection",
            Self::Enum => "enum",
            Self::List => "list",
            Self::Map => "map",
            Self::Queue => "queue",
            Self::Set => "set",
            Self::Other => "other",
            Self::EndMarker => "end_marker",
        }
    }

    /// The Rust types this tag represents.
    pub const fn rust_types(self) -> &'static [&'static str] {
        match self {
            Self::Bool => &["bool"],
            Self::Byte => &["i8", "u8"],
            Self::Short => &["i16"],
            Self::Int => &["i32"],
            Self::Long => &["i64"],
            Self::Float => &["f32"],
            Self::Double => &["f64"],
            Self::Char => &["u16"],
            Self::String => &["String"],
            Self::BoolArray => &["Vec<bool>", "MultiArray<bool>"],
            Self::ByteArray => &["Vec<i8>", "Vec<u8>", "MultiArray<i8>", "MultiArray<u8>"],
            Self::ShortArray => &["Vec<i16>", "MultiArray<i16>"],
            Self::IntArray => &["Vec<i32>", "MultiArray<i32>"],
            Self::LongArray => &["Vec<i64>", "MultiArray<i64>"],
            Self::FloatArray => &["Vec<f32>", "MultiArray<f32>"],
            Self::DoubleArray => &["Vec<f64>", "MultiArray<f64>"],
            Self::CharArray => &["Vec<u16>", "MultiArray<u16>"],
            Self::StringArray => &["Vec<String>", "MultiArray<String>"],
            Self::Collection => &[],
            Self::List => &["LinkedList<T>"],
            Self::Queue => &["VecDeque<T>"],
            Self::Set => &["HashSet<T>", "BTreeSet<T>"],
            Self::Map => &["HashMap<K, V>", "BTreeMap<K, V>"],
            Self::Enum => &["#[derive(WireEnum)]"],
            Self::Other => &["#[derive(WireObject)]"],
            Self::StartMarker | Self::EndMarker => &[],
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
