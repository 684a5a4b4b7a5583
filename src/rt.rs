// src/rt.rs

//! Runtime utilities for generated code (Macros).
//! Do not use directly.

use tracing::{debug, warn};

use crate::error::Result;
use crate::format::FieldHeader;
use crate::value::{read_enum_payload, write_enum_payload};

pub use crate::data_type::DataType;
pub use crate::dispatch::FieldCodec;
pub use crate::error::Result as WireResult;
pub use crate::format::FieldHeader as WireFieldHeader;
pub use crate::protocol::WireProtocol;
pub use crate::reflect::{WireField, WireObject, WireReflect, WireType};
pub use crate::schema::{FieldInfo, TypeInfo, TypeRef};
pub use crate::value::{WireEnum, WireValue};

/// Writes an enum field. Used by `#[derive(WireEnum)]`.
pub fn write_enum<E: WireEnum>(value: &E, proto: &mut dyn WireProtocol, name: &str) -> Result<()> {
    write_enum_payload(value, proto, name)
}

/// Reads an enum field by constant name. Used by `#[derive(WireEnum)]`.
///
/// A constant this side does not declare leaves the field absent.
pub fn read_enum<E: WireEnum>(proto: &mut dyn WireProtocol, header: &FieldHeader) -> Result<Option<E>> {
    let payload = read_enum_payload(proto, header)?;
    if payload.qualified_name != E::qualified_name() {
        debug!(
            field = %header.name,
            written = %payload.qualified_name,
            local = E::qualified_name(),
            "enum read under a different type name"
        );
    }
    match E::from_constant(&payload.selected) {
        Some(value) => Ok(Some(value)),
        None => {
            warn!(
                field = %header.name,
                enum_type = E::simple_name(),
                constant = %payload.selected,
                known = %E::constant_list(),
                "unknown enum constant; field left absent"
            );
            Ok(None)
        }
    }
}
