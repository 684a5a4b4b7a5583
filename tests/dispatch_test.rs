#![allow(missing_docs)]

//! Custom codecs and registries.

use std::any::Any;
use std::sync::Arc;

use wirecode::{
    DataType, FieldCodec, FieldHeader, KnownTypes, ProtocolKind, TypeRef, WireError, WireObject, WireProtocol,
    WireType, WireValue, Wirecode,
};

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Shape {
    origin: Point,
    sides: i32,
}

/// A unit-carrying value with its own codec: written as a bare double.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Celsius(f64);

impl WireType for Celsius {
    fn type_ref() -> TypeRef {
        TypeRef::new("dispatch_test::Celsius")
    }

    fn data_type() -> DataType {
        DataType::Double
    }

    fn codec() -> Option<FieldCodec> {
        Some(FieldCodec::of::<Self>())
    }
}

impl WireValue for Celsius {
    fn write_value(&self, proto: &mut dyn WireProtocol, name: &str) -> wirecode::Result<()> {
        self.0.write_value(proto, name)
    }

    fn read_value(proto: &mut dyn WireProtocol, header: &FieldHeader) -> wirecode::Result<Option<Self>> {
        Ok(f64::read_value(proto, header)?.map(Celsius))
    }
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Reading {
    station: String,
    temperature: Celsius,
    history: Option<Celsius>,
}

// Writes a Point as "x,y".
fn write_point(proto: &mut dyn WireProtocol, name: &str, value: &dyn Any) -> wirecode::Result<()> {
    let point = value.downcast_ref::<Point>().ok_or_else(|| WireError::TypeMismatch {
        field: name.to_string(),
        expected: "Point".to_string(),
    })?;
    format!("{},{}", point.x, point.y).write_value(proto, name)
}

fn read_point(proto: &mut dyn WireProtocol, header: &FieldHeader, slot: &mut dyn Any) -> wirecode::Result<bool> {
    let Some(text) = String::read_value(proto, header)? else {
        return Ok(false);
    };
    let Some(point) = slot.downcast_mut::<Point>() else {
        return Ok(false);
    };
    let mut parts = text.split(',').map(str::parse::<i32>);
    match (parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y))) => {
            *point = Point { x, y };
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn point_registry() -> Arc<KnownTypes> {
    let registry = KnownTypes::with_defaults();
    registry.register(FieldCodec::new(Point::type_ref(), Vec::new(), write_point, read_point));
    Arc::new(registry)
}

#[test]
fn test_value_type_with_its_own_codec() -> wirecode::Result<()> {
    let reading = Reading {
        station: "north".to_string(),
        temperature: Celsius(-3.5),
        history: Some(Celsius(1.0)),
    };
    let loaded: Reading = Wirecode::decode(Wirecode::encode(&reading)?)?;
    assert_eq!(loaded, reading);
    Ok(())
}

#[test]
fn test_registered_codec_replaces_structural_encoding() -> wirecode::Result<()> {
    let shape = Shape {
        origin: Point { x: 4, y: -2 },
        sides: 3,
    };
    let builder = Wirecode::builder().registry(point_registry());
    let bytes = builder.encode(&shape)?;

    let report = builder.inspect(bytes.clone())?;
    assert_eq!(report.root.children[0].name, "origin");
    assert_eq!(report.root.children[0].data_type, DataType::String);
    assert!(report.root.children[0].children.is_empty());

    let loaded: Shape = builder.decode(bytes)?;
    assert_eq!(loaded, shape);
    Ok(())
}

#[test]
fn test_default_registry_writes_a_scope() -> wirecode::Result<()> {
    let shape = Shape {
        origin: Point { x: 1, y: 1 },
        sides: 4,
    };
    let report = Wirecode::inspect(Wirecode::encode(&shape)?)?;
    assert_eq!(report.root.children[0].data_type, DataType::StartMarker);
    assert_eq!(report.root.children[0].children.len(), 2);
    Ok(())
}

#[test]
fn test_supertype_fallback() {
    let registry = KnownTypes::new();
    registry.register(FieldCodec::new(
        TypeRef::new("Number"),
        Vec::new(),
        |_, _, _| Ok(()),
        |_, _, _| Ok(true),
    ));
    let resolved = registry.resolve(&i32::type_ref(), &[]);
    assert_eq!(resolved.map(|c| c.type_ref.name), Some("Number"));
    assert!(registry.resolve(&bool::type_ref(), &[]).is_none());
}

/// Written by its codec as a bare `i16`.
#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Tiny {
    level: i16,
}

/// Written by its codec as an empty payload; reading it sets `seen`.
#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Presence {
    seen: bool,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Packed {
    before: i32,
    tiny: Tiny,
    presence: Presence,
    after: String,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct PackedEnds {
    before: i32,
    after: String,
}

fn write_tiny(proto: &mut dyn WireProtocol, name: &str, value: &dyn Any) -> wirecode::Result<()> {
    let tiny = value.downcast_ref::<Tiny>().ok_or_else(|| WireError::TypeMismatch {
        field: name.to_string(),
        expected: "Tiny".to_string(),
    })?;
    let mut header = proto.put_field_header(name, DataType::Other)?;
    proto.buffer_mut().put_i16(tiny.level);
    proto.finish_field(&mut header)
}

fn read_tiny(proto: &mut dyn WireProtocol, _: &FieldHeader, slot: &mut dyn Any) -> wirecode::Result<bool> {
    let level = proto.buffer_mut().get_i16()?;
    Ok(slot.downcast_mut::<Tiny>().map(|tiny| tiny.level = level).is_some())
}

fn write_presence(proto: &mut dyn WireProtocol, name: &str, _: &dyn Any) -> wirecode::Result<()> {
    let mut header = proto.put_field_header(name, DataType::Other)?;
    proto.finish_field(&mut header)
}

fn read_presence(_: &mut dyn WireProtocol, _: &FieldHeader, slot: &mut dyn Any) -> wirecode::Result<bool> {
    Ok(slot.downcast_mut::<Presence>().map(|p| p.seen = true).is_some())
}

fn short_payload_registry() -> Arc<KnownTypes> {
    let registry = KnownTypes::with_defaults();
    registry.register(FieldCodec::new(Tiny::type_ref(), Vec::new(), write_tiny, read_tiny));
    registry.register(FieldCodec::new(Presence::type_ref(), Vec::new(), write_presence, read_presence));
    Arc::new(registry)
}

#[test]
fn test_short_other_payloads() -> wirecode::Result<()> {
    let packed = Packed {
        before: 1,
        tiny: Tiny { level: 7 },
        presence: Presence { seen: true },
        after: "end".to_string(),
    };
    for protocol in [ProtocolKind::Native, ProtocolKind::Compat] {
        let builder = Wirecode::builder().protocol(protocol).registry(short_payload_registry());
        let bytes = builder.encode(&packed)?;

        let report = builder.inspect(bytes.clone())?;
        let sizes: Vec<Option<usize>> = report.root.children.iter().map(|c| c.data_size).collect();
        assert_eq!(sizes[1], Some(2), "{protocol:?}");
        assert_eq!(sizes[2], Some(0), "{protocol:?}");

        let loaded: Packed = builder.decode(bytes.clone())?;
        assert_eq!(loaded, packed, "{protocol:?}");

        // A reader without those fields steps over them by their recorded length.
        let ends: PackedEnds = Wirecode::builder().protocol(protocol).decode(bytes)?;
        assert_eq!(ends.before, 1);
        assert_eq!(ends.after, "end");
    }
    Ok(())
}
