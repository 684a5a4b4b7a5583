#![allow(missing_docs)]

use std::collections::HashMap;

use wirecode::{
    ByteBuffer, DataType, NativeProtocol, ProtocolKind, WireError, WireObject, WireProtocol, Wirecode,
};

#[derive(WireObject, Debug, Default, PartialEq)]
struct ScalarDoc {
    x: f64,
}

#[derive(WireObject, Debug, Default, PartialEq)]
struct ArrayDoc {
    arr: Vec<f64>,
    tail: i32,
}

#[derive(WireObject, Debug, Default, PartialEq)]
struct TailOnly {
    tail: i32,
}

#[derive(WireObject, Debug, Default, PartialEq)]
struct Inner {
    value: i32,
}

#[derive(WireObject, Debug, Default, PartialEq)]
struct NestedDoc {
    inner: Inner,
}

#[derive(WireObject, Debug, Default, PartialEq)]
struct MapDoc {
    map: HashMap<i32, String>,
}

const PROTOCOLS: [ProtocolKind; 2] = [ProtocolKind::Native, ProtocolKind::Compat];

#[test]
#[allow(clippy::approx_constant)]
fn test_double_is_exact() -> wirecode::Result<()> {
    for protocol in PROTOCOLS {
        let builder = Wirecode::builder().protocol(protocol);
        let loaded: ScalarDoc = builder.decode(builder.encode(&ScalarDoc { x: 3.14159 })?)?;
        assert_eq!(loaded.x.to_bits(), 3.14159f64.to_bits(), "{protocol:?}");
    }
    Ok(())
}

#[test]
fn test_double_array_dims() -> wirecode::Result<()> {
    let doc = ArrayDoc {
        arr: vec![1.0, 2.0, 3.0],
        tail: 9,
    };
    let bytes = Wirecode::encode(&doc)?;

    let mut proto = NativeProtocol::new(ByteBuffer::wrap(bytes));
    proto.get_header_info()?;
    let header = proto.get_field_header()?;
    assert_eq!(header.name, "arr");
    assert_eq!(header.data_type, DataType::DoubleArray);
    assert_eq!(proto.get_array_dims()?, vec![3]);

    for protocol in PROTOCOLS {
        let builder = Wirecode::builder().protocol(protocol);
        let loaded: ArrayDoc = builder.decode(builder.encode(&doc)?)?;
        assert_eq!(loaded, doc, "{protocol:?}");
    }
    Ok(())
}

#[test]
fn test_nested_object_layout() -> wirecode::Result<()> {
    let doc = NestedDoc {
        inner: Inner { value: 42 },
    };
    for protocol in PROTOCOLS {
        let builder = Wirecode::builder().protocol(protocol);
        let bytes = builder.encode(&doc)?;

        let report = builder.inspect(bytes.clone())?;
        assert_eq!(report.root.children.len(), 1);
        let inner = &report.root.children[0];
        assert_eq!(inner.name, "inner");
        assert_eq!(inner.data_type, DataType::StartMarker);
        assert_eq!(inner.children.len(), 1);
        assert_eq!(inner.children[0].name, "value");
        assert_eq!(inner.children[0].data_type, DataType::Int);

        let loaded: NestedDoc = builder.decode(bytes)?;
        assert_eq!(loaded, doc, "{protocol:?}");
    }
    Ok(())
}

#[test]
fn test_map_ignores_iteration_order() -> wirecode::Result<()> {
    let doc = MapDoc {
        map: [(1, "a".to_string()), (2, "b".to_string())].into_iter().collect(),
    };
    for protocol in PROTOCOLS {
        let builder = Wirecode::builder().protocol(protocol);
        let loaded: MapDoc = builder.decode(builder.encode(&doc)?)?;
        assert_eq!(loaded.map, doc.map, "{protocol:?}");
    }
    Ok(())
}

/// Overwrites the native length placeholder of the first top-level field.
fn corrupt_first_length(bytes: &mut [u8], value: i32) -> wirecode::Result<()> {
    let report = Wirecode::inspect(bytes.to_vec())?;
    let field = &report.root.children[0];
    // [i32 len+1][name][0][tag]
    let length_at = field.offset + 4 + field.name.len() + 1 + 1;
    bytes[length_at..length_at + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

#[test]
fn test_negative_length_falls_back_to_swallowing() -> wirecode::Result<()> {
    let doc = ArrayDoc {
        arr: vec![1.0, 2.0, 3.0],
        tail: 9,
    };
    let mut bytes = Wirecode::encode(&doc)?;
    corrupt_first_length(&mut bytes, -7)?;

    let report = Wirecode::inspect(bytes.clone())?;
    assert_eq!(report.root.children[0].data_size, None);

    // Known field: read by its codec.
    let loaded: ArrayDoc = Wirecode::decode(bytes.clone())?;
    assert_eq!(loaded, doc);

    // Unknown field: stepped over element by element.
    let tail: TailOnly = Wirecode::decode(bytes)?;
    assert_eq!(tail.tail, 9);
    Ok(())
}

#[test]
fn test_small_positive_length_is_corruption() -> wirecode::Result<()> {
    let mut bytes = Wirecode::encode(&ArrayDoc {
        arr: vec![1.0, 2.0, 3.0],
        tail: 9,
    })?;
    corrupt_first_length(&mut bytes, 2)?;
    assert!(matches!(
        Wirecode::decode::<ArrayDoc>(bytes),
        Err(WireError::Structure(_))
    ));
    Ok(())
}
