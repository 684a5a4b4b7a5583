#![allow(missing_docs)]

//! Malformed, truncated and foreign streams.

use wirecode::{ByteBuffer, NativeProtocol, ProtocolKind, WireError, WireObject, WireProtocol, Wirecode};

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Inner {
    values: Vec<i32>,
    label: String,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Outer {
    id: i64,
    inner: Inner,
    ratio: f64,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Climate {
    #[wire(rename = "温度")]
    temp: i32,
    #[wire(rename = "湿度")]
    hum: i32,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Station {
    id: i32,
    #[wire(rename = "größe")]
    size: i32,
    #[wire(rename = "内部")]
    inner: Inner,
}

fn sample() -> Outer {
    Outer {
        id: 5,
        inner: Inner {
            values: vec![1, 2, 3, 4],
            label: "in".to_string(),
        },
        ratio: 0.5,
    }
}

#[test]
fn test_every_truncation_is_an_error() -> wirecode::Result<()> {
    for protocol in [ProtocolKind::Native, ProtocolKind::Compat] {
        let builder = Wirecode::builder().protocol(protocol);
        let bytes = builder.encode(&sample())?;
        for cut in 0..bytes.len() {
            let result = builder.decode::<Outer>(&bytes[..cut]);
            assert!(result.is_err(), "{protocol:?} accepted a stream cut at {cut}");
        }
    }
    Ok(())
}

#[test]
fn test_corrupted_end_marker() -> wirecode::Result<()> {
    let mut bytes = Wirecode::encode(&sample())?;
    if let Some(last) = bytes.last_mut() {
        *last = 0x00;
    }
    assert!(matches!(
        Wirecode::decode::<Outer>(bytes),
        Err(WireError::Structure(_))
    ));
    Ok(())
}

#[test]
fn test_empty_input() {
    assert!(Wirecode::decode::<Outer>(Vec::new()).is_err());
    assert!(Wirecode::inspect(Vec::new()).is_err());
}

#[test]
fn test_newer_version_is_rejected() -> wirecode::Result<()> {
    let bytes = Wirecode::encode(&sample())?;
    let result = Wirecode::builder().accept_version(0, 9).decode::<Outer>(bytes);
    match result {
        Err(WireError::Version {
            producer,
            found,
            accepted,
        }) => {
            assert_eq!(producer, wirecode::protocol::NATIVE_PRODUCER);
            assert_eq!(found, wirecode::protocol::NATIVE_VERSION);
            assert_eq!(accepted, (0, 9));
        }
        other => panic!("expected a version error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_newer_minor_is_accepted_by_a_newer_reader() -> wirecode::Result<()> {
    let bytes = Wirecode::encode(&sample())?;
    let loaded: Outer = Wirecode::builder().accept_version(2, 0).decode(bytes)?;
    assert_eq!(loaded, sample());
    Ok(())
}

#[test]
fn test_garbage_does_not_panic() {
    let mut state = 0x9E37_79B9_u32;
    for len in [1usize, 7, 31, 64, 255] {
        let bytes: Vec<u8> = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state.to_le_bytes()[0]
            })
            .collect();
        let _ = Wirecode::decode::<Outer>(bytes.clone());
        let _ = Wirecode::inspect(bytes);
    }
}

#[test]
fn test_stream_from_a_newer_minor_is_rejected() -> wirecode::Result<()> {
    let mut bytes = Wirecode::encode(&sample())?;
    let mut reader = NativeProtocol::new(ByteBuffer::wrap(bytes.clone()));
    reader.get_header_info()?;
    // [major][minor][micro] end the header block.
    let minor_at = reader.buffer().position() - 2;
    bytes[minor_at] = 5;

    match Wirecode::decode::<Outer>(bytes) {
        Err(WireError::Version {
            producer,
            found,
            accepted,
        }) => {
            assert_eq!(producer, wirecode::protocol::NATIVE_PRODUCER);
            assert_eq!(found, (1, 5, 0));
            assert_eq!(accepted, (1, 0));
        }
        other => panic!("expected a version error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_compat_rejects_names_outside_latin1() -> wirecode::Result<()> {
    let climate = Climate { temp: 21, hum: 55 };
    let compat = Wirecode::builder().protocol(ProtocolKind::Compat);
    assert!(matches!(compat.encode(&climate), Err(WireError::Encoding(_))));

    let station = Station {
        id: 3,
        size: 9,
        inner: Inner::default(),
    };
    assert!(matches!(compat.encode(&station), Err(WireError::Encoding(_))));

    // Native names are UTF-8.
    let loaded: Climate = Wirecode::decode(Wirecode::encode(&climate)?)?;
    assert_eq!(loaded, climate);
    let loaded: Station = Wirecode::decode(Wirecode::encode(&station)?)?;
    assert_eq!(loaded, station);
    Ok(())
}
