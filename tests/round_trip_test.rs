#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};

use wirecode::{BufferKind, MultiArray, ProtocolKind, WireEnum, WireObject, Wirecode};

#[derive(WireEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Mode {
    #[default]
    Idle,
    Running,
    #[wire(rename = "FAULT")]
    Fault,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(WireObject, Debug, Default, Clone, PartialEq)]
struct Sensor {
    id: i64,
    label: String,
    enabled: bool,
    gain: f32,
    ratio: f64,
    code: u16,
    small: i8,
    raw: u8,
    short: i16,
    samples: Vec<f64>,
    grid: MultiArray<i32>,
    tags: BTreeSet<String>,
    seen: HashSet<i32>,
    queue: VecDeque<i64>,
    names: LinkedList<String>,
    lookup: BTreeMap<String, i32>,
    counts: HashMap<i32, i64>,
    origin: Point,
    target: Option<Point>,
    note: Option<String>,
    mode: Mode,
    #[wire(skip)]
    scratch: Vec<u8>,
}

// Generator of data
fn create_sensor() -> wirecode::Result<Sensor> {
    Ok(Sensor {
        id: -9_000_000_000,
        label: "probe-7".to_string(),
        enabled: true,
        gain: 1.25,
        ratio: -0.001,
        code: 0x41,
        small: -8,
        raw: 200,
        short: -1234,
        samples: (0..100).map(|i| f64::from(i) * 0.5).collect(),
        grid: MultiArray::new(vec![2, 3], vec![1, 2, 3, 4, 5, 6])?,
        tags: ["alpha", "beta"].iter().map(|s| s.to_string()).collect(),
        seen: [3, 5, 8].into_iter().collect(),
        queue: [10, 20, 30].into_iter().collect(),
        names: ["x", "y"].iter().map(|s| s.to_string()).collect(),
        lookup: [("one".to_string(), 1), ("two".to_string(), 2)].into_iter().collect(),
        counts: [(1, 100), (2, 200)].into_iter().collect(),
        origin: Point { x: 3, y: -4 },
        target: Some(Point { x: 10, y: 20 }),
        note: None,
        mode: Mode::Fault,
        scratch: vec![1, 2, 3],
    })
}

fn combinations() -> Vec<(ProtocolKind, BufferKind)> {
    vec![
        (ProtocolKind::Native, BufferKind::Checked),
        (ProtocolKind::Native, BufferKind::Fast),
        (ProtocolKind::Compat, BufferKind::Checked),
        (ProtocolKind::Compat, BufferKind::Fast),
    ]
}

// --- TESTS ---

#[test]
fn test_default_round_trip() -> wirecode::Result<()> {
    let original = create_sensor()?;
    let bytes = Wirecode::encode(&original)?;
    let loaded: Sensor = Wirecode::decode(bytes)?;

    let expected = Sensor {
        scratch: Vec::new(),
        ..original
    };
    assert_eq!(loaded, expected);
    Ok(())
}

#[test]
fn test_every_protocol_and_buffer() -> wirecode::Result<()> {
    let original = create_sensor()?;
    for (protocol, buffer) in combinations() {
        let builder = Wirecode::builder().protocol(protocol).buffer(buffer);
        let bytes = builder.encode(&original)?;
        assert_eq!(ProtocolKind::detect(&bytes), Some(protocol));

        let loaded: Sensor = builder.decode(bytes)?;
        assert_eq!(loaded.id, original.id, "{protocol:?}/{buffer:?}");
        assert_eq!(loaded.samples, original.samples);
        assert_eq!(loaded.grid, original.grid);
        assert_eq!(loaded.counts, original.counts);
        assert_eq!(loaded.target, original.target);
        assert_eq!(loaded.note, None);
        assert_eq!(loaded.mode, Mode::Fault);
        assert!(loaded.scratch.is_empty());
    }
    Ok(())
}

#[test]
fn test_buffers_produce_identical_bytes() -> wirecode::Result<()> {
    let original = create_sensor()?;
    for protocol in [ProtocolKind::Native, ProtocolKind::Compat] {
        let checked = Wirecode::builder()
            .protocol(protocol)
            .buffer(BufferKind::Checked)
            .encode(&original)?;
        let fast = Wirecode::builder()
            .protocol(protocol)
            .buffer(BufferKind::Fast)
            .encode(&original)?;
        assert_eq!(checked, fast, "{protocol:?}");
    }
    Ok(())
}

#[test]
fn test_decoder_detects_protocol() -> wirecode::Result<()> {
    let original = create_sensor()?;
    let compat = Wirecode::builder()
        .protocol(ProtocolKind::Compat)
        .encode(&original)?;

    // The default builder is configured for the native protocol.
    let loaded: Sensor = Wirecode::decode(compat)?;
    assert_eq!(loaded.label, original.label);
    assert_eq!(loaded.lookup, original.lookup);
    Ok(())
}

#[test]
fn test_decode_into_keeps_absent_fields() -> wirecode::Result<()> {
    let bytes = Wirecode::encode(&Sensor::default())?;

    let mut target = Sensor {
        note: Some("kept".to_string()),
        ..Sensor::default()
    };
    let info = Wirecode::decode_into(bytes, &mut target)?;
    assert_eq!(info.producer, wirecode::protocol::NATIVE_PRODUCER);
    assert_eq!(target.note.as_deref(), Some("kept"));
    Ok(())
}

#[test]
fn test_empty_values() -> wirecode::Result<()> {
    for (protocol, buffer) in combinations() {
        let builder = Wirecode::builder().protocol(protocol).buffer(buffer);
        let loaded: Sensor = builder.decode(builder.encode(&Sensor::default())?)?;
        assert_eq!(loaded, Sensor::default(), "{protocol:?}/{buffer:?}");
    }
    Ok(())
}

#[test]
fn test_enum_constants() {
    assert_eq!(Mode::constants(), &["Idle", "Running", "FAULT"]);
    assert_eq!(Mode::Fault.constant_name(), "FAULT");
    assert_eq!(Mode::Running.ordinal(), 1);
    assert_eq!(Mode::from_constant("FAULT"), Some(Mode::Fault));
    assert_eq!(Mode::from_constant("Fault"), None);
    assert_eq!(Mode::constant_list(), "[Idle, Running, FAULT]");
    assert_eq!(Mode::simple_name(), "Mode");
    assert!(Mode::qualified_name().ends_with("::Mode"));
}
