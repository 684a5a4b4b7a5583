#![allow(missing_docs)]

//! Two sides evolving their types independently.

use tracing_test::traced_test;
use wirecode::{ProtocolKind, WireObject, Wirecode};

mod v1 {
    use super::*;

    #[derive(WireObject, Debug, Default, Clone, PartialEq)]
    pub struct Detail {
        pub depth: i32,
        pub notes: Vec<String>,
    }

    #[derive(WireObject, Debug, Default, Clone, PartialEq)]
    pub struct Record {
        pub id: i32,
        pub name: String,
        pub legacy: Vec<i64>,
        pub detail: Detail,
        pub weight: f64,
    }
}

mod v2 {
    use super::*;

    #[derive(WireObject, Debug, Clone, PartialEq)]
    pub struct Record {
        pub weight: f64,
        pub id: i32,
        pub name: String,
        pub added: f32,
    }

    impl Default for Record {
        fn default() -> Self {
            Self {
                weight: 0.0,
                id: 0,
                name: String::new(),
                added: 7.5,
            }
        }
    }
}

mod v3 {
    use super::*;

    // `id` changed type.
    #[derive(WireObject, Debug, Default, Clone, PartialEq)]
    pub struct Record {
        pub id: String,
        pub name: String,
    }
}

fn old_record() -> v1::Record {
    v1::Record {
        id: 17,
        name: "seventeen".to_string(),
        legacy: vec![1, 2, 3],
        detail: v1::Detail {
            depth: 4,
            notes: vec!["n1".to_string(), "n2".to_string()],
        },
        weight: 2.5,
    }
}

#[test]
fn test_newer_reader_skips_unknown_fields() -> wirecode::Result<()> {
    for protocol in [ProtocolKind::Native, ProtocolKind::Compat] {
        let builder = Wirecode::builder().protocol(protocol);
        let bytes = builder.encode(&old_record())?;

        let loaded: v2::Record = builder.decode(bytes)?;
        assert_eq!(loaded.id, 17, "{protocol:?}");
        assert_eq!(loaded.name, "seventeen");
        assert_eq!(loaded.weight, 2.5);
        // Absent from the stream: keeps its default.
        assert_eq!(loaded.added, 7.5);
    }
    Ok(())
}

#[test]
fn test_older_reader_keeps_defaults() -> wirecode::Result<()> {
    let newer = v2::Record {
        weight: -1.0,
        id: 99,
        name: "new".to_string(),
        added: 0.25,
    };
    for protocol in [ProtocolKind::Native, ProtocolKind::Compat] {
        let builder = Wirecode::builder().protocol(protocol);
        let loaded: v1::Record = builder.decode(builder.encode(&newer)?)?;
        assert_eq!(loaded.id, 99, "{protocol:?}");
        assert_eq!(loaded.weight, -1.0);
        assert!(loaded.legacy.is_empty());
        assert_eq!(loaded.detail, v1::Detail::default());
    }
    Ok(())
}

#[test]
#[traced_test]
fn test_changed_type_is_skipped() -> wirecode::Result<()> {
    for protocol in [ProtocolKind::Native, ProtocolKind::Compat] {
        let builder = Wirecode::builder().protocol(protocol);
        let loaded: v3::Record = builder.decode(builder.encode(&old_record())?)?;
        assert_eq!(loaded.id, "", "{protocol:?}");
        assert_eq!(loaded.name, "seventeen");
    }
    assert!(logs_contain("tag mismatch"));
    Ok(())
}

#[test]
fn test_inspect_shows_unknown_scopes() -> wirecode::Result<()> {
    let report = Wirecode::inspect(Wirecode::encode(&old_record())?)?;
    let names: Vec<&str> = report.root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "legacy", "detail", "weight"]);

    let detail = &report.root.children[3];
    assert_eq!(detail.children.len(), 2);
    assert_eq!(report.max_depth, 1);
    Ok(())
}
