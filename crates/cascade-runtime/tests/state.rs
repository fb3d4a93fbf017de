use cascade_core::bits::Bits;
use cascade_runtime::data_plane::DataPlane;
use cascade_runtime::state::{get_scalar, scalar, Snapshot, SnapshotError};

#[test]
fn test_data_plane_ids_are_stable() {
    let mut dp = DataPlane::new();
    assert!(dp.is_empty());
    let a = dp.vid("clock.val");
    let b = dp.vid("led.val");
    assert_ne!(a, b);
    assert_eq!(dp.vid("clock.val"), a);
    assert_eq!(dp.lookup("led.val"), Some(b));
    assert_eq!(dp.lookup("pad.val"), None);
    assert_eq!(dp.len(), 2);
}

#[test]
fn test_data_plane_notifies_on_change_only() {
    let mut dp = DataPlane::new();
    let v = dp.vid("x");
    dp.add_reader(v, 3);
    dp.add_reader(v, 3);
    dp.add_reader(v, 5);

    assert_eq!(dp.write(v, &Bits::from_u64(4, 1)), &[3, 5]);
    assert!(dp.write(v, &Bits::from_u64(4, 1)).is_empty());
    assert_eq!(dp.write(v, &Bits::from_u64(4, 2)), &[3, 5]);
    assert_eq!(dp.last(v), Some(&Bits::from_u64(4, 2)));

    dp.force(v, Bits::from_u64(4, 7));
    assert!(dp.write(v, &Bits::from_u64(4, 7)).is_empty());

    dp.clear_readers();
    assert!(dp.readers(v).is_empty());
    assert!(dp.write(v, &Bits::from_u64(4, 0)).is_empty());
}

#[test]
fn test_scalar_helpers() {
    let state = scalar("val", Bits::from_bool(true));
    assert_eq!(get_scalar(&state, "val"), Some(&Bits::from_bool(true)));
    assert_eq!(get_scalar(&state, "other"), None);
}

#[test]
fn test_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.json");
    let mut snapshot = Snapshot {
        time: 42,
        ..Snapshot::default()
    };
    snapshot.engines.insert(
        "Root".to_string(),
        [(
            "mem".to_string(),
            vec![Bits::from_u64(8, 1), Bits::from_i64(8, -2).with_signed(true)],
        )]
        .into_iter()
        .collect(),
    );
    snapshot.engines.insert("clock".to_string(), scalar("val", Bits::from_bool(true)));
    snapshot.save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap();
    assert_eq!(loaded, snapshot);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["time"], 42);
    assert!(json["engines"]["Root"]["mem"].is_array());
}

#[test]
fn test_snapshot_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(Snapshot::load(&missing), Err(SnapshotError::Io { .. })));

    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(Snapshot::load(&garbage), Err(SnapshotError::Format { .. })));
}
