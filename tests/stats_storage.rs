//! Statistics storage lifecycle and the persisted JSON form.

use peridot::catalog::{ColumnOid, DatabaseOid, NamespaceOid, TableOid};
use peridot::stats::{ColumnStats, StatsStorage, TableStats};

fn column_stats(column_oid: u32) -> ColumnStats {
    ColumnStats::new(
        NamespaceOid(1),
        DatabaseOid(1),
        TableOid(1),
        ColumnOid(column_oid),
        format!("c{}", column_oid),
        5,
        4.0,
        0.2,
        vec![3.0, 4.0, 5.0],
        vec![0.2, 0.2, 0.2],
        vec![1.0, 5.0],
        true,
    )
}

fn five_column_table_stats() -> TableStats {
    TableStats::new(
        DatabaseOid(1),
        TableOid(1),
        5,
        true,
        (1..=5).map(column_stats).collect(),
    )
}

#[test]
fn test_get_table_stats() {
    let storage = StatsStorage::new();
    storage.insert_table_stats(DatabaseOid(1), TableOid(1), five_column_table_stats());

    assert!(storage.table_stats(DatabaseOid(1), TableOid(1)).is_some());
    assert!(storage.table_stats(DatabaseOid(2), TableOid(1)).is_none());
}

#[test]
fn test_insert_table_stats() {
    let storage = StatsStorage::new();
    assert!(storage.insert_table_stats(DatabaseOid(1), TableOid(1), five_column_table_stats()));
    // A second insert on the same key is rejected.
    assert!(!storage.insert_table_stats(DatabaseOid(1), TableOid(1), five_column_table_stats()));

    let stored = storage.table_stats(DatabaseOid(1), TableOid(1)).unwrap();
    assert_eq!(five_column_table_stats(), *stored);
}

#[test]
fn test_delete_table_stats() {
    let storage = StatsStorage::new();
    storage.insert_table_stats(DatabaseOid(1), TableOid(1), five_column_table_stats());

    assert!(storage.delete_table_stats(DatabaseOid(1), TableOid(1)));
    assert!(!storage.delete_table_stats(DatabaseOid(1), TableOid(1)));
    assert!(!storage.delete_table_stats(DatabaseOid(2), TableOid(1)));
    assert!(!storage.contains(DatabaseOid(1), TableOid(1)));
}

#[test]
fn test_column_stats_json_round_trip() {
    let stats = column_stats(1);

    let json = serde_json::to_string(&stats).unwrap();
    let parsed: ColumnStats = serde_json::from_str(&json).unwrap();
    assert_eq!(stats, parsed);

    // The persisted key names are fixed by the collaborator.
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let object = value.as_object().unwrap();
    for key in [
        "namespace_id",
        "database_id",
        "table_id",
        "column_id",
        "column_name",
        "num_rows",
        "cardinality",
        "frac_null",
        "most_common_vals",
        "most_common_freqs",
        "histogram_bounds",
        "is_basetable",
    ] {
        assert!(object.contains_key(key), "missing key {}", key);
    }
    assert_eq!(12, object.len());
}

#[test]
fn test_table_stats_json_round_trip() {
    let stats = five_column_table_stats();

    let json = serde_json::to_string(&stats).unwrap();
    let parsed: TableStats = serde_json::from_str(&json).unwrap();
    assert_eq!(stats, parsed);
    assert_eq!(5, parsed.column_stats().len());
    assert!(parsed.column_by_name("c3").is_some());
}
