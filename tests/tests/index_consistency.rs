//! Cross-crate checks that a hash index stays faithful to the heap
//! it covers: new offsets land in the right bucket, deletes remove
//! exactly the right offset, a point lookup agrees with an equivalent
//! full scan, and two independent readers of the same index file
//! reconstruct the same mapping.

use std::collections::BTreeMap;
use std::path::Path;

use badsubd_common::config::EngineConfig;
use engine::Engine;
use storage::{Column, ColumnType, HashIndex, Row, Value};

fn engine_in(dir: &Path) -> (EngineConfig, Engine) {
    let mut config = EngineConfig::default();
    config.set_data_dir(dir.to_path_buf());
    let engine = Engine::open(config.clone()).unwrap();
    (config, engine)
}

fn row(id: u64, login: &str) -> Row {
    let mut row = Row::new();
    row.set("id", Value::Int(id));
    row.set("login", Value::Text(login.to_string()));
    row
}

#[test]
fn index_tracks_inserts_and_deletes_and_agrees_with_a_full_scan() {
    let dir = tempfile::tempdir().unwrap();
    let (config, engine) = engine_in(dir.path());

    engine
        .create_table(
            "users",
            vec![Column::new("id", ColumnType::Int), Column::new("login", ColumnType::Varchar { size: 10 })],
        )
        .unwrap();
    engine.create_index("users", "id").unwrap();

    let off1 = engine.insert("users", &row(1, "alice")).unwrap();
    let off2 = engine.insert("users", &row(2, "bob")).unwrap();
    let off3 = engine.insert("users", &row(3, "carol")).unwrap();

    let index = HashIndex::open(&config.index_dir(), "users", "id").unwrap();
    assert_eq!(index.find(2), vec![off2]);

    let mut where_id2 = BTreeMap::new();
    where_id2.insert("id".to_string(), Value::Int(2));
    let point = engine.select("users", None, &where_id2).unwrap();
    let scanned: Vec<_> = engine
        .select("users", None, &BTreeMap::new())
        .unwrap()
        .into_iter()
        .filter(|r| r.get("id") == Some(&Value::Int(2)))
        .collect();
    assert_eq!(point, scanned);

    engine.delete("users", Some(&where_id2)).unwrap();

    let index_after = HashIndex::open(&config.index_dir(), "users", "id").unwrap();
    assert!(index_after.find(2).is_empty());
    assert_eq!(index_after.find(1), vec![off1]);
    assert_eq!(index_after.find(3), vec![off3]);

    let other_reader = HashIndex::open(&config.index_dir(), "users", "id").unwrap();
    for key in [1u64, 2, 3, 999] {
        assert_eq!(index_after.find(key), other_reader.find(key));
    }
}

#[test]
fn index_created_over_existing_rows_is_populated_from_the_heap() {
    let dir = tempfile::tempdir().unwrap();
    let (config, engine) = engine_in(dir.path());

    engine
        .create_table(
            "users",
            vec![Column::new("id", ColumnType::Int), Column::new("login", ColumnType::Varchar { size: 10 })],
        )
        .unwrap();

    let off1 = engine.insert("users", &row(1, "alice")).unwrap();
    let off2 = engine.insert("users", &row(2, "bob")).unwrap();

    engine.create_index("users", "id").unwrap();

    let index = HashIndex::open(&config.index_dir(), "users", "id").unwrap();
    assert_eq!(index.find(1), vec![off1]);
    assert_eq!(index.find(2), vec![off2]);
}

#[test]
fn creating_an_index_on_a_varchar_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_config, engine) = engine_in(dir.path());

    engine
        .create_table(
            "users",
            vec![Column::new("id", ColumnType::Int), Column::new("login", ColumnType::Varchar { size: 10 })],
        )
        .unwrap();

    let err = engine.create_index("users", "login").unwrap_err();
    assert!(err.to_string().contains("login"));
}
