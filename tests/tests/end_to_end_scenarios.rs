//! Literal-input-to-literal-output scenarios (S1-S7) driven entirely
//! through the SQL surface, the way an external caller would use
//! this crate.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use badsubd_common::config::EngineConfig;
use engine::Engine;
use sql::{SqlFrontend, StatementResult};
use storage::{HashIndex, Value};

fn config_in(dir: &Path) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.set_data_dir(dir.to_path_buf());
    config
}

fn frontend(config: &EngineConfig) -> SqlFrontend {
    SqlFrontend::new(Engine::open(config.clone()).expect("engine opens"))
}

fn rows(result: StatementResult) -> Vec<BTreeMap<String, Value>> {
    match result {
        StatementResult::Rows(rows) => rows,
        other => panic!("expected Rows, got {other:?}"),
    }
}

#[test]
fn s1_create_insert_and_point_select() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let fe = frontend(&config);

    fe.execute("CREATE TABLE users (id INT, login VARCHAR(10))").unwrap();
    fe.execute("INSERT INTO users VALUES (1, 'alice')").unwrap();
    fe.execute("INSERT INTO users VALUES (2, 'bob')").unwrap();
    fe.execute("INSERT INTO users VALUES (3, 'carol')").unwrap();

    let found = rows(fe.execute("SELECT * FROM users WHERE id=2").unwrap());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("id"), Some(&Value::Int(2)));
    assert_eq!(found[0].get("login"), Some(&Value::Text("bob".to_string())));

    let info = fe.engine().get_table_info("users").unwrap();
    assert_eq!(info.row_size, 1 + 8 + 4 * 10);

    let heap_len = fs::metadata(config.table_dir().join("users.dat")).unwrap().len();
    assert_eq!(heap_len, 16 + info.row_size as u64 * 3);
    assert_eq!(heap_len, 163);
}

#[test]
fn s2_index_build_then_point_lookup_on_new_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let fe = frontend(&config);

    fe.execute("CREATE TABLE users (id INT, login VARCHAR(10))").unwrap();
    fe.execute("INSERT INTO users VALUES (1, 'alice')").unwrap();
    fe.execute("INSERT INTO users VALUES (2, 'bob')").unwrap();
    fe.execute("INSERT INTO users VALUES (3, 'carol')").unwrap();

    fe.engine().create_index("users", "id").unwrap();
    fe.execute("INSERT INTO users VALUES (4, 'dave')").unwrap();

    let index = HashIndex::open(&config.index_dir(), "users", "id").unwrap();
    assert_eq!(index.find(4), vec![163]);

    let found = rows(fe.execute("SELECT * FROM users WHERE id=4").unwrap());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("login"), Some(&Value::Text("dave".to_string())));
}

#[test]
fn s3_varchar_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let fe = frontend(&config);

    fe.execute("CREATE TABLE notes (body VARCHAR(5))").unwrap();
    fe.execute("INSERT INTO notes VALUES ('abcdefgh')").unwrap();

    let found = rows(fe.execute("SELECT * FROM notes").unwrap());
    assert_eq!(found[0].get("body"), Some(&Value::Text("abcde".to_string())));
}

#[test]
fn s4_delete_where_tombstones_without_shrinking_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let fe = frontend(&config);

    fe.execute("CREATE TABLE users (id INT, login VARCHAR(10))").unwrap();
    fe.execute("INSERT INTO users VALUES (1, 'alice')").unwrap();
    fe.execute("INSERT INTO users VALUES (2, 'bob')").unwrap();
    fe.execute("INSERT INTO users VALUES (3, 'carol')").unwrap();
    fe.execute("INSERT INTO users VALUES (4, 'dave')").unwrap();

    match fe.execute("DELETE FROM users WHERE id=2").unwrap() {
        StatementResult::Deleted(n) => assert_eq!(n, 1),
        other => panic!("expected Deleted, got {other:?}"),
    }

    let found = rows(fe.execute("SELECT * FROM users").unwrap());
    let ids: Vec<u64> = found.iter().map(|r| r.get("id").unwrap().as_int().unwrap()).collect();
    assert_eq!(ids, vec![1, 3, 4]);

    let heap_path = config.table_dir().join("users.dat");
    let row_size = fe.engine().get_table_info("users").unwrap().row_size;
    assert_eq!(fs::metadata(&heap_path).unwrap().len(), 16 + row_size as u64 * 4);

    let bytes = fs::read(&heap_path).unwrap();
    assert_eq!(bytes[16 + row_size], 0x01);
}

#[test]
fn s5_delete_star_truncates_the_heap() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let fe = frontend(&config);

    fe.execute("CREATE TABLE users (id INT, login VARCHAR(10))").unwrap();
    fe.execute("INSERT INTO users VALUES (1, 'alice')").unwrap();
    fe.execute("INSERT INTO users VALUES (2, 'bob')").unwrap();

    match fe.execute("DELETE * FROM users").unwrap() {
        StatementResult::Deleted(n) => assert_eq!(n, -1),
        other => panic!("expected Deleted(-1), got {other:?}"),
    }

    let heap_path = config.table_dir().join("users.dat");
    assert_eq!(fs::metadata(&heap_path).unwrap().len(), 16);
    assert_eq!(fe.engine().get_table_info("users").unwrap().total_rows, 0);
}

#[test]
fn s6_insert_without_column_list_binds_schema_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let fe = frontend(&config);

    fe.execute("CREATE TABLE users (id INT, login VARCHAR(10))").unwrap();
    fe.execute("INSERT INTO users VALUES (10, 'zoe')").unwrap();

    let found = rows(fe.execute("SELECT * FROM users WHERE login='zoe'").unwrap());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("id"), Some(&Value::Int(10)));
}

#[test]
fn s7_non_bmp_code_point_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let fe = frontend(&config);

    fe.execute("CREATE TABLE notes (body VARCHAR(2))").unwrap();
    fe.execute("INSERT INTO notes VALUES ('\u{1D11E}')").unwrap();

    let found = rows(fe.execute("SELECT * FROM notes").unwrap());
    assert_eq!(found[0].get("body"), Some(&Value::Text("\u{1D11E}".to_string())));
}
