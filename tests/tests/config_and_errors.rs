//! Config layering (default -> toml -> env) and error messages that
//! name the table/column they complain about.

use std::fs;
use std::path::PathBuf;

use badsubd_common::config::EngineConfig;
use badsubd_common::error::EngineError;
use engine::Engine;
use storage::{Column, ColumnType, Row};

#[test]
fn env_override_beats_toml_file_which_beats_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("badsubd.toml");
    fs::write(&toml_path, "data_dir = \"/tmp/from-toml\"\ndefault_varchar_size = 64\n").unwrap();

    let config = EngineConfig::load(Some(&toml_path)).unwrap();
    assert_eq!(config.data_dir(), &PathBuf::from("/tmp/from-toml"));
    assert_eq!(*config.default_varchar_size(), 64);

    std::env::set_var("BADSUBD_DATA_DIR", "/tmp/from-env");
    let config = EngineConfig::load(Some(&toml_path)).unwrap();
    assert_eq!(config.data_dir(), &PathBuf::from("/tmp/from-env"));
    std::env::remove_var("BADSUBD_DATA_DIR");

    let config = EngineConfig::load(Some(&dir.path().join("missing.toml"))).unwrap();
    assert_eq!(config.data_dir(), &PathBuf::from("./data"));
}

#[test]
fn error_messages_name_the_offending_table_and_column() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.set_data_dir(dir.path().to_path_buf());
    let engine = Engine::open(config).unwrap();

    let err = engine.insert("ghost", &Row::new()).unwrap_err();
    assert!(matches!(err, EngineError::UnknownTable(_)));
    assert!(err.to_string().contains("ghost"));

    engine.create_table("users", vec![Column::new("id", ColumnType::Int)]).unwrap();
    let err = engine.create_table("users", vec![Column::new("id", ColumnType::Int)]).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyExists(_)));
    assert!(err.to_string().contains("users"));

    let err = engine.create_index("users", "missing").unwrap_err();
    assert!(matches!(err, EngineError::UnknownColumn { .. }));
    assert!(err.to_string().contains("missing"));
    assert!(err.to_string().contains("users"));
}
