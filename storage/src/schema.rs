use std::fs;
use std::path::{Path, PathBuf};

use getset::Getters;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use badsubd_common::config::EngineConfig;
use badsubd_common::error::{EngineError, EngineResult};

use crate::value::ColumnType;

/// One column definition within a table, in on-disk declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Column {
    #[getset(get = "pub")]
    name: String,

    #[getset(get = "pub")]
    data_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            data_type,
        }
    }
}

/// On-disk shape for a column: flat `{name, type, size}`, with INT
/// columns carrying `size: 0` rather than omitting the field (§4.2).
#[derive(Serialize, Deserialize)]
struct ColumnDoc {
    name: String,
    #[serde(rename = "type")]
    type_: String,
    size: u16,
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (type_, size) = match self.data_type {
            ColumnType::Int => ("INT".to_string(), 0),
            ColumnType::Varchar { size } => ("VARCHAR".to_string(), size),
        };
        ColumnDoc { name: self.name.clone(), type_, size }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = ColumnDoc::deserialize(deserializer)?;
        let data_type = match doc.type_.as_str() {
            "INT" => ColumnType::Int,
            "VARCHAR" => ColumnType::Varchar { size: doc.size },
            other => {
                return Err(serde::de::Error::custom(format!("unknown column type '{other}'")))
            }
        };
        Ok(Column { name: doc.name, data_type })
    }
}

/// A table's column layout, persisted once at creation time and
/// never mutated afterwards.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct Schema {
    #[getset(get = "pub")]
    table_name: String,

    #[getset(get = "pub")]
    columns: Vec<Column>,

    #[serde(default)]
    #[getset(get = "pub")]
    primary_key: Option<String>,
}

impl Schema {
    pub fn new(table_name: impl Into<String>, columns: Vec<Column>, primary_key: Option<String>) -> Self {
        Schema {
            table_name: table_name.into(),
            columns,
            primary_key,
        }
    }

    /// Total bytes a physical row occupies: one tombstone byte plus
    /// the packed width of every column.
    pub fn row_size(&self) -> usize {
        1 + self.columns.iter().map(|c| c.data_type.width_bytes()).sum::<usize>()
    }

    /// Byte offset of `name` within a row slot, tombstone byte included.
    pub fn column_offset(&self, name: &str) -> EngineResult<usize> {
        let mut offset = 1;
        for column in &self.columns {
            if column.name == name {
                return Ok(offset);
            }
            offset += column.data_type.width_bytes();
        }
        Err(EngineError::UnknownColumn {
            table: self.table_name.clone(),
            column: name.to_string(),
        })
    }

    pub fn column(&self, name: &str) -> EngineResult<&Column> {
        self.columns.iter().find(|c| c.name == name).ok_or_else(|| EngineError::UnknownColumn {
            table: self.table_name.clone(),
            column: name.to_string(),
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// Persists and retrieves table schemas as JSON documents, one file
/// per table under the configured schema directory.
pub struct SchemaStore {
    dir: PathBuf,
}

impl SchemaStore {
    pub fn new(config: &EngineConfig) -> Self {
        SchemaStore { dir: config.schema_dir() }
    }

    fn path_for(&self, table_name: &str) -> PathBuf {
        self.dir.join(format!("{table_name}.json"))
    }

    pub fn exists(&self, table_name: &str) -> bool {
        self.path_for(table_name).exists()
    }

    pub fn save(&self, schema: &Schema) -> EngineResult<()> {
        let text = serde_json::to_string_pretty(schema)?;
        fs::write(self.path_for(schema.table_name()), text)?;
        Ok(())
    }

    pub fn load(&self, table_name: &str) -> EngineResult<Schema> {
        let path = self.path_for(table_name);
        if !path.exists() {
            return Err(EngineError::UnknownTable(table_name.to_string()));
        }
        let text = fs::read_to_string(&path)?;
        let schema: Schema = serde_json::from_str(&text)?;
        Ok(schema)
    }

    pub fn delete(&self, table_name: &str) -> EngineResult<()> {
        let path = self.path_for(table_name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }
}
