use serde::{Deserialize, Serialize};

/// The two column types this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColumnType {
    Int,
    Varchar { size: u16 },
}

impl ColumnType {
    /// Number of bytes this column occupies within a row slot.
    pub fn width_bytes(&self) -> usize {
        match self {
            ColumnType::Int => badsubd_common::config::INT_WIDTH_BYTES,
            ColumnType::Varchar { size } => *size as usize * badsubd_common::config::CHAR_WIDTH_BYTES,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Varchar { .. } => "VARCHAR",
        }
    }
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Int(u64),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            Value::Int(_) => None,
        }
    }
}
