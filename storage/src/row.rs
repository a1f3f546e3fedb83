use std::collections::BTreeMap;

use badsubd_common::error::{EngineError, EngineResult};

use crate::schema::Schema;
use crate::value::{ColumnType, Value};

/// A logical row: column name to value, plus the two attributes a
/// scan attaches (deletion state and heap offset) that are never
/// part of the stored byte layout itself.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: BTreeMap<String, Value>,
    pub deleted: bool,
    pub position: Option<u64>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    pub fn with_values(values: BTreeMap<String, Value>) -> Self {
        Row { values, deleted: false, position: None }
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Encodes and decodes rows to and from their fixed-width physical
/// layout for one schema.
#[derive(Debug, Clone)]
pub struct RowCodec {
    row_size: usize,
}

impl RowCodec {
    pub fn new(schema: &Schema) -> Self {
        RowCodec { row_size: schema.row_size() }
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Encodes a logical row into exactly `row_size` bytes. Missing
    /// values encode as zero / empty string. Values longer than a
    /// VARCHAR column's capacity are truncated, never rejected.
    pub fn encode(&self, schema: &Schema, row: &Row) -> EngineResult<Vec<u8>> {
        let mut buf = vec![0u8; self.row_size];
        buf[0] = if row.deleted { 1 } else { 0 };

        let mut offset = 1;
        for column in schema.columns() {
            let width = column.data_type().width_bytes();
            let slot = &mut buf[offset..offset + width];
            match (column.data_type(), row.get(column.name())) {
                (ColumnType::Int, Some(Value::Int(v))) => {
                    slot.copy_from_slice(&v.to_be_bytes());
                }
                (ColumnType::Int, Some(other)) => {
                    return Err(EngineError::TypeMismatch {
                        column: column.name().clone(),
                        reason: format!("expected INT, got {other:?}"),
                    });
                }
                (ColumnType::Int, None) => {
                    slot.copy_from_slice(&0u64.to_be_bytes());
                }
                (ColumnType::Varchar { size }, Some(Value::Text(s))) => {
                    encode_utf32(s, *size as usize, slot);
                }
                (ColumnType::Varchar { .. }, Some(other)) => {
                    return Err(EngineError::TypeMismatch {
                        column: column.name().clone(),
                        reason: format!("expected VARCHAR, got {other:?}"),
                    });
                }
                (ColumnType::Varchar { .. }, None) => {
                    // already zeroed: empty string
                }
            }
            offset += width;
        }

        Ok(buf)
    }

    /// Decodes a row slot. `bytes` must be exactly `row_size` long.
    pub fn decode(&self, schema: &Schema, table: &str, position: u64, bytes: &[u8]) -> EngineResult<Row> {
        if bytes.len() != self.row_size {
            return Err(EngineError::CorruptRow {
                table: table.to_string(),
                offset: position,
                reason: format!("expected {} bytes, got {}", self.row_size, bytes.len()),
            });
        }

        let mut row = Row::new();
        row.deleted = bytes[0] != 0;
        row.position = Some(position);

        let mut offset = 1;
        for column in schema.columns() {
            let width = column.data_type().width_bytes();
            let slot = &bytes[offset..offset + width];
            let value = match column.data_type() {
                ColumnType::Int => {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(slot);
                    Value::Int(u64::from_be_bytes(buf))
                }
                ColumnType::Varchar { .. } => Value::Text(decode_utf32(slot)),
            };
            row.set(column.name().clone(), value);
            offset += width;
        }

        Ok(row)
    }
}

/// Truncates `s` to `max_chars` Unicode scalar values, encodes it as
/// UTF-32LE, and NUL-pads the remainder of `slot`.
fn encode_utf32(s: &str, max_chars: usize, slot: &mut [u8]) {
    for (i, ch) in s.chars().take(max_chars).enumerate() {
        let bytes = (ch as u32).to_le_bytes();
        slot[i * 4..i * 4 + 4].copy_from_slice(&bytes);
    }
}

/// Strips trailing NUL code units, then decodes the remainder as
/// UTF-32LE, ignoring any code unit that isn't a valid scalar value.
fn decode_utf32(slot: &[u8]) -> String {
    let mut end = slot.len();
    while end >= 4 && slot[end - 4..end] == [0, 0, 0, 0] {
        end -= 4;
    }

    let mut out = String::new();
    for chunk in slot[..end].chunks_exact(4) {
        let code = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if let Some(ch) = char::from_u32(code) {
            out.push(ch);
        }
    }
    out
}
