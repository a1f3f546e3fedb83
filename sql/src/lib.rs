//! A small, deliberately permissive SQL dialect (§4.6) over
//! [`Engine`]: `CREATE TABLE`, `INSERT INTO`, `SELECT` and `DELETE`,
//! one statement per call.
//!
//! The tokenizer mirrors the original implementation's regex-driven
//! extraction rather than a strict grammar: `WHERE` predicates are
//! pulled out with a `findall`-style scan that tolerates stray
//! commas and repeated whitespace between them (§9), and column/value
//! lists are split with a small paren/quote-aware scanner rather than
//! rejected outright on unusual input.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use badsubd_common::error::{EngineError, EngineResult};
use engine::Engine;
use storage::{Column, ColumnType, Value};

/// Outcome of one executed statement.
#[derive(Debug, Clone)]
pub enum StatementResult {
    TableCreated,
    Inserted { offset: u64 },
    Rows(Vec<BTreeMap<String, Value>>),
    Deleted(i64),
}

/// Parses and dispatches one SQL statement at a time against an
/// owned [`Engine`].
pub struct SqlFrontend {
    engine: Engine,
}

impl SqlFrontend {
    pub fn new(engine: Engine) -> Self {
        SqlFrontend { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Executes one statement. Leading/trailing whitespace and
    /// embedded newlines/tabs are normalized to spaces before
    /// dispatch, matching the original's permissive preprocessing.
    pub fn execute(&self, sql: &str) -> EngineResult<StatementResult> {
        let sql = sql.trim().replace('\n', " ").replace('\t', " ");
        let upper = sql.to_uppercase();
        trace!(statement = %sql, "dispatching statement");

        if upper.starts_with("CREATE TABLE") {
            self.execute_create_table(&sql)
        } else if upper.starts_with("INSERT INTO") {
            self.execute_insert(&sql)
        } else if upper.starts_with("SELECT") {
            self.execute_select(&sql)
        } else if upper.starts_with("DELETE") {
            self.execute_delete(&sql)
        } else {
            Err(EngineError::UnsupportedStatement(sql))
        }
    }

    fn execute_create_table(&self, sql: &str) -> EngineResult<StatementResult> {
        static HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^CREATE TABLE\s+").unwrap());
        static TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^(\w+)\s*\((.*)\)\s*$").unwrap());

        let rest = HEAD.replace(sql, "");
        let caps = TABLE
            .captures(rest.trim())
            .ok_or_else(|| EngineError::BadStatement(format!("invalid CREATE TABLE syntax: {sql}")))?;

        let table_name = caps[1].to_string();
        let columns = parse_column_defs(&caps[2])?;
        self.engine.create_table(&table_name, columns)?;
        Ok(StatementResult::TableCreated)
    }

    fn execute_insert(&self, sql: &str) -> EngineResult<StatementResult> {
        static HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^INSERT INTO\s+").unwrap());
        static SHAPE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"(?is)^(\w+)\s*(?:\(([^)]+)\))?\s*VALUES\s*\(([^)]+)\)").unwrap());

        let rest = HEAD.replace(sql, "");
        let caps = SHAPE
            .captures(rest.trim())
            .ok_or_else(|| EngineError::BadStatement(format!("invalid INSERT syntax: {sql}")))?;

        let table_name = caps[1].to_string();
        let columns_clause = caps.get(2).map(|m| m.as_str());
        let tokens = split_value_tokens(&caps[3]);

        let column_names: Vec<String> = match columns_clause {
            Some(list) => list.split(',').map(|c| c.trim().to_string()).collect(),
            None => {
                let info = self.engine.get_table_info(&table_name)?;
                info.columns.iter().map(|c| c.name().clone()).collect::<Vec<_>>()
            }
        };

        if column_names.len() != tokens.len() {
            return Err(EngineError::BadStatement(format!(
                "INSERT INTO {table_name}: {} values for {} columns",
                tokens.len(),
                column_names.len()
            )));
        }

        let mut row = storage::Row::new();
        for (name, token) in column_names.into_iter().zip(tokens) {
            if let Some(value) = convert_value(&token, &name)? {
                row.set(name, value);
            }
        }

        let offset = self.engine.insert(&table_name, &row)?;
        Ok(StatementResult::Inserted { offset })
    }

    fn execute_select(&self, sql: &str) -> EngineResult<StatementResult> {
        static FROM_WHERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)FROM\s+(\w+)(?:\s+WHERE\s+(.*))?$").unwrap());
        static HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^SELECT\s+").unwrap());

        let rest = HEAD.replace(sql, "");
        let caps = FROM_WHERE
            .captures(&rest)
            .ok_or_else(|| EngineError::BadStatement(format!("invalid SELECT syntax: {sql}")))?;

        let columns_str = rest[..caps.get(0).unwrap().start()].trim().to_string();
        let table_name = caps[1].to_string();
        let where_clause = match caps.get(2) {
            Some(m) => parse_where(m.as_str())?,
            None => BTreeMap::new(),
        };

        let columns = if columns_str == "*" || columns_str.is_empty() {
            None
        } else {
            Some(columns_str.split(',').map(|c| c.trim().to_string()).collect::<Vec<_>>())
        };

        let rows = self.engine.select(&table_name, columns.as_deref(), &where_clause)?;
        Ok(StatementResult::Rows(rows))
    }

    fn execute_delete(&self, sql: &str) -> EngineResult<StatementResult> {
        static HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^DELETE\s+").unwrap());
        static FROM_WHERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^\*?\s*FROM\s+(\w+)(?:\s+WHERE\s+(.*))?$").unwrap());

        let rest = HEAD.replace(sql, "");
        let caps = FROM_WHERE
            .captures(rest.trim())
            .ok_or_else(|| EngineError::BadStatement(format!("invalid DELETE syntax: {sql}")))?;

        let table_name = caps[1].to_string();
        let where_clause = caps.get(2).map(|m| parse_where(m.as_str())).transpose()?;

        let deleted = self.engine.delete(&table_name, where_clause.as_ref())?;
        Ok(StatementResult::Deleted(deleted))
    }
}

/// Splits a `CREATE TABLE` column list on top-level commas (commas
/// inside a `VARCHAR(n)` size are not split points), then parses
/// each `<name> <type>[(<size>)]` definition.
fn parse_column_defs(columns_str: &str) -> EngineResult<Vec<Column>> {
    let mut defs = Vec::new();
    let mut current = String::new();
    let mut paren_depth = 0i32;

    for ch in columns_str.chars() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            ',' if paren_depth == 0 => {
                if !current.trim().is_empty() {
                    defs.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        defs.push(current.trim().to_string());
    }

    static SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)\)").unwrap());

    let mut columns = Vec::new();
    for def in defs {
        let parts: Vec<&str> = def.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(EngineError::BadStatement(format!("invalid column definition: {def}")));
        }
        let name = parts[0].to_string();
        let type_word = parts[1].to_uppercase();

        let data_type = if type_word == "INT" {
            ColumnType::Int
        } else if type_word.starts_with("VARCHAR") {
            let size = SIZE
                .captures(&def)
                .and_then(|c| c[1].parse::<u16>().ok())
                .unwrap_or(badsubd_common::config::DEFAULT_VARCHAR_SIZE);
            ColumnType::Varchar { size }
        } else {
            return Err(EngineError::BadStatement(format!("unsupported data type: {type_word}")));
        };

        columns.push(Column::new(name, data_type));
    }
    Ok(columns)
}

/// Splits an `INSERT ... VALUES (...)` value list on top-level
/// commas, respecting quoted strings, into raw (still-quoted) tokens.
fn split_value_tokens(values_str: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = ' ';
    let mut paren_depth = 0i32;

    for ch in values_str.chars() {
        if !in_quotes && (ch == '\'' || ch == '"') {
            in_quotes = true;
            quote_char = ch;
        } else if in_quotes && ch == quote_char {
            in_quotes = false;
        } else if !in_quotes && ch == '(' {
            paren_depth += 1;
        } else if !in_quotes && ch == ')' {
            paren_depth -= 1;
        } else if !in_quotes && ch == ',' && paren_depth == 0 {
            if !current.trim().is_empty() {
                values.push(current.trim().to_string());
            }
            current.clear();
            continue;
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        values.push(current.trim().to_string());
    }
    values
}

/// Converts one literal bound to `column`: a quoted string, `NULL`
/// (absence of a value), a bare integer, or a bareword treated as
/// text. A bareword that is a negative number or overflows `u64` is a
/// numeric literal out of this format's supported range (§3, §7), not
/// a string, so it fails with [`EngineError::OutOfRange`] rather than
/// silently falling back to text.
fn convert_value(token: &str, column: &str) -> EngineResult<Option<Value>> {
    let is_quoted = (token.starts_with('\'') && token.ends_with('\'') && token.len() >= 2)
        || (token.starts_with('"') && token.ends_with('"') && token.len() >= 2);
    if is_quoted {
        return Ok(Some(Value::Text(token[1..token.len() - 1].to_string())));
    }
    if token.eq_ignore_ascii_case("NULL") {
        return Ok(None);
    }

    static INTEGER_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
    if INTEGER_LITERAL.is_match(token) {
        return match token.parse::<u64>() {
            Ok(n) => Ok(Some(Value::Int(n))),
            Err(_) => Err(EngineError::OutOfRange {
                column: column.to_string(),
                reason: format!("'{token}' does not fit an unsigned 64-bit range [0, 2^64-1]"),
            }),
        };
    }
    Ok(Some(Value::Text(token.to_string())))
}

/// Extracts every `col = val` predicate via a global scan, the same
/// way the original's `findall` over the WHERE clause behaves:
/// predicates need only be separated by whitespace, commas between
/// them are tolerated rather than required.
fn parse_where(where_clause: &str) -> EngineResult<BTreeMap<String, Value>> {
    static PREDICATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s*=\s*([^\s,]+)").unwrap());

    let mut conditions = BTreeMap::new();
    for caps in PREDICATE.captures_iter(where_clause) {
        let column = caps[1].to_string();
        match convert_value(&caps[2], &column)? {
            Some(value) => {
                conditions.insert(column, value);
            }
            None => {
                conditions.remove(&column);
            }
        }
    }
    Ok(conditions)
}
