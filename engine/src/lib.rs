//! Coordinates the schema catalog, table heap files and hash indexes
//! behind the single synchronous API the SQL frontend and any other
//! caller drive (§4.5).

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use badsubd_common::config::EngineConfig;
use badsubd_common::error::{EngineError, EngineResult};
use storage::{Column, ColumnType, HashIndex, HeapFile, Row, RowCodec, Schema, SchemaStore, Value};

/// Everything the engine keeps open for one table: its schema, its
/// row codec, its heap file, and zero or more hash indexes keyed by
/// column name.
struct TableHandle {
    schema: Schema,
    codec: RowCodec,
    heap: HeapFile,
    indexes: BTreeMap<String, HashIndex>,
}

/// Schema, size and index summary returned by [`Engine::get_table_info`].
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub table_name: String,
    pub columns: Vec<Column>,
    pub row_size: usize,
    pub total_rows: u64,
    pub indexed_columns: Vec<String>,
    pub heap_size_bytes: u64,
    pub index_size_bytes: BTreeMap<String, u64>,
}

/// The storage engine. Owns the schema store and the in-memory
/// registry of open tables; everything else is addressed through it.
pub struct Engine {
    config: EngineConfig,
    schemas: SchemaStore,
    tables: RwLock<BTreeMap<String, TableHandle>>,
}

impl Engine {
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config.ensure_directories()?;
        Ok(Engine {
            schemas: SchemaStore::new(&config),
            config,
            tables: RwLock::new(BTreeMap::new()),
        })
    }

    /// Creates a table, persists its schema, and opens an empty heap
    /// file for it. Fails with [`EngineError::AlreadyExists`] if a
    /// schema with this name is already on disk.
    pub fn create_table(&self, table_name: &str, columns: Vec<Column>) -> EngineResult<()> {
        if self.schemas.exists(table_name) {
            return Err(EngineError::AlreadyExists(table_name.to_string()));
        }
        for column in &columns {
            if let ColumnType::Varchar { size } = column.data_type() {
                if *size == 0 || *size > badsubd_common::config::MAX_VARCHAR_SIZE {
                    return Err(EngineError::TypeMismatch {
                        column: column.name().clone(),
                        reason: format!(
                            "VARCHAR size must be in 1..={}",
                            badsubd_common::config::MAX_VARCHAR_SIZE
                        ),
                    });
                }
            }
        }

        let schema = Schema::new(table_name, columns, None);
        self.schemas.save(&schema)?;

        let heap = HeapFile::create(&self.config.table_dir(), table_name, &schema)?;
        let codec = RowCodec::new(&schema);

        debug!(table = table_name, row_size = codec.row_size(), "table created");

        self.tables.write().expect("table registry poisoned").insert(
            table_name.to_string(),
            TableHandle { schema, codec, heap, indexes: BTreeMap::new() },
        );
        Ok(())
    }

    /// Builds a hash index over `column`, which must be an INT
    /// column of `table_name`, and populates it from every live row
    /// currently in the table.
    pub fn create_index(&self, table_name: &str, column: &str) -> EngineResult<()> {
        self.ensure_loaded(table_name)?;
        let mut tables = self.tables.write().expect("table registry poisoned");
        let handle = tables.get_mut(table_name).expect("just loaded");

        let col = handle.schema.column(column)?;
        if !matches!(col.data_type(), ColumnType::Int) {
            return Err(EngineError::TypeMismatch {
                column: column.to_string(),
                reason: "indexes are only supported on INT columns".to_string(),
            });
        }

        let index = HashIndex::create(&self.config.index_dir(), table_name, column)?;
        for (offset, bytes) in handle.heap.scan()? {
            let row = handle.codec.decode(&handle.schema, table_name, offset, &bytes)?;
            if let Some(Value::Int(key)) = row.get(column) {
                index.insert(*key, offset)?;
            }
        }

        debug!(table = table_name, column, "index created");
        handle.indexes.insert(column.to_string(), index);
        Ok(())
    }

    /// Appends `row` to `table_name`'s heap and updates every index
    /// on a column present in `row`.
    pub fn insert(&self, table_name: &str, row: &Row) -> EngineResult<u64> {
        self.ensure_loaded(table_name)?;
        let tables = self.tables.read().expect("table registry poisoned");
        let handle = tables.get(table_name).expect("just loaded");

        let bytes = handle.codec.encode(&handle.schema, row)?;
        let offset = handle.heap.insert(&bytes)?;

        for (column, index) in handle.indexes.iter() {
            if let Some(Value::Int(key)) = row.get(column) {
                index.insert(*key, offset)?;
            }
        }

        Ok(offset)
    }

    /// Selects rows from `table_name`. When `where_clause` pins at
    /// least one indexed INT column, resolves candidate offsets from
    /// that index (the first such column in schema order, per Q5)
    /// and post-filters by the full `where_clause`; otherwise does a
    /// full heap scan. `columns` projects the result; `None` returns
    /// every schema column.
    pub fn select(
        &self,
        table_name: &str,
        columns: Option<&[String]>,
        where_clause: &BTreeMap<String, Value>,
    ) -> EngineResult<Vec<BTreeMap<String, Value>>> {
        self.ensure_loaded(table_name)?;
        let tables = self.tables.read().expect("table registry poisoned");
        let handle = tables.get(table_name).expect("just loaded");

        if let Some((column, key)) = self.indexed_predicate(handle, where_clause) {
            let mut results = Vec::new();
            for offset in handle.indexes[&column].find(key) {
                match handle.heap.read_at(offset) {
                    Ok(bytes) => {
                        let row = match handle.codec.decode(&handle.schema, table_name, offset, &bytes) {
                            Ok(row) => row,
                            Err(e) => {
                                warn!(table = table_name, offset, error = %e, "skipping unreadable indexed row");
                                continue;
                            }
                        };
                        if row.deleted {
                            continue;
                        }
                        if matches_where(&row, where_clause) {
                            results.push(project(&row, &handle.schema, columns));
                        }
                    }
                    Err(e) => {
                        warn!(table = table_name, offset, error = %e, "skipping stale index offset");
                    }
                }
            }
            return Ok(results);
        }

        let mut results = Vec::new();
        for (offset, bytes) in handle.heap.scan()? {
            let row = handle.codec.decode(&handle.schema, table_name, offset, &bytes)?;
            if matches_where(&row, where_clause) {
                results.push(project(&row, &handle.schema, columns));
            }
        }
        Ok(results)
    }

    /// Deletes rows matching `where_clause`, tombstoning each in
    /// place and updating every index. With no `where_clause`,
    /// truncates the heap (recreating it empty) and returns `-1`;
    /// indexes are left untouched (Q1).
    pub fn delete(&self, table_name: &str, where_clause: Option<&BTreeMap<String, Value>>) -> EngineResult<i64> {
        self.ensure_loaded(table_name)?;
        let mut tables = self.tables.write().expect("table registry poisoned");
        let handle = tables.get_mut(table_name).expect("just loaded");

        match where_clause {
            Some(where_clause) => {
                let mut matches = Vec::new();
                for (offset, bytes) in handle.heap.scan()? {
                    let row = handle.codec.decode(&handle.schema, table_name, offset, &bytes)?;
                    if matches_where(&row, where_clause) {
                        matches.push(row);
                    }
                }

                for row in &matches {
                    let offset = row.position.expect("scanned row carries a position");
                    handle.heap.tombstone(offset)?;
                    for (column, index) in handle.indexes.iter() {
                        if let Some(Value::Int(key)) = row.get(column) {
                            index.delete(*key, Some(offset))?;
                        }
                    }
                }
                Ok(matches.len() as i64)
            }
            None => {
                handle.heap = HeapFile::create(&self.config.table_dir(), table_name, &handle.schema)?;
                warn!(table = table_name, "table truncated without resetting indexes (Q1)");
                Ok(-1)
            }
        }
    }

    /// Reports schema, physical row size, live-plus-tombstoned row
    /// count, and the set of indexed columns for `table_name`.
    pub fn get_table_info(&self, table_name: &str) -> EngineResult<TableInfo> {
        self.ensure_loaded(table_name)?;
        let tables = self.tables.read().expect("table registry poisoned");
        let handle = tables.get(table_name).expect("just loaded");

        let mut index_size_bytes = BTreeMap::new();
        for (column, index) in handle.indexes.iter() {
            index_size_bytes.insert(column.clone(), index.size_bytes()?);
        }

        Ok(TableInfo {
            table_name: table_name.to_string(),
            columns: handle.schema.columns().clone(),
            row_size: handle.codec.row_size(),
            total_rows: handle.heap.total_rows()?,
            indexed_columns: handle.indexes.keys().cloned().collect(),
            heap_size_bytes: handle.heap.size_bytes()?,
            index_size_bytes,
        })
    }

    /// Removes a table's schema document and heap file. Not reachable
    /// through any SQL verb (§4.5); programmatic callers only.
    pub fn delete_schema(&self, table_name: &str) -> EngineResult<()> {
        self.tables.write().expect("table registry poisoned").remove(table_name);
        self.schemas.delete(table_name)?;
        let path = self.config.table_dir().join(format!("{table_name}.dat"));
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Finds the first schema-order INT column that is both indexed
    /// and present in `where_clause` (Q5's deterministic tie-break).
    fn indexed_predicate(&self, handle: &TableHandle, where_clause: &BTreeMap<String, Value>) -> Option<(String, u64)> {
        for column in handle.schema.columns() {
            if !matches!(column.data_type(), ColumnType::Int) {
                continue;
            }
            if !handle.indexes.contains_key(column.name()) {
                continue;
            }
            if let Some(Value::Int(key)) = where_clause.get(column.name()) {
                return Some((column.name().clone(), *key));
            }
        }
        None
    }

    /// Loads a table's schema, codec, heap and any existing index
    /// files into the in-memory registry if it isn't already there.
    fn ensure_loaded(&self, table_name: &str) -> EngineResult<()> {
        if self.tables.read().expect("table registry poisoned").contains_key(table_name) {
            return Ok(());
        }

        let schema = self.schemas.load(table_name)?;
        let codec = RowCodec::new(&schema);
        let heap = HeapFile::open(&self.config.table_dir(), table_name, &schema)?;

        let mut indexes = BTreeMap::new();
        for column in schema.columns() {
            let path = self.config.index_dir().join(format!("{table_name}_{}.idx", column.name()));
            if path.exists() {
                indexes.insert(column.name().clone(), HashIndex::open(&self.config.index_dir(), table_name, column.name())?);
            }
        }

        self.tables
            .write()
            .expect("table registry poisoned")
            .insert(table_name.to_string(), TableHandle { schema, codec, heap, indexes });
        Ok(())
    }
}

/// Conjunctive equality match: every key in `where_clause` must be
/// present in `row` with an equal value.
fn matches_where(row: &Row, where_clause: &BTreeMap<String, Value>) -> bool {
    where_clause.iter().all(|(column, value)| row.get(column) == Some(value))
}

/// Projects `row` onto `columns` (or every schema column when
/// `columns` is `None`); synthetic attributes are never included.
fn project(row: &Row, schema: &Schema, columns: Option<&[String]>) -> BTreeMap<String, Value> {
    let names: Vec<&String> = match columns {
        Some(names) => names.iter().collect(),
        None => schema.columns().iter().map(|c| c.name()).collect(),
    };

    let mut out = BTreeMap::new();
    for name in names {
        if let Some(value) = row.get(name) {
            out.insert(name.clone(), value.clone());
        }
    }
    out
}
