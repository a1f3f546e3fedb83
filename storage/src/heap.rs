use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::warn;

use badsubd_common::error::{EngineError, EngineResult};

use crate::schema::Schema;

const MAGIC: &[u8; 4] = b"CDB3";
const HEADER_SIZE: u64 = 16;

/// Append-only heap file for one table.
///
/// ```txt
/// offset 0  : magic "CDB3"            (4 bytes)
/// offset 4  : total rows ever written (u64 BE)
/// offset 12 : reserved, always 0      (u32 BE)
/// offset 16 : row[0]                  (row_size bytes)
/// offset 16 + row_size : row[1]
/// ...
/// ```
pub struct HeapFile {
    table: String,
    path: PathBuf,
    row_size: usize,
    writer: Mutex<BufWriter<File>>,
    reader: Arc<Mutex<BufReader<File>>>,
}

impl HeapFile {
    /// Creates a fresh, empty heap file, overwriting any existing one.
    pub fn create(dir: &Path, table: &str, schema: &Schema) -> EngineResult<Self> {
        let path = dir.join(format!("{table}.dat"));
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&path)?;
        file.write_all(MAGIC)?;
        file.write_u64::<BigEndian>(0)?;
        file.write_u32::<BigEndian>(0)?;
        file.flush()?;

        Self::open(dir, table, schema)
    }

    /// Opens an existing heap file for append/read access.
    pub fn open(dir: &Path, table: &str, schema: &Schema) -> EngineResult<Self> {
        let path = dir.join(format!("{table}.dat"));
        let writer = OpenOptions::new().write(true).open(&path)?;
        let reader = File::open(&path)?;

        Ok(HeapFile {
            table: table.to_string(),
            path,
            row_size: schema.row_size(),
            writer: Mutex::new(BufWriter::new(writer)),
            reader: Arc::new(Mutex::new(BufReader::new(reader))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On-disk size of the heap file, in bytes.
    pub fn size_bytes(&self) -> EngineResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Reads the header's total-rows-ever-written counter.
    pub fn total_rows(&self) -> EngineResult<u64> {
        let mut reader = self.lock_reader()?;
        reader.seek(SeekFrom::Start(4))?;
        Ok(reader.read_u64::<BigEndian>()?)
    }

    fn set_total_rows(&self, count: u64) -> EngineResult<()> {
        let mut writer = self.writer.lock().expect("heap writer poisoned");
        writer.seek(SeekFrom::Start(4))?;
        writer.write_u64::<BigEndian>(count)?;
        writer.flush()?;
        Ok(())
    }

    /// Appends one already-encoded row and returns the byte offset it
    /// was written at — that offset is the row's identity.
    pub fn insert(&self, row_bytes: &[u8]) -> EngineResult<u64> {
        debug_assert_eq!(row_bytes.len(), self.row_size);

        let total = self.total_rows()?;
        let position = HEADER_SIZE + total * self.row_size as u64;

        {
            let mut writer = self.writer.lock().expect("heap writer poisoned");
            writer.seek(SeekFrom::End(0))?;
            writer.write_all(row_bytes)?;
            writer.flush()?;
        }

        self.set_total_rows(total + 1)?;
        Ok(position)
    }

    /// Reads the exact `row_size` bytes at `position`.
    pub fn read_at(&self, position: u64) -> EngineResult<Vec<u8>> {
        let mut reader = self.lock_reader()?;
        reader.seek(SeekFrom::Start(position))?;

        let mut buf = vec![0u8; self.row_size];
        reader.read_exact(&mut buf).map_err(|_| EngineError::CorruptRow {
            table: self.table.clone(),
            offset: position,
            reason: "short read".to_string(),
        })?;
        Ok(buf)
    }

    /// Reads the row at sequential slot index `i` (i.e. the `i`-th
    /// row slot ever appended, tombstoned or not), a convenience over
    /// `read_at(16 + i * row_size)`.
    pub fn read_by_index(&self, i: u64) -> EngineResult<Vec<u8>> {
        self.read_at(HEADER_SIZE + i * self.row_size as u64)
    }

    /// Overwrites the row slot at `position` in place.
    pub fn update_at(&self, position: u64, row_bytes: &[u8]) -> EngineResult<()> {
        debug_assert_eq!(row_bytes.len(), self.row_size);
        let mut writer = self.writer.lock().expect("heap writer poisoned");
        writer.seek(SeekFrom::Start(position))?;
        writer.write_all(row_bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Flips the tombstone byte at `position` to mark the row deleted.
    pub fn tombstone(&self, position: u64) -> EngineResult<()> {
        let mut writer = self.writer.lock().expect("heap writer poisoned");
        writer.seek(SeekFrom::Start(position))?;
        writer.write_all(&[1u8])?;
        writer.flush()?;
        Ok(())
    }

    /// Iterates every slot from the start of the file, yielding
    /// `(offset, raw_bytes)` for live rows only. Tombstoned rows and
    /// short trailing reads stop the scan or are skipped; a row that
    /// fails to even be read at the expected width is logged and
    /// skipped rather than aborting the whole scan.
    pub fn scan(&self) -> EngineResult<Vec<(u64, Vec<u8>)>> {
        let mut reader = self.lock_reader()?;
        reader.seek(SeekFrom::Start(HEADER_SIZE))?;

        let mut out = Vec::new();
        let mut position = HEADER_SIZE;
        loop {
            let mut buf = vec![0u8; self.row_size];
            match reader.read_exact(&mut buf) {
                Ok(()) => {
                    if buf[0] == 0 {
                        out.push((position, buf));
                    }
                    position += self.row_size as u64;
                }
                Err(_) => break,
            }
        }
        Ok(out)
    }

    fn lock_reader(&self) -> EngineResult<std::sync::MutexGuard<'_, BufReader<File>>> {
        self.reader.lock().map_err(|e| {
            warn!("heap file reader lock poisoned for table '{}': {}", self.table, e);
            EngineError::CorruptRow {
                table: self.table.clone(),
                offset: 0,
                reason: "reader lock poisoned".to_string(),
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::Column;
    use crate::value::ColumnType;

    fn schema() -> Schema {
        Schema::new("users", vec![Column::new("id", ColumnType::Int)], None)
    }

    #[test]
    fn append_grows_the_header_counter_and_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();
        let heap = HeapFile::create(dir.path(), "users", &schema).unwrap();

        let row_size = schema.row_size();
        let mut bytes = vec![0u8; row_size];
        bytes[1..9].copy_from_slice(&42u64.to_be_bytes());

        let offset = heap.insert(&bytes).unwrap();
        assert_eq!(offset, HEADER_SIZE);
        assert_eq!(heap.total_rows().unwrap(), 1);

        let file_len = std::fs::metadata(heap.path()).unwrap().len();
        assert_eq!(file_len, HEADER_SIZE + row_size as u64);
    }

    #[test]
    fn read_by_index_matches_read_at_the_equivalent_offset() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();
        let heap = HeapFile::create(dir.path(), "users", &schema).unwrap();

        let row_size = schema.row_size();
        let mut first = vec![0u8; row_size];
        first[1..9].copy_from_slice(&1u64.to_be_bytes());
        let mut second = vec![0u8; row_size];
        second[1..9].copy_from_slice(&2u64.to_be_bytes());

        heap.insert(&first).unwrap();
        heap.insert(&second).unwrap();

        assert_eq!(heap.read_by_index(0).unwrap(), heap.read_at(HEADER_SIZE).unwrap());
        assert_eq!(
            heap.read_by_index(1).unwrap(),
            heap.read_at(HEADER_SIZE + row_size as u64).unwrap()
        );
    }

    #[test]
    fn tombstoned_rows_are_excluded_from_scan() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();
        let heap = HeapFile::create(dir.path(), "users", &schema).unwrap();

        let row_size = schema.row_size();
        let bytes = vec![0u8; row_size];
        let offset = heap.insert(&bytes).unwrap();

        heap.tombstone(offset).unwrap();
        let live = heap.scan().unwrap();
        assert!(live.is_empty());

        let file_len = std::fs::metadata(heap.path()).unwrap().len();
        assert_eq!(file_len, HEADER_SIZE + row_size as u64);
    }
}
