use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use badsubd_common::error::EngineResult;

/// Persistent map from a 64-bit integer key to the ordered list of
/// heap offsets currently holding that key, for one (table, column)
/// pair. Rewritten in full on every mutation (§4.4).
///
/// ```txt
/// repeating: key (u64 BE), count N (u32 BE), N x offset (u64 BE)
/// ```
pub struct HashIndex {
    path: PathBuf,
    buckets: RwLock<BTreeMap<u64, Vec<u64>>>,
}

impl HashIndex {
    /// Creates a fresh, empty index file for `(table, column)`.
    pub fn create(dir: &Path, table: &str, column: &str) -> EngineResult<Self> {
        let path = dir.join(format!("{table}_{column}.idx"));
        let index = HashIndex {
            path,
            buckets: RwLock::new(BTreeMap::new()),
        };
        index.save()?;
        Ok(index)
    }

    /// Opens an existing index file, rebuilding the in-memory
    /// dictionary by reading it sequentially. A missing file behaves
    /// as an empty index.
    pub fn open(dir: &Path, table: &str, column: &str) -> EngineResult<Self> {
        let path = dir.join(format!("{table}_{column}.idx"));
        let buckets = if path.exists() {
            Self::load(&path)?
        } else {
            BTreeMap::new()
        };
        Ok(HashIndex {
            path,
            buckets: RwLock::new(buckets),
        })
    }

    fn load(path: &Path) -> EngineResult<BTreeMap<u64, Vec<u64>>> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut buckets = BTreeMap::new();
        loop {
            let key = match reader.read_u64::<BigEndian>() {
                Ok(key) => key,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            let count = reader.read_u32::<BigEndian>()?;
            let mut offsets = Vec::with_capacity(count as usize);
            for _ in 0..count {
                offsets.push(reader.read_u64::<BigEndian>()?);
            }
            buckets.insert(key, offsets);
        }
        Ok(buckets)
    }

    /// Appends `offset` to the bucket for `key` and persists
    /// immediately. Does not deduplicate (Q2): the engine never
    /// produces a duplicate `(key, offset)` pair since every insert
    /// carries a fresh heap offset, so this is harmless in practice.
    pub fn insert(&self, key: u64, offset: u64) -> EngineResult<()> {
        {
            let mut buckets = self.buckets.write().expect("index lock poisoned");
            buckets.entry(key).or_default().push(offset);
        }
        self.save()
    }

    /// Current ordered offsets for `key`, or an empty vector if the
    /// key has no live bucket.
    pub fn find(&self, key: u64) -> Vec<u64> {
        self.buckets.read().expect("index lock poisoned").get(&key).cloned().unwrap_or_default()
    }

    /// Removes `offset` from `key`'s bucket, or the whole bucket when
    /// `offset` is `None`; persists only when something changed.
    pub fn delete(&self, key: u64, offset: Option<u64>) -> EngineResult<()> {
        let changed = {
            let mut buckets = self.buckets.write().expect("index lock poisoned");
            match offset {
                None => buckets.remove(&key).is_some(),
                Some(offset) => match buckets.get_mut(&key) {
                    Some(offsets) => {
                        let before = offsets.len();
                        offsets.retain(|&o| o != offset);
                        let removed = offsets.len() != before;
                        if offsets.is_empty() {
                            buckets.remove(&key);
                        }
                        removed
                    }
                    None => false,
                },
            }
        };
        if changed {
            self.save()?;
        }
        Ok(())
    }

    /// On-disk size of the index file, in bytes.
    pub fn size_bytes(&self) -> EngineResult<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> EngineResult<()> {
        let buckets = self.buckets.read().expect("index lock poisoned");
        let mut writer = BufWriter::new(File::create(&self.path)?);
        for (key, offsets) in buckets.iter() {
            writer.write_u64::<BigEndian>(*key)?;
            writer.write_u32::<BigEndian>(offsets.len() as u32)?;
            for offset in offsets {
                writer.write_u64::<BigEndian>(*offset)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
