// crates/tessera-store/src/rocks.rs
//
// RocksDB-backed persistent storage for treasury state.
//
// Keys are the treasury's string keys (`params`, `tax_rate:{epoch}`,
// `claim:{class}:{account}`, ...) stored verbatim. A block's writes arrive
// as one `write_batch` call and land in a single RocksDB WriteBatch, so a
// crash never leaves a half-written block on disk.

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};
use tracing::{debug, trace};

use tessera_core::error::TesseraError;
use tessera_core::traits::{BatchOp, KvStore};

/// RocksDB wrapper implementing the `KvStore` trait.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, TesseraError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            TesseraError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        debug!(path, "RocksDB opened");
        Ok(Self { db })
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TesseraError> {
        self.db
            .get(key)
            .map_err(|e| TesseraError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TesseraError> {
        self.db
            .put(key, value)
            .map_err(|e| TesseraError::Storage(format!("RocksDB put failed: {}", e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TesseraError> {
        self.db
            .delete(key)
            .map_err(|e| TesseraError::Storage(format!("RocksDB delete failed: {}", e)))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TesseraError> {
        let mut entries = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| TesseraError::Storage(format!("RocksDB iteration error: {}", e)))?;

            // No prefix extractor is configured, so the iterator runs past
            // the prefix. Stop when it no longer matches.
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    fn last_before(
        &self,
        prefix: &[u8],
        before: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, TesseraError> {
        // A reverse iterator starts at the last key <= `before`.
        for item in self.db.iterator(IteratorMode::From(before, Direction::Reverse)) {
            let (key, value) = item
                .map_err(|e| TesseraError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if &*key >= before {
                continue;
            }
            if !key.starts_with(prefix) {
                return Ok(None);
            }
            return Ok(Some((key.to_vec(), value.to_vec())));
        }
        Ok(None)
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), TesseraError> {
        trace!(ops = ops.len(), "Committing batch");
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => batch.put(key, value),
                BatchOp::Delete { key } => batch.delete(key),
            }
        }
        self.db
            .write(batch)
            .map_err(|e| TesseraError::Storage(format!("RocksDB batch write failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> String {
        std::env::temp_dir()
            .join(format!("tessera-rocks-{}", uuid::Uuid::now_v7()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_put_get_delete() {
        let path = temp_path();
        let mut store = RocksStore::open(&path).unwrap();
        store.put(b"income_pool", b"42").unwrap();
        assert_eq!(store.get(b"income_pool").unwrap(), Some(b"42".to_vec()));
        store.delete(b"income_pool").unwrap();
        assert_eq!(store.get(b"income_pool").unwrap(), None);
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_prefix_scan_stops_at_prefix_end() {
        let path = temp_path();
        let mut store = RocksStore::open(&path).unwrap();
        store.put(b"tax_rate:00000000000000000002", b"b").unwrap();
        store.put(b"tax_rate:00000000000000000001", b"a").unwrap();
        store.put(b"tax_cap:usdr", b"c").unwrap();
        store.put(b"tax_rates", b"d").unwrap();

        let scanned = store.prefix_scan(b"tax_rate:").unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].1, b"a".to_vec());
        assert_eq!(scanned[1].1, b"b".to_vec());
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_last_before_seeks_backward() {
        let path = temp_path();
        let mut store = RocksStore::open(&path).unwrap();
        store.put(b"tax_rate:00000000000000000001", b"a").unwrap();
        store.put(b"tax_rate:00000000000000000004", b"b").unwrap();
        store.put(b"tax_cap:usdr", b"c").unwrap();

        let hit = store
            .last_before(b"tax_rate:", b"tax_rate:00000000000000000003")
            .unwrap();
        assert_eq!(hit.map(|(_, v)| v), Some(b"a".to_vec()));
        let hit = store
            .last_before(b"tax_rate:", b"tax_rate:00000000000000000004")
            .unwrap();
        assert_eq!(hit.map(|(_, v)| v), Some(b"a".to_vec()));
        let hit = store
            .last_before(b"tax_rate:", b"tax_rate:00000000000000000009")
            .unwrap();
        assert_eq!(hit.map(|(_, v)| v), Some(b"b".to_vec()));
        // Below the first version the seek lands on tax_cap:, outside the prefix.
        let hit = store
            .last_before(b"tax_rate:", b"tax_rate:00000000000000000001")
            .unwrap();
        assert_eq!(hit, None);
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_write_batch_applies_all_ops() {
        let path = temp_path();
        let mut store = RocksStore::open(&path).unwrap();
        store.put(b"stale", b"x").unwrap();
        store
            .write_batch(vec![
                BatchOp::Put {
                    key: b"last_height".to_vec(),
                    value: b"7".to_vec(),
                },
                BatchOp::Delete {
                    key: b"stale".to_vec(),
                },
            ])
            .unwrap();
        assert_eq!(store.get(b"last_height").unwrap(), Some(b"7".to_vec()));
        assert_eq!(store.get(b"stale").unwrap(), None);
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let path = temp_path();
        {
            let mut store = RocksStore::open(&path).unwrap();
            store.put(b"params", b"{}").unwrap();
        }
        let store = RocksStore::open(&path).unwrap();
        assert_eq!(store.get(b"params").unwrap(), Some(b"{}".to_vec()));
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }
}
