// crates/tessera-store/src/memory.rs
//
// In-memory key-value store. Ordered by key, so prefix scans are
// deterministic exactly like the RocksDB backend.

use std::collections::BTreeMap;
use std::ops::Bound;

use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;

/// BTreeMap-backed store used by tests and the node's in-memory mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TesseraError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TesseraError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TesseraError> {
        self.entries.remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TesseraError> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn last_before(
        &self,
        prefix: &[u8],
        before: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, TesseraError> {
        if before <= prefix {
            return Ok(None);
        }
        Ok(self
            .entries
            .range::<[u8], _>((Bound::Included(prefix), Bound::Excluded(before)))
            .next_back()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let mut store = MemStore::new();
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        // Deleting a missing key is fine.
        store.delete(b"a").unwrap();
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let mut store = MemStore::new();
        store.put(b"claim:oracle:02", b"x").unwrap();
        store.put(b"claim:budget:01", b"y").unwrap();
        store.put(b"claim:oracle:01", b"z").unwrap();
        store.put(b"claims", b"not a claim").unwrap();
        store.put(b"income_pool", b"5").unwrap();

        let keys: Vec<Vec<u8>> = store
            .prefix_scan(b"claim:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            vec![
                b"claim:budget:01".to_vec(),
                b"claim:oracle:01".to_vec(),
                b"claim:oracle:02".to_vec(),
            ]
        );
    }

    #[test]
    fn test_last_before_seeks_within_prefix() {
        let mut store = MemStore::new();
        store.put(b"rate:01", b"a").unwrap();
        store.put(b"rate:03", b"b").unwrap();
        store.put(b"rate:07", b"c").unwrap();
        store.put(b"rats", b"x").unwrap();
        store.put(b"r", b"y").unwrap();

        let hit = store.last_before(b"rate:", b"rate:05").unwrap();
        assert_eq!(hit, Some((b"rate:03".to_vec(), b"b".to_vec())));
        // The bound itself is excluded.
        let hit = store.last_before(b"rate:", b"rate:03").unwrap();
        assert_eq!(hit, Some((b"rate:01".to_vec(), b"a".to_vec())));
        assert_eq!(store.last_before(b"rate:", b"rate:01").unwrap(), None);
        // Keys outside the prefix are never returned.
        assert_eq!(store.last_before(b"rate:", b"rate:").unwrap(), None);
        let hit = store.last_before(b"rate:", b"rate:\xff").unwrap();
        assert_eq!(hit, Some((b"rate:07".to_vec(), b"c".to_vec())));
    }
}
