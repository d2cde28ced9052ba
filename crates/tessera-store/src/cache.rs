// crates/tessera-store/src/cache.rs
//
// Write-buffering overlay over another store.
//
// Reads see buffered writes first and fall through to the parent. Nothing
// reaches the parent until the caller takes the buffered writes with
// `into_batch` and applies them; dropping the cache discards them. The
// treasury runs every state transition inside one of these so a failure
// halfway leaves the parent store untouched.

use std::collections::BTreeMap;
use std::ops::Bound;

use tessera_core::error::TesseraError;
use tessera_core::traits::{BatchOp, KvStore};

/// Buffered view over a parent store.
///
/// A `None` entry in `writes` is a pending delete.
#[derive(Debug)]
pub struct CacheStore<'a, P: KvStore + ?Sized> {
    parent: &'a P,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, P: KvStore + ?Sized> CacheStore<'a, P> {
    pub fn new(parent: &'a P) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Whether any write has been buffered.
    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Number of buffered writes (puts and deletes).
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Consume the cache, returning its writes in key order.
    pub fn into_batch(self) -> Vec<BatchOp> {
        self.writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOp::Put { key, value },
                None => BatchOp::Delete { key },
            })
            .collect()
    }
}

impl<'a, P: KvStore + ?Sized> KvStore for CacheStore<'a, P> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TesseraError> {
        match self.writes.get(key) {
            Some(Some(value)) => Ok(Some(value.clone())),
            Some(None) => Ok(None),
            None => self.parent.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TesseraError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TesseraError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TesseraError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix)?.into_iter().collect();
        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn last_before(
        &self,
        prefix: &[u8],
        before: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, TesseraError> {
        let mut before = before.to_vec();
        loop {
            if before.as_slice() <= prefix {
                return Ok(None);
            }
            let parent = self.parent.last_before(prefix, &before)?;
            let buffered = self
                .writes
                .range::<[u8], _>((Bound::Included(prefix), Bound::Excluded(before.as_slice())))
                .next_back()
                .filter(|(k, _)| k.starts_with(prefix));
            match (parent, buffered) {
                (Some((key, value)), Some((buffered_key, _))) if key > *buffered_key => {
                    return Ok(Some((key, value)));
                }
                (_, Some((key, Some(value)))) => return Ok(Some((key.clone(), value.clone()))),
                // Deleted here: keep looking below it.
                (_, Some((key, None))) => before = key.clone(),
                (parent, None) => return Ok(parent),
            }
        }
    }
}
