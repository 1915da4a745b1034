use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::error::{Error, ErrorKind, Result};
use crate::table::Table;

/// In-memory ordered key/tag table.
///
/// The reference `Table` implementation: a `BTreeMap` behind a lock. A real
/// backend would keep the same interface over an on-disk B-tree.
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    open: AtomicBool,
}

impl MemTable {
    pub fn new() -> Self {
        MemTable {
            data: RwLock::new(BTreeMap::new()),
            open: AtomicBool::new(true),
        }
    }

    /// Close the table; all subsequent operations fail with
    /// `DatabaseClosed`.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::DatabaseClosed,
                "table is closed".to_string(),
            ))
        }
    }
}

impl Default for MemTable {
    fn default() -> Self {
        MemTable::new()
    }
}

impl Table for MemTable {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn get_exact(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn floor_entry(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn next_entry(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn first_entry(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        let data = self.data.read();
        Ok(data.iter().next().map(|(k, v)| (k.clone(), v.clone())))
    }

    fn add(&self, key: Vec<u8>, tag: Vec<u8>) -> Result<()> {
        self.check_open()?;
        self.data.write().insert(key, tag);
        Ok(())
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        self.check_open()?;
        self.data.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableCursor;
    use std::sync::Arc;

    fn seeded() -> MemTable {
        let table = MemTable::new();
        table.add(b"b".to_vec(), b"1".to_vec()).unwrap();
        table.add(b"d".to_vec(), b"2".to_vec()).unwrap();
        table.add(b"f".to_vec(), b"3".to_vec()).unwrap();
        table
    }

    #[test]
    fn test_get_exact() {
        let table = seeded();
        assert_eq!(table.get_exact(b"d").unwrap(), Some(b"2".to_vec()));
        assert_eq!(table.get_exact(b"c").unwrap(), None);
    }

    #[test]
    fn test_floor_and_next() {
        let table = seeded();
        assert_eq!(table.floor_entry(b"d").unwrap().unwrap().0, b"d".to_vec());
        assert_eq!(table.floor_entry(b"e").unwrap().unwrap().0, b"d".to_vec());
        assert_eq!(table.floor_entry(b"a").unwrap(), None);
        assert_eq!(table.next_entry(b"d").unwrap().unwrap().0, b"f".to_vec());
        assert_eq!(table.next_entry(b"f").unwrap(), None);
    }

    #[test]
    fn test_cursor_find_entry_semantics() {
        let table: Arc<dyn Table> = Arc::new(seeded());
        let mut cursor = TableCursor::new(table);

        // Exact hit.
        assert!(cursor.find_entry(b"d").unwrap());
        assert_eq!(cursor.key(), Some(&b"d"[..]));

        // Between keys: positions on the floor entry.
        assert!(!cursor.find_entry(b"e").unwrap());
        assert_eq!(cursor.key(), Some(&b"d"[..]));
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.key(), Some(&b"f"[..]));
        assert!(!cursor.next().unwrap());

        // Before all keys: before-start, next() goes to the first entry.
        assert!(!cursor.find_entry(b"a").unwrap());
        assert_eq!(cursor.key(), None);
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.key(), Some(&b"b"[..]));
    }

    #[test]
    fn test_closed_table() {
        let table = seeded();
        table.close();
        let err = table.get_exact(b"b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DatabaseClosed);
        let err = table.add(b"x".to_vec(), b"y".to_vec()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DatabaseClosed);
    }

    #[test]
    fn test_del_absent_is_noop() {
        let table = seeded();
        table.del(b"zzz").unwrap();
        assert_eq!(table.len(), 3);
    }
}
