pub mod memtable;

pub use memtable::MemTable;

use std::sync::Arc;

use crate::core::error::Result;

/// Ordered key/tag table: the B-tree-like store the value subsystem reads
/// and writes through. Keys and tags are arbitrary byte strings; iteration
/// order is lexicographic on keys.
///
/// Every operation fails with `DatabaseClosed` once the table is closed.
pub trait Table: Send + Sync {
    fn is_open(&self) -> bool;

    /// Tag stored under exactly `key`, if any.
    fn get_exact(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Entry with the greatest key <= `key`, if any.
    fn floor_entry(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Entry with the least key > `key`, if any.
    fn next_entry(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Entry with the least key overall, if any.
    fn first_entry(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Insert or replace the entry for `key`.
    fn add(&self, key: Vec<u8>, tag: Vec<u8>) -> Result<()>;

    /// Remove the entry for `key`. Removing an absent key is a no-op.
    fn del(&self, key: &[u8]) -> Result<()>;
}

/// Cursor over a `Table`.
///
/// `find_entry` positions on the greatest key <= the target and reports
/// whether the match was exact; with no such key the cursor sits before the
/// start, from where `next` moves to the table's first entry.
pub struct TableCursor {
    table: Arc<dyn Table>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl TableCursor {
    pub fn new(table: Arc<dyn Table>) -> Self {
        TableCursor {
            table,
            current: None,
        }
    }

    pub fn find_entry(&mut self, key: &[u8]) -> Result<bool> {
        match self.table.floor_entry(key)? {
            Some((found, tag)) => {
                let exact = found == key;
                self.current = Some((found, tag));
                Ok(exact)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    /// Advance to the next entry; returns false at the end of the table.
    pub fn next(&mut self) -> Result<bool> {
        self.current = match &self.current {
            Some((key, _)) => self.table.next_entry(key)?,
            None => self.table.first_entry()?,
        };
        Ok(self.current.is_some())
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_slice())
    }

    pub fn tag(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, t)| t.as_slice())
    }
}
