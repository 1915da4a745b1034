use std::sync::Arc;

use crate::core::error::Result;
use crate::core::types::{DocId, SlotNo};
use crate::table::{Table, TableCursor};
use crate::values::chunk::ValueChunkReader;
use crate::values::keys::{docid_from_key, value_chunk_key};

/// Streams every (docid, value) pair stored for one slot, walking the
/// slot's chunks in docid order.
///
/// Reads the committed table state; edits still sitting in a manager's
/// edit buffer become visible only after `merge_changes`. Call `next` (or
/// `skip_to`) once to reach the first entry:
///
/// ```ignore
/// let mut list = manager.slot_values(0);
/// list.next()?;
/// while !list.at_end() {
///     // list.docid(), list.value()
///     list.next()?;
/// }
/// ```
pub struct SlotValueList {
    slot: SlotNo,
    cursor: TableCursor,
    reader: ValueChunkReader,
    started: bool,
    at_end: bool,
}

impl SlotValueList {
    pub fn new(table: Arc<dyn Table>, slot: SlotNo) -> Self {
        SlotValueList {
            slot,
            cursor: TableCursor::new(table),
            reader: ValueChunkReader::exhausted(),
            started: false,
            at_end: false,
        }
    }

    pub fn at_end(&self) -> bool {
        self.at_end
    }

    pub fn docid(&self) -> DocId {
        self.reader.docid()
    }

    pub fn value(&self) -> &[u8] {
        self.reader.value()
    }

    /// Advance to the next entry; the first call positions on the slot's
    /// first stored value.
    pub fn next(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            return self.move_to_first_chunk();
        }
        if self.at_end {
            return Ok(());
        }
        self.reader.next()?;
        if self.reader.at_end() {
            self.next_chunk()?;
        }
        Ok(())
    }

    /// Advance to the first entry with docid >= `target`. A no-op when
    /// already positioned at or past it.
    pub fn skip_to(&mut self, target: DocId) -> Result<()> {
        if self.at_end {
            return Ok(());
        }
        if self.started && !self.reader.at_end() && self.reader.docid() >= target {
            return Ok(());
        }
        self.started = true;

        // Find the chunk covering `target`; its key is the greatest chunk
        // key at or below it.
        let exact = self.cursor.find_entry(&value_chunk_key(self.slot, target))?;
        let first_did = if exact {
            Some(target)
        } else {
            match self.cursor.key() {
                Some(key) => docid_from_key(self.slot, key)?,
                None => None,
            }
        };

        match first_did {
            Some(first_did) => {
                let chunk = self.cursor.tag().unwrap_or_default().to_vec();
                self.reader = ValueChunkReader::new(chunk, first_did)?;
                self.reader.skip_to(target)?;
                if self.reader.at_end() {
                    // Past this chunk's last entry; any later chunk starts
                    // beyond `target`, so its first entry qualifies.
                    self.next_chunk()?;
                }
            }
            None => {
                // No chunk covers `target`; move to the slot's next chunk.
                self.next_chunk()?;
            }
        }
        Ok(())
    }

    fn move_to_first_chunk(&mut self) -> Result<()> {
        // Docids start at 1, so this key is at or below every chunk key
        // for the slot.
        if self.cursor.find_entry(&value_chunk_key(self.slot, DocId(1)))? {
            let chunk = self.cursor.tag().unwrap_or_default().to_vec();
            self.reader = ValueChunkReader::new(chunk, DocId(1))?;
            return Ok(());
        }
        self.next_chunk()
    }

    fn next_chunk(&mut self) -> Result<()> {
        if self.cursor.next()? {
            if let Some(key) = self.cursor.key() {
                if let Some(first_did) = docid_from_key(self.slot, key)? {
                    let chunk = self.cursor.tag().unwrap_or_default().to_vec();
                    self.reader = ValueChunkReader::new(chunk, first_did)?;
                    return Ok(());
                }
            }
        }
        self.at_end = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MemTable;
    use crate::values::updater::ValueUpdater;

    fn seeded(slot: SlotNo, dids: &[u64], threshold: usize) -> Arc<MemTable> {
        let table = Arc::new(MemTable::new());
        let dyn_table: Arc<dyn Table> = Arc::clone(&table) as Arc<dyn Table>;
        let mut updater = ValueUpdater::new(dyn_table, slot, threshold);
        for &did in dids {
            let value = format!("v{}", did);
            updater.update(DocId(did), value.as_bytes()).unwrap();
        }
        updater.finish().unwrap();
        table
    }

    fn collect(list: &mut SlotValueList) -> Vec<u64> {
        let mut out = Vec::new();
        list.next().unwrap();
        while !list.at_end() {
            out.push(list.docid().0);
            list.next().unwrap();
        }
        out
    }

    #[test]
    fn test_iterates_across_chunks() {
        let dids: Vec<u64> = (1..=60).collect();
        // Small threshold forces several chunks.
        let table = seeded(0, &dids, 40);
        let mut list = SlotValueList::new(table as Arc<dyn Table>, 0);
        assert_eq!(collect(&mut list), dids);
    }

    #[test]
    fn test_empty_slot() {
        let table = seeded(0, &[1, 2, 3], 2000);
        let mut list = SlotValueList::new(table as Arc<dyn Table>, 7);
        list.next().unwrap();
        assert!(list.at_end());
    }

    #[test]
    fn test_values_come_back() {
        let table = seeded(2, &[5, 9], 2000);
        let mut list = SlotValueList::new(table as Arc<dyn Table>, 2);
        list.next().unwrap();
        assert_eq!(list.docid(), DocId(5));
        assert_eq!(list.value(), b"v5");
        list.next().unwrap();
        assert_eq!(list.docid(), DocId(9));
        assert_eq!(list.value(), b"v9");
        list.next().unwrap();
        assert!(list.at_end());
    }

    #[test]
    fn test_skip_to_within_and_across_chunks() {
        let dids: Vec<u64> = (1..=60).map(|d| d * 2).collect(); // 2, 4, .. 120
        let table = seeded(1, &dids, 40);
        let mut list = SlotValueList::new(table as Arc<dyn Table>, 1);

        list.skip_to(DocId(30)).unwrap();
        assert_eq!(list.docid(), DocId(30));

        // Target between stored docids lands on the next one.
        list.skip_to(DocId(91)).unwrap();
        assert_eq!(list.docid(), DocId(92));

        // Backwards skip is a no-op.
        list.skip_to(DocId(3)).unwrap();
        assert_eq!(list.docid(), DocId(92));

        // Skipping past the end exhausts the list.
        list.skip_to(DocId(500)).unwrap();
        assert!(list.at_end());
    }

    #[test]
    fn test_skip_to_before_first_entry() {
        let table = seeded(1, &[40, 50], 2000);
        let mut list = SlotValueList::new(table as Arc<dyn Table>, 1);
        list.skip_to(DocId(10)).unwrap();
        assert_eq!(list.docid(), DocId(40));
    }
}
