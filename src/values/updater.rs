use log::trace;
use std::mem;
use std::sync::Arc;

use crate::compression::pack::PackCodec;
use crate::core::error::Result;
use crate::core::types::{DocId, SlotNo, MAX_DOCID};
use crate::table::{Table, TableCursor};
use crate::values::chunk::ValueChunkReader;
use crate::values::keys::{docid_from_key, value_chunk_key};

/// Rewrites one slot's chunk sequence to apply a batch of edits.
///
/// Edits arrive through `update` in strictly ascending docid order; an
/// empty value deletes. The updater walks the existing chunks through a
/// cursor, splices the edits into a rewritten stream, starts a fresh chunk
/// whenever the rewritten tag crosses the size threshold, and rekeys a
/// chunk whose first docid changed. `finish` must be called after the last
/// edit to drain the open chunk and write it out.
pub struct ValueUpdater {
    table: Arc<dyn Table>,
    slot: SlotNo,
    reader: ValueChunkReader,
    /// Bytes of the chunk currently being rewritten, for detecting a
    /// rewrite that changed nothing.
    orig_tag: Vec<u8>,
    /// The rewritten stream being accumulated.
    tag: Vec<u8>,
    prev_did: DocId,
    /// Key docid of the chunk being rewritten; None when the edits fell
    /// outside every existing chunk.
    first_did: Option<DocId>,
    /// First docid appended to `tag`.
    new_first_did: Option<DocId>,
    /// Largest docid that may stay in the current chunk: one less than the
    /// next chunk's first docid. None when no chunk is open.
    last_allowed_did: Option<DocId>,
    threshold: usize,
}

impl ValueUpdater {
    pub fn new(table: Arc<dyn Table>, slot: SlotNo, threshold: usize) -> Self {
        ValueUpdater {
            table,
            slot,
            reader: ValueChunkReader::exhausted(),
            orig_tag: Vec::new(),
            tag: Vec::new(),
            prev_did: DocId(0),
            first_did: None,
            new_first_did: None,
            last_allowed_did: None,
            threshold,
        }
    }

    /// Apply one edit. An empty `value` removes the entry for `did`.
    pub fn update(&mut self, did: DocId, value: &[u8]) -> Result<()> {
        if let Some(last_allowed) = self.last_allowed_did {
            if did > last_allowed {
                // The edit belongs in a later chunk: copy the rest of the
                // current one over, write it out, and fall through to open
                // the chunk that covers `did`.
                self.drain_reader()?;
                self.write_tag()?;
                self.last_allowed_did = None;
            }
        }
        if self.last_allowed_did.is_none() {
            self.open_chunk_for(did)?;
        }

        // Copy entries before `did` into the rewritten stream.
        while !self.reader.at_end() && self.reader.docid() < did {
            self.copy_current_entry()?;
        }
        // Skip any stored entry for `did`; this edit replaces or deletes it.
        if !self.reader.at_end() && self.reader.docid() == did {
            self.reader.next()?;
        }
        if !value.is_empty() {
            self.append_to_stream(did, value)?;
        }
        Ok(())
    }

    /// Copy over anything left of the open chunk and write it out. Must be
    /// called once all edits have been applied; with no edits applied it
    /// leaves the table alone.
    pub fn finish(mut self) -> Result<()> {
        self.drain_reader()?;
        self.write_tag()
    }

    /// Position the updater on the chunk covering `did`, loading it into
    /// the reader if one exists, and work out the docid range the chunk is
    /// allowed to span.
    fn open_chunk_for(&mut self, did: DocId) -> Result<()> {
        self.last_allowed_did = Some(MAX_DOCID);
        debug_assert!(self.tag.is_empty());
        self.new_first_did = None;
        self.first_did = None;
        self.orig_tag.clear();

        let mut cursor = TableCursor::new(Arc::clone(&self.table));
        if cursor.find_entry(&value_chunk_key(self.slot, did))? {
            self.first_did = Some(did);
        } else if let Some(key) = cursor.key() {
            // The floor key may belong to another slot or namespace, in
            // which case no existing chunk covers `did`.
            self.first_did = docid_from_key(self.slot, key)?;
        }

        if let Some(first_did) = self.first_did {
            let chunk = cursor.tag().unwrap_or_default().to_vec();
            self.orig_tag = chunk.clone();
            self.reader = ValueChunkReader::new(chunk, first_did)?;
        }

        if cursor.next()? {
            if let Some(key) = cursor.key() {
                if let Some(next_first) = docid_from_key(self.slot, key)? {
                    self.last_allowed_did = Some(DocId(next_first.0 - 1));
                }
            }
        }
        Ok(())
    }

    fn copy_current_entry(&mut self) -> Result<()> {
        let did = self.reader.docid();
        let value = self.reader.value().to_vec();
        self.append_to_stream(did, &value)?;
        self.reader.next()
    }

    fn drain_reader(&mut self) -> Result<()> {
        while !self.reader.at_end() {
            self.copy_current_entry()?;
        }
        Ok(())
    }

    fn append_to_stream(&mut self, did: DocId, value: &[u8]) -> Result<()> {
        debug_assert!(did.0 > 0);
        if self.tag.is_empty() {
            self.new_first_did = Some(did);
        } else {
            debug_assert!(did > self.prev_did);
            PackCodec::pack_uint(&mut self.tag, did.0 - self.prev_did.0 - 1);
        }
        self.prev_did = did;
        PackCodec::pack_string(&mut self.tag, value);
        if self.tag.len() >= self.threshold {
            self.write_tag()?;
        }
        Ok(())
    }

    fn write_tag(&mut self) -> Result<()> {
        // A reopened chunk whose rewrite changed nothing stays as it is.
        if self.first_did.is_some()
            && self.new_first_did == self.first_did
            && self.tag == self.orig_tag
        {
            self.first_did = None;
            self.new_first_did = None;
            self.tag.clear();
            self.orig_tag.clear();
            return Ok(());
        }

        // If the first docid changed, the old key has to go.
        if let Some(first_did) = self.first_did {
            if self.new_first_did != Some(first_did) {
                self.table.del(&value_chunk_key(self.slot, first_did))?;
            }
        }
        if !self.tag.is_empty() {
            debug_assert!(self.new_first_did.is_some());
            if let Some(new_first) = self.new_first_did {
                trace!(
                    "slot {}: writing chunk at docid {} ({} bytes)",
                    self.slot,
                    new_first.0,
                    self.tag.len()
                );
                self.table
                    .add(value_chunk_key(self.slot, new_first), mem::take(&mut self.tag))?;
            }
        }
        self.first_did = None;
        self.new_first_did = None;
        self.tag.clear();
        self.orig_tag.clear();
        Ok(())
    }
}
