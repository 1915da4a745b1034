use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, SlotNo, BAD_SLOT};
use crate::table::{Table, TableCursor};
use crate::values::chunk::ValueChunkReader;
use crate::values::keys::{docid_from_key, termlist_key, value_chunk_key, value_stats_key};
use crate::values::list::SlotValueList;
use crate::values::slots::{encode_slots_used, SlotsUsedReader};
use crate::values::stats::{
    decode_value_stats, encode_value_stats, CacheStats, StatsCache, ValueStats,
};
use crate::values::updater::ValueUpdater;

/// Document value storage over a pair of ordered key/tag tables.
///
/// Values are stored column-wise in the postlist table: one slot's values
/// for all documents form a sequence of chunks keyed by their first docid.
/// The termlist table carries, per document, the compact summary of which
/// slots the document uses, so deletion can find a document's values
/// without a second copy of them.
///
/// All mutation is staged in memory — the per-slot edit buffer and the
/// per-document slots-used staging map — until `merge_changes` applies it
/// to the tables. Reads consult the staged state first.
pub struct ValueManager {
    postlist: Arc<dyn Table>,
    termlist: Arc<dyn Table>,
    config: Config,
    /// Staged edits: slot -> docid -> value; an empty value deletes.
    changes: BTreeMap<SlotNo, BTreeMap<DocId, Vec<u8>>>,
    /// Staged per-document slots-used records; an empty record means the
    /// document's termlist entry goes away.
    slots: BTreeMap<DocId, Vec<u8>>,
    /// Cursor memoized across reads to amortize descent into the table;
    /// dropped whenever `merge_changes` rewrites chunks underneath it.
    cursor: Mutex<Option<TableCursor>>,
    stats_cache: StatsCache,
}

impl ValueManager {
    pub fn new(postlist: Arc<dyn Table>, termlist: Arc<dyn Table>) -> Self {
        Self::with_config(postlist, termlist, Config::default())
    }

    pub fn with_config(postlist: Arc<dyn Table>, termlist: Arc<dyn Table>, config: Config) -> Self {
        let stats_cache = StatsCache::new(config.stats_cache_capacity);
        ValueManager {
            postlist,
            termlist,
            config,
            changes: BTreeMap::new(),
            slots: BTreeMap::new(),
            cursor: Mutex::new(None),
            stats_cache,
        }
    }

    /// Stage `value` for (did, slot). No table I/O happens until
    /// `merge_changes`.
    pub fn add_value(&mut self, did: DocId, slot: SlotNo, value: Vec<u8>) {
        debug_assert!(slot != BAD_SLOT);
        self.changes.entry(slot).or_default().insert(did, value);
    }

    /// Stage removal of the value at (did, slot).
    pub fn remove_value(&mut self, did: DocId, slot: SlotNo) {
        self.changes.entry(slot).or_default().insert(did, Vec::new());
    }

    /// The value stored at (did, slot); staged edits win over the table.
    /// Empty means no value.
    pub fn get_value(&self, did: DocId, slot: SlotNo) -> Result<Vec<u8>> {
        if let Some(edits) = self.changes.get(&slot) {
            if let Some(value) = edits.get(&did) {
                return Ok(value.clone());
            }
        }

        let (first_did, chunk) = match self.chunk_containing(slot, did)? {
            Some(found) => found,
            None => return Ok(Vec::new()),
        };
        let mut reader = ValueChunkReader::new(chunk, first_did)?;
        reader.skip_to(did)?;
        if reader.at_end() || reader.docid() != did {
            return Ok(Vec::new());
        }
        Ok(reader.value().to_vec())
    }

    /// Stage all of `doc`'s values for document `did`, widening the slot
    /// statistics in `val_stats` (loading any not yet present), and stage
    /// the document's slots-used record. Returns the encoded record, empty
    /// if the document has no values or the termlist table is not open.
    pub fn add_document(
        &mut self,
        did: DocId,
        doc: &Document,
        val_stats: &mut BTreeMap<SlotNo, ValueStats>,
    ) -> Result<Vec<u8>> {
        let values = doc.values()?;
        if values.is_empty() {
            if let Some(staged) = self.slots.get_mut(&did) {
                // This batch staged values for the document earlier; they
                // are gone now.
                staged.clear();
            }
            return Ok(Vec::new());
        }

        let mut slotvec = Vec::with_capacity(values.len());
        for (&slot, value) in &values {
            let stats = self.stats_for(slot, val_stats)?;
            if stats.freq == 0 {
                stats.lower_bound = value.clone();
                stats.upper_bound = value.clone();
            } else {
                // Check the upper bound first; values in a slot commonly
                // grow over time.
                if value > &stats.upper_bound {
                    stats.upper_bound = value.clone();
                } else if value < &stats.lower_bound {
                    stats.lower_bound = value.clone();
                }
            }
            stats.freq += 1;

            self.add_value(did, slot, value.clone());
            slotvec.push(slot);
        }

        if !self.termlist.is_open() {
            return Ok(Vec::new());
        }

        let record = encode_slots_used(&slotvec);
        self.slots.insert(did, record.clone());
        Ok(record)
    }

    /// Remove document `did`'s values, reconstructing the set of slots it
    /// used from its staged or stored slots-used record, and decrementing
    /// each slot's frequency in `val_stats`. A document with no record is
    /// a no-op.
    pub fn delete_document(
        &mut self,
        did: DocId,
        val_stats: &mut BTreeMap<SlotNo, ValueStats>,
    ) -> Result<()> {
        let record = if let Some(staged) = self.slots.get_mut(&did) {
            mem::take(staged)
        } else {
            match self.termlist.get_exact(&termlist_key(did))? {
                Some(record) => {
                    // Leave an empty staged entry so a later add in this
                    // batch starts from a clean slate.
                    self.slots.insert(did, Vec::new());
                    record
                }
                None => return Ok(()),
            }
        };
        if record.is_empty() {
            return Ok(());
        }

        for slot in SlotsUsedReader::new(&record)? {
            let slot = slot?;
            let stats = self.stats_for(slot, val_stats)?;
            debug_assert!(stats.freq > 0);
            stats.freq = stats.freq.saturating_sub(1);
            if stats.freq == 0 {
                stats.lower_bound.clear();
                stats.upper_bound.clear();
            }
            self.remove_value(did, slot);
        }
        Ok(())
    }

    /// Replace document `did` with `doc`: delete then add. When the
    /// supplied document carries the same id, its values are forced to
    /// materialize first, since the delete below would otherwise empty the
    /// staged state a lazy fetch reads through. The id check can hit for a
    /// document from another database with a coinciding id; forcing the
    /// fetch is harmless there.
    pub fn replace_document(
        &mut self,
        did: DocId,
        doc: &Document,
        val_stats: &mut BTreeMap<SlotNo, ValueStats>,
    ) -> Result<Vec<u8>> {
        if doc.id() == did {
            doc.ensure_values_fetched()?;
        }
        self.delete_document(did, val_stats)?;
        self.add_document(did, doc, val_stats)
    }

    /// Apply every staged edit to the tables: each slot's edits drain
    /// through a chunk updater in ascending docid order, then the staged
    /// slots-used records are written to the termlist table.
    pub fn merge_changes(&mut self) -> Result<()> {
        debug!(
            "merging changes for {} slots, {} documents",
            self.changes.len(),
            self.slots.len()
        );
        // The chunk rewrite invalidates whatever the read cursor was
        // looking at.
        *self.cursor.lock() = None;

        let changes = mem::take(&mut self.changes);
        for (slot, edits) in changes {
            let mut updater = ValueUpdater::new(
                Arc::clone(&self.postlist),
                slot,
                self.config.chunk_size_threshold,
            );
            for (did, value) in edits {
                updater.update(did, &value)?;
            }
            updater.finish()?;
        }

        let slots = mem::take(&mut self.slots);
        if self.termlist.is_open() {
            for (did, record) in slots {
                let key = termlist_key(did);
                if record.is_empty() {
                    self.termlist.del(&key)?;
                } else {
                    self.termlist.add(key, record)?;
                }
            }
        }
        Ok(())
    }

    /// Collect every (slot, value) pair document `did` has, using its
    /// slots-used record to know which slots to fetch.
    pub fn get_all_values(
        &self,
        values: &mut BTreeMap<SlotNo, Vec<u8>>,
        did: DocId,
    ) -> Result<()> {
        debug_assert!(values.is_empty());
        if !self.termlist.is_open() {
            // No termlist: either the whole database is closed, or it was
            // built without one.
            if !self.postlist.is_open() {
                return Err(Error::new(
                    ErrorKind::DatabaseClosed,
                    "database is closed".to_string(),
                ));
            }
            return Err(Error::new(
                ErrorKind::FeatureUnavailable,
                "database has no termlist".to_string(),
            ));
        }

        let record = match self.slots.get(&did) {
            Some(staged) => staged.clone(),
            None => match self.termlist.get_exact(&termlist_key(did))? {
                Some(record) => record,
                None => return Ok(()),
            },
        };
        if record.is_empty() {
            return Ok(());
        }

        for slot in SlotsUsedReader::new(&record)? {
            let slot = slot?;
            let value = self.get_value(did, slot)?;
            values.insert(slot, value);
        }
        Ok(())
    }

    /// Statistics for `slot`, through the MRU cache.
    pub fn get_value_stats(&self, slot: SlotNo) -> Result<ValueStats> {
        if let Some(stats) = self.stats_cache.get(slot) {
            return Ok(stats);
        }
        let mut stats = ValueStats::default();
        self.read_value_stats(slot, &mut stats)?;
        self.stats_cache.put(slot, stats.clone());
        Ok(stats)
    }

    /// Write out a batch of slot statistics, emptying `val_stats`. A slot
    /// whose frequency dropped to zero loses its record.
    pub fn set_value_stats(&mut self, val_stats: &mut BTreeMap<SlotNo, ValueStats>) -> Result<()> {
        // Invalidate before the first write so a failure part-way cannot
        // leave stale cached statistics behind.
        self.stats_cache.clear();
        for (&slot, stats) in val_stats.iter() {
            let key = value_stats_key(slot);
            if stats.freq != 0 {
                self.postlist.add(key, encode_value_stats(stats))?;
            } else {
                self.postlist.del(&key)?;
            }
        }
        val_stats.clear();
        Ok(())
    }

    /// Stream over all committed values in `slot`, in docid order.
    pub fn slot_values(&self, slot: SlotNo) -> SlotValueList {
        SlotValueList::new(Arc::clone(&self.postlist), slot)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.stats_cache.stats()
    }

    /// Find the chunk covering `did` for `slot`: its first docid and tag.
    fn chunk_containing(&self, slot: SlotNo, did: DocId) -> Result<Option<(DocId, Vec<u8>)>> {
        trace!("locating chunk for slot {} docid {}", slot, did.0);
        let mut guard = self.cursor.lock();
        let cursor = guard
            .get_or_insert_with(|| TableCursor::new(Arc::clone(&self.postlist)));

        let exact = cursor.find_entry(&value_chunk_key(slot, did))?;
        let first_did = if exact {
            did
        } else {
            // The floor key is only useful if it is a value chunk for this
            // slot; anything else means no chunk covers `did`.
            match cursor.key() {
                Some(key) => match docid_from_key(slot, key)? {
                    Some(first_did) => first_did,
                    None => return Ok(None),
                },
                None => return Ok(None),
            }
        };
        let tag = match cursor.tag() {
            Some(tag) => tag.to_vec(),
            None => return Ok(None),
        };
        Ok(Some((first_did, tag)))
    }

    /// Uncached statistics read straight from the table.
    fn read_value_stats(&self, slot: SlotNo, stats: &mut ValueStats) -> Result<()> {
        match self.postlist.get_exact(&value_stats_key(slot))? {
            Some(tag) => decode_value_stats(&tag, stats),
            None => {
                stats.clear();
                Ok(())
            }
        }
    }

    /// Statistics entry for `slot` in the batch map, loading the stored
    /// statistics on first touch.
    fn stats_for<'a>(
        &self,
        slot: SlotNo,
        val_stats: &'a mut BTreeMap<SlotNo, ValueStats>,
    ) -> Result<&'a mut ValueStats> {
        match val_stats.entry(slot) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut stats = ValueStats::default();
                self.read_value_stats(slot, &mut stats)?;
                Ok(entry.insert(stats))
            }
        }
    }
}
