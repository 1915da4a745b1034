use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u64);

impl DocId {
    pub fn new(id: u64) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DocId {
    fn from(id: u64) -> Self {
        DocId(id)
    }
}

/// Largest representable document id; the implicit upper bound of the
/// final chunk in every slot's stream.
pub const MAX_DOCID: DocId = DocId(u64::MAX);

/// Value slot number. Slots are small non-negative integers.
pub type SlotNo = u32;

/// Reserved sentinel meaning "no slot".
pub const BAD_SLOT: SlotNo = SlotNo::MAX;

/// Supplies a document's values on demand, for documents whose values
/// live in storage and have not been materialized yet.
pub trait ValueSource: Send + Sync {
    fn fetch_values(&self) -> Result<BTreeMap<SlotNo, Vec<u8>>>;
}

/// A document's slot values, ordered by slot number.
///
/// Values are either set directly with `add_value` or fetched lazily from a
/// `ValueSource` the first time they are needed. An empty value is never
/// stored, so inserting one is equivalent to leaving the slot unset.
pub struct Document {
    id: DocId,
    values: RwLock<Option<BTreeMap<SlotNo, Vec<u8>>>>,
    source: Option<Box<dyn ValueSource>>,
}

impl Document {
    pub fn new(id: DocId) -> Self {
        Document {
            id,
            values: RwLock::new(Some(BTreeMap::new())),
            source: None,
        }
    }

    pub fn with_source(id: DocId, source: Box<dyn ValueSource>) -> Self {
        Document {
            id,
            values: RwLock::new(None),
            source: Some(source),
        }
    }

    pub fn id(&self) -> DocId {
        self.id
    }

    /// Set the value for `slot`. An empty value is never stored, so
    /// setting one unsets the slot instead.
    pub fn add_value(&mut self, slot: SlotNo, value: Vec<u8>) -> Result<()> {
        self.ensure_values_fetched()?;
        let mut guard = self.values.write();
        let values = guard.as_mut().unwrap();
        if value.is_empty() {
            values.remove(&slot);
        } else {
            values.insert(slot, value);
        }
        Ok(())
    }

    /// Force lazy values to be read from their source now. A no-op for
    /// documents whose values are already materialized.
    pub fn ensure_values_fetched(&self) -> Result<()> {
        let mut guard = self.values.write();
        if guard.is_none() {
            let fetched = match &self.source {
                Some(source) => source.fetch_values()?,
                None => BTreeMap::new(),
            };
            *guard = Some(fetched);
        }
        Ok(())
    }

    /// Snapshot of the document's values in slot order, fetching them
    /// from the source first if necessary.
    pub fn values(&self) -> Result<BTreeMap<SlotNo, Vec<u8>>> {
        self.ensure_values_fetched()?;
        Ok(self.values.read().as_ref().unwrap().clone())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let guard = self.values.read();
        match guard.as_ref() {
            Some(values) => write!(f, "Document(id={}, values={})", self.id.0, values.len()),
            None => write!(f, "Document(id={}, values=<unfetched>)", self.id.0),
        }
    }
}
