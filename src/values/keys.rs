use crate::compression::pack::PackCodec;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, SlotNo};

/// Namespace prefix for value-chunk keys in the postlist table.
pub const VALUE_CHUNK_PREFIX: [u8; 2] = [0x00, 0xd8];

/// Namespace prefix for per-slot statistics keys in the postlist table.
pub const VALUE_STATS_PREFIX: [u8; 2] = [0x00, 0xd0];

/// Key of the chunk whose first entry is `first_did`, for `slot`.
///
/// The docid uses the sort-preserving encoding so cursor order over a
/// slot's chunk keys equals docid order.
pub fn value_chunk_key(slot: SlotNo, first_did: DocId) -> Vec<u8> {
    let mut key = VALUE_CHUNK_PREFIX.to_vec();
    PackCodec::pack_uint(&mut key, slot as u64);
    PackCodec::pack_uint_preserving_sort(&mut key, first_did.0);
    key
}

/// Key of the statistics record for `slot`.
pub fn value_stats_key(slot: SlotNo) -> Vec<u8> {
    let mut key = VALUE_STATS_PREFIX.to_vec();
    PackCodec::pack_uint(&mut key, slot as u64);
    key
}

/// Key of the per-document slots-used record in the termlist table.
pub fn termlist_key(did: DocId) -> Vec<u8> {
    let mut key = Vec::new();
    PackCodec::pack_uint_preserving_sort(&mut key, did.0);
    key
}

/// If `key` is a value-chunk key for `slot`, decode its first docid.
/// Returns `None` for keys outside the chunk namespace or for a different
/// slot; a chunk key for this slot with a malformed tail is `Corrupt`.
pub fn docid_from_key(slot: SlotNo, key: &[u8]) -> Result<Option<DocId>> {
    let mut p = key;
    if p.len() < 2 || p[..2] != VALUE_CHUNK_PREFIX {
        return Ok(None);
    }
    p = &p[2..];
    let found_slot = PackCodec::unpack_uint(&mut p)
        .map_err(|_| Error::corrupt("bad slot in value chunk key"))?;
    if found_slot != slot as u64 {
        return Ok(None);
    }
    let did = PackCodec::unpack_uint_preserving_sort(&mut p)
        .map_err(|_| Error::corrupt("bad docid in value chunk key"))?;
    if !p.is_empty() {
        return Err(Error::corrupt("trailing bytes in value chunk key"));
    }
    Ok(Some(DocId(did)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_keys_sort_by_docid_within_slot() {
        let dids = [1u64, 2, 9, 255, 256, 1000, 1_000_000];
        let keys: Vec<Vec<u8>> = dids.iter().map(|&d| value_chunk_key(7, DocId(d))).collect();
        for i in 1..keys.len() {
            assert!(keys[i - 1] < keys[i]);
        }
    }

    #[test]
    fn test_docid_from_key_round_trip() {
        let key = value_chunk_key(3, DocId(42));
        assert_eq!(docid_from_key(3, &key).unwrap(), Some(DocId(42)));
    }

    #[test]
    fn test_docid_from_key_rejects_other_namespaces() {
        assert_eq!(docid_from_key(3, b"plainterm").unwrap(), None);
        assert_eq!(docid_from_key(3, &value_stats_key(3)).unwrap(), None);
        // Right namespace, different slot.
        let key = value_chunk_key(4, DocId(42));
        assert_eq!(docid_from_key(3, &key).unwrap(), None);
    }

    #[test]
    fn test_docid_from_key_trailing_bytes_corrupt() {
        let mut key = value_chunk_key(3, DocId(42));
        key.push(0x00);
        assert!(docid_from_key(3, &key).is_err());
    }

    #[test]
    fn test_stats_keys_sort_before_chunk_keys() {
        assert!(value_stats_key(1000) < value_chunk_key(0, DocId(1)));
    }
}
