use std::ops::Range;

use crate::compression::pack::PackCodec;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;

/// Streams (docid, value) pairs out of a single value chunk.
///
/// A chunk tag holds the first entry's value as a plain length-prefixed
/// string (its docid is in the chunk key), then `pack_uint(delta) ||
/// pack_string(value)` per entry with `delta = did - prev_did - 1`.
///
/// The reader owns the tag and tracks the current value as a byte range,
/// so `skip_to` crosses entries without copying any value data.
pub struct ValueChunkReader {
    data: Vec<u8>,
    pos: usize,
    did: DocId,
    value: Range<usize>,
    at_end: bool,
}

impl ValueChunkReader {
    /// A reader that is already at the end; placeholder until a chunk is
    /// loaded.
    pub fn exhausted() -> Self {
        ValueChunkReader {
            data: Vec::new(),
            pos: 0,
            did: DocId(0),
            value: 0..0,
            at_end: true,
        }
    }

    /// Read a chunk whose first entry is for `first_did`. The first value
    /// is decoded eagerly.
    pub fn new(data: Vec<u8>, first_did: DocId) -> Result<Self> {
        let mut reader = ValueChunkReader {
            data,
            pos: 0,
            did: first_did,
            value: 0..0,
            at_end: false,
        };
        reader.value = reader
            .read_value()
            .map_err(|_| Error::corrupt("failed to unpack first value"))?;
        Ok(reader)
    }

    pub fn at_end(&self) -> bool {
        self.at_end
    }

    pub fn docid(&self) -> DocId {
        self.did
    }

    pub fn value(&self) -> &[u8] {
        &self.data[self.value.clone()]
    }

    /// Advance to the next entry, or to the end of the chunk.
    pub fn next(&mut self) -> Result<()> {
        if self.pos == self.data.len() {
            self.at_end = true;
            return Ok(());
        }
        let delta = self.read_delta()?;
        self.did = DocId(self.did.0 + delta + 1);
        self.value = self.read_value()?;
        Ok(())
    }

    /// Advance to the first entry with docid >= `target`, or to the end.
    /// A no-op if the reader is already there.
    pub fn skip_to(&mut self, target: DocId) -> Result<()> {
        if self.at_end || target <= self.did {
            return Ok(());
        }
        while self.pos != self.data.len() {
            let delta = self.read_delta()?;
            self.did = DocId(self.did.0 + delta + 1);
            let value = self.read_value()?;
            if self.did >= target {
                self.value = value;
                return Ok(());
            }
            // Not there yet; the value bytes were never materialized.
        }
        self.at_end = true;
        Ok(())
    }

    fn read_delta(&mut self) -> Result<u64> {
        let mut p = &self.data[self.pos..];
        let delta = PackCodec::unpack_uint(&mut p)
            .map_err(|_| Error::corrupt("failed to unpack streamed value docid"))?;
        self.pos = self.data.len() - p.len();
        Ok(delta)
    }

    fn read_value(&mut self) -> Result<Range<usize>> {
        let mut p = &self.data[self.pos..];
        let len = PackCodec::unpack_uint(&mut p)
            .map_err(|_| Error::corrupt("failed to unpack streamed value length"))?;
        let start = self.data.len() - p.len();
        if len > (self.data.len() - start) as u64 {
            return Err(Error::corrupt("streamed value overruns chunk"));
        }
        let end = start + len as usize;
        self.pos = end;
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    /// Build a chunk tag from (docid, value) pairs with strictly
    /// increasing docids.
    fn build_chunk(entries: &[(u64, &[u8])]) -> Vec<u8> {
        let mut tag = Vec::new();
        PackCodec::pack_string(&mut tag, entries[0].1);
        for window in entries.windows(2) {
            PackCodec::pack_uint(&mut tag, window[1].0 - window[0].0 - 1);
            PackCodec::pack_string(&mut tag, window[1].1);
        }
        tag
    }

    #[test]
    fn test_round_trip() {
        let entries: Vec<(u64, &[u8])> =
            vec![(1, b"alpha"), (2, b"beta"), (9, b"gamma"), (300, b"d")];
        let tag = build_chunk(&entries);

        let mut reader = ValueChunkReader::new(tag, DocId(1)).unwrap();
        let mut seen = Vec::new();
        while !reader.at_end() {
            seen.push((reader.docid().0, reader.value().to_vec()));
            reader.next().unwrap();
        }
        let expected: Vec<(u64, Vec<u8>)> =
            entries.iter().map(|&(d, v)| (d, v.to_vec())).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_single_entry_chunk() {
        let mut tag = Vec::new();
        PackCodec::pack_string(&mut tag, b"only");
        let mut reader = ValueChunkReader::new(tag, DocId(7)).unwrap();
        assert_eq!(reader.docid(), DocId(7));
        assert_eq!(reader.value(), b"only");
        reader.next().unwrap();
        assert!(reader.at_end());
    }

    #[test]
    fn test_skip_to() {
        let entries: Vec<(u64, &[u8])> =
            vec![(10, b"a"), (11, b"b"), (20, b"c"), (21, b"d"), (40, b"e")];
        let tag = build_chunk(&entries);

        // Lands on an exact docid.
        let mut reader = ValueChunkReader::new(tag.clone(), DocId(10)).unwrap();
        reader.skip_to(DocId(20)).unwrap();
        assert_eq!(reader.docid(), DocId(20));
        assert_eq!(reader.value(), b"c");

        // Lands on the next docid past a gap.
        reader.skip_to(DocId(30)).unwrap();
        assert_eq!(reader.docid(), DocId(40));
        assert_eq!(reader.value(), b"e");

        // Backwards target is a no-op.
        reader.skip_to(DocId(5)).unwrap();
        assert_eq!(reader.docid(), DocId(40));

        // Past the last docid ends the reader.
        reader.skip_to(DocId(41)).unwrap();
        assert!(reader.at_end());
    }

    #[test]
    fn test_skip_to_from_first_entry() {
        let entries: Vec<(u64, &[u8])> = vec![(10, b"a"), (12, b"b")];
        let tag = build_chunk(&entries);
        let mut reader = ValueChunkReader::new(tag, DocId(10)).unwrap();
        reader.skip_to(DocId(10)).unwrap();
        assert_eq!(reader.docid(), DocId(10));
        assert_eq!(reader.value(), b"a");
    }

    #[test]
    fn test_truncated_value_is_corrupt() {
        let entries: Vec<(u64, &[u8])> = vec![(1, b"alpha"), (2, b"beta")];
        let mut tag = build_chunk(&entries);
        tag.truncate(tag.len() - 2);
        let mut reader = ValueChunkReader::new(tag, DocId(1)).unwrap();
        let err = reader.next().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corrupt);
    }

    #[test]
    fn test_truncated_first_value_is_corrupt() {
        let mut tag = Vec::new();
        PackCodec::pack_string(&mut tag, b"alpha");
        tag.truncate(2);
        assert!(ValueChunkReader::new(tag, DocId(1)).is_err());
    }

    #[test]
    fn test_exhausted_reader() {
        let reader = ValueChunkReader::exhausted();
        assert!(reader.at_end());
    }
}
