use crate::compression::interpolative::{BitReader, BitWriter};
use crate::compression::pack::PackCodec;
use crate::core::error::{Error, Result};
use crate::core::types::SlotNo;

/// Largest slot number a 7-bit bitmap record can hold.
pub const BITMAP_MAX_SLOT: SlotNo = 6;

/// Encode the set of slots a document uses, as stored in the termlist
/// table.
///
/// Two forms share the first byte `b0`:
/// - top bit clear: `b0` is a bitmap, bit `i` set meaning slot `i` is used;
/// - top bit set: `b0 & 0x7f` is the byte length of the slot section (with
///   0 meaning the length follows as a varint). The section is
///   `pack_uint(last_slot)` plus, for two or more slots, a bit-packed
///   header (first slot, slot count - 2) and the interpolative coding of
///   the middle slots.
///
/// `slots` must be non-empty and strictly increasing.
pub fn encode_slots_used(slots: &[SlotNo]) -> Vec<u8> {
    debug_assert!(!slots.is_empty());
    debug_assert!(slots.windows(2).all(|w| w[0] < w[1]));

    let last = *slots.last().unwrap();
    if last <= BITMAP_MAX_SLOT {
        let mut bitmap = 0u8;
        for &slot in slots {
            bitmap |= 1 << slot;
        }
        return vec![bitmap];
    }

    let mut section = Vec::new();
    PackCodec::pack_uint(&mut section, last as u64);
    if slots.len() > 1 {
        let first = slots[0];
        let seq: Vec<u64> = slots.iter().map(|&s| s as u64).collect();
        let mut writer = BitWriter::new(section);
        writer.encode(first as u64, last as u64);
        writer.encode((slots.len() - 2) as u64, (last - first) as u64);
        writer.encode_interpolative(&seq, 0, seq.len() - 1);
        section = writer.freeze();
    }

    let mut blob = Vec::with_capacity(section.len() + 2);
    if section.len() < 0x80 {
        blob.push(0x80 | section.len() as u8);
    } else {
        blob.push(0x80);
        PackCodec::pack_uint(&mut blob, section.len() as u64);
    }
    blob.extend_from_slice(&section);
    blob
}

enum ReaderState<'a> {
    Bitmap {
        bits: u8,
        slot: SlotNo,
    },
    Single {
        last: SlotNo,
        done: bool,
    },
    Stream {
        reader: BitReader<'a>,
        pending: SlotNo,
        last: SlotNo,
        done: bool,
    },
}

/// Streams the slots out of a slots-used record, in increasing order.
pub struct SlotsUsedReader<'a> {
    state: ReaderState<'a>,
}

impl<'a> SlotsUsedReader<'a> {
    pub fn new(blob: &'a [u8]) -> Result<Self> {
        let (&b0, mut p) = blob
            .split_first()
            .ok_or_else(|| Error::corrupt("empty slots-used record"))?;

        if b0 & 0x80 == 0 {
            return Ok(SlotsUsedReader {
                state: ReaderState::Bitmap { bits: b0, slot: 0 },
            });
        }

        let mut len = (b0 & 0x7f) as u64;
        if len == 0 {
            len = PackCodec::unpack_uint(&mut p)
                .map_err(|_| Error::corrupt("slots-used length corrupt"))?;
        }
        if len > p.len() as u64 {
            return Err(Error::corrupt("slots-used section overruns record"));
        }
        let mut section = &p[..len as usize];

        let last = PackCodec::unpack_uint(&mut section)
            .map_err(|_| Error::corrupt("slots-used data corrupt"))?;
        if last > SlotNo::MAX as u64 {
            return Err(Error::corrupt("slots-used last slot out of range"));
        }
        let last = last as SlotNo;

        if section.is_empty() {
            return Ok(SlotsUsedReader {
                state: ReaderState::Single { last, done: false },
            });
        }

        let mut reader = BitReader::new(section);
        let first = reader.decode(last as u64)? as SlotNo;
        let count = reader.decode((last - first) as u64)? as usize + 2;
        reader.decode_interpolative(0, count - 1, first as u64, last as u64);
        Ok(SlotsUsedReader {
            state: ReaderState::Stream {
                reader,
                pending: first,
                last,
                done: false,
            },
        })
    }
}

impl Iterator for SlotsUsedReader<'_> {
    type Item = Result<SlotNo>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            ReaderState::Bitmap { bits, slot } => {
                while *bits != 0 {
                    let current = *slot;
                    let used = *bits & 1 != 0;
                    *bits >>= 1;
                    *slot += 1;
                    if used {
                        return Some(Ok(current));
                    }
                }
                None
            }
            ReaderState::Single { last, done } => {
                if *done {
                    None
                } else {
                    *done = true;
                    Some(Ok(*last))
                }
            }
            ReaderState::Stream {
                reader,
                pending,
                last,
                done,
            } => {
                if *done {
                    return None;
                }
                let current = *pending;
                if current == *last {
                    *done = true;
                } else {
                    match reader.decode_interpolative_next() {
                        Ok(next) => *pending = next as SlotNo,
                        Err(err) => {
                            *done = true;
                            return Some(Err(err));
                        }
                    }
                }
                Some(Ok(current))
            }
        }
    }
}
