//! Offset recomputation for a write.
//!
//! Entries are walked in on-disk order with a running size delta. Each entry
//! lands at its original offset plus the delta accumulated by every
//! replacement before it, rounded up to the alignment boundary, and is kept
//! clear of the previous entry's new end so an unaligned size change can
//! never make two entries overlap.
//!
//! Entries whose source ranges overlap form a sharing group. A group with no
//! replacement is moved as one block and keeps sharing its bytes; only its
//! first entry is realigned. A group
//! with a replacement is split: each member gets its own range, since the
//! members no longer resolve to the same bytes.

use std::io::Write;

use bnk_types::MediaId;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::cursor::BinaryWriter;
use crate::error::{BankError, BankResult};
use crate::index::{DataIndex, MediaEntry, ResourceIndex};

/// Media alignment expected by the runtime.
pub const DEFAULT_ALIGNMENT: u32 = 16;

/// Round `value` up to a multiple of `alignment`. Values already on a
/// boundary are returned unchanged.
pub fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Where one media entry goes in the rewritten `DATA` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalLayoutEntry {
    pub id: MediaId,
    pub offset: u32,
    pub size: u32,
    pub bytes: Bytes,
    pub replaced: bool,
}

impl FinalLayoutEntry {
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// The complete layout of a `DATA` section about to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalLayout {
    entries: Vec<FinalLayoutEntry>,
    data_len: u32,
}

impl FinalLayout {
    /// Entries in the original on-disk order.
    pub fn entries(&self) -> &[FinalLayoutEntry] {
        &self.entries
    }

    /// Length of the `DATA` payload: the furthest entry end.
    pub fn data_len(&self) -> u32 {
        self.data_len
    }

    pub fn to_data_index(&self) -> DataIndex {
        DataIndex {
            entries: self
                .entries
                .iter()
                .map(|e| MediaEntry::new(e.id, e.offset, e.size))
                .collect(),
        }
    }

    /// Emit the `DATA` payload. Alignment gaps are zero-filled.
    pub fn write_data<W: Write>(&self, writer: &mut BinaryWriter<W>) -> BankResult<()> {
        let mut payload = BytesMut::zeroed(self.data_len as usize);
        for entry in &self.entries {
            let start = entry.offset as usize;
            payload[start..start + entry.bytes.len()].copy_from_slice(&entry.bytes);
        }
        writer.write_bytes(&payload)
    }
}

impl ResourceIndex {
    /// Lay out every entry for a write, applying pending replacements.
    ///
    /// Pure with respect to `self`: calling it twice without touching the
    /// replacements yields equal layouts.
    pub fn compute_final_layout(&self, alignment: u32) -> BankResult<FinalLayout> {
        let alignment = u64::from(alignment);
        let split = self.split_sharing_groups();
        let mut entries = Vec::with_capacity(self.len());
        let mut diff: i64 = 0;
        let mut source_end: u64 = 0;
        let mut final_end: u64 = 0;
        // Final minus source offset of the current group's first entry.
        let mut group_shift: i64 = 0;

        for (i, entry) in self.entries().iter().enumerate() {
            let (bytes, replaced) = match self.replacement(entry.id) {
                Some(bytes) => (bytes.clone(), true),
                None => (self.original_bytes(entry), false),
            };

            let source = i64::from(entry.offset);
            let starts_group = u64::from(entry.offset) >= source_end;
            let offset = if starts_group || split[i] {
                let start = ((source + diff).max(0) as u64).max(final_end);
                align_up(start, alignment)
            } else {
                (source + group_shift).max(0) as u64
            };
            if starts_group {
                group_shift = offset as i64 - source;
            }
            let size = bytes.len() as u64;

            let overflow = || BankError::LayoutOverflow { id: entry.id };
            let offset32 = u32::try_from(offset).map_err(|_| overflow())?;
            let size32 = u32::try_from(size).map_err(|_| overflow())?;
            if offset + size > u64::from(u32::MAX) {
                return Err(overflow());
            }

            diff += size as i64 - i64::from(entry.size);
            source_end = source_end.max(entry.end());
            final_end = final_end.max(offset + size);

            entries.push(FinalLayoutEntry {
                id: entry.id,
                offset: offset32,
                size: size32,
                bytes,
                replaced,
            });
        }

        debug!(
            media = entries.len(),
            replaced = self.replacement_count(),
            data_len = final_end,
            "computed final layout"
        );
        Ok(FinalLayout {
            entries,
            data_len: final_end as u32,
        })
    }

    /// Per entry: whether it sits in a sharing group that has a replacement.
    fn split_sharing_groups(&self) -> Vec<bool> {
        let entries = self.entries();
        let mut split = vec![false; entries.len()];
        let mut group_start = 0;
        let mut group_replaced = false;
        let mut source_end: u64 = 0;
        for (i, entry) in entries.iter().enumerate() {
            if u64::from(entry.offset) >= source_end {
                split[group_start..i].fill(group_replaced);
                group_start = i;
                group_replaced = false;
            }
            group_replaced |= self.has_replacement(entry.id);
            source_end = source_end.max(entry.end());
        }
        split[group_start..].fill(group_replaced);
        split
    }
}
