//! The data index (`DIDX`) and the raw media section (`DATA`).
//!
//! `DIDX` layout: `N × [id: u32][offset: u32][size: u32]`, offsets relative
//! to the first byte of the `DATA` payload and non-decreasing in stored
//! order. `DATA` holds the media bytes; its declared length equals the end of
//! the last indexed entry.
//!
//! The [`ResourceIndex`] keeps the entries exactly as read plus a separate map
//! of pending replacements. Nothing is recomputed until a write asks for a
//! [`FinalLayout`](crate::layout::FinalLayout).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Seek, Write};

use bnk_types::{MediaId, SectionTag};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::cursor::{BinaryReader, BinaryWriter};
use crate::error::{BankError, BankResult};
use crate::section::{
    read_frame_header, read_section, write_frame_header, write_section, SectionBody,
};

/// Bytes per index record.
pub const INDEX_RECORD_LEN: u32 = 12;

/// One record of the data index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MediaEntry {
    pub id: MediaId,
    /// Relative to the start of the `DATA` payload.
    pub offset: u32,
    pub size: u32,
}

impl MediaEntry {
    pub fn new(id: MediaId, offset: u32, size: u32) -> Self {
        Self { id, offset, size }
    }

    /// One past the last byte of this entry.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// Decoded `DIDX` payload, in on-disk order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataIndex {
    pub entries: Vec<MediaEntry>,
}

impl SectionBody for DataIndex {
    const TAG: SectionTag = SectionTag::DIDX;

    fn decode<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        declared_len: u32,
    ) -> BankResult<Self> {
        if declared_len % INDEX_RECORD_LEN != 0 {
            return Err(BankError::CorruptIndex {
                length: declared_len,
            });
        }
        let count = (declared_len / INDEX_RECORD_LEN) as usize;
        let mut entries: Vec<MediaEntry> = Vec::with_capacity(count);
        let mut seen = HashSet::with_capacity(count);

        for index in 0..count {
            let id = MediaId::new(reader.read_u32()?);
            let offset = reader.read_u32()?;
            let size = reader.read_u32()?;

            if let Some(previous) = entries.last() {
                if offset < previous.offset {
                    return Err(BankError::NonMonotonicOffset {
                        index,
                        offset,
                        previous: previous.offset,
                    });
                }
            }
            if !seen.insert(id) {
                return Err(BankError::DuplicateResourceId(id));
            }
            entries.push(MediaEntry::new(id, offset, size));
        }

        Ok(Self { entries })
    }

    fn payload_len(&self) -> u64 {
        self.entries.len() as u64 * u64::from(INDEX_RECORD_LEN)
    }

    fn encode<W: Write>(&self, writer: &mut BinaryWriter<W>) -> BankResult<()> {
        for entry in &self.entries {
            writer.write_u32(entry.id.get())?;
            writer.write_u32(entry.offset)?;
            writer.write_u32(entry.size)?;
        }
        Ok(())
    }
}

/// Media entries of a loaded bank, their bytes, and pending replacements.
#[derive(Clone, Debug, Default)]
pub struct ResourceIndex {
    entries: Vec<MediaEntry>,
    positions: HashMap<MediaId, usize>,
    /// The whole `DATA` payload; entry bytes are slices of it.
    data: Bytes,
    /// Absolute source position of the first `DATA` payload byte.
    data_base: u64,
    replacements: BTreeMap<MediaId, Bytes>,
}

impl ResourceIndex {
    /// Decode `DIDX` followed by `DATA`.
    pub fn decode<R: Read + Seek>(reader: &mut BinaryReader<R>) -> BankResult<Self> {
        let DataIndex { entries } = read_section(reader)?;

        let data_len = read_frame_header(reader, SectionTag::DATA)?;
        let expected = entries.last().map(MediaEntry::end).unwrap_or(0);
        if u64::from(data_len) != expected {
            return Err(BankError::DataSizeMismatch {
                expected,
                actual: data_len,
            });
        }
        if let Some(entry) = entries.iter().find(|e| e.end() > u64::from(data_len)) {
            return Err(BankError::EntryOutOfBounds {
                id: entry.id,
                end: entry.end(),
                data_len,
            });
        }

        let data_base = reader.position();
        let data = Bytes::from(reader.read_bytes(data_len as usize)?);
        debug!(media = entries.len(), data_base, data_len, "decoded media index");

        Ok(Self::from_parts(entries, data, data_base))
    }

    /// Build an index over an in-memory `DATA` payload. Entries must already
    /// satisfy the on-disk invariants.
    pub(crate) fn from_parts(entries: Vec<MediaEntry>, data: Bytes, data_base: u64) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        Self {
            entries,
            positions,
            data,
            data_base,
            replacements: BTreeMap::new(),
        }
    }

    /// Write `DIDX` and `DATA` using a freshly computed layout.
    ///
    /// The layout is dropped before returning; the entries and replacements
    /// are left as they were so the same index can be written again.
    pub fn encode<W: Write>(
        &self,
        writer: &mut BinaryWriter<W>,
        alignment: u32,
    ) -> BankResult<()> {
        let layout = self.compute_final_layout(alignment)?;
        write_section(writer, &layout.to_data_index())?;
        write_frame_header(writer, SectionTag::DATA, u64::from(layout.data_len()))?;
        layout.write_data(writer)
    }

    /// Entries in on-disk order.
    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: MediaId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn entry(&self, id: MediaId) -> BankResult<&MediaEntry> {
        self.positions
            .get(&id)
            .map(|&i| &self.entries[i])
            .ok_or(BankError::UnknownResourceId(id))
    }

    /// Absolute source position of the `DATA` payload.
    pub fn data_base(&self) -> u64 {
        self.data_base
    }

    /// Declared length of the source `DATA` payload.
    pub fn data_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Original bytes of a media entry, ignoring any replacement.
    pub fn get(&self, id: MediaId) -> BankResult<Bytes> {
        let entry = self.entry(id)?;
        Ok(self.original_bytes(entry))
    }

    /// Bytes that a write would emit for `id`: the replacement if one is
    /// active, the original otherwise.
    pub fn resolve(&self, id: MediaId) -> BankResult<Bytes> {
        let entry = self.entry(id)?;
        Ok(self
            .replacements
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.original_bytes(entry)))
    }

    /// Queue `bytes` to replace media `id` on the next write. Returns the
    /// replacement it supersedes, if any.
    pub fn set_replacement(
        &mut self,
        id: MediaId,
        bytes: impl Into<Bytes>,
    ) -> BankResult<Option<Bytes>> {
        self.entry(id)?;
        let bytes = bytes.into();
        debug!(%id, size = bytes.len(), "replacement set");
        Ok(self.replacements.insert(id, bytes))
    }

    /// Drop the pending replacement for `id` and return its bytes.
    pub fn clear_replacement(&mut self, id: MediaId) -> BankResult<Bytes> {
        self.entry(id)?;
        let removed = self
            .replacements
            .remove(&id)
            .ok_or(BankError::NoActiveReplacement(id))?;
        debug!(%id, "replacement cleared");
        Ok(removed)
    }

    pub fn replacement(&self, id: MediaId) -> Option<&Bytes> {
        self.replacements.get(&id)
    }

    pub fn has_replacement(&self, id: MediaId) -> bool {
        self.replacements.contains_key(&id)
    }

    /// Ids with a pending replacement, ascending.
    pub fn replaced_ids(&self) -> impl Iterator<Item = MediaId> + '_ {
        self.replacements.keys().copied()
    }

    pub fn replacement_count(&self) -> usize {
        self.replacements.len()
    }

    pub(crate) fn original_bytes(&self, entry: &MediaEntry) -> Bytes {
        // Bounds were checked against the payload length on decode.
        let start = entry.offset as usize;
        self.data.slice(start..start + entry.size as usize)
    }
}
