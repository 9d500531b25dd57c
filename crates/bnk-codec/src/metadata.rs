//! Best-effort typed view of `Sound` object payloads.
//!
//! Only the leading fields are read; the rest of the payload is ignored.
//! Decoding never fails a bank read: anything unexpected yields `None`.

use std::io::Cursor;

use bnk_types::{Endian, MediaId, SectionTag};
use serde::Serialize;
use tracing::warn;

use crate::cursor::BinaryReader;
use crate::error::BankResult;
use crate::hierarchy::{HircObject, ObjectKind};

/// Where a sound's media lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Media is in this bank's data section.
    Embedded,
    /// Media is streamed from a loose file.
    Streamed,
    /// The head of the media is embedded, the rest streamed.
    Prefetched,
}

impl FetchMode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Embedded),
            1 => Some(Self::Streamed),
            2 => Some(Self::Prefetched),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SoundMetadata {
    pub plugin: SectionTag,
    pub fetch_mode: FetchMode,
    pub media_id: MediaId,
    pub source_id: u32,
    pub media_offset: u32,
    /// Absent when the payload ends right after the offset.
    pub media_size: Option<u32>,
}

impl HircObject {
    /// Decode the sound fields of this object's payload. Returns `None` for
    /// other kinds and for payloads that do not look like a sound.
    pub fn sound_metadata(&self, endian: Endian) -> Option<SoundMetadata> {
        if self.kind != ObjectKind::Sound {
            return None;
        }
        match decode_sound(&self.payload, endian) {
            Ok(meta) => meta,
            Err(err) => {
                warn!(object = %self.id, error = %err, "sound metadata not decodable");
                None
            }
        }
    }
}

fn decode_sound(payload: &[u8], endian: Endian) -> BankResult<Option<SoundMetadata>> {
    let mut reader = BinaryReader::new(Cursor::new(payload), endian)?;
    let plugin = reader.read_tag()?;
    let code = reader.read_u8()?;
    let Some(fetch_mode) = FetchMode::from_code(code) else {
        warn!(code, "unknown fetch mode");
        return Ok(None);
    };
    let media_id = MediaId::new(reader.read_u32()?);
    let source_id = reader.read_u32()?;
    let media_offset = reader.read_u32()?;
    let media_size = if reader.remaining() >= 4 {
        Some(reader.read_u32()?)
    } else {
        None
    };
    Ok(Some(SoundMetadata {
        plugin,
        fetch_mode,
        media_id,
        source_id,
        media_offset,
        media_size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnk_types::ObjectId;

    fn sound_payload(fetch: u8, ints: &[u32]) -> Vec<u8> {
        let mut p = vec![0x01, 0x00, 0x04, 0x00];
        p.push(fetch);
        for v in ints {
            p.extend_from_slice(&v.to_le_bytes());
        }
        p
    }

    fn sound(payload: Vec<u8>) -> HircObject {
        HircObject::new(ObjectKind::Sound, ObjectId::new(9), payload)
    }

    #[test]
    fn decodes_full_record() {
        let obj = sound(sound_payload(0, &[111, 222, 64, 1000, 0xDEAD]));
        let meta = obj.sound_metadata(Endian::Little).unwrap();
        assert_eq!(meta.plugin, SectionTag::new([0x01, 0x00, 0x04, 0x00]));
        assert_eq!(meta.fetch_mode, FetchMode::Embedded);
        assert_eq!(meta.media_id, MediaId::new(111));
        assert_eq!(meta.source_id, 222);
        assert_eq!(meta.media_offset, 64);
        assert_eq!(meta.media_size, Some(1000));
    }

    #[test]
    fn size_is_optional() {
        let obj = sound(sound_payload(1, &[1, 2, 3]));
        let meta = obj.sound_metadata(Endian::Little).unwrap();
        assert_eq!(meta.fetch_mode, FetchMode::Streamed);
        assert_eq!(meta.media_size, None);
    }

    #[test]
    fn big_endian_fields() {
        let mut p = b"ABCD".to_vec();
        p.push(2);
        for v in [5u32, 6, 7, 8] {
            p.extend_from_slice(&v.to_be_bytes());
        }
        let meta = sound(p).sound_metadata(Endian::Big).unwrap();
        assert_eq!(meta.plugin.to_string(), "ABCD");
        assert_eq!(meta.fetch_mode, FetchMode::Prefetched);
        assert_eq!(meta.media_id, MediaId::new(5));
        assert_eq!(meta.media_size, Some(8));
    }

    #[test]
    fn short_or_odd_payloads_yield_none() {
        assert!(sound(vec![1, 2, 3]).sound_metadata(Endian::Little).is_none());
        assert!(sound(sound_payload(0, &[1])).sound_metadata(Endian::Little).is_none());
        assert!(sound(sound_payload(9, &[1, 2, 3, 4]))
            .sound_metadata(Endian::Little)
            .is_none());
    }

    #[test]
    fn other_kinds_yield_none() {
        let obj = HircObject::new(
            ObjectKind::Event,
            ObjectId::new(1),
            sound_payload(0, &[1, 2, 3, 4]),
        );
        assert!(obj.sound_metadata(Endian::Little).is_none());
    }
}
