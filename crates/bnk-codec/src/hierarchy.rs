//! The object hierarchy (`HIRC`) section.
//!
//! ```text
//! [4 bytes: object count]
//! per object:
//!   [1 byte : kind code]
//!   [4 bytes: size, counting the id field but not the kind byte]
//!   [4 bytes: object id]
//!   [size - 4 bytes: payload]
//! ```
//!
//! Payloads are kept opaque and re-emitted unchanged. Only `Sound` objects
//! get a typed view, see [`crate::metadata`].

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek, Write};

use bnk_types::{Endian, ObjectId, SectionTag};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::cursor::{BinaryReader, BinaryWriter};
use crate::error::{BankError, BankResult};
use crate::section::SectionBody;

/// Kind byte, size and id.
const OBJECT_HEADER_LEN: u64 = 9;

/// Object kind, keyed by the kind byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Settings,
    Sound,
    EventAction,
    Event,
    RandomSequenceContainer,
    SwitchContainer,
    ActorMixer,
    AudioBus,
    BlendContainer,
    MusicSegment,
    MusicTrack,
    MusicSwitchContainer,
    MusicPlaylistContainer,
    Attenuation,
    DialogueEvent,
    MotionBus,
    MotionFx,
    Effect,
    AuxiliaryBus,
    /// A code missing from the table. The code is kept so it re-encodes
    /// unchanged.
    Unknown(u8),
}

const KIND_TABLE: [(u8, ObjectKind, &str); 19] = [
    (1, ObjectKind::Settings, "Settings"),
    (2, ObjectKind::Sound, "Sound"),
    (3, ObjectKind::EventAction, "EventAction"),
    (4, ObjectKind::Event, "Event"),
    (5, ObjectKind::RandomSequenceContainer, "RandomSequenceContainer"),
    (6, ObjectKind::SwitchContainer, "SwitchContainer"),
    (7, ObjectKind::ActorMixer, "ActorMixer"),
    (8, ObjectKind::AudioBus, "AudioBus"),
    (9, ObjectKind::BlendContainer, "BlendContainer"),
    (10, ObjectKind::MusicSegment, "MusicSegment"),
    (11, ObjectKind::MusicTrack, "MusicTrack"),
    (12, ObjectKind::MusicSwitchContainer, "MusicSwitchContainer"),
    (13, ObjectKind::MusicPlaylistContainer, "MusicPlaylistContainer"),
    (14, ObjectKind::Attenuation, "Attenuation"),
    (15, ObjectKind::DialogueEvent, "DialogueEvent"),
    (16, ObjectKind::MotionBus, "MotionBus"),
    (17, ObjectKind::MotionFx, "MotionFx"),
    (18, ObjectKind::Effect, "Effect"),
    (20, ObjectKind::AuxiliaryBus, "AuxiliaryBus"),
];

impl ObjectKind {
    pub fn from_code(code: u8) -> Self {
        KIND_TABLE
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|(_, kind, _)| *kind)
            .unwrap_or(Self::Unknown(code))
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Unknown(code) => *code,
            known => KIND_TABLE
                .iter()
                .find(|(_, kind, _)| kind == known)
                .map(|(code, _, _)| *code)
                .unwrap_or_default(),
        }
    }

    pub fn name(&self) -> &'static str {
        KIND_TABLE
            .iter()
            .find(|(_, kind, _)| kind == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("Unknown")
    }

    /// Look a kind up by its table name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        KIND_TABLE
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(_, kind, _)| *kind)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code})"),
            known => f.write_str(known.name()),
        }
    }
}

/// One object record. The payload is everything after the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HircObject {
    pub kind: ObjectKind,
    pub id: ObjectId,
    pub payload: Bytes,
}

impl HircObject {
    pub fn new(kind: ObjectKind, id: ObjectId, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            id,
            payload: payload.into(),
        }
    }

    /// The on-disk size field: payload plus the 4-byte id.
    pub fn size(&self) -> u64 {
        self.payload.len() as u64 + 4
    }

    fn record_len(&self) -> u64 {
        OBJECT_HEADER_LEN + self.payload.len() as u64
    }
}

/// Decoded `HIRC` section: objects in file order plus an id lookup.
#[derive(Clone, Debug, Default)]
pub struct ObjectHierarchy {
    objects: Vec<HircObject>,
    positions: HashMap<ObjectId, usize>,
    endian: Endian,
}

impl ObjectHierarchy {
    pub fn new(objects: Vec<HircObject>, endian: Endian) -> Self {
        let positions = objects
            .iter()
            .enumerate()
            .map(|(i, obj)| (obj.id, i))
            .collect();
        Self {
            objects,
            positions,
            endian,
        }
    }

    pub fn objects(&self) -> &[HircObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Byte order the payloads were written in.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Look up an object by id. When an id repeats, the last object with
    /// that id wins.
    pub fn get(&self, id: ObjectId) -> Option<&HircObject> {
        self.positions.get(&id).map(|&i| &self.objects[i])
    }

    /// Kind name of the object with this id.
    pub fn name_of(&self, id: ObjectId) -> Option<&'static str> {
        self.get(id).map(|obj| obj.kind.name())
    }

    pub fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &HircObject> {
        self.objects.iter().filter(move |obj| obj.kind == kind)
    }
}

impl SectionBody for ObjectHierarchy {
    const TAG: SectionTag = SectionTag::HIRC;

    fn decode<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        declared_len: u32,
    ) -> BankResult<Self> {
        let count = reader.read_u32()?;
        // Each record is at least 9 bytes; do not trust the count for
        // preallocation beyond what the section can hold.
        let cap = (count as u64).min(u64::from(declared_len) / OBJECT_HEADER_LEN) as usize;
        let mut objects = Vec::with_capacity(cap);
        for index in 0..count as usize {
            let kind = ObjectKind::from_code(reader.read_u8()?);
            let size = reader.read_u32()?;
            if size < 4 {
                return Err(BankError::CorruptObject { index, size });
            }
            let id = ObjectId::new(reader.read_u32()?);
            let payload = Bytes::from(reader.read_bytes(size as usize - 4)?);
            objects.push(HircObject { kind, id, payload });
        }
        debug!(objects = objects.len(), "decoded object hierarchy");
        Ok(Self::new(objects, reader.endian()))
    }

    fn payload_len(&self) -> u64 {
        4 + self.objects.iter().map(HircObject::record_len).sum::<u64>()
    }

    fn encode<W: Write>(&self, writer: &mut BinaryWriter<W>) -> BankResult<()> {
        writer.write_u32(self.objects.len() as u32)?;
        for obj in &self.objects {
            writer.write_u8(obj.kind.code())?;
            writer.write_u32(obj.size() as u32)?;
            writer.write_u32(obj.id.get())?;
            writer.write_bytes(&obj.payload)?;
        }
        Ok(())
    }
}
