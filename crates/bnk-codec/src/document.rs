//! Whole-bank read and write.
//!
//! A [`BankDocument`] is either empty or holds one decoded [`Bank`]. Reads
//! are all-or-nothing: a failure anywhere leaves the document empty.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use bnk_types::{Endian, MediaId, ObjectId, SectionTag};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::config::BankConfig;
use crate::cursor::{BinaryReader, BinaryWriter};
use crate::error::{BankError, BankResult};
use crate::hierarchy::ObjectHierarchy;
use crate::index::{MediaEntry, ResourceIndex};
use crate::layout::FinalLayout;
use crate::metadata::SoundMetadata;
use crate::section::{read_opaque, read_section, write_opaque, write_section};

/// The decoded sections of one bank, in file order.
#[derive(Clone, Debug)]
pub struct Bank {
    header: Bytes,
    resources: ResourceIndex,
    hierarchy: ObjectHierarchy,
    trailing: Bytes,
}

impl Bank {
    pub fn decode<R: Read + Seek>(reader: &mut BinaryReader<R>) -> BankResult<Self> {
        let header = read_opaque(reader, SectionTag::BKHD)?;
        let resources = ResourceIndex::decode(reader)?;
        let hierarchy: ObjectHierarchy = read_section(reader)?;
        let trailing = Bytes::from(reader.read_remaining()?);
        Ok(Self {
            header,
            resources,
            hierarchy,
            trailing,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut BinaryWriter<W>, alignment: u32) -> BankResult<()> {
        write_opaque(writer, SectionTag::BKHD, &self.header)?;
        self.resources.encode(writer, alignment)?;
        write_section(writer, &self.hierarchy)?;
        writer.write_bytes(&self.trailing)?;
        writer.flush()
    }

    /// Opaque `BKHD` payload.
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    pub fn resources(&self) -> &ResourceIndex {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceIndex {
        &mut self.resources
    }

    pub fn hierarchy(&self) -> &ObjectHierarchy {
        &self.hierarchy
    }

    /// Bytes after the hierarchy, kept verbatim.
    pub fn trailing(&self) -> &Bytes {
        &self.trailing
    }
}

/// Section sizes and counts of a loaded bank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BankSummary {
    pub endian: Endian,
    pub header_len: usize,
    pub media_count: usize,
    pub data_len: u64,
    pub object_count: usize,
    pub trailing_len: usize,
    pub pending_replacements: Vec<MediaId>,
}

#[derive(Clone, Debug, Default)]
enum DocumentState {
    #[default]
    Empty,
    Loaded(Box<Bank>),
}

/// An editable bank: read once, queue replacements, write any number of
/// times.
#[derive(Clone, Debug, Default)]
pub struct BankDocument {
    config: BankConfig,
    state: DocumentState,
}

impl BankDocument {
    pub fn new(config: BankConfig) -> Self {
        Self {
            config,
            state: DocumentState::Empty,
        }
    }

    /// Open and read a bank file. The file is closed before this returns.
    pub fn open(path: impl AsRef<Path>, config: BankConfig) -> BankResult<Self> {
        let path = path.as_ref();
        let mut doc = Self::new(config);
        let file = File::open(path)?;
        doc.read(BufReader::new(file))?;
        info!(path = %path.display(), "opened bank");
        Ok(doc)
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, DocumentState::Loaded(_))
    }

    pub fn bank(&self) -> BankResult<&Bank> {
        match &self.state {
            DocumentState::Loaded(bank) => Ok(&**bank),
            DocumentState::Empty => Err(BankError::NoSourceLoaded),
        }
    }

    fn bank_mut(&mut self) -> BankResult<&mut Bank> {
        match &mut self.state {
            DocumentState::Loaded(bank) => Ok(&mut **bank),
            DocumentState::Empty => Err(BankError::NoSourceLoaded),
        }
    }

    /// Decode a bank from `source`, replacing whatever was loaded.
    pub fn read<R: Read + Seek>(&mut self, source: R) -> BankResult<()> {
        self.state = DocumentState::Empty;
        self.config.validate()?;
        let mut reader = BinaryReader::new(source, self.config.endian)?;
        let bank = Bank::decode(&mut reader)?;
        info!(
            media = bank.resources.len(),
            objects = bank.hierarchy.len(),
            trailing = bank.trailing.len(),
            "read bank"
        );
        self.state = DocumentState::Loaded(Box::new(bank));
        Ok(())
    }

    /// Encode the loaded bank, applying pending replacements.
    ///
    /// The output uses the byte order the bank was read with, taken from
    /// this document's config. BKHD and HIRC payloads are carried as opaque
    /// bytes and cannot be swapped, so writing in the other order is not
    /// offered.
    pub fn write<W: Write>(&self, dest: W) -> BankResult<()> {
        let bank = self.bank()?;
        let mut writer = BinaryWriter::new(dest, self.config.endian);
        bank.encode(&mut writer, self.config.alignment)?;
        info!(
            bytes = writer.position(),
            replaced = bank.resources.replacement_count(),
            "wrote bank"
        );
        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> BankResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    /// Encode and write to `path`. The file is only created once encoding
    /// has succeeded.
    pub fn save(&self, path: impl AsRef<Path>) -> BankResult<()> {
        let bytes = self.to_bytes()?;
        let path = path.as_ref();
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        info!(path = %path.display(), bytes = bytes.len(), "saved bank");
        Ok(())
    }

    /// Media entries in on-disk order.
    pub fn entries(&self) -> BankResult<&[MediaEntry]> {
        Ok(self.bank()?.resources.entries())
    }

    /// Original bytes of a media entry.
    pub fn get(&self, id: MediaId) -> BankResult<Bytes> {
        self.bank()?.resources.get(id)
    }

    /// Bytes the next write will emit for `id`.
    pub fn resolve(&self, id: MediaId) -> BankResult<Bytes> {
        self.bank()?.resources.resolve(id)
    }

    pub fn set_replacement(
        &mut self,
        id: MediaId,
        bytes: impl Into<Bytes>,
    ) -> BankResult<Option<Bytes>> {
        self.bank_mut()?.resources.set_replacement(id, bytes)
    }

    pub fn clear_replacement(&mut self, id: MediaId) -> BankResult<Bytes> {
        self.bank_mut()?.resources.clear_replacement(id)
    }

    /// The layout a write would produce right now.
    pub fn final_layout(&self) -> BankResult<FinalLayout> {
        self.bank()?
            .resources
            .compute_final_layout(self.config.alignment)
    }

    pub fn hierarchy(&self) -> BankResult<&ObjectHierarchy> {
        Ok(&self.bank()?.hierarchy)
    }

    /// Typed view of a `Sound` object. `None` when metadata decoding is
    /// disabled, the id is unknown, or the payload is not recognised.
    pub fn sound_metadata(&self, id: ObjectId) -> BankResult<Option<SoundMetadata>> {
        if !self.config.decode_metadata {
            return Ok(None);
        }
        let hierarchy = &self.bank()?.hierarchy;
        Ok(hierarchy
            .get(id)
            .and_then(|obj| obj.sound_metadata(hierarchy.endian())))
    }

    pub fn summary(&self) -> BankResult<BankSummary> {
        let bank = self.bank()?;
        Ok(BankSummary {
            endian: self.config.endian,
            header_len: bank.header.len(),
            media_count: bank.resources.len(),
            data_len: bank.resources.data_len(),
            object_count: bank.hierarchy.len(),
            trailing_len: bank.trailing.len(),
            pending_replacements: bank.resources.replaced_ids().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Media at 16-aligned offsets, one `Sound` object, and a trailer.
    fn fixture(media: &[(u32, &[u8])], endian: Endian) -> Vec<u8> {
        let mut w = BinaryWriter::new(Vec::new(), endian);
        w.write_tag(SectionTag::BKHD).unwrap();
        w.write_u32(8).unwrap();
        w.write_bytes(b"\x8c\0\0\0\x01\0\0\0").unwrap();

        let mut data = Vec::new();
        let mut records = Vec::new();
        for (id, bytes) in media {
            let offset = (data.len() + 15) / 16 * 16;
            data.resize(offset, 0);
            records.push((*id, offset as u32, bytes.len() as u32));
            data.extend_from_slice(bytes);
        }
        w.write_tag(SectionTag::DIDX).unwrap();
        w.write_u32(records.len() as u32 * 12).unwrap();
        for (id, offset, size) in records {
            w.write_u32(id).unwrap();
            w.write_u32(offset).unwrap();
            w.write_u32(size).unwrap();
        }
        w.write_tag(SectionTag::DATA).unwrap();
        w.write_u32(data.len() as u32).unwrap();
        w.write_bytes(&data).unwrap();

        w.write_tag(SectionTag::HIRC).unwrap();
        w.write_u32(4 + 9 + 21).unwrap();
        w.write_u32(1).unwrap();
        w.write_u8(2).unwrap();
        w.write_u32(4 + 21).unwrap();
        w.write_u32(500).unwrap();
        w.write_bytes(&[1, 0, 4, 0]).unwrap();
        w.write_u8(0).unwrap();
        for v in [media.first().map(|m| m.0).unwrap_or(0), 77, 0, 10] {
            w.write_u32(v).unwrap();
        }
        w.write_bytes(b"STIDtail").unwrap();
        w.into_inner()
    }

    /// Media 1 and 2 share bytes 0..8, media 3 sits alone at 16.
    fn shared_fixture() -> Vec<u8> {
        let mut w = BinaryWriter::new(Vec::new(), Endian::Little);
        w.write_tag(SectionTag::BKHD).unwrap();
        w.write_u32(8).unwrap();
        w.write_bytes(b"\x8c\0\0\0\x01\0\0\0").unwrap();
        w.write_tag(SectionTag::DIDX).unwrap();
        w.write_u32(36).unwrap();
        for (id, offset, size) in [(1u32, 0u32, 8u32), (2, 0, 8), (3, 16, 4)] {
            w.write_u32(id).unwrap();
            w.write_u32(offset).unwrap();
            w.write_u32(size).unwrap();
        }
        let mut data = vec![0xAA; 8];
        data.resize(16, 0);
        data.extend_from_slice(&[0xCC; 4]);
        w.write_tag(SectionTag::DATA).unwrap();
        w.write_u32(data.len() as u32).unwrap();
        w.write_bytes(&data).unwrap();
        w.write_tag(SectionTag::HIRC).unwrap();
        w.write_u32(4).unwrap();
        w.write_u32(0).unwrap();
        w.into_inner()
    }

    fn load(bytes: &[u8], endian: Endian) -> BankDocument {
        let mut doc = BankDocument::new(BankConfig::with_endian(endian));
        doc.read(Cursor::new(bytes.to_vec())).unwrap();
        doc
    }

    #[test]
    fn empty_document_refuses_work() {
        let mut doc = BankDocument::default();
        assert!(!doc.is_loaded());
        assert!(matches!(doc.write(Vec::new()), Err(BankError::NoSourceLoaded)));
        assert!(matches!(doc.get(MediaId::new(1)), Err(BankError::NoSourceLoaded)));
        assert!(matches!(
            doc.set_replacement(MediaId::new(1), vec![1]),
            Err(BankError::NoSourceLoaded)
        ));
        assert!(matches!(doc.summary(), Err(BankError::NoSourceLoaded)));
    }

    #[test]
    fn roundtrip_is_identical() {
        let bytes = fixture(&[(1, b"first media"), (2, b"second"), (3, &[9; 33])], Endian::Little);
        let doc = load(&bytes, Endian::Little);
        assert_eq!(doc.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn roundtrip_big_endian() {
        let bytes = fixture(&[(10, b"abc"), (11, b"defgh")], Endian::Big);
        let doc = load(&bytes, Endian::Big);
        assert_eq!(doc.get(MediaId::new(11)).unwrap(), Bytes::from_static(b"defgh"));
        assert_eq!(doc.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn untouched_shared_media_roundtrips() {
        let bytes = shared_fixture();
        let doc = load(&bytes, Endian::Little);
        assert_eq!(doc.get(MediaId::new(1)).unwrap(), doc.get(MediaId::new(2)).unwrap());
        assert_eq!(doc.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn shrinking_shared_media_leaves_its_twin_alone() {
        let mut doc = load(&shared_fixture(), Endian::Little);
        doc.set_replacement(MediaId::new(1), vec![0x11; 4]).unwrap();
        let reread = load(&doc.to_bytes().unwrap(), Endian::Little);
        assert_eq!(&reread.get(MediaId::new(1)).unwrap()[..], &[0x11; 4]);
        assert_eq!(&reread.get(MediaId::new(2)).unwrap()[..], &[0xAA; 8]);
        assert_eq!(&reread.get(MediaId::new(3)).unwrap()[..], &[0xCC; 4]);
    }

    #[test]
    fn growing_shared_media_leaves_its_twin_alone() {
        let mut doc = load(&shared_fixture(), Endian::Little);
        doc.set_replacement(MediaId::new(2), vec![0x22; 100]).unwrap();
        let reread = load(&doc.to_bytes().unwrap(), Endian::Little);
        assert_eq!(&reread.get(MediaId::new(1)).unwrap()[..], &[0xAA; 8]);
        assert_eq!(&reread.get(MediaId::new(2)).unwrap()[..], &[0x22; 100]);
        assert_eq!(&reread.get(MediaId::new(3)).unwrap()[..], &[0xCC; 4]);
        let offsets: Vec<u32> = reread.entries().unwrap().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 16, 128]);
    }

    #[test]
    fn sections_are_exposed() {
        let bytes = fixture(&[(1, b"aa"), (2, b"bbb")], Endian::Little);
        let doc = load(&bytes, Endian::Little);
        let bank = doc.bank().unwrap();
        assert_eq!(bank.header().len(), 8);
        assert_eq!(&bank.trailing()[..], b"STIDtail");
        assert_eq!(doc.entries().unwrap().len(), 2);

        let summary = doc.summary().unwrap();
        assert_eq!(summary.media_count, 2);
        assert_eq!(summary.data_len, 19);
        assert_eq!(summary.object_count, 1);
        assert_eq!(summary.trailing_len, 8);
        assert!(summary.pending_replacements.is_empty());
    }

    #[test]
    fn failed_read_leaves_document_empty() {
        let good = fixture(&[(1, b"aa")], Endian::Little);
        let mut doc = load(&good, Endian::Little);
        assert!(doc.is_loaded());

        let truncated = &good[..good.len() - 40];
        assert!(doc.read(Cursor::new(truncated.to_vec())).is_err());
        assert!(!doc.is_loaded());
        assert!(matches!(doc.bank(), Err(BankError::NoSourceLoaded)));
    }

    #[test]
    fn wrong_endian_fails_cleanly() {
        let bytes = fixture(&[(1, b"aa")], Endian::Little);
        let mut doc = BankDocument::new(BankConfig::with_endian(Endian::Big));
        assert!(doc.read(Cursor::new(bytes)).is_err());
        assert!(!doc.is_loaded());
    }

    #[test]
    fn replacement_changes_output_only_for_that_entry() {
        let bytes = fixture(&[(1, &[1; 10]), (2, &[2; 5])], Endian::Little);
        let mut doc = load(&bytes, Endian::Little);
        doc.set_replacement(MediaId::new(1), vec![7u8; 20]).unwrap();
        assert_eq!(doc.summary().unwrap().pending_replacements, vec![MediaId::new(1)]);

        let out = doc.to_bytes().unwrap();
        let back = load(&out, Endian::Little);
        assert_eq!(back.get(MediaId::new(1)).unwrap(), Bytes::from(vec![7u8; 20]));
        assert_eq!(back.get(MediaId::new(2)).unwrap(), Bytes::from(vec![2u8; 5]));
        let e2 = back.entries().unwrap()[1];
        assert_eq!((e2.offset, e2.size), (32, 5));

        // The source document is untouched and can be written again.
        assert_eq!(doc.get(MediaId::new(1)).unwrap(), Bytes::from(vec![1u8; 10]));
        assert_eq!(doc.to_bytes().unwrap(), out);

        doc.clear_replacement(MediaId::new(1)).unwrap();
        assert_eq!(doc.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn sound_metadata_respects_config() {
        let bytes = fixture(&[(42, b"media")], Endian::Little);
        let doc = load(&bytes, Endian::Little);
        let meta = doc.sound_metadata(ObjectId::new(500)).unwrap().unwrap();
        assert_eq!(meta.media_id, MediaId::new(42));
        assert_eq!(meta.source_id, 77);
        assert_eq!(meta.media_size, Some(10));
        assert!(doc.sound_metadata(ObjectId::new(1)).unwrap().is_none());

        let mut off = BankDocument::new(BankConfig {
            decode_metadata: false,
            ..BankConfig::default()
        });
        off.read(Cursor::new(bytes)).unwrap();
        assert!(off.sound_metadata(ObjectId::new(500)).unwrap().is_none());
    }

    #[test]
    fn invalid_config_is_rejected_on_read() {
        let bytes = fixture(&[(1, b"a")], Endian::Little);
        let mut doc = BankDocument::new(BankConfig {
            alignment: 3,
            ..BankConfig::default()
        });
        assert!(matches!(
            doc.read(Cursor::new(bytes)),
            Err(BankError::InvalidConfig(_))
        ));
    }
}
