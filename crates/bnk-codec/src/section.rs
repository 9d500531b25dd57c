//! Section framing shared by every part of a bank.
//!
//! On-disk format:
//! ```text
//! [4 bytes: tag (raw ASCII, never byte-swapped)]
//! [4 bytes: payload length (bank byte order)]
//! [N bytes: payload]
//! ```
//!
//! Opaque sections are read as a byte blob. Structured sections implement
//! [`SectionBody`] and decode their own payload; the framing checks that the
//! decoder consumed exactly the declared length.

use std::io::{Read, Seek, Write};

use bytes::Bytes;
use bnk_types::SectionTag;
use tracing::debug;

use crate::cursor::{BinaryReader, BinaryWriter};
use crate::error::{BankError, BankResult};

/// Tag plus length.
pub const FRAME_HEADER_LEN: u64 = 8;

/// A section payload that knows how to decode and encode itself.
pub trait SectionBody: Sized {
    const TAG: SectionTag;

    /// Decode the payload. The reader is positioned on its first byte and
    /// `declared_len` bytes belong to this section.
    fn decode<R: Read + Seek>(reader: &mut BinaryReader<R>, declared_len: u32)
        -> BankResult<Self>;

    /// Number of payload bytes [`encode`](Self::encode) will write.
    fn payload_len(&self) -> u64;

    fn encode<W: Write>(&self, writer: &mut BinaryWriter<W>) -> BankResult<()>;
}

/// Read a section tag, check it, and return the declared payload length.
pub fn read_frame_header<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    expected: SectionTag,
) -> BankResult<u32> {
    let offset = reader.position();
    if reader.is_at_end() {
        return Err(BankError::MissingSection { expected, offset });
    }
    let found = reader.read_tag()?;
    if found != expected {
        return Err(BankError::UnexpectedSection {
            expected,
            found,
            offset,
        });
    }
    let len = reader.read_u32()?;
    debug!(tag = %expected, offset, len, "section header");
    Ok(len)
}

/// Read a whole section as an opaque payload.
pub fn read_opaque<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    expected: SectionTag,
) -> BankResult<Bytes> {
    let len = read_frame_header(reader, expected)?;
    Ok(Bytes::from(reader.read_bytes(len as usize)?))
}

/// Read a structured section through its [`SectionBody`] decoder.
pub fn read_section<B: SectionBody, R: Read + Seek>(
    reader: &mut BinaryReader<R>,
) -> BankResult<B> {
    let declared = read_frame_header(reader, B::TAG)?;
    let start = reader.position();
    let body = B::decode(reader, declared)?;
    let consumed = reader.position() - start;
    if consumed != u64::from(declared) {
        return Err(BankError::SectionLengthMismatch {
            tag: B::TAG,
            declared,
            consumed,
        });
    }
    Ok(body)
}

/// Write the tag and a length that must fit in 32 bits.
pub fn write_frame_header<W: Write>(
    writer: &mut BinaryWriter<W>,
    tag: SectionTag,
    len: u64,
) -> BankResult<()> {
    let len32 = u32::try_from(len).map_err(|_| BankError::SectionTooLarge { tag, len })?;
    writer.write_tag(tag)?;
    writer.write_u32(len32)
}

pub fn write_opaque<W: Write>(
    writer: &mut BinaryWriter<W>,
    tag: SectionTag,
    payload: &[u8],
) -> BankResult<()> {
    write_frame_header(writer, tag, payload.len() as u64)?;
    writer.write_bytes(payload)
}

/// Write a structured section, taking its length from the body's own
/// accounting.
pub fn write_section<B: SectionBody, W: Write>(
    writer: &mut BinaryWriter<W>,
    body: &B,
) -> BankResult<()> {
    let len = body.payload_len();
    write_frame_header(writer, B::TAG, len)?;
    let start = writer.position();
    body.encode(writer)?;
    let written = writer.position() - start;
    if written != len {
        return Err(BankError::SectionLengthMismatch {
            tag: B::TAG,
            declared: len as u32,
            consumed: written,
        });
    }
    Ok(())
}
