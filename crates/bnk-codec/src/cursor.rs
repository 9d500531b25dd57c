//! Endian-aware positional reader and writer.
//!
//! Both sides work over any `std::io` stream: a `File`, a `BufReader`, or an
//! in-memory `std::io::Cursor`. Short reads are never passed through: asking
//! for more bytes than the source holds fails with
//! [`BankError::TruncatedRead`] before anything is consumed.

use std::io::{self, Read, Seek, SeekFrom, Write};

use bnk_types::{Endian, SectionTag};

use crate::error::{BankError, BankResult};

/// Positional reader with a byte order fixed at construction.
#[derive(Debug)]
pub struct BinaryReader<R> {
    inner: R,
    endian: Endian,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> BinaryReader<R> {
    /// Wrap a seekable source. The cursor starts wherever the source is
    /// currently positioned.
    pub fn new(mut inner: R, endian: Endian) -> BankResult<Self> {
        let pos = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;
        Ok(Self {
            inner,
            endian,
            pos,
            len,
        })
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Total length of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute position. Seeking past the end is allowed; the
    /// next read will fail.
    pub fn seek(&mut self, pos: u64) -> BankResult<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> BankResult<Vec<u8>> {
        self.ensure(n as u64)?;
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(|e| self.map_eof(e, n as u64))?;
        self.pos += n as u64;
        Ok(buf)
    }

    /// Read everything from the current position to the end of the source.
    pub fn read_remaining(&mut self) -> BankResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.remaining() as usize);
        self.inner.read_to_end(&mut buf)?;
        self.pos += buf.len() as u64;
        Ok(buf)
    }

    /// Read `n` raw bytes as text. Bytes outside UTF-8 are replaced rather
    /// than rejected.
    pub fn read_fixed_string(&mut self, n: usize) -> BankResult<String> {
        let bytes = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn read_tag(&mut self) -> BankResult<SectionTag> {
        let mut buf = [0u8; 4];
        self.read_array(&mut buf)?;
        Ok(SectionTag::new(buf))
    }

    pub fn read_u8(&mut self) -> BankResult<u8> {
        let mut buf = [0u8; 1];
        self.read_array(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u32(&mut self) -> BankResult<u32> {
        let mut buf = [0u8; 4];
        self.read_array(&mut buf)?;
        Ok(self.endian.u32_from_bytes(buf))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array(&mut self, buf: &mut [u8]) -> BankResult<()> {
        let n = buf.len() as u64;
        self.ensure(n)?;
        self.inner.read_exact(buf).map_err(|e| self.map_eof(e, n))?;
        self.pos += n;
        Ok(())
    }

    fn ensure(&self, n: u64) -> BankResult<()> {
        if n > self.remaining() {
            return Err(BankError::TruncatedRead {
                offset: self.pos,
                requested: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn map_eof(&self, err: io::Error, requested: u64) -> BankError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            BankError::TruncatedRead {
                offset: self.pos,
                requested,
                available: self.remaining(),
            }
        } else {
            err.into()
        }
    }
}

/// Positional writer mirroring [`BinaryReader`].
#[derive(Debug)]
pub struct BinaryWriter<W> {
    inner: W,
    endian: Endian,
    pos: u64,
}

impl<W: Write> BinaryWriter<W> {
    /// Wrap a sink. Positions are counted from the first byte written
    /// through this writer.
    pub fn new(inner: W, endian: Endian) -> Self {
        Self {
            inner,
            endian,
            pos: 0,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> BankResult<()> {
        self.inner.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write the raw bytes of `text` with no length prefix or terminator.
    pub fn write_fixed_string(&mut self, text: &str) -> BankResult<()> {
        self.write_bytes(text.as_bytes())
    }

    pub fn write_tag(&mut self, tag: SectionTag) -> BankResult<()> {
        self.write_bytes(tag.as_bytes())
    }

    pub fn write_u8(&mut self, value: u8) -> BankResult<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u32(&mut self, value: u32) -> BankResult<()> {
        let bytes = self.endian.u32_to_bytes(value);
        self.write_bytes(&bytes)
    }

    /// Append `n` zero bytes.
    pub fn write_zeros(&mut self, n: u64) -> BankResult<()> {
        io::copy(&mut io::repeat(0).take(n), &mut self.inner)?;
        self.pos += n;
        Ok(())
    }

    pub fn flush(&mut self) -> BankResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> BinaryWriter<W> {
    /// Move to an absolute position (relative to where this writer started).
    pub fn seek(&mut self, pos: u64) -> BankResult<()> {
        let delta = pos as i64 - self.pos as i64;
        self.inner.seek(SeekFrom::Current(delta))?;
        self.pos = pos;
        Ok(())
    }
}
