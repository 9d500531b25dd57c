use std::fmt;

use serde::{Deserialize, Serialize};

/// Four-byte section identifier.
///
/// Tags are raw bytes on disk and are never byte-swapped, whatever the
/// bank's integer byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionTag([u8; 4]);

impl SectionTag {
    /// Bank header.
    pub const BKHD: Self = Self(*b"BKHD");
    /// Data index: one (id, offset, size) triple per media file.
    pub const DIDX: Self = Self(*b"DIDX");
    /// Raw media bytes addressed by the data index.
    pub const DATA: Self = Self(*b"DATA");
    /// Object hierarchy.
    pub const HIRC: Self = Self(*b"HIRC");

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    fn is_printable(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_graphic())
    }
}

impl fmt::Display for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl fmt::Debug for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SectionTag({self})")
    }
}

impl From<[u8; 4]> for SectionTag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}
