use bnk_types::{MediaId, SectionTag};
use thiserror::Error;

/// Coarse classification of a [`BankError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The byte stream does not follow the container framing.
    Format,
    /// The framing is intact but the recorded sizes and offsets disagree.
    Consistency,
    /// The caller asked for something the document cannot do.
    Usage,
    /// The underlying reader or writer failed.
    Io,
}

#[derive(Debug, Error)]
pub enum BankError {
    #[error("section {expected} not found: reached end of input at offset {offset}")]
    MissingSection { expected: SectionTag, offset: u64 },

    #[error("unexpected section at offset {offset}: expected {expected}, found {found}")]
    UnexpectedSection {
        expected: SectionTag,
        found: SectionTag,
        offset: u64,
    },

    #[error("truncated read at offset {offset}: wanted {requested} bytes, {available} available")]
    TruncatedRead {
        offset: u64,
        requested: u64,
        available: u64,
    },

    #[error("section {tag} declares {declared} bytes but its decoder consumed {consumed}")]
    SectionLengthMismatch {
        tag: SectionTag,
        declared: u32,
        consumed: u64,
    },

    #[error("section {tag} payload of {len} bytes does not fit a 32-bit length")]
    SectionTooLarge { tag: SectionTag, len: u64 },

    #[error("corrupt data index: length {length} is not a multiple of 12")]
    CorruptIndex { length: u32 },

    #[error("corrupt data index: entry {index} is at offset {offset}, below the preceding offset {previous}")]
    NonMonotonicOffset {
        index: usize,
        offset: u32,
        previous: u32,
    },

    #[error("duplicate media id {0} in data index")]
    DuplicateResourceId(MediaId),

    #[error("corrupt data section: expected length {expected}, found {actual}")]
    DataSizeMismatch { expected: u64, actual: u32 },

    #[error("media {id} ends at {end}, past the data section length {data_len}")]
    EntryOutOfBounds { id: MediaId, end: u64, data_len: u32 },

    #[error("corrupt object hierarchy: object {index} declares size {size}, smaller than its id field")]
    CorruptObject { index: usize, size: u32 },

    #[error("media {id} no longer fits a 32-bit offset after relayout")]
    LayoutOverflow { id: MediaId },

    #[error("unknown media id: {0}")]
    UnknownResourceId(MediaId),

    #[error("no active replacement for media {0}")]
    NoActiveReplacement(MediaId),

    #[error("no bank loaded")]
    NoSourceLoaded,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BankError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingSection { .. }
            | Self::UnexpectedSection { .. }
            | Self::TruncatedRead { .. }
            | Self::SectionLengthMismatch { .. }
            | Self::SectionTooLarge { .. } => ErrorClass::Format,
            Self::CorruptIndex { .. }
            | Self::NonMonotonicOffset { .. }
            | Self::DuplicateResourceId(_)
            | Self::DataSizeMismatch { .. }
            | Self::EntryOutOfBounds { .. }
            | Self::CorruptObject { .. }
            | Self::LayoutOverflow { .. } => ErrorClass::Consistency,
            Self::UnknownResourceId(_)
            | Self::NoActiveReplacement(_)
            | Self::NoSourceLoaded
            | Self::InvalidConfig(_) => ErrorClass::Usage,
            Self::Io(_) => ErrorClass::Io,
        }
    }
}

pub type BankResult<T> = Result<T, BankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = BankError::UnexpectedSection {
            expected: SectionTag::DIDX,
            found: SectionTag::new(*b"STID"),
            offset: 40,
        };
        assert_eq!(
            err.to_string(),
            "unexpected section at offset 40: expected DIDX, found STID"
        );

        let err = BankError::NonMonotonicOffset {
            index: 3,
            offset: 16,
            previous: 32,
        };
        assert_eq!(
            err.to_string(),
            "corrupt data index: entry 3 is at offset 16, below the preceding offset 32"
        );
    }

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(BankError::CorruptIndex { length: 13 }.class(), ErrorClass::Consistency);
        assert_eq!(BankError::NoSourceLoaded.class(), ErrorClass::Usage);
        assert_eq!(
            BankError::TruncatedRead { offset: 0, requested: 4, available: 0 }.class(),
            ErrorClass::Format
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(BankError::from(io).class(), ErrorClass::Io);
    }
}
