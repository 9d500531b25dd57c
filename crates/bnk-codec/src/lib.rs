//! Soundbank (`.bnk`) container codec.
//!
//! Reads a bank into memory, exposes its embedded media and object
//! hierarchy, queues media replacements, and writes the bank back with every
//! media offset recomputed and re-aligned.
//!
//! # Architecture
//!
//! - **Cursor** ([`BinaryReader`], [`BinaryWriter`]): endian-aware positional I/O
//! - **Section framing** ([`section`]): tag + length envelope shared by all sections
//! - **Resource index** ([`ResourceIndex`]): `DIDX` + `DATA`, lookup and replacements
//! - **Layout** ([`FinalLayout`]): aligned offsets computed at write time
//! - **Hierarchy** ([`ObjectHierarchy`]): `HIRC` objects, kept opaque
//! - **Document** ([`BankDocument`]): the read/replace/write workflow
//!
//! A bank with no pending replacements writes back byte for byte.

pub mod config;
pub mod cursor;
pub mod document;
pub mod error;
pub mod hierarchy;
pub mod index;
pub mod layout;
pub mod metadata;
pub mod section;

pub use config::BankConfig;
pub use cursor::{BinaryReader, BinaryWriter};
pub use document::{Bank, BankDocument, BankSummary};
pub use error::{BankError, BankResult, ErrorClass};
pub use hierarchy::{HircObject, ObjectHierarchy, ObjectKind};
pub use index::{DataIndex, MediaEntry, ResourceIndex};
pub use layout::{FinalLayout, FinalLayoutEntry, DEFAULT_ALIGNMENT};
pub use metadata::{FetchMode, SoundMetadata};

pub use bnk_types::{Endian, MediaId, ObjectId, SectionTag};
