//! Foundation types for soundbank tooling.
//!
//! Every other `bnk-*` crate depends on `bnk-types`. The types here are plain
//! values: they carry no I/O and no knowledge of the container layout beyond
//! the names of its sections.
//!
//! # Key Types
//!
//! - [`MediaId`]: id of an embedded audio sub-resource in the data index
//! - [`ObjectId`]: id of an object in the object hierarchy
//! - [`SectionTag`]: 4-byte section identifier (`BKHD`, `DIDX`, ...)
//! - [`Endian`]: byte order of every integer field in a bank

pub mod endian;
pub mod error;
pub mod id;
pub mod tag;

pub use endian::Endian;
pub use error::TypeError;
pub use id::{MediaId, ObjectId};
pub use tag::SectionTag;
