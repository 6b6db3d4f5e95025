pub mod archive;
pub mod arsc;
pub mod axml;
pub mod chunk;

#[cfg(test)]
pub(crate) mod fixtures;

pub use archive::{ArchiveExtractor, ExtractedPackage};
pub use arsc::{ResourceTable, ResourceValue};
pub use axml::{AttributeValue, Manifest};
