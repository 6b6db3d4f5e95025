//! Decoder for the compiled resource table (`resources.arsc`).

use crate::apk::chunk::{
    read_u16_at, read_u32_at, read_u8_at, slice, value_type, ChunkHeader, ResValue, StringPool,
    RES_STRING_POOL_TYPE, RES_TABLE_PACKAGE_TYPE, RES_TABLE_TYPE, RES_TABLE_TYPE_TYPE,
};
use crate::error::DecodeError;

const NO_ENTRY: u32 = 0xFFFF_FFFF;
const NO_ENTRY_16: u16 = 0xFFFF;

const FLAG_SPARSE: u8 = 0x01;
const FLAG_OFFSET16: u8 = 0x02;

const ENTRY_FLAG_COMPLEX: u16 = 0x0001;
const ENTRY_FLAG_COMPACT: u16 = 0x0008;

/// Reference chains longer than this are treated as unresolvable.
const MAX_REFERENCE_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceValue {
    String(String),
    Reference(u32),
    Scalar { data_type: u8, data: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub id: u32,
    pub type_name: String,
    pub key: String,
    pub value: ResourceValue,
    /// True when the entry belongs to the unqualified (default) configuration.
    pub default_config: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePackage {
    pub id: u32,
    pub name: String,
    pub entries: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTable {
    packages: Vec<ResourcePackage>,
}

impl ResourceTable {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let root = ChunkHeader::parse(data, 0)?.ensure_type(RES_TABLE_TYPE)?;

        let mut values: Option<StringPool> = None;
        let mut packages = Vec::new();

        for chunk in root.children(data) {
            let chunk = chunk?;
            match chunk.chunk_type {
                RES_STRING_POOL_TYPE => values = Some(StringPool::parse(data, &chunk)?),
                RES_TABLE_PACKAGE_TYPE => {
                    let values = values.as_ref().ok_or_else(|| {
                        DecodeError::InvalidString("package before value string pool".to_string())
                    })?;
                    packages.push(parse_package(data, &chunk, values)?);
                }
                _ => {}
            }
        }

        Ok(Self { packages })
    }

    pub fn packages(&self) -> &[ResourcePackage] {
        &self.packages
    }

    pub fn package(&self, name: &str) -> Option<&ResourcePackage> {
        self.packages.iter().find(|package| package.name == name)
    }

    /// String resource `key` of `package`, preferring the default configuration.
    /// Aliases (`@string/other`) are followed to the string they name.
    pub fn string(&self, package: &str, key: &str) -> Option<&str> {
        let package = self.package(package)?;
        let mut candidates = package
            .entries
            .iter()
            .filter(|entry| entry.type_name == "string" && entry.key == key)
            .filter_map(|entry| {
                let value = match &entry.value {
                    ResourceValue::String(value) => Some(value.as_str()),
                    ResourceValue::Reference(id) => self.resolve_reference(*id),
                    ResourceValue::Scalar { .. } => None,
                }?;
                Some((entry.default_config, value))
            });

        let first = candidates.next()?;
        if first.0 {
            return Some(first.1);
        }
        Some(
            candidates
                .find(|(default_config, _)| *default_config)
                .unwrap_or(first)
                .1,
        )
    }

    /// Follows `id` (and any references it points at) down to a string value.
    pub fn resolve_reference(&self, id: u32) -> Option<&str> {
        let mut current = id;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match &self.lookup(current)?.value {
                ResourceValue::String(value) => return Some(value),
                ResourceValue::Reference(next) => current = *next,
                ResourceValue::Scalar { .. } => return None,
            }
        }
        None
    }

    fn lookup(&self, id: u32) -> Option<&ResourceEntry> {
        let package_id = id >> 24;
        let package = self.packages.iter().find(|p| p.id == package_id)?;
        let mut matches = package.entries.iter().filter(|entry| entry.id == id);
        let first = matches.next()?;
        if first.default_config {
            return Some(first);
        }
        Some(matches.find(|entry| entry.default_config).unwrap_or(first))
    }
}

fn parse_package(
    data: &[u8],
    chunk: &ChunkHeader,
    values: &StringPool,
) -> Result<ResourcePackage, DecodeError> {
    let base = chunk.offset;
    let id = read_u32_at(data, base + 8)?;

    let name_bytes = slice(data, base + 12, 256)?;
    let units: Vec<u16> = name_bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    let name = String::from_utf16_lossy(&units);

    let type_strings = read_u32_at(data, base + 268)? as usize;
    let key_strings = read_u32_at(data, base + 276)? as usize;
    let types = nested_pool(data, base, type_strings)?;
    let keys = nested_pool(data, base, key_strings)?;

    let pools = PackagePools {
        package_id: id,
        values,
        types: &types,
        keys: &keys,
    };

    let mut entries = Vec::new();
    for child in chunk.children(data) {
        let child = child?;
        if child.chunk_type == RES_TABLE_TYPE_TYPE {
            pools.parse_type(data, &child, &mut entries)?;
        }
    }

    Ok(ResourcePackage { id, name, entries })
}

fn nested_pool(data: &[u8], base: usize, offset: usize) -> Result<StringPool, DecodeError> {
    if offset == 0 {
        return Ok(StringPool::default());
    }
    let header = ChunkHeader::parse(data, base + offset)?;
    StringPool::parse(data, &header)
}

struct PackagePools<'a> {
    package_id: u32,
    values: &'a StringPool,
    types: &'a StringPool,
    keys: &'a StringPool,
}

impl PackagePools<'_> {
    fn parse_type(
        &self,
        data: &[u8],
        chunk: &ChunkHeader,
        entries: &mut Vec<ResourceEntry>,
    ) -> Result<(), DecodeError> {
        let base = chunk.offset;
        let type_id = read_u8_at(data, base + 8)?;
        let flags = read_u8_at(data, base + 9)?;
        let entry_count = read_u32_at(data, base + 12)? as usize;
        let entries_start = base + read_u32_at(data, base + 16)? as usize;

        let config_size = read_u32_at(data, base + 20)? as usize;
        let config = slice(data, base + 24, config_size.saturating_sub(4))?;
        let default_config = config.iter().all(|byte| *byte == 0);

        let type_name = self
            .types
            .get(u32::from(type_id).saturating_sub(1))
            .unwrap_or_default()
            .to_string();

        let offsets_start = chunk.body_start();
        for slot in 0..entry_count {
            let located = if flags & FLAG_SPARSE != 0 {
                let index = read_u16_at(data, offsets_start + slot * 4)?;
                let offset = read_u16_at(data, offsets_start + slot * 4 + 2)?;
                Some((u32::from(index), offset as usize * 4))
            } else if flags & FLAG_OFFSET16 != 0 {
                let offset = read_u16_at(data, offsets_start + slot * 2)?;
                (offset != NO_ENTRY_16).then(|| (slot as u32, offset as usize * 4))
            } else {
                let offset = read_u32_at(data, offsets_start + slot * 4)?;
                (offset != NO_ENTRY).then(|| (slot as u32, offset as usize))
            };

            let Some((index, offset)) = located else {
                continue;
            };

            let Some((key, value)) = self.parse_entry(data, entries_start + offset)? else {
                continue;
            };

            entries.push(ResourceEntry {
                id: (self.package_id << 24) | (u32::from(type_id) << 16) | index,
                type_name: type_name.clone(),
                key,
                value,
                default_config,
            });
        }

        Ok(())
    }

    fn parse_entry(
        &self,
        data: &[u8],
        offset: usize,
    ) -> Result<Option<(String, ResourceValue)>, DecodeError> {
        let size = read_u16_at(data, offset)?;
        let flags = read_u16_at(data, offset + 2)?;

        let (key, raw) = if flags & ENTRY_FLAG_COMPACT != 0 {
            // Compact entries pack the key into `size` and the type into the flag's high byte.
            let raw = ResValue {
                data_type: (flags >> 8) as u8,
                data: read_u32_at(data, offset + 4)?,
            };
            (u32::from(size), raw)
        } else if flags & ENTRY_FLAG_COMPLEX != 0 {
            return Ok(None);
        } else {
            let key = read_u32_at(data, offset + 4)?;
            (key, ResValue::parse(data, offset + size as usize)?)
        };

        let key = self.keys.get(key).unwrap_or_default().to_string();
        let value = match raw.data_type {
            value_type::STRING => match self.values.get(raw.data) {
                Some(text) => ResourceValue::String(text.to_string()),
                None => {
                    return Err(DecodeError::StringIndex {
                        index: raw.data,
                        count: self.values.len(),
                    })
                }
            },
            value_type::REFERENCE => ResourceValue::Reference(raw.data),
            data_type => ResourceValue::Scalar {
                data_type,
                data: raw.data,
            },
        };

        Ok(Some((key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apk::fixtures::ResourceTableBuilder;

    #[test]
    fn test_lookup_app_name() {
        let bytes = ResourceTableBuilder::new("com.supercell.brawlstars")
            .string("app_name", "Brawl Stars")
            .string("title", "Something else")
            .build();

        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.packages().len(), 1);
        assert_eq!(table.packages()[0].id, 0x7f);
        assert_eq!(
            table.string("com.supercell.brawlstars", "app_name"),
            Some("Brawl Stars")
        );
        assert_eq!(table.string("com.supercell.brawlstars", "missing"), None);
        assert_eq!(table.string("com.other", "app_name"), None);
    }

    #[test]
    fn test_default_config_wins() {
        let bytes = ResourceTableBuilder::new("com.example")
            .localized_string("fr", "app_name", "Bagarre")
            .string("app_name", "Brawl")
            .build();

        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.string("com.example", "app_name"), Some("Brawl"));
    }

    #[test]
    fn test_qualified_value_used_when_no_default() {
        let bytes = ResourceTableBuilder::new("com.example")
            .localized_string("fr", "app_name", "Bagarre")
            .build();

        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.string("com.example", "app_name"), Some("Bagarre"));
    }

    #[test]
    fn test_sparse_entries() {
        let builder = ResourceTableBuilder::new("com.example")
            .localized_string("de", "greeting", "Hallo")
            .string("app_name", "Sparse Mod")
            .sparse();
        let bytes = builder.build();

        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.string("com.example", "app_name"), Some("Sparse Mod"));
        assert_eq!(table.resolve_reference(builder.id_of(1)), Some("Sparse Mod"));
    }

    #[test]
    fn test_aliased_string_is_followed() {
        let builder = ResourceTableBuilder::new("com.example").string("brand", "Nulls Brawl");
        let brand = builder.id_of(0);
        let table = ResourceTable::parse(&builder.reference("app_name", brand).build()).unwrap();

        assert_eq!(table.string("com.example", "app_name"), Some("Nulls Brawl"));
    }

    #[test]
    fn test_dangling_alias_is_not_a_string() {
        let bytes = ResourceTableBuilder::new("com.example")
            .reference("app_name", 0x7f01_00ff)
            .build();

        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.string("com.example", "app_name"), None);
    }

    #[test]
    fn test_resolve_reference() {
        let builder = ResourceTableBuilder::new("com.example")
            .string("app_name", "Brawl")
            .string("version", "53.176");
        let table = ResourceTable::parse(&builder.build()).unwrap();

        assert_eq!(table.resolve_reference(builder.id_of(1)), Some("53.176"));
        assert_eq!(table.resolve_reference(0x7f01_00ff), None);
        assert_eq!(table.resolve_reference(0x0101_0000), None);
    }

    #[test]
    fn test_rejects_non_table() {
        let manifest = crate::apk::fixtures::ManifestBuilder::new().build();
        assert!(matches!(
            ResourceTable::parse(&manifest),
            Err(DecodeError::UnexpectedChunk { .. })
        ));
        assert!(ResourceTable::parse(&[0u8; 3]).is_err());
    }
}
