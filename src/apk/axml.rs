//! Decoder for the compiled `AndroidManifest.xml`.
//!
//! Only the root `<manifest>` element is decoded; the rest of the document
//! (application, activities, permissions) is never needed for inventory.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::apk::chunk::{
    read_u16_at, read_u32_at, value_type, ChunkHeader, ResValue, StringPool, NO_INDEX,
    RES_STRING_POOL_TYPE, RES_XML_RESOURCE_MAP_TYPE, RES_XML_START_ELEMENT_TYPE,
    RES_XML_START_NAMESPACE_TYPE, RES_XML_TYPE,
};
use crate::error::DecodeError;

/// Framework attribute ids that obfuscated manifests keep when names are stripped.
const KNOWN_ATTRIBUTES: &[(u32, &str)] = &[
    (0x0101_021b, "versionCode"),
    (0x0101_021c, "versionName"),
    (0x0101_0572, "compileSdkVersion"),
    (0x0101_0573, "compileSdkVersionCodename"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Int(i32),
    Hex(u32),
    Bool(bool),
    Reference(u32),
    Other { data_type: u8, data: u32 },
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(value) => write!(f, "{}", value),
            AttributeValue::Int(value) => write!(f, "{}", value),
            AttributeValue::Hex(value) => write!(f, "0x{:x}", value),
            AttributeValue::Bool(value) => write!(f, "{}", value),
            AttributeValue::Reference(id) => write!(f, "@0x{:08x}", id),
            AttributeValue::Other { data, .. } => write!(f, "{}", data),
        }
    }
}

/// Attributes of the root manifest element, keyed `prefix:name` or bare `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    element: String,
    attributes: BTreeMap<String, AttributeValue>,
}

impl Manifest {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let root = ChunkHeader::parse(data, 0)?.ensure_type(RES_XML_TYPE)?;

        let mut strings: Option<StringPool> = None;
        let mut resource_ids: Vec<u32> = Vec::new();
        let mut prefixes: HashMap<u32, u32> = HashMap::new();

        for chunk in root.children(data) {
            let chunk = chunk?;
            match chunk.chunk_type {
                RES_STRING_POOL_TYPE => strings = Some(StringPool::parse(data, &chunk)?),
                RES_XML_RESOURCE_MAP_TYPE => {
                    resource_ids = (chunk.body_start()..chunk.end())
                        .step_by(4)
                        .map(|offset| read_u32_at(data, offset))
                        .collect::<Result<_, _>>()?;
                }
                RES_XML_START_NAMESPACE_TYPE => {
                    let prefix = read_u32_at(data, chunk.body_start())?;
                    let uri = read_u32_at(data, chunk.body_start() + 4)?;
                    prefixes.insert(uri, prefix);
                }
                RES_XML_START_ELEMENT_TYPE => {
                    let strings = strings.as_ref().ok_or_else(|| {
                        DecodeError::InvalidString("element before string pool".to_string())
                    })?;
                    let resolver = NameResolver {
                        strings,
                        resource_ids: &resource_ids,
                        prefixes: &prefixes,
                    };
                    return resolver.root_element(data, &chunk);
                }
                _ => {}
            }
        }

        Err(DecodeError::MissingRootElement)
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Declared application id (`package` attribute).
    pub fn package(&self) -> Option<&str> {
        self.get("package").and_then(AttributeValue::as_str)
    }

    /// `android:versionName`, falling back to a bare `versionName`.
    pub fn version_name(&self) -> Option<&AttributeValue> {
        self.get("android:versionName")
            .or_else(|| self.get("versionName"))
    }
}

struct NameResolver<'a> {
    strings: &'a StringPool,
    resource_ids: &'a [u32],
    prefixes: &'a HashMap<u32, u32>,
}

impl NameResolver<'_> {
    fn root_element(&self, data: &[u8], chunk: &ChunkHeader) -> Result<Manifest, DecodeError> {
        let ext = chunk.body_start();
        let name = read_u32_at(data, ext + 4)?;
        let attribute_start = read_u16_at(data, ext + 8)? as usize;
        let attribute_size = read_u16_at(data, ext + 10)? as usize;
        let attribute_count = read_u16_at(data, ext + 12)? as usize;

        let element = self.strings.get(name).unwrap_or_default().to_string();
        let mut attributes = BTreeMap::new();

        for index in 0..attribute_count {
            let offset = ext + attribute_start + index * attribute_size;
            let namespace = read_u32_at(data, offset)?;
            let name = read_u32_at(data, offset + 4)?;
            let raw = read_u32_at(data, offset + 8)?;
            let value = ResValue::parse(data, offset + 12)?;

            let Some(key) = self.attribute_key(namespace, name) else {
                continue;
            };
            attributes.insert(key, self.attribute_value(raw, value));
        }

        Ok(Manifest {
            element,
            attributes,
        })
    }

    fn attribute_key(&self, namespace: u32, name: u32) -> Option<String> {
        let mut local = self.strings.get(name).unwrap_or_default().to_string();
        let mut namespace_prefix = self.prefix(namespace);

        if local.is_empty() {
            let id = *self.resource_ids.get(name as usize)?;
            let (_, known) = KNOWN_ATTRIBUTES.iter().find(|(known, _)| *known == id)?;
            local = known.to_string();
            namespace_prefix = Some("android".to_string());
        }

        Some(match namespace_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
            _ => local,
        })
    }

    fn prefix(&self, namespace: u32) -> Option<String> {
        if namespace == NO_INDEX {
            return None;
        }
        let prefix = self.prefixes.get(&namespace)?;
        self.strings.get(*prefix).map(str::to_string)
    }

    fn attribute_value(&self, raw: u32, value: ResValue) -> AttributeValue {
        match value.data_type {
            value_type::STRING => AttributeValue::String(
                self.strings
                    .get(value.data)
                    .or_else(|| self.strings.get(raw))
                    .unwrap_or_default()
                    .to_string(),
            ),
            value_type::INT_DEC => AttributeValue::Int(value.data as i32),
            value_type::INT_HEX => AttributeValue::Hex(value.data),
            value_type::INT_BOOLEAN => AttributeValue::Bool(value.data != 0),
            value_type::REFERENCE => AttributeValue::Reference(value.data),
            _ => match self.strings.get(raw) {
                Some(text) => AttributeValue::String(text.to_string()),
                None => AttributeValue::Other {
                    data_type: value.data_type,
                    data: value.data,
                },
            },
        }
    }
}
