//! Encoders for small binary manifests and resource tables used in tests.
//!
//! Only depends on std so integration tests can include it by path.

const NO_INDEX: u32 = 0xFFFF_FFFF;
pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

fn push_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn pad4(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

fn chunk(chunk_type: u16, header: &[u8], body: &[u8]) -> Vec<u8> {
    let header_size = 8 + header.len();
    let mut out = Vec::with_capacity(header_size + body.len());
    push_u16(&mut out, chunk_type);
    push_u16(&mut out, header_size as u16);
    push_u32(&mut out, (header_size + body.len()) as u32);
    out.extend_from_slice(header);
    out.extend_from_slice(body);
    out
}

pub fn string_pool(strings: &[&str], utf8: bool) -> Vec<u8> {
    let mut offsets = Vec::new();
    let mut data = Vec::new();
    for value in strings {
        push_u32(&mut offsets, data.len() as u32);
        if utf8 {
            let chars = value.chars().count();
            assert!(chars < 0x80 && value.len() < 0x80, "fixture strings must be short");
            data.push(chars as u8);
            data.push(value.len() as u8);
            data.extend_from_slice(value.as_bytes());
            data.push(0);
        } else {
            let units: Vec<u16> = value.encode_utf16().collect();
            assert!(units.len() < 0x8000, "fixture strings must be short");
            push_u16(&mut data, units.len() as u16);
            for unit in units {
                push_u16(&mut data, unit);
            }
            push_u16(&mut data, 0);
        }
    }
    pad4(&mut data);

    let mut header = Vec::new();
    push_u32(&mut header, strings.len() as u32);
    push_u32(&mut header, 0);
    push_u32(&mut header, if utf8 { 1 << 8 } else { 0 });
    push_u32(&mut header, (28 + offsets.len()) as u32);
    push_u32(&mut header, 0);

    let mut body = offsets;
    body.extend_from_slice(&data);
    chunk(0x0001, &header, &body)
}

struct FixtureAttribute {
    namespaced: bool,
    name: u32,
    raw: u32,
    data_type: u8,
    data: u32,
}

/// Builds an `AndroidManifest.xml` holding a single `<manifest>` element.
pub struct ManifestBuilder {
    strings: Vec<String>,
    resource_ids: Vec<u32>,
    attributes: Vec<FixtureAttribute>,
    utf8: bool,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::with_resource_map(&[])
    }

    /// Reserves one nameless string per id, the way obfuscators strip
    /// attribute names and leave only the resource map.
    pub fn with_resource_map(ids: &[u32]) -> Self {
        let mut builder = Self {
            strings: ids.iter().map(|_| String::new()).collect(),
            resource_ids: ids.to_vec(),
            attributes: Vec::new(),
            utf8: false,
        };
        builder.intern("android");
        builder.intern(ANDROID_NS);
        builder.intern("manifest");
        builder
    }

    pub fn utf8(mut self) -> Self {
        self.utf8 = true;
        self
    }

    fn intern(&mut self, value: &str) -> u32 {
        let reserved = self.resource_ids.len();
        if let Some(index) = self.strings[reserved..].iter().position(|s| s == value) {
            return (reserved + index) as u32;
        }
        self.strings.push(value.to_string());
        (self.strings.len() - 1) as u32
    }

    pub fn string_attr(mut self, namespaced: bool, name: &str, value: &str) -> Self {
        let name = self.intern(name);
        let raw = self.intern(value);
        self.attributes.push(FixtureAttribute {
            namespaced,
            name,
            raw,
            data_type: 0x03,
            data: raw,
        });
        self
    }

    pub fn int_attr(mut self, namespaced: bool, name: &str, value: u32) -> Self {
        let name = self.intern(name);
        self.attributes.push(FixtureAttribute {
            namespaced,
            name,
            raw: NO_INDEX,
            data_type: 0x10,
            data: value,
        });
        self
    }

    pub fn reference_attr(mut self, namespaced: bool, name: &str, id: u32) -> Self {
        let name = self.intern(name);
        self.attributes.push(FixtureAttribute {
            namespaced,
            name,
            raw: NO_INDEX,
            data_type: 0x01,
            data: id,
        });
        self
    }

    /// String attribute whose name is the reserved slot `slot` of the resource map.
    pub fn unnamed_string_attr(mut self, slot: usize, value: &str) -> Self {
        let raw = self.intern(value);
        self.attributes.push(FixtureAttribute {
            namespaced: true,
            name: slot as u32,
            raw,
            data_type: 0x03,
            data: raw,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let refs: Vec<&str> = self.strings.iter().map(String::as_str).collect();
        let reserved = self.resource_ids.len() as u32;
        let prefix = reserved;
        let uri = reserved + 1;
        let element = reserved + 2;

        let mut body = string_pool(&refs, self.utf8);

        if !self.resource_ids.is_empty() {
            let mut ids = Vec::new();
            for id in &self.resource_ids {
                push_u32(&mut ids, *id);
            }
            body.extend(chunk(0x0180, &[], &ids));
        }

        let mut node_header = Vec::new();
        push_u32(&mut node_header, 1);
        push_u32(&mut node_header, NO_INDEX);

        let mut namespace = Vec::new();
        push_u32(&mut namespace, prefix);
        push_u32(&mut namespace, uri);
        body.extend(chunk(0x0100, &node_header, &namespace));

        let mut start = Vec::new();
        push_u32(&mut start, NO_INDEX);
        push_u32(&mut start, element);
        push_u16(&mut start, 20);
        push_u16(&mut start, 20);
        push_u16(&mut start, self.attributes.len() as u16);
        push_u16(&mut start, 0);
        push_u16(&mut start, 0);
        push_u16(&mut start, 0);
        for attribute in &self.attributes {
            push_u32(&mut start, if attribute.namespaced { uri } else { NO_INDEX });
            push_u32(&mut start, attribute.name);
            push_u32(&mut start, attribute.raw);
            push_u16(&mut start, 8);
            start.push(0);
            start.push(attribute.data_type);
            push_u32(&mut start, attribute.data);
        }
        body.extend(chunk(0x0102, &node_header, &start));

        let mut end = Vec::new();
        push_u32(&mut end, NO_INDEX);
        push_u32(&mut end, element);
        body.extend(chunk(0x0103, &node_header, &end));
        body.extend(chunk(0x0101, &node_header, &namespace));

        chunk(0x0003, &[], &body)
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct FixtureEntry {
    key: u32,
    data_type: u8,
    value: u32,
    locale: Option<[u8; 2]>,
}

/// Builds a `resources.arsc` with one package whose only type is `string`.
pub struct ResourceTableBuilder {
    package_id: u32,
    package_name: String,
    values: Vec<String>,
    keys: Vec<String>,
    entries: Vec<FixtureEntry>,
    sparse: bool,
}

impl ResourceTableBuilder {
    pub fn new(package_name: &str) -> Self {
        Self {
            package_id: 0x7f,
            package_name: package_name.to_string(),
            values: Vec::new(),
            keys: Vec::new(),
            entries: Vec::new(),
            sparse: false,
        }
    }

    /// Lay entries out as (index, offset) pairs instead of a dense offset array.
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    fn key_index(&mut self, key: &str) -> u32 {
        match self.keys.iter().position(|k| k == key) {
            Some(index) => index as u32,
            None => {
                self.keys.push(key.to_string());
                (self.keys.len() - 1) as u32
            }
        }
    }

    fn push_entry(&mut self, key: &str, value: &str, locale: Option<[u8; 2]>) {
        let key = self.key_index(key);
        self.values.push(value.to_string());
        let value = (self.values.len() - 1) as u32;
        self.entries.push(FixtureEntry {
            key,
            data_type: 0x03,
            value,
            locale,
        });
    }

    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.push_entry(key, value, None);
        self
    }

    /// Default-config entry that points at resource `id`, like `@string/other`.
    pub fn reference(mut self, key: &str, id: u32) -> Self {
        let key = self.key_index(key);
        self.entries.push(FixtureEntry {
            key,
            data_type: 0x01,
            value: id,
            locale: None,
        });
        self
    }

    pub fn localized_string(mut self, language: &str, key: &str, value: &str) -> Self {
        let bytes = language.as_bytes();
        self.push_entry(key, value, Some([bytes[0], bytes[1]]));
        self
    }

    /// Resource id the `position`-th added entry ends up with.
    pub fn id_of(&self, position: usize) -> u32 {
        (self.package_id << 24) | (1 << 16) | position as u32
    }

    fn type_chunk(&self, locale: Option<[u8; 2]>) -> Vec<u8> {
        let present: Vec<usize> = (0..self.entries.len())
            .filter(|i| self.entries[*i].locale == locale)
            .collect();

        let mut entries = Vec::new();
        let mut offsets = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.locale != locale {
                if !self.sparse {
                    push_u32(&mut offsets, NO_INDEX);
                }
                continue;
            }
            if self.sparse {
                push_u16(&mut offsets, index as u16);
                push_u16(&mut offsets, (entries.len() / 4) as u16);
            } else {
                push_u32(&mut offsets, entries.len() as u32);
            }
            push_u16(&mut entries, 8);
            push_u16(&mut entries, 0);
            push_u32(&mut entries, entry.key);
            push_u16(&mut entries, 8);
            entries.push(0);
            entries.push(entry.data_type);
            push_u32(&mut entries, entry.value);
        }

        let entry_count = if self.sparse {
            present.len()
        } else {
            self.entries.len()
        };

        let mut config = vec![0u8; 64];
        config[..4].copy_from_slice(&64u32.to_le_bytes());
        if let Some(language) = locale {
            config[8..10].copy_from_slice(&language);
        }

        let header_len = 20 + config.len();
        let mut header = Vec::new();
        header.push(1);
        header.push(if self.sparse { 0x01 } else { 0x00 });
        push_u16(&mut header, 0);
        push_u32(&mut header, entry_count as u32);
        push_u32(&mut header, (header_len + offsets.len()) as u32);
        header.extend_from_slice(&config);

        let mut body = offsets;
        body.extend_from_slice(&entries);
        chunk(0x0201, &header, &body)
    }

    pub fn build(&self) -> Vec<u8> {
        let values: Vec<&str> = self.values.iter().map(String::as_str).collect();
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let type_pool = string_pool(&["string"], false);
        let key_pool = string_pool(&keys, false);

        let mut header = Vec::new();
        push_u32(&mut header, self.package_id);
        let mut name: Vec<u16> = self.package_name.encode_utf16().collect();
        name.resize(128, 0);
        for unit in name {
            push_u16(&mut header, unit);
        }
        push_u32(&mut header, 288);
        push_u32(&mut header, 1);
        push_u32(&mut header, (288 + type_pool.len()) as u32);
        push_u32(&mut header, keys.len() as u32);
        push_u32(&mut header, 0);

        let mut body = type_pool;
        body.extend(key_pool);
        body.extend(self.type_chunk(None));
        let mut locales: Vec<[u8; 2]> = self.entries.iter().filter_map(|e| e.locale).collect();
        locales.dedup();
        for locale in locales {
            body.extend(self.type_chunk(Some(locale)));
        }
        let package = chunk(0x0200, &header, &body);

        let mut table_header = Vec::new();
        push_u32(&mut table_header, 1);
        let mut table_body = string_pool(&values, true);
        table_body.extend(package);
        chunk(0x0002, &table_header, &table_body)
    }
}
