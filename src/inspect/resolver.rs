use crate::apk::{AttributeValue, ExtractedPackage, Manifest, ResourceTable};
use crate::error::{CensusError, Result};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub display_name: String,
    pub version: Option<String>,
}

/// Recovers the declared application name and version of an unpacked package.
///
/// Nothing here fails: every step that cannot produce a value hands over to
/// the next one, ending at the package's file name.
pub struct ResourceResolver<'a> {
    app_name_key: &'a str,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(app_name_key: &'a str) -> Self {
        Self { app_name_key }
    }

    pub fn resolve(
        &self,
        package_path: &Path,
        contents: Option<&ExtractedPackage>,
        diagnostics: &mut Vec<String>,
    ) -> PackageIdentity {
        let manifest = contents.and_then(|c| recover(load_manifest(c), "manifest", diagnostics));
        let table = contents.and_then(|c| recover(load_table(c), "resource table", diagnostics));

        let version = manifest
            .as_ref()
            .and_then(|manifest| self.version(manifest, table.as_ref()));

        let display_name = self
            .app_name(manifest.as_ref(), table.as_ref())
            .unwrap_or_else(|| package_stem(package_path));

        PackageIdentity {
            display_name,
            version,
        }
    }

    /// `android:versionName` or `versionName`, dereferenced through the table
    /// when it points at a string resource.
    pub fn version(&self, manifest: &Manifest, table: Option<&ResourceTable>) -> Option<String> {
        let value = manifest.version_name()?;
        let rendered = match value {
            AttributeValue::Reference(id) => table
                .and_then(|table| table.resolve_reference(*id))
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            other => other.to_string(),
        };
        Some(rendered)
    }

    /// The `app_name` string scoped to the manifest's package id.
    pub fn app_name(
        &self,
        manifest: Option<&Manifest>,
        table: Option<&ResourceTable>,
    ) -> Option<String> {
        let table = table?;
        let package = manifest?.package()?;
        let name = table.string(package, self.app_name_key)?;
        if name.is_empty() {
            return None;
        }
        debug!(package, name, "application name resolved");
        Some(name.to_string())
    }
}

fn load_manifest(contents: &ExtractedPackage) -> Result<Option<Manifest>> {
    let Some(bytes) = contents.manifest_bytes()? else {
        return Ok(None);
    };
    Manifest::parse(&bytes)
        .map(Some)
        .map_err(|source| CensusError::Decode {
            what: "manifest",
            source,
        })
}

fn load_table(contents: &ExtractedPackage) -> Result<Option<ResourceTable>> {
    let Some(bytes) = contents.resource_table_bytes()? else {
        return Ok(None);
    };
    ResourceTable::parse(&bytes)
        .map(Some)
        .map_err(|source| CensusError::Decode {
            what: "resource table",
            source,
        })
}

/// Turns a failed step into "not found", keeping the cause as a diagnostic.
fn recover<T>(result: Result<Option<T>>, what: &str, diagnostics: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            debug!("no {} in package", what);
            None
        }
        Err(e) => {
            debug!(error = %e, "{} unreadable", what);
            diagnostics.push(e.to_string());
            None
        }
    }
}

/// File name without its extension.
pub fn package_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
