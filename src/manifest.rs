use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::config::CatalogInfo;
use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub description_html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub title: String,
    pub description_html: String,
    pub tables: BTreeMap<String, TableDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub title: String,
    pub license: String,
    pub license_url: String,
    pub description_html: String,
    pub source: String,
    pub source_url: String,
    pub about: String,
    pub about_url: String,
    pub databases: BTreeMap<String, CollectionDescriptor>,
}

impl Manifest {
    pub fn new(info: &CatalogInfo) -> Self {
        Self {
            title: info.title.clone(),
            license: info.license.clone(),
            license_url: info.license_url.clone(),
            description_html: info.description_html.clone(),
            source: info.source.clone(),
            source_url: info.source_url.clone(),
            about: info.about.clone(),
            about_url: info.about_url.clone(),
            databases: BTreeMap::new(),
        }
    }

    pub fn with_collection(
        mut self,
        name: impl Into<String>,
        collection: CollectionDescriptor,
    ) -> Self {
        self.databases.insert(name.into(), collection);
        self
    }

    pub fn table_count(&self) -> usize {
        self.databases
            .values()
            .map(|collection| collection.tables.len())
            .sum()
    }
}

pub struct ManifestWriter;

impl ManifestWriter {
    /// Serializes with a four-space indent and replaces whatever is at `path`.
    pub fn write(path: &Path, manifest: &Manifest) -> Result<(), CatalogError> {
        let write_error = |message: String| CatalogError::ManifestWrite {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| write_error(err.to_string()))?;
        }

        let mut content = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut content, formatter);
        manifest
            .serialize(&mut serializer)
            .map_err(|err| write_error(err.to_string()))?;
        content.push(b'\n');

        fs::write(path, &content).map_err(|err| write_error(err.to_string()))?;
        info!(
            path = %path.display(),
            collections = manifest.databases.len(),
            tables = manifest.table_count(),
            "wrote manifest"
        );
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Manifest, CatalogError> {
        let read_error = |message: String| CatalogError::ManifestRead {
            path: path.to_path_buf(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|err| read_error(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| read_error(err.to_string()))
    }
}
