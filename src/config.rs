use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{DescriptionMode, FilenameSchema};
use crate::error::CatalogError;
use crate::locator::GlobPattern;
use crate::storage::{ObjectStoreOptions, StorageRoot};

pub const DEFAULT_CONFIG_FILE: &str = "climate-catalog.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub storage_root: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub anonymous: Option<bool>,
    #[serde(default)]
    pub public_url_base: Option<String>,
    #[serde(default)]
    pub database: Option<Utf8PathBuf>,
    #[serde(default)]
    pub manifest: Option<Utf8PathBuf>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub collection_title: Option<String>,
    #[serde(default)]
    pub filename_schema: Option<FilenameSchema>,
    #[serde(default)]
    pub description_mode: Option<DescriptionMode>,
    #[serde(default)]
    pub city_column: Option<String>,
    #[serde(default)]
    pub time_column: Option<String>,
    #[serde(default)]
    pub search_columns: Option<Vec<String>>,
    #[serde(default)]
    pub facets: Option<Vec<String>>,
    #[serde(default)]
    pub catalog: Option<CatalogInfo>,
}

/// Catalog-level fields of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogInfo {
    pub title: String,
    pub license: String,
    pub license_url: String,
    pub description_html: String,
    pub source: String,
    pub source_url: String,
    pub about: String,
    pub about_url: String,
}

impl Default for CatalogInfo {
    fn default() -> Self {
        Self {
            title: "CarbonPlan data".to_string(),
            license: "CC Attribution 4.0 License".to_string(),
            license_url: "https://creativecommons.org/licenses/by/4.0/".to_string(),
            description_html: "This is a public catalog of datasets related to carbon removal and \
                climate solutions. At CarbonPlan, we maintain this data catalog for our own use and \
                as a resource to the rest of the research community."
                .to_string(),
            source: "carbonplan/data".to_string(),
            source_url: "https://carbonplan.org/data".to_string(),
            about: "carbonplan/data".to_string(),
            about_url: "https://carbonplan.org/data".to_string(),
        }
    }
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub storage_root: Option<String>,
    pub pattern: Option<String>,
    pub limit: Option<usize>,
    pub database: Option<Utf8PathBuf>,
    pub manifest: Option<Utf8PathBuf>,
    pub filename_schema: Option<FilenameSchema>,
    pub description_mode: Option<DescriptionMode>,
}

impl Config {
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        self.storage_root = overrides.storage_root.or(self.storage_root);
        self.pattern = overrides.pattern.or(self.pattern);
        self.limit = overrides.limit.or(self.limit);
        self.database = overrides.database.or(self.database);
        self.manifest = overrides.manifest.or(self.manifest);
        self.filename_schema = overrides.filename_schema.or(self.filename_schema);
        self.description_mode = overrides.description_mode.or(self.description_mode);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub storage_root: StorageRoot,
    pub pattern: GlobPattern,
    pub limit: Option<usize>,
    pub object_store: ObjectStoreOptions,
    pub public_url_base: Option<String>,
    pub database: Utf8PathBuf,
    pub manifest: Utf8PathBuf,
    pub collection: String,
    pub collection_title: String,
    pub filename_schema: FilenameSchema,
    pub description_mode: DescriptionMode,
    pub city_column: String,
    pub time_column: String,
    pub search_columns: Vec<String>,
    pub facets: Vec<String>,
    pub catalog: CatalogInfo,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Utf8Path>) -> Result<Config, CatalogError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| CatalogError::ConfigRead(config_path.clone().into_std_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| CatalogError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&Utf8Path>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, CatalogError> {
        Self::resolve_config(Self::load(path)?.apply(overrides))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CatalogError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(CatalogError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let storage_root = StorageRoot::parse(
            config
                .storage_root
                .as_deref()
                .unwrap_or("data/cmip6-downscaling"),
        )?;
        let pattern = GlobPattern::new(config.pattern.as_deref().unwrap_or("*.csv.gz"))?;

        let collection = non_empty("collection", config.collection, "cmip6-downscaling")?;
        let city_column = non_empty("city_column", config.city_column, "cities")?;
        let time_column = non_empty("time_column", config.time_column, "time")?;

        let search_columns = config
            .search_columns
            .unwrap_or_else(|| vec![city_column.clone(), time_column.clone()]);
        if search_columns.is_empty()
            || search_columns
                .iter()
                .any(|column| column.trim().is_empty())
        {
            return Err(CatalogError::InvalidConfig(
                "search_columns must name at least one column".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            storage_root,
            pattern,
            limit: config.limit,
            object_store: ObjectStoreOptions {
                region: config.region,
                anonymous: config.anonymous.unwrap_or(false),
            },
            public_url_base: config.public_url_base,
            database: config
                .database
                .unwrap_or_else(|| Utf8PathBuf::from("cmip6-downscaling.db")),
            manifest: config
                .manifest
                .unwrap_or_else(|| Utf8PathBuf::from("metadata.json")),
            collection,
            collection_title: config
                .collection_title
                .unwrap_or_else(|| "Downscaled CMIP6 Data".to_string()),
            filename_schema: config.filename_schema.unwrap_or_default(),
            description_mode: config.description_mode.unwrap_or_default(),
            facets: config.facets.unwrap_or_else(|| vec![city_column.clone()]),
            city_column,
            time_column,
            search_columns,
            catalog: config.catalog.unwrap_or_default(),
        })
    }
}

fn non_empty(field: &str, value: Option<String>, default: &str) -> Result<String, CatalogError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(CatalogError::InvalidConfig(format!(
            "{field} must not be empty"
        ))),
        Some(value) => Ok(value),
        None => Ok(default.to_string()),
    }
}
