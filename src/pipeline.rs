use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::domain::{DatasetFields, DatasetFile};
use crate::error::CatalogError;
use crate::locator::locate;
use crate::manifest::{Manifest, ManifestWriter};
use crate::sampler::ContentSampler;
use crate::storage::DatasetStore;
use crate::synth::MetadataSynthesizer;
use crate::tools::{CatalogConverter, CommandRunner, SearchIndexer};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }

    pub fn timed(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            message: message.into(),
            elapsed: Some(elapsed),
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Discards progress events.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub convert: bool,
    pub index: bool,
    pub built_at: DateTime<Utc>,
}

impl BuildOptions {
    /// Locate, describe and write the manifest; leave the database alone.
    pub fn metadata_only(built_at: DateTime<Utc>) -> Self {
        Self {
            convert: false,
            index: false,
            built_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub collection: String,
    pub tables: Vec<String>,
    pub database: Option<Utf8PathBuf>,
    pub converted: bool,
    pub indexed: bool,
    pub manifest: Utf8PathBuf,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub datasets: Vec<ListEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub table: String,
    #[serde(flatten)]
    pub file: DatasetFile,
    pub fields: DatasetFields,
}

pub struct Pipeline<S, R> {
    config: ResolvedConfig,
    store: S,
    runner: R,
}

impl<S: DatasetStore, R: CommandRunner> Pipeline<S, R> {
    pub fn new(config: ResolvedConfig, store: S, runner: R) -> Self {
        Self {
            config,
            store,
            runner,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn locate(&self, sink: &dyn ProgressSink) -> Result<Vec<DatasetFile>, CatalogError> {
        sink.event(ProgressEvent::new(format!(
            "phase=Locate; {} in {}",
            self.config.pattern.as_str(),
            self.store.describe()
        )));
        let files = locate(&self.store, &self.config.pattern, self.config.limit)?;
        let base = self.config.public_url_base.as_deref();
        Ok(files
            .into_iter()
            .map(|file| file.with_public_base(base))
            .collect())
    }

    /// Located datasets with their parsed name fields.
    pub fn list(&self, sink: &dyn ProgressSink) -> Result<ListResult, CatalogError> {
        let datasets = self
            .locate(sink)?
            .into_iter()
            .map(|file| {
                let fields = self.config.filename_schema.parse(file.stem())?;
                Ok(ListEntry {
                    table: file.stem().to_string(),
                    file,
                    fields,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;
        Ok(ListResult { datasets })
    }

    /// Locate, convert, index, describe, write. The first failure aborts.
    pub fn build(
        &self,
        options: BuildOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BuildReport, CatalogError> {
        let started = Instant::now();
        let files = self.locate(sink)?;
        for file in &files {
            self.config.filename_schema.parse(file.stem())?;
        }
        let tables = files
            .iter()
            .map(|file| file.stem().to_string())
            .collect::<Vec<_>>();
        let database = &self.config.database;

        let converted = options.convert && !files.is_empty();
        if converted {
            sink.event(ProgressEvent::new(format!("phase=Convert; {database}")));
            let inputs = files
                .iter()
                .map(DatasetFile::converter_input)
                .collect::<Vec<_>>();
            CatalogConverter::new(&self.runner).convert(&inputs, database)?;
        }

        let indexed = options.index && !tables.is_empty();
        if indexed {
            sink.event(ProgressEvent::new(format!("phase=Index; {database}")));
            let names = tables.iter().map(String::as_str).collect::<Vec<_>>();
            SearchIndexer::new(&self.runner).index(
                database,
                &names,
                &self.config.search_columns,
            )?;
        }

        let synthesizer = MetadataSynthesizer::new(
            self.config.filename_schema,
            self.config.description_mode,
            ContentSampler::new(&self.config.city_column, &self.config.time_column),
            self.config.facets.clone(),
        );
        let described = synthesizer.describe_tables(&self.store, &files, sink)?;
        let collection = synthesizer.describe_collection(
            &self.config.collection_title,
            described,
            options.built_at,
        );
        let manifest = Manifest::new(&self.config.catalog)
            .with_collection(&self.config.collection, collection);

        sink.event(ProgressEvent::new(format!("phase=Write; {}", self.config.manifest)));
        ManifestWriter::write(self.config.manifest.as_std_path(), &manifest)?;

        sink.event(ProgressEvent::timed("phase=Done", started.elapsed()));
        info!(
            tables = tables.len(),
            converted,
            indexed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "catalog build finished"
        );

        Ok(BuildReport {
            collection: self.config.collection.clone(),
            tables,
            database: (converted || indexed).then(|| database.clone()),
            converted,
            indexed,
            manifest: self.config.manifest.clone(),
            built_at: options.built_at,
        })
    }
}
