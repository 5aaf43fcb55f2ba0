use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use tokio::runtime::Runtime;
use tracing::debug;
use url::Url;

use crate::domain::DatasetFile;
use crate::error::CatalogError;

/// A place dataset files can be listed from and read out of.
pub trait DatasetStore {
    /// Direct children of the root, in no particular order.
    fn list(&self) -> Result<Vec<DatasetFile>, CatalogError>;
    fn read(&self, file: &DatasetFile) -> Result<Vec<u8>, CatalogError>;
    fn describe(&self) -> String;
}

impl<T: DatasetStore + ?Sized> DatasetStore for Box<T> {
    fn list(&self) -> Result<Vec<DatasetFile>, CatalogError> {
        (**self).list()
    }

    fn read(&self, file: &DatasetFile) -> Result<Vec<u8>, CatalogError> {
        (**self).read(file)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRoot {
    Local(Utf8PathBuf),
    S3(Url),
}

impl StorageRoot {
    pub fn parse(value: &str) -> Result<Self, CatalogError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::InvalidStorageRoot(value.to_string()));
        }
        if let Some((scheme, _)) = trimmed.split_once("://") {
            let url = Url::parse(trimmed)
                .map_err(|err| CatalogError::InvalidStorageRoot(err.to_string()))?;
            return match scheme {
                "s3" if url.host_str().is_some() => Ok(StorageRoot::S3(url)),
                "s3" => Err(CatalogError::InvalidStorageRoot(format!(
                    "{trimmed}: missing bucket"
                ))),
                "file" => Ok(StorageRoot::Local(Utf8PathBuf::from(url.path()))),
                other => Err(CatalogError::InvalidStorageRoot(format!(
                    "unsupported storage scheme: {other}"
                ))),
            };
        }
        Ok(StorageRoot::Local(Utf8PathBuf::from(trimmed)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectStoreOptions {
    pub region: Option<String>,
    pub anonymous: bool,
}

pub fn open_store(
    root: &StorageRoot,
    options: &ObjectStoreOptions,
) -> Result<Box<dyn DatasetStore>, CatalogError> {
    match root {
        StorageRoot::Local(path) => Ok(Box::new(LocalStore::new(path.clone()))),
        StorageRoot::S3(url) => Ok(Box::new(ObjectStoreSource::new(url, options)?)),
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: Utf8PathBuf,
}

impl LocalStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl DatasetStore for LocalStore {
    fn list(&self) -> Result<Vec<DatasetFile>, CatalogError> {
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| CatalogError::StorageUnreachable(format!("{}: {err}", self.root)))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|err| CatalogError::StorageUnreachable(format!("{}: {err}", self.root)))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
                debug!(root = %self.root, "skipping non UTF-8 file name");
                continue;
            };
            if let Some(name) = path.file_name() {
                files.push(DatasetFile::new(path.as_str(), name));
            }
        }
        Ok(files)
    }

    fn read(&self, file: &DatasetFile) -> Result<Vec<u8>, CatalogError> {
        fs::read(&file.location).map_err(|err| CatalogError::ContentRead {
            name: file.name.clone(),
            message: err.to_string(),
        })
    }

    fn describe(&self) -> String {
        self.root.to_string()
    }
}

/// An `s3://bucket/prefix` root. Listing and reads block on a private
/// current-thread runtime.
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: ObjectPath,
    runtime: Runtime,
}

impl ObjectStoreSource {
    pub fn new(url: &Url, options: &ObjectStoreOptions) -> Result<Self, CatalogError> {
        let bucket = url
            .host_str()
            .ok_or_else(|| CatalogError::InvalidStorageRoot(format!("{url}: missing bucket")))?
            .to_string();

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&bucket);
        if let Some(region) = &options.region {
            builder = builder.with_region(region);
        }
        if options.anonymous {
            builder = builder.with_skip_signature(true);
        }
        let store = builder
            .build()
            .map_err(|err| CatalogError::StorageUnreachable(format!("{url}: {err}")))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| CatalogError::StorageUnreachable(err.to_string()))?;

        Ok(Self::with_store(Arc::new(store), bucket, url.path(), runtime))
    }

    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: String,
        prefix: &str,
        runtime: Runtime,
    ) -> Self {
        Self {
            store,
            bucket,
            prefix: ObjectPath::from(prefix.trim_matches('/')),
            runtime,
        }
    }

    fn uri(&self, path: &ObjectPath) -> String {
        format!("s3://{}/{}", self.bucket, path)
    }
}

impl DatasetStore for ObjectStoreSource {
    fn list(&self) -> Result<Vec<DatasetFile>, CatalogError> {
        let prefix = self.prefix.parts().next().is_some().then_some(&self.prefix);
        let listing = self
            .runtime
            .block_on(self.store.list_with_delimiter(prefix))
            .map_err(|err| {
                CatalogError::StorageUnreachable(format!("{}: {err}", self.uri(&self.prefix)))
            })?;

        Ok(listing
            .objects
            .into_iter()
            .filter_map(|meta| {
                let name = meta.location.filename()?.to_string();
                Some(DatasetFile::new(self.uri(&meta.location), name))
            })
            .collect())
    }

    fn read(&self, file: &DatasetFile) -> Result<Vec<u8>, CatalogError> {
        let location = file
            .location
            .strip_prefix(&format!("s3://{}/", self.bucket))
            .map(ObjectPath::from)
            .ok_or_else(|| CatalogError::ContentRead {
                name: file.name.clone(),
                message: format!("{} is not inside bucket {}", file.location, self.bucket),
            })?;

        let bytes = self
            .runtime
            .block_on(async {
                let result = self.store.get(&location).await?;
                result.bytes().await
            })
            .map_err(|err| CatalogError::ContentRead {
                name: file.name.clone(),
                message: err.to_string(),
            })?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.uri(&self.prefix)
    }
}
