use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub const NAME_DELIMITER: char = '.';

/// Positional layout of the dot-delimited dataset names.
///
/// `Plain` names carry exactly the eight semantic segments. `Suffixed` names
/// carry the same eight followed by a format segment, which is what the stem
/// of a `*.csv.gz` file looks like once `.gz` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilenameSchema {
    Plain,
    #[default]
    Suffixed,
}

impl FilenameSchema {
    pub fn segment_count(self) -> usize {
        match self {
            FilenameSchema::Plain => 8,
            FilenameSchema::Suffixed => 9,
        }
    }

    pub fn parse(self, stem: &str) -> Result<DatasetFields, CatalogError> {
        let segments = stem.split(NAME_DELIMITER).collect::<Vec<_>>();
        let expected = self.segment_count();
        if segments.len() != expected {
            return Err(CatalogError::FilenameParse {
                name: stem.to_string(),
                expected,
                found: segments.len(),
            });
        }
        if let Some(index) = segments.iter().position(|segment| segment.is_empty()) {
            return Err(CatalogError::EmptyNameSegment {
                name: stem.to_string(),
                position: index + 1,
            });
        }

        let owned = |index: usize| segments[index].to_string();
        Ok(DatasetFields {
            project: owned(0),
            institution: owned(1),
            model: owned(2),
            scenario: owned(3),
            member: owned(4),
            timescale: owned(5),
            method: owned(6),
            variable: owned(7),
            format: match self {
                FilenameSchema::Plain => None,
                FilenameSchema::Suffixed => Some(owned(8)),
            },
        })
    }
}

impl fmt::Display for FilenameSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilenameSchema::Plain => write!(f, "plain"),
            FilenameSchema::Suffixed => write!(f, "suffixed"),
        }
    }
}

/// Semantic fields encoded in a dataset name, in filename order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetFields {
    pub project: String,
    pub institution: String,
    pub model: String,
    pub scenario: String,
    pub member: String,
    pub timescale: String,
    pub method: String,
    pub variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// How per-table descriptions are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionMode {
    /// Read each file and list its temporal extent and cities.
    #[default]
    Sampled,
    /// Skip reading data and point readers at the file's public URL.
    External,
}

/// One raw data file found under the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetFile {
    pub location: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl DatasetFile {
    pub fn new(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
            public_url: None,
        }
    }

    pub fn with_public_base(mut self, base: Option<&str>) -> Self {
        self.public_url = base.map(|base| format!("{}/{}", base.trim_end_matches('/'), self.name));
        self
    }

    /// File name without its final extension: `a.b.csv.gz` becomes `a.b.csv`.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(index) if index > 0 => &self.name[..index],
            _ => &self.name,
        }
    }

    pub fn is_gzip(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with(".gz")
    }

    /// Location handed to the converter: the public URL when known.
    pub fn converter_input(&self) -> &str {
        self.public_url.as_deref().unwrap_or(&self.location)
    }
}
