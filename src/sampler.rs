use std::collections::BTreeSet;
use std::io::Read;

use flate2::read::MultiGzDecoder;
use serde::Serialize;

use crate::domain::DatasetFile;
use crate::error::CatalogError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentStats {
    pub cities: Vec<String>,
    pub time_min: String,
    pub time_max: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct ContentSampler {
    city_column: String,
    time_column: String,
}

impl ContentSampler {
    pub fn new(city_column: impl Into<String>, time_column: impl Into<String>) -> Self {
        Self {
            city_column: city_column.into(),
            time_column: time_column.into(),
        }
    }

    /// Reads the whole table into memory, across every gzip member. Time
    /// values are compared as raw strings, which orders ISO-8601 stamps
    /// chronologically.
    pub fn sample(&self, file: &DatasetFile, raw: &[u8]) -> Result<ContentStats, CatalogError> {
        let read_error = |message: String| CatalogError::ContentRead {
            name: file.name.clone(),
            message,
        };

        let content = if file.is_gzip() || raw.starts_with(&GZIP_MAGIC) {
            let mut decoded = Vec::new();
            MultiGzDecoder::new(raw)
                .read_to_end(&mut decoded)
                .map_err(|err| read_error(format!("gzip: {err}")))?;
            decoded
        } else {
            raw.to_vec()
        };

        let mut reader = csv::Reader::from_reader(content.as_slice());
        let headers = reader
            .headers()
            .map_err(|err| read_error(err.to_string()))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| read_error(format!("missing column {name}")))
        };
        let city_index = column(&self.city_column)?;
        let time_index = column(&self.time_column)?;

        let mut cities = BTreeSet::new();
        let mut time_range: Option<(String, String)> = None;
        let mut rows = 0;
        for record in reader.records() {
            let record = record.map_err(|err| read_error(err.to_string()))?;
            rows += 1;
            if let Some(city) = record.get(city_index) {
                if !city.is_empty() {
                    cities.insert(city.to_string());
                }
            }
            let Some(time) = record.get(time_index).filter(|value| !value.is_empty()) else {
                continue;
            };
            time_range = Some(match time_range {
                None => (time.to_string(), time.to_string()),
                Some((min, max)) => {
                    let min = if time < min.as_str() {
                        time.to_string()
                    } else {
                        min
                    };
                    let max = if time > max.as_str() {
                        time.to_string()
                    } else {
                        max
                    };
                    (min, max)
                }
            });
        }

        let (time_min, time_max) = time_range
            .ok_or_else(|| read_error(format!("no values in column {}", self.time_column)))?;

        Ok(ContentStats {
            cities: cities.into_iter().collect(),
            time_min,
            time_max,
            rows,
        })
    }
}
