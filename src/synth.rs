use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{DatasetFields, DatasetFile, DescriptionMode, FilenameSchema};
use crate::error::CatalogError;
use crate::manifest::{CollectionDescriptor, TableDescriptor};
use crate::pipeline::{ProgressEvent, ProgressSink};
use crate::render::{dedent, render_markdown};
use crate::sampler::{ContentSampler, ContentStats};
use crate::storage::DatasetStore;

pub const LAST_UPDATED_FORMAT: &str = "%B %d, %Y at %H:%M (UTC)";

#[derive(Debug, Clone)]
pub struct MetadataSynthesizer {
    schema: FilenameSchema,
    mode: DescriptionMode,
    sampler: ContentSampler,
    facets: Vec<String>,
}

impl MetadataSynthesizer {
    pub fn new(
        schema: FilenameSchema,
        mode: DescriptionMode,
        sampler: ContentSampler,
        facets: Vec<String>,
    ) -> Self {
        Self {
            schema,
            mode,
            sampler,
            facets,
        }
    }

    /// Every name is parsed before any file is read, so a malformed name
    /// fails the build without touching data.
    pub fn describe_tables<S: DatasetStore + ?Sized>(
        &self,
        store: &S,
        files: &[DatasetFile],
        sink: &dyn ProgressSink,
    ) -> Result<BTreeMap<String, TableDescriptor>, CatalogError> {
        let parsed = files
            .iter()
            .map(|file| Ok((file, self.schema.parse(file.stem())?)))
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let mut tables = BTreeMap::new();
        for (file, fields) in parsed {
            sink.event(ProgressEvent::new(format!(
                "phase=Describe; {}",
                file.stem()
            )));
            let descriptor = match self.mode {
                DescriptionMode::Sampled => {
                    let raw = store.read(file)?;
                    let stats = self.sampler.sample(file, &raw)?;
                    self.sampled_table(&fields, &stats)
                }
                DescriptionMode::External => self.external_table(file, &fields),
            };
            tables.insert(file.stem().to_string(), descriptor);
        }
        info!(tables = tables.len(), mode = ?self.mode, "described tables");
        Ok(tables)
    }

    pub fn sampled_table(&self, fields: &DatasetFields, stats: &ContentStats) -> TableDescriptor {
        let cities = if stats.cities.is_empty() {
            "_No cities listed._".to_string()
        } else {
            stats.cities.join(", ")
        };
        let text = format!(
            "
            ## Overview

            Every CSV file you download will contain a timeseries of one variable (`tasmax`, `tasmin`, or `pr`).
            You can specify a time range or selection of cities by typing those in the box below.
            For example, you can type in “New York City” to access data only for that city.
            The list of available cities is included below. Download the file below by scrolling down to the bottom
            of the page and clicking “Download”.

            ## Metadata

            - **General Circulation Model (GCM)**: {model}
            - **Scenario**: {scenario}
            - **Frequency**: {timescale}
            - **Temporal extent**: {time_min} to {time_max}
            - **Downscaling method**: {method}
            - **Variable**: {variable}

            ---

            **Available cities**:

            {cities}

            ---
            ",
            model = fields.model,
            scenario = fields.scenario,
            timescale = fields.timescale,
            method = fields.method,
            variable = fields.variable,
            time_min = stats.time_min,
            time_max = stats.time_max,
        );

        TableDescriptor {
            description_html: render_markdown(&dedent(&text)),
            facets: (!self.facets.is_empty()).then(|| self.facets.clone()),
            source_url: None,
            source: None,
        }
    }

    pub fn external_table(&self, file: &DatasetFile, fields: &DatasetFields) -> TableDescriptor {
        let url = file.public_url.as_deref().unwrap_or(&file.location);
        let text = format!(
            "
            ## Overview

            This table is published as a compressed CSV file and is not loaded into the catalog.
            Download it directly from the link below.

            ## Metadata

            - **General Circulation Model (GCM)**: {model}
            - **Scenario**: {scenario}
            - **Frequency**: {timescale}
            - **Downscaling method**: {method}
            - **Variable**: {variable}

            ## Access

            - **File**: [{name}]({url})

            > [!NOTE]
            > Files are gzip-compressed; most CSV readers open them without unpacking.
            ",
            model = fields.model,
            scenario = fields.scenario,
            timescale = fields.timescale,
            method = fields.method,
            variable = fields.variable,
            name = file.name,
        );

        TableDescriptor {
            description_html: render_markdown(&dedent(&text)),
            facets: None,
            source_url: Some(url.to_string()),
            source: Some(file.name.clone()),
        }
    }

    pub fn describe_collection(
        &self,
        title: &str,
        tables: BTreeMap<String, TableDescriptor>,
        built_at: DateTime<Utc>,
    ) -> CollectionDescriptor {
        CollectionDescriptor {
            title: title.to_string(),
            description_html: collection_overview(built_at),
            tables,
        }
    }
}

pub fn collection_overview(built_at: DateTime<Utc>) -> String {
    let text = format!(
        "
        ## Overview

        This page allows you to download timeseries of climate data at 107 cities around the globe in CSV format.
        The data is from a collection of downscaled climate projections based upon results from the Coupled Model
        Intercomparison Project Phase 6 (CMIP6). This collection of datasets includes results from multiple downscaling
        methods to support uncertainty estimation. See [here](https://carbonplan.org/research/cmip6-downscaling-explainer)
        for more details on the dataset and methods.

        ## Metadata

        - **Variables**: daily minimum and maximum temperature, precipitation
        - **Spatial coverage**: global
        - **Temporal resolution**: daily, plus monthly and annual aggregations
        - **Last updated**: {last_updated}
        - **License**: CC-BY-4.0
        - **Available formats**: CSVs (point locations)
        - **Tags**: `climate`, `risks`

        ## Relevant resources

        - **Explainer article**: [https://carbonplan.org/research/cmip6-downscaling-explainer](https://carbonplan.org/research/cmip6-downscaling-explainer)
        - **Map tool**: [https://carbonplan.org/research/cmip6-downscaling](https://carbonplan.org/research/cmip6-downscaling)
        ",
        last_updated = built_at.format(LAST_UPDATED_FORMAT),
    );
    render_markdown(&dedent(&text))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fields() -> DatasetFields {
        FilenameSchema::Suffixed
            .parse("CMIP.A.ModelX.ssp245.r1.day.BC.tasmax.csv")
            .unwrap()
    }

    fn synthesizer(mode: DescriptionMode) -> MetadataSynthesizer {
        MetadataSynthesizer::new(
            FilenameSchema::Suffixed,
            mode,
            ContentSampler::new("cities", "time"),
            vec!["cities".to_string()],
        )
    }

    #[test]
    fn sampled_table_lists_fields_and_cities() {
        let stats = ContentStats {
            cities: vec!["Lagos".to_string(), "Paris".to_string()],
            time_min: "2015-01-01".to_string(),
            time_max: "2100-12-31".to_string(),
            rows: 2,
        };
        let table = synthesizer(DescriptionMode::Sampled).sampled_table(&fields(), &stats);

        let html = &table.description_html;
        assert!(html.contains("<h2>Metadata</h2>"));
        assert!(html.contains("<strong>General Circulation Model (GCM)</strong>: ModelX"));
        assert!(html.contains("<strong>Scenario</strong>: ssp245"));
        assert!(html.contains("<strong>Temporal extent</strong>: 2015-01-01 to 2100-12-31"));
        assert!(html.contains("<strong>Variable</strong>: tasmax"));
        assert!(html.contains("Lagos, Paris"));
        assert!(!html.contains("<pre>"));
        assert_eq!(table.facets, Some(vec!["cities".to_string()]));
    }

    #[test]
    fn external_table_links_to_file() {
        let file = DatasetFile::new(
            "s3://bucket/x/CMIP.A.ModelX.ssp245.r1.day.BC.tasmax.csv.gz",
            "CMIP.A.ModelX.ssp245.r1.day.BC.tasmax.csv.gz",
        )
        .with_public_base(Some("https://bucket.example.com/x"));
        let table = synthesizer(DescriptionMode::External).external_table(&file, &fields());

        assert_eq!(
            table.source_url.as_deref(),
            Some("https://bucket.example.com/x/CMIP.A.ModelX.ssp245.r1.day.BC.tasmax.csv.gz")
        );
        assert_eq!(
            table.source.as_deref(),
            Some("CMIP.A.ModelX.ssp245.r1.day.BC.tasmax.csv.gz")
        );
        assert!(table.facets.is_none());
        assert!(table.description_html.contains("markdown-alert-note"));
        assert!(table.description_html.contains("<strong>Downscaling method</strong>: BC"));
    }

    #[test]
    fn overview_carries_build_time() {
        let built_at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        let html = collection_overview(built_at);
        assert!(html.contains("March 05, 2024 at 14:07 (UTC)"));
        assert_eq!(html, collection_overview(built_at));
    }
}
