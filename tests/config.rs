use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use climate_catalog::config::{Config, ConfigLoader, ConfigOverrides};
use climate_catalog::domain::{DescriptionMode, FilenameSchema};
use climate_catalog::error::CatalogError;
use climate_catalog::storage::StorageRoot;

#[test]
fn parse_config_file_with_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("climate-catalog.json")).unwrap();
    fs::write(
        path.as_std_path(),
        r#"{
            "storage_root": "s3://carbonplan-share/datasette/cmip6-downscaling",
            "limit": 2,
            "anonymous": true,
            "region": "us-west-2",
            "public_url_base": "https://carbonplan-share.s3.us-west-2.amazonaws.com/datasette/cmip6-downscaling",
            "filename_schema": "plain",
            "catalog": { "title": "Example data" }
        }"#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        limit: Some(5),
        description_mode: Some(DescriptionMode::External),
        ..ConfigOverrides::default()
    };
    let resolved = ConfigLoader::resolve(Some(path.as_path()), overrides).unwrap();

    assert_matches!(resolved.storage_root, StorageRoot::S3(_));
    assert_eq!(resolved.limit, Some(5));
    assert_eq!(resolved.filename_schema, FilenameSchema::Plain);
    assert_eq!(resolved.description_mode, DescriptionMode::External);
    assert!(resolved.object_store.anonymous);
    assert_eq!(resolved.object_store.region.as_deref(), Some("us-west-2"));
    assert_eq!(resolved.catalog.title, "Example data");
    assert_eq!(resolved.catalog.license, "CC Attribution 4.0 License");
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("nope.json")).unwrap();
    let err = ConfigLoader::load(Some(path.as_path())).unwrap_err();
    assert_matches!(err, CatalogError::ConfigRead(_));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("bad.json")).unwrap();
    fs::write(path.as_std_path(), r#"{ "limit": "two" }"#).unwrap();
    let err = ConfigLoader::load(Some(path.as_path())).unwrap_err();
    assert_matches!(err, CatalogError::ConfigParse(_));
}

#[test]
fn invalid_values_are_rejected() {
    let err = ConfigLoader::resolve_config(Config {
        search_columns: Some(Vec::new()),
        ..Config::default()
    })
    .unwrap_err();
    assert_matches!(err, CatalogError::InvalidConfig(_));

    let err = ConfigLoader::resolve_config(Config {
        collection: Some(" ".to_string()),
        ..Config::default()
    })
    .unwrap_err();
    assert_matches!(err, CatalogError::InvalidConfig(_));

    let err = ConfigLoader::resolve_config(Config {
        schema_version: Some(2),
        ..Config::default()
    })
    .unwrap_err();
    assert_matches!(err, CatalogError::InvalidConfig(_));
}

#[test]
fn search_columns_follow_renamed_columns() {
    let resolved = ConfigLoader::resolve_config(Config {
        city_column: Some("city".to_string()),
        time_column: Some("date".to_string()),
        ..Config::default()
    })
    .unwrap();
    assert_eq!(resolved.search_columns, vec!["city", "date"]);
    assert_eq!(resolved.facets, vec!["city"]);
}
