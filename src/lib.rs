//! Builds a browsable climate data catalog: locate compressed CSV projections,
//! load them into SQLite through `csvs-to-sqlite`, add full-text search with
//! `sqlite-utils`, and write the `metadata.json` manifest describing every
//! table.

pub mod config;
pub mod domain;
pub mod error;
pub mod locator;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod sampler;
pub mod storage;
pub mod synth;
pub mod tools;
