use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::{BuildReport, ListResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_build(result: &BuildReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Prints progress lines to stderr and summaries to stdout.
pub struct HumanOutput;

impl HumanOutput {
    pub fn print_build(result: &BuildReport) {
        println!("catalog {}: {} table(s)", result.collection, result.tables.len());
        for table in &result.tables {
            println!("  - {table}");
        }
        match &result.database {
            Some(database) => println!(
                "database: {database} (converted: {}, indexed: {})",
                result.converted, result.indexed
            ),
            None => println!("database: untouched"),
        }
        println!("manifest: {}", result.manifest);
    }

    pub fn print_list(result: &ListResult) {
        if result.datasets.is_empty() {
            println!("no datasets matched");
            return;
        }
        for entry in &result.datasets {
            let fields = &entry.fields;
            println!(
                "{}\n    model={} scenario={} member={} timescale={} method={} variable={}",
                entry.table,
                fields.model,
                fields.scenario,
                fields.member,
                fields.timescale,
                fields.method,
                fields.variable
            );
        }
    }
}

impl ProgressSink for HumanOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}
