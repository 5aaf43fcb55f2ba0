use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use climate_catalog::config::{ConfigLoader, ConfigOverrides};
use climate_catalog::domain::{DescriptionMode, FilenameSchema};
use climate_catalog::error::CatalogError;
use climate_catalog::output::{HumanOutput, JsonOutput, OutputMode};
use climate_catalog::pipeline::{BuildOptions, Pipeline, ProgressSink};
use climate_catalog::storage::{DatasetStore, open_store};
use climate_catalog::tools::SystemCommandRunner;

#[derive(Parser)]
#[command(name = "climate-catalog")]
#[command(about = "Build a browsable catalog (SQLite + metadata.json) from climate projection CSVs")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Convert, index and describe the datasets (default)")]
    Build(BuildArgs),
    #[command(about = "Only write the metadata manifest")]
    Metadata,
    #[command(about = "List located datasets and their parsed name fields")]
    List,
}

#[derive(Args, Clone, Default)]
struct SourceArgs {
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Local directory or s3://bucket/prefix.
    #[arg(long, global = true)]
    root: Option<String>,

    #[arg(long, global = true)]
    pattern: Option<String>,

    #[arg(long, global = true)]
    limit: Option<usize>,

    #[arg(long, global = true)]
    database: Option<Utf8PathBuf>,

    #[arg(long, global = true)]
    manifest: Option<Utf8PathBuf>,

    #[arg(long, global = true, value_enum)]
    schema: Option<FilenameSchema>,

    #[arg(long, global = true, value_enum)]
    mode: Option<DescriptionMode>,
}

#[derive(Args, Clone, Default)]
struct BuildArgs {
    #[arg(long)]
    skip_convert: bool,

    #[arg(long)]
    skip_index: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error {
        CatalogError::StorageUnreachable(_)
        | CatalogError::InvalidStorageRoot(_)
        | CatalogError::InvalidPattern(_)
        | CatalogError::FilenameParse { .. }
        | CatalogError::EmptyNameSegment { .. }
        | CatalogError::ContentRead { .. }
        | CatalogError::ConfigRead(_)
        | CatalogError::ConfigParse(_)
        | CatalogError::InvalidConfig(_) => 2,
        CatalogError::ExternalTool { .. } | CatalogError::MissingTool(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let overrides = ConfigOverrides {
        storage_root: cli.source.root,
        pattern: cli.source.pattern,
        limit: cli.source.limit,
        database: cli.source.database,
        manifest: cli.source.manifest,
        filename_schema: cli.source.schema,
        description_mode: cli.source.mode,
    };
    let config = ConfigLoader::resolve(cli.source.config.as_deref(), overrides)?;
    let store = open_store(&config.storage_root, &config.object_store)?;
    let pipeline = Pipeline::new(config, store, SystemCommandRunner::new());

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &HumanOutput,
    };

    match cli.command.unwrap_or(Commands::Build(BuildArgs::default())) {
        Commands::Build(args) => {
            let options = BuildOptions {
                convert: !args.skip_convert,
                index: !args.skip_index,
                built_at: Utc::now(),
            };
            run_build(&pipeline, options, sink, output_mode)
        }
        Commands::Metadata => run_build(
            &pipeline,
            BuildOptions::metadata_only(Utc::now()),
            sink,
            output_mode,
        ),
        Commands::List => {
            let result = pipeline.list(sink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_list(&result).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_list(&result),
            }
            Ok(())
        }
    }
}

fn run_build<S: DatasetStore>(
    pipeline: &Pipeline<S, SystemCommandRunner>,
    options: BuildOptions,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let report = pipeline.build(options, sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_build(&report).into_diagnostic()?,
        OutputMode::Human => HumanOutput::print_build(&report),
    }
    Ok(())
}
