use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use sqlsynth_core::{GeneratorConfig, Schema, validate_schema};
use sqlsynth_sqlite::{load_schema, open_read_only, open_with_script};
use sqlsynth_synth::{SynthesisOutput, VerbatimNamer, synthesize};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Output format of generated documents.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "sqlsynth")]
#[command(about = "Synthesize typed data-access specifications from a SQLite schema")]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Synthesize entity bundles for every table and view.
    Generate(GenerateArgs),
    /// Print the schema model read from the catalog.
    Inspect(InspectArgs),
    /// Resolve the column indices of a statement for one entity.
    Lookup(LookupArgs),
}

/// Where the schema comes from.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// SQLite database file, opened read-only.
    #[arg(long)]
    db: Option<PathBuf>,
    /// SQL script creating the schema, run on an in-memory database.
    #[arg(long)]
    sql: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Generator configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct LookupArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Generator configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Entity whose properties are resolved.
    #[arg(long)]
    entity: String,
    /// Statement to resolve. It is prepared, never run.
    #[arg(long)]
    query: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Lookup(args) => run_lookup(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let config = load_config(args.config.as_ref())?;
    let conn = open_source(&args.source)?;
    let schema = read_schema(&conn)?;
    let output = synthesize(&schema, &config, &VerbatimNamer).map_err(|err| err.to_string())?;

    for diagnostic in &output.diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    let raw = format_output(&output, args.format)?;
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|err| {
                        format!("Failed to create output directory '{}': {err}", parent.display())
                    })?;
                }
            }
            fs::write(path, raw).map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
            eprintln!("{}", output.report().summary());
            eprintln!("Wrote '{}'.", path.display());
        }
        None => println!("{raw}"),
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let conn = open_source(&args.source)?;
    let schema = read_schema(&conn)?;
    let raw = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&schema)
            .map_err(|err| format!("Failed to serialize schema: {err}"))?,
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(&schema).map_err(|err| format!("Failed to serialize schema: {err}"))?
        }
    };
    println!("{raw}");
    Ok(())
}

fn run_lookup(args: LookupArgs) -> Result<(), String> {
    let config = load_config(args.config.as_ref())?;
    let conn = open_source(&args.source)?;
    let schema = read_schema(&conn)?;
    let output = synthesize(&schema, &config, &VerbatimNamer).map_err(|err| err.to_string())?;
    let bundle = output
        .bundle(&args.entity)
        .ok_or_else(|| format!("Unknown entity '{}'", args.entity))?;

    let stmt = conn
        .prepare(&args.query)
        .map_err(|err| format!("Failed to prepare query: {err}"))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    debug!(entity = %args.entity, columns = columns.len(), "Resolving statement columns");

    let resolved = bundle.dynamic_lookup.resolve(&columns);
    for (property, index) in resolved.pairs() {
        println!("{property}\t{index}");
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<GeneratorConfig, String> {
    match path {
        Some(path) => GeneratorConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display())),
        None => Ok(GeneratorConfig::default()),
    }
}

fn open_source(source: &SourceArgs) -> Result<Connection, String> {
    match (&source.db, &source.sql) {
        (Some(path), _) => open_read_only(path)
            .map_err(|err| format!("Failed to open database '{}': {err}", path.display())),
        (None, Some(path)) => {
            let script = fs::read_to_string(path)
                .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
            open_with_script(&script)
                .map_err(|err| format!("Failed to run schema script '{}': {err}", path.display()))
        }
        (None, None) => Err("Specify a schema source: --db or --sql".to_string()),
    }
}

fn read_schema(conn: &Connection) -> Result<Schema, String> {
    let schema = load_schema(conn).map_err(|err| err.to_string())?;
    for finding in validate_schema(&schema) {
        warn!(%finding, "Schema validation finding");
    }
    Ok(schema)
}

fn format_output(output: &SynthesisOutput, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(output)
            .map_err(|err| format!("Failed to serialize bundles: {err}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(output).map_err(|err| format!("Failed to serialize bundles: {err}"))
        }
    }
}
