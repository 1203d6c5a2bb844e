use std::fs;
use std::path::{Path, PathBuf};

use attribute_schema_core::{Diagnostics, PlanInputs, Schema, Snapshot, Value};
use attribute_schema_db::{
    EngineConfig, FingerprintManifest, RegistryBuilder, SchemaRegistry, wire_fingerprint,
};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Output format for wire schemas.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "attr-schema")]
#[command(about = "Validate configurations, plan changes and publish attribute schemas")]
struct Cli {
    /// Engine configuration YAML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory of schema definition files; overrides the configured sources.
    #[arg(long = "schemas", global = true)]
    schema_dirs: Vec<PathBuf>,
    /// Schema bundle file; overrides the configured sources.
    #[arg(long = "bundle", global = true)]
    bundles: Vec<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the wire form of one or all schemas.
    Wire(WireArgs),
    /// Validate configuration files against a schema.
    Validate(ValidateArgs),
    /// Run plan modification and print the planned values.
    Plan(PlanArgs),
    /// Print wire fingerprints and compare them with a manifest.
    Fingerprint(FingerprintArgs),
    /// Check that every schema converts to its wire form.
    Check,
}

#[derive(Debug, Args)]
struct WireArgs {
    /// Schema name (default: all schemas).
    #[arg(long)]
    schema: Option<String>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Write to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema name.
    #[arg(long)]
    schema: String,
    /// Configuration JSON files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Schema name.
    #[arg(long)]
    schema: String,
    /// Configuration JSON file.
    #[arg(long)]
    configuration: PathBuf,
    /// Prior state JSON file (default: null, a create).
    #[arg(long)]
    state: Option<PathBuf>,
    /// Proposed plan JSON file.
    #[arg(long)]
    proposed: PathBuf,
}

#[derive(Debug, Args)]
struct FingerprintArgs {
    /// Fingerprint manifest to compare against.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Write the current fingerprints to the manifest.
    #[arg(long, requires = "manifest")]
    update: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_filter.as_deref());

    let result = match &cli.command {
        Command::Wire(args) => run_wire(&cli, &config, args),
        Command::Validate(args) => run_validate(&cli, &config, args),
        Command::Plan(args) => run_plan(&cli, &config, args),
        Command::Fingerprint(args) => run_fingerprint(&cli, &config, args),
        Command::Check => run_check(&cli, &config),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or(DEFAULT_LOG_FILTER)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => EngineConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_registry(cli: &Cli, config: &EngineConfig) -> Result<SchemaRegistry, String> {
    match (cli.schema_dirs.as_slice(), cli.bundles.as_slice()) {
        ([], []) => {
            if config.schema_dirs.is_empty() && config.bundles.is_empty() {
                return Err("no schema sources configured; pass --schemas or --bundle".to_string());
            }
            config.registry_builder().build().map_err(|e| e.to_string())
        }
        // A single source reports its own error instead of the fallback summary.
        ([dir], []) => SchemaRegistry::from_dir(dir)
            .map_err(|e| format!("Failed to load schemas from '{}': {e}", dir.display())),
        ([], [bundle]) => SchemaRegistry::from_bundle(bundle)
            .map_err(|e| format!("Failed to load bundle '{}': {e}", bundle.display())),
        (dirs, bundles) => {
            let builder = dirs
                .iter()
                .fold(RegistryBuilder::new(), |b, dir| b.from_dir(dir.clone()));
            bundles
                .iter()
                .fold(builder, |b, bundle| b.from_bundle(bundle.clone()))
                .build()
                .map_err(|e| e.to_string())
        }
    }
}

fn lookup<'a>(registry: &'a SchemaRegistry, name: &str) -> Result<&'a Schema, String> {
    registry.get(name).ok_or_else(|| {
        format!(
            "unknown schema '{name}' (available: {})",
            registry.names().join(", ")
        )
    })
}

fn read_json(path: &Path) -> Result<serde_json::Value, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("Failed to parse '{}': {e}", path.display()))
}

fn read_value(schema: &Schema, path: &Path) -> Result<Value, String> {
    let json = read_json(path)?;
    schema
        .value_from_json(&json)
        .map_err(|e| format!("'{}': {e}", path.display()))
}

fn write_output(output: Option<&Path>, rendered: &str) -> Result<(), String> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|err| {
                        format!(
                            "Failed to create output directory '{}': {err}",
                            parent.display()
                        )
                    })?;
                }
            }
            fs::write(path, rendered)
                .map_err(|err| format!("Failed to write '{}': {err}", path.display()))
        }
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn fails(diags: &Diagnostics, fail_on_warnings: bool) -> bool {
    diags.has_errors() || (fail_on_warnings && diags.warnings().next().is_some())
}

fn run_wire(cli: &Cli, config: &EngineConfig, args: &WireArgs) -> Result<(), String> {
    let registry = load_registry(cli, config)?;

    let rendered = match &args.schema {
        Some(name) => {
            let wire = lookup(&registry, name)?
                .to_wire()
                .map_err(|e| format!("schema '{name}': {e}"))?;
            render(&wire, args.format)?
        }
        None => {
            let mut all = serde_json::Map::new();
            for name in registry.names() {
                let wire = lookup(&registry, name)?
                    .to_wire()
                    .map_err(|e| format!("schema '{name}': {e}"))?;
                let value = serde_json::to_value(&wire)
                    .map_err(|e| format!("Failed to serialize '{name}': {e}"))?;
                all.insert(name.to_string(), value);
            }
            render(&all, args.format)?
        }
    };

    write_output(args.output.as_deref(), rendered.trim_end())
}

fn render<T: serde::Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        CliOutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    }
}

fn run_validate(cli: &Cli, config: &EngineConfig, args: &ValidateArgs) -> Result<(), String> {
    use rayon::prelude::*;

    let registry = load_registry(cli, config)?;
    let schema = lookup(&registry, &args.schema)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let outcomes: Vec<Result<Diagnostics, String>> = pool.install(|| {
        args.inputs
            .par_iter()
            .map(|path| -> Result<Diagnostics, String> {
                let value = read_value(schema, path)?;
                debug!(path = %path.display(), "validating configuration");
                Ok(schema.validate(&Snapshot::new(value)))
            })
            .collect()
    });

    let mut failed = 0usize;
    for (path, outcome) in args.inputs.iter().zip(outcomes) {
        match outcome {
            Ok(diags) => {
                for diag in &diags {
                    println!("{}: {diag}", path.display());
                }
                if fails(&diags, config.fail_on_warnings) {
                    failed += 1;
                }
            }
            Err(err) => {
                eprintln!("{err}");
                failed += 1;
            }
        }
    }

    info!(files = args.inputs.len(), failed, "validation finished");
    if failed > 0 {
        return Err(format!(
            "{failed} of {} configuration file(s) failed validation",
            args.inputs.len()
        ));
    }
    println!(
        "Validated {} configuration file(s) against '{}'.",
        args.inputs.len(),
        args.schema
    );
    Ok(())
}

fn run_plan(cli: &Cli, config: &EngineConfig, args: &PlanArgs) -> Result<(), String> {
    let registry = load_registry(cli, config)?;
    let schema = lookup(&registry, &args.schema)?;

    let configuration = Snapshot::new(read_value(schema, &args.configuration)?);
    let state = match &args.state {
        Some(path) => Snapshot::new(read_value(schema, path)?),
        None => Snapshot::null(),
    };
    let proposed = Snapshot::new(read_value(schema, &args.proposed)?);
    let provider_meta = Value::from(config.provider_meta.clone());

    let outcome = schema.modify_plan(&PlanInputs {
        config: &configuration,
        state: &state,
        plan: &proposed,
        provider_meta: &provider_meta,
    });

    let requires_replace: Vec<String> = outcome
        .requires_replace
        .iter()
        .map(ToString::to_string)
        .collect();
    let report = serde_json::json!({
        "planned": outcome.planned.to_json(),
        "requires_replace": requires_replace,
        "diagnostics": outcome.diagnostics,
    });
    let rendered =
        serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to render plan: {e}"))?;
    println!("{rendered}");

    if fails(&outcome.diagnostics, config.fail_on_warnings) {
        return Err("plan modification reported errors".to_string());
    }
    Ok(())
}

fn run_fingerprint(
    cli: &Cli,
    config: &EngineConfig,
    args: &FingerprintArgs,
) -> Result<(), String> {
    let registry = load_registry(cli, config)?;

    let mut current = FingerprintManifest::new();
    for name in registry.names() {
        let wire = lookup(&registry, name)?
            .to_wire()
            .map_err(|e| format!("schema '{name}': {e}"))?;
        let fingerprint = wire_fingerprint(&wire).map_err(|e| e.to_string())?;
        println!("{fingerprint}  {name}");
        current.update_entry(name, &fingerprint, wire.version);
    }

    let Some(manifest_path) = &args.manifest else {
        return Ok(());
    };

    let previous = if manifest_path.exists() {
        FingerprintManifest::load(manifest_path).map_err(|e| {
            format!(
                "Failed to load manifest '{}': {e}",
                manifest_path.display()
            )
        })?
    } else {
        FingerprintManifest::new()
    };

    let changed = previous.changed_schemas(&current);
    if changed.is_empty() {
        println!("No schema changes.");
    } else {
        println!("Changed schemas: {}", changed.join(", "));
    }

    if args.update {
        current.save(manifest_path).map_err(|e| {
            format!(
                "Failed to write manifest '{}': {e}",
                manifest_path.display()
            )
        })?;
        info!(manifest = %manifest_path.display(), "updated fingerprint manifest");
    }
    Ok(())
}

fn run_check(cli: &Cli, config: &EngineConfig) -> Result<(), String> {
    let registry = load_registry(cli, config)?;

    let mut failures = Vec::new();
    for name in registry.names() {
        let schema = lookup(&registry, name)?;
        match schema.to_wire() {
            Ok(_) => println!("ok: {name}"),
            Err(err) => {
                println!("invalid: {name}: {err}");
                failures.push(name);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} schema(s) failed the check: {}",
            failures.len(),
            failures.join(", ")
        ))
    }
}
