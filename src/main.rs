//! procdesc - Main entry point
//!
//! Reads annotated scripts from disk and prints parse results, validation
//! reports, process descriptions and links as JSON on stdout. Logs go to
//! stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use procdesc::catalog::{describe_all, ScriptSource};
use procdesc::cli::{script_id_from_path, Cli, Commands, ScriptArgs};
use procdesc::config::Config;
use procdesc::links::collect_links;
use procdesc::parser::ParsedScript;

/// Initialize the tracing subscriber, honouring RUST_LOG
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    debug!("CLI arguments parsed");

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse(args) => {
            let parsed = parse_script(&config, &args)?;
            print_json(&parsed)?;
        }
        Commands::Validate(args) => {
            let registries = config.registries();
            let file = open_script(&args.script)?;
            let errors = registries
                .validator()
                .validate_script(file, &config.public_script_id(&args.script_id()));

            let report: Vec<String> = errors.iter().map(ToString::to_string).collect();
            print_json(&report)?;
            if !errors.is_empty() {
                error!(script = ?args.script, count = errors.len(), "script is not valid");
                std::process::exit(1);
            }
            info!(script = ?args.script, "script is valid");
        }
        Commands::Describe(args) => {
            let registries = config.registries();
            let parsed = parse_script(&config, &args)?;
            let description = registries
                .synthesizer()
                .synthesize(&parsed.annotations, &config.public_script_id(&args.script_id()))
                .with_context(|| format!("Failed to describe {:?}", args.script))?;
            print_json(&description)?;
        }
        Commands::Links(args) => {
            let generator = config.url_generator()?;
            let parsed = parse_script(&config, &args)?;
            let links = collect_links(&parsed, &args.script_id(), &generator, &config)?;
            print_json(&links)?;
        }
        Commands::Catalog { scripts } => {
            let mut sources = Vec::with_capacity(scripts.len());
            for path in &scripts {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read script {:?}", path))?;
                sources.push(ScriptSource::new(script_id_from_path(path), text));
            }

            let registries = config.registries();
            let catalog = describe_all(&sources, &config, &registries);
            print_json(&catalog.report())?;
        }
        Commands::CheckConfig { config: path } => {
            info!("Checking configuration file: {:?}", path);
            match Config::load_from_file(&path).and_then(|config| config.validate()) {
                Ok(()) => {
                    info!("Configuration check successful");
                    println!("✓ Configuration file is valid: {:?}", path);
                }
                Err(e) => {
                    error!("Configuration check failed: {:#}", e);
                    eprintln!("✗ Configuration check failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Load and validate the configuration, or use defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    info!("Loading configuration from: {:?}", path);
    let config = Config::load_from_file(path)?;
    config.validate()?;
    Ok(config)
}

fn open_script(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open script {:?}", path))?;
    Ok(BufReader::new(file))
}

fn parse_script(config: &Config, args: &ScriptArgs) -> Result<ParsedScript> {
    let reader = open_script(&args.script)?;
    config
        .parser()
        .parse(reader)
        .with_context(|| format!("Failed to parse annotations of {:?}", args.script))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
