//! markup-inflator CLI
//!
//! Usage:
//!   markup-inflator [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -c, --check             Only parse the template and print its outline
//!   -t, --types <FILE>      Host type schema (TOML) to inflate against
//!       --config <FILE>     Inflator configuration (TOML)
//!       --host-type <TYPE>  Type of the host object (defaults to the root type)
//!   -v, --verbose           Log inflation steps
//!   -h, --help              Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use markup_inflator::host::{HostTypeSystem, TypeSchema};
use markup_inflator::{parse_named, InflatorConfig, Template};

#[derive(Parser)]
#[command(name = "markup-inflator")]
#[command(about = "Compile object-tree markup and inflate it into an in-memory host")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Only parse the template and print its outline
    #[arg(short, long)]
    check: bool,

    /// Host type schema (TOML format)
    #[arg(short, long)]
    types: Option<PathBuf>,

    /// Inflator configuration (TOML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Type of the host object; defaults to the template's root type
    #[arg(long)]
    host_type: Option<String>,

    /// Log inflation steps (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "markup_inflator=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    // Read input
    let (bytes, filename) = match &cli.input {
        Some(path) => match fs::read(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = Vec::new();
            match io::stdin().read_to_end(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let template = match parse_named(&bytes, &filename) {
        Ok(template) => Arc::new(template),
        Err(e) => {
            eprint!("{}", e.format(&String::from_utf8_lossy(&bytes), &filename));
            std::process::exit(1);
        }
    };

    let types = match (&cli.types, cli.check) {
        (Some(path), false) => path,
        _ => {
            print!("{}", template.outline());
            return;
        }
    };

    if let Err(message) = inflate(&cli, template, types) {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

fn inflate(cli: &Cli, template: Arc<Template>, types: &Path) -> Result<(), String> {
    let mut system = TypeSchema::from_file(types)
        .and_then(|schema| schema.build())
        .map_err(|e| format!("loading type schema '{}': {}", types.display(), e))?;

    let config = match &cli.config {
        Some(path) => InflatorConfig::from_file(path)
            .map_err(|e| format!("loading config '{}': {}", path.display(), e))?,
        None => InflatorConfig::default(),
    };

    let host_type = cli.host_type.as_deref().unwrap_or(template.root_type());
    let host = system.instantiate(host_type).map_err(|e| e.to_string())?;

    let inflator = template
        .create_inflator(config.builtin_registry())
        .with_config(config);
    let inflation = inflator.inflate(&mut system, host).map_err(|e| e.to_string())?;

    for error in &inflation.errors {
        eprintln!("warning: {}", error);
    }
    print!("{}", system.describe(host).map_err(|e| e.to_string())?);
    Ok(())
}
