use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use folio_core::{ExitCode, FolioConfig, MetsDocument, WellFormednessValidator};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Page-turner tables of contents from METS structural maps",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting FOLIO_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the table of contents of a METS document.
    Toc {
        path: PathBuf,
        /// Print an indented outline instead of JSON.
        #[arg(long)]
        outline: bool,
    },

    /// List the files a METS document declares, in document order.
    Files { path: PathBuf },

    /// Report whether a document yields a usable table of contents.
    Check { path: PathBuf },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration.
    List,
    /// Show where the config file is read from.
    Path,
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    init_tracing();

    match run() {
        Ok(code) => std::process::exit(code as i32),
        Err(err) => {
            error!(error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            std::process::exit(ExitCode::GeneralError as i32);
        }
    }
}

fn run() -> Result<ExitCode> {
    let start = Instant::now();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here, on stdout.
            err.print()?;
            return Ok(if err.use_stderr() {
                ExitCode::InvalidArgs
            } else {
                ExitCode::Success
            });
        }
    };

    let json_output = cli.json || std::env::var("FOLIO_JSON").as_deref() == Ok("1");

    let config = match FolioConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "Failed to load config {}: {err}",
                FolioConfig::config_path().display()
            );
            return Ok(ExitCode::ConfigError);
        }
    };

    match cli.command {
        // ── Toc ────────────────────────────────────────────────────────────
        Commands::Toc { path, outline } => {
            let Some(document) = open_document(&path, &config)? else {
                return Ok(ExitCode::NotFound);
            };
            log_warnings(&document);

            if !document.is_valid() {
                report_errors(&document, json_output, start)?;
                return Ok(ExitCode::InvalidDocument);
            }

            let toc = document.table_of_contents();
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": toc,
                    "meta": { "duration_ms": dur }
                }))?;
            } else if outline {
                print!("{}", document.outline());
            } else {
                println!("{}", toc.to_json(config.output.pretty_json)?);
            }
        }

        // ── Files ──────────────────────────────────────────────────────────
        Commands::Files { path } => {
            let Some(document) = open_document(&path, &config)? else {
                return Ok(ExitCode::NotFound);
            };
            log_warnings(&document);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": document.files(), "total": document.files().len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if document.files().is_empty() {
                println!("No files declared.");
            } else {
                for file in document.files() {
                    let sequence = file.sequence.map(|s| s.to_string()).unwrap_or_default();
                    println!(
                        "{id:<16}  {sequence:>5}  {media:<16}  {role:<10}  {href}",
                        id = file.id,
                        media = file.media_type,
                        role = file.role,
                        href = file.href,
                    );
                }
            }
        }

        // ── Check ──────────────────────────────────────────────────────────
        Commands::Check { path } => {
            let Some(document) = open_document(&path, &config)? else {
                return Ok(ExitCode::NotFound);
            };
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "valid": document.is_valid(),
                        "label": document.label(),
                        "alt_record_ids": document.alt_record_ids(),
                        "entries": document.entries().len(),
                        "warnings": document.warnings(),
                        "errors": document.errors(),
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                let mark = if document.is_valid() { "✓" } else { "✗" };
                println!("{mark} {}", path.display());
                if !document.label().is_empty() {
                    println!("  Label:   {}", document.label());
                }
                println!("  Entries: {}", document.entries().len());
                for warning in document.warnings() {
                    println!("  warning: {warning}");
                }
                for err in document.errors() {
                    println!("  error:   {err}");
                }
            }

            if !document.is_valid() {
                return Ok(ExitCode::InvalidDocument);
            }
        }

        // ── Config ─────────────────────────────────────────────────────────
        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::List => {
                    let kv = config_key_values(&config);
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":kv,"meta":{"duration_ms":dur}}))?;
                    } else {
                        for (k, v) in &kv {
                            println!("{k} = {v}");
                        }
                    }
                }
                ConfigAction::Path => {
                    let config_path = FolioConfig::config_path();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "path": config_path, "exists": config_path.exists() },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else if config_path.exists() {
                        println!("✓ Config: {}", config_path.display());
                    } else {
                        println!("○ Config: {} (not found, using defaults)", config_path.display());
                    }
                }
            }
        }

        // ── Version ────────────────────────────────────────────────────────
        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"version":version},"meta":{"duration_ms":dur}}))?;
            } else {
                println!("folio v{version}");
            }
        }
    }

    Ok(ExitCode::Success)
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `None` when the file does not exist.
fn open_document(path: &Path, config: &FolioConfig) -> Result<Option<MetsDocument>> {
    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        return Ok(None);
    }
    let document = MetsDocument::open(path, &WellFormednessValidator, config)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(Some(document))
}

fn log_warnings(document: &MetsDocument) {
    for warning in document.warnings() {
        warn!("{warning}");
    }
}

fn report_errors(document: &MetsDocument, json_output: bool, start: Instant) -> Result<()> {
    if json_output {
        print_json(&serde_json::json!({
            "status": "error",
            "data": { "errors": document.errors() },
            "meta": { "duration_ms": start.elapsed().as_millis() }
        }))?;
    } else if document.errors().is_empty() {
        eprintln!("No table of contents could be built.");
    } else {
        for err in document.errors() {
            eprintln!("error: {err}");
        }
    }
    Ok(())
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn config_key_values(config: &FolioConfig) -> std::collections::BTreeMap<&'static str, String> {
    let mut kv = std::collections::BTreeMap::new();
    kv.insert("schema.path", config.schema.path.clone());
    kv.insert("parser.page_type", config.parser.page_type.clone());
    kv.insert("parser.trace", config.parser.trace.to_string());
    kv.insert("output.pretty_json", config.output.pretty_json.to_string());
    kv
}
