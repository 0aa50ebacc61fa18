use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kolscope_core::error::ExitCode;
use kolscope_core::{AppConfig, ProfileStore};
use kolscope_science::{BatchOrchestrator, BatchReport, normalize_date};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "kolscope",
    about = "Key opinion leader profiles from PubMed and a generative fallback",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to $KOLSCOPE_CONFIG or the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging on stderr. RUST_LOG takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich subjects and store their profiles.
    Enrich {
        /// Subject names.
        names: Vec<String>,
        /// File with one name per line, or a JSON array of names.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print one stored profile.
    Get { name: String },

    /// List stored profile summaries.
    List {
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Normalize a publication date to YYYY-MM-DD.
    NormalizeDate { raw: String },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write the default configuration file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);

    match cli.command {
        Commands::Enrich {
            names,
            file,
            batch_size,
            concurrency,
        } => {
            let start = Instant::now();
            match run_enrich(&config_path, names, file.as_deref(), batch_size, concurrency).await {
                Ok(report) => {
                    print_json(&serde_json::json!({
                        "status": 200,
                        "stored": report.stored,
                        "skipped": report.skipped,
                        "failed": report.failed,
                        "meta": { "duration_ms": start.elapsed().as_millis() }
                    }))?;
                }
                Err(e) => {
                    print_json(&serde_json::json!({"status": 500, "error": format!("{e:#}")}))?;
                    std::process::exit(ExitCode::GeneralError as i32);
                }
            }
        }

        Commands::Get { name } => {
            let store = open_store(&load_config(&config_path)?)?;
            match store.get(&name)? {
                Some(record) => print_json(&serde_json::json!({"status": 200, "data": record}))?,
                None => {
                    print_json(&serde_json::json!({
                        "status": 404,
                        "error": format!("no profile stored for {name}")
                    }))?;
                    std::process::exit(ExitCode::NotFound as i32);
                }
            }
        }

        Commands::List { limit } => {
            let store = open_store(&load_config(&config_path)?)?;
            let summaries = store.list_summaries(limit)?;
            let total = store.count()?;
            print_json(&serde_json::json!({
                "status": 200,
                "data": { "items": summaries, "total": total, "limit": limit }
            }))?;
        }

        Commands::NormalizeDate { raw } => {
            println!("{}", normalize_date(&raw));
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let mut config = load_config(&config_path)?;
                if config.pubmed.api_key.is_some() {
                    config.pubmed.api_key = Some("********".to_string());
                }
                print_json(&serde_json::to_value(&config)?)?;
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    eprintln!(
                        "Config already exists at {}. Pass --force to overwrite.",
                        config_path.display()
                    );
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
                AppConfig::default().save_to(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },
    }

    Ok(())
}

async fn run_enrich(
    config_path: &Path,
    names: Vec<String>,
    file: Option<&Path>,
    batch_size: Option<usize>,
    concurrency: Option<usize>,
) -> Result<BatchReport> {
    let mut config = load_config(config_path)?;
    if let Some(size) = batch_size {
        config.batch.batch_size = size;
    }
    if let Some(limit) = concurrency {
        config.batch.concurrency = limit;
    }
    config.validate()?;

    let subjects = collect_subjects(names, file)?;
    if subjects.is_empty() {
        bail!("no subjects given; pass names or --file");
    }

    let store = Arc::new(open_store(&config)?);
    let orchestrator = BatchOrchestrator::from_config(&config, store)?;
    info!(
        subjects = subjects.len(),
        batch_size = orchestrator.options().batch_size,
        concurrency = orchestrator.options().concurrency,
        "starting enrichment"
    );
    Ok(orchestrator.run(&subjects).await)
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_from(path).with_context(|| format!("loading config from {}", path.display()))
}

fn open_store(config: &AppConfig) -> Result<ProfileStore> {
    let path = config.database_path();
    ProfileStore::open(&path).with_context(|| format!("opening profile store {}", path.display()))
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

/// Names from the command line followed by names from `file`, trimmed,
/// blanks dropped, first occurrence kept.
fn collect_subjects(names: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    let mut all = names;
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading subject file {}", path.display()))?;
        all.extend(parse_subject_list(&text)?);
    }

    let mut seen = HashSet::new();
    Ok(all
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect())
}

/// A JSON array of strings, or one name per line.
fn parse_subject_list(text: &str) -> Result<Vec<String>> {
    if text.trim_start().starts_with('[') {
        let names: Vec<String> =
            serde_json::from_str(text).context("subject file is not a JSON array of names")?;
        return Ok(names);
    }
    Ok(text.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn newline_file_is_trimmed_and_deduplicated() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Alan Paul Venook\n\n  Jane Roe  \nAlan Paul Venook").unwrap();

        let subjects = collect_subjects(vec!["John Doe".to_string()], Some(file.path())).unwrap();
        assert_eq!(subjects, vec!["John Doe", "Alan Paul Venook", "Jane Roe"]);
    }

    #[test]
    fn json_array_file_is_accepted() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"["Jane Roe", "", "John Doe", "Jane Roe"]"#).unwrap();

        let subjects = collect_subjects(Vec::new(), Some(file.path())).unwrap();
        assert_eq!(subjects, vec!["Jane Roe", "John Doe"]);
    }

    #[test]
    fn malformed_json_array_is_an_error() {
        assert!(parse_subject_list("[\"Jane Roe\",").is_err());
    }

    #[test]
    fn cli_parses_enrich_flags() {
        let cli = Cli::try_parse_from([
            "kolscope",
            "--verbose",
            "enrich",
            "Jane Roe",
            "John Doe",
            "--batch-size",
            "5",
            "--concurrency",
            "2",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Enrich {
                names,
                batch_size,
                concurrency,
                file,
            } => {
                assert_eq!(names, vec!["Jane Roe", "John Doe"]);
                assert_eq!(batch_size, Some(5));
                assert_eq!(concurrency, Some(2));
                assert!(file.is_none());
            }
            _ => panic!("expected enrich"),
        }
    }
}
