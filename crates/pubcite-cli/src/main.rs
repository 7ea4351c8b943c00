use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;

use pubcite_core::{ExitCode, Identifier, IdentifierBatch, PubciteConfig};
use pubcite_science::formats::{to_csl_json, write_csl_json};
use pubcite_science::{
    BatchRunner, FailureKind, PageClient, PageOutcome, PubMedSource, extract_page,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "pubcite",
    about = "Extract PubMed citation metadata into CSL-JSON",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting PUBCITE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metadata for every identifier in a JSON input file.
    Run {
        /// JSON object mapping keys to {"doi": ..., "pmid": ...} entries.
        input: PathBuf,
        /// Output CSL-JSON path (defaults to output.path from config).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Always fetch pages, bypassing the page cache.
        #[arg(long)]
        no_cache: bool,
    },

    /// Extract one record from a saved article page.
    Extract {
        file: PathBuf,
        /// DOI the page was searched for.
        #[arg(long, conflicts_with = "pmid")]
        doi: Option<String>,
        /// PMID the page was searched for.
        #[arg(long)]
        pmid: Option<String>,
    },

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
    /// List all config values.
    List,
    /// Get a config value by key.
    Get { key: String },
    /// Print the config file path.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("PUBCITE_JSON").as_deref() == Ok("1");
    init_tracing(cli.verbose, cli.quiet);

    let mut config = PubciteConfig::load()?;
    debug!(path = %PubciteConfig::config_path().display(), "config loaded");

    match cli.command {
        // ── Run ────────────────────────────────────────────────────────────

        Commands::Run {
            input,
            output,
            no_cache,
        } => {
            if no_cache {
                config.cache.enabled = false;
            }
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.path));

            let batch = IdentifierBatch::from_path(&input)
                .with_context(|| format!("cannot read identifiers from {}", input.display()))?;
            let source = Arc::new(PubMedSource::with_query_url(&config.fetch.query_url)?);
            let fetcher = Arc::new(PageClient::from_config(&config)?);
            let runner = BatchRunner::new(source, fetcher);

            let outcome = runner.run(&batch).await;
            if let Err(e) = write_csl_json(&output, &outcome.records, config.output.pretty) {
                eprintln!("Cannot write {}: {e}", output.display());
                std::process::exit(ExitCode::FileSystemError as i32);
            }

            let summary = outcome.summary();
            let dur = start.elapsed().as_millis();
            if json_output {
                let status = if summary.has_failures() { "partial" } else { "ok" };
                print_json(&serde_json::json!({
                    "status": status,
                    "data": {
                        "output": output,
                        "summary": summary,
                        "failures": outcome.failures,
                        "not_found": outcome.not_found,
                        "partial": outcome.partial,
                        "skipped": outcome.skipped,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!(
                    "Extracted {} of {} records → {}",
                    summary.extracted,
                    summary.total,
                    output.display()
                );
                for id in &outcome.not_found {
                    println!("  not found   {id}");
                }
                for failure in &outcome.failures {
                    println!(
                        "  failed      {}  [{}] {}",
                        failure.identifier, failure.stage, failure.message
                    );
                }
                for note in &outcome.partial {
                    let missing: Vec<&str> = note.missing.iter().map(|f| f.as_str()).collect();
                    println!("  partial     {}  missing {}", note.id, missing.join(", "));
                }
                for key in &outcome.skipped {
                    println!("  skipped     {key}");
                }
            }

            let offline = summary.extracted == 0
                && summary.has_failures()
                && outcome.failures.iter().all(|f| f.kind == FailureKind::Fetch);
            if offline {
                std::process::exit(ExitCode::NetworkError as i32);
            }
            if summary.has_failures() {
                std::process::exit(ExitCode::PartialFailure as i32);
            }
        }

        // ── Extract ────────────────────────────────────────────────────────

        Commands::Extract { file, doi, pmid } => {
            let id = match (doi, pmid) {
                (Some(doi), _) => Identifier::doi(&doi)?,
                (None, Some(pmid)) => Identifier::pmid(&pmid)?,
                (None, None) => {
                    eprintln!("Pass the identifier the page was searched for: --doi or --pmid");
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
            };
            let markup = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;

            let source = PubMedSource::with_query_url(&config.fetch.query_url)?;
            let page = extract_page(&source, &id, &markup);
            let dur = start.elapsed().as_millis();

            match page {
                PageOutcome::Extracted(record) => {
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":record,"meta":{"duration_ms":dur}}))?;
                    } else {
                        println!("{}", to_csl_json(&[record], true)?);
                    }
                }
                PageOutcome::NotFound(notice) => {
                    if json_output {
                        print_json(&serde_json::json!({"status":"error","error":"not_found","message":notice,"meta":{"duration_ms":dur}}))?;
                    } else {
                        eprintln!("Not found: {notice}");
                    }
                    std::process::exit(ExitCode::NotFound as i32);
                }
                PageOutcome::Failed(failure) => {
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "error",
                            "error": failure.error.kind(),
                            "stage": failure.stage,
                            "message": failure.error.to_string(),
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        eprintln!("Extraction failed at {failure}");
                    }
                    std::process::exit(ExitCode::GeneralError as i32);
                }
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
                ConfigAction::Get { key } => {
                    let kv = config_key_values(&config);
                    match kv.get(key.as_str()) {
                        Some(val) => {
                            if json_output {
                                print_json(&serde_json::json!({"status":"ok","data":{"key":key,"value":val},"meta":{"duration_ms":dur}}))?;
                            } else {
                                println!("{val}");
                            }
                        }
                        None => {
                            eprintln!("Unknown config key: {key}");
                            std::process::exit(ExitCode::InvalidArgs as i32);
                        }
                    }
                }
                ConfigAction::Path => {
                    let path = PubciteConfig::config_path();
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":{"path":path,"exists":path.exists()},"meta":{"duration_ms":dur}}))?;
                    } else {
                        println!("{}", path.display());
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
                println!("pubcite v{version}");
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "pubcite=error"
    } else {
        match verbose {
            0 => "pubcite=info",
            1 => "pubcite=debug",
            _ => "pubcite=trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn config_key_values(config: &PubciteConfig) -> BTreeMap<&'static str, String> {
    let mut map = BTreeMap::new();
    map.insert("fetch.query_url", config.fetch.query_url.clone());
    map.insert("fetch.min_interval_ms", config.fetch.min_interval_ms.to_string());
    map.insert("fetch.max_retries", config.fetch.max_retries.to_string());
    map.insert("fetch.timeout_secs", config.fetch.timeout_secs.to_string());
    map.insert("fetch.user_agents", config.fetch.user_agents.len().to_string());
    map.insert("cache.enabled", config.cache.enabled.to_string());
    map.insert("cache.ttl_hours", config.cache.ttl_hours.to_string());
    map.insert("cache.directory", config.cache_dir().to_string_lossy().to_string());
    map.insert("output.path", config.output.path.clone());
    map.insert("output.pretty", config.output.pretty.to_string());
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_output_and_cache_flags() {
        let cli = Cli::try_parse_from([
            "pubcite", "run", "ids.json", "-o", "out.csl.json", "--no-cache", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run {
                input,
                output,
                no_cache,
            } => {
                assert_eq!(input, PathBuf::from("ids.json"));
                assert_eq!(output, Some(PathBuf::from("out.csl.json")));
                assert!(no_cache);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn extract_rejects_both_identifiers() {
        let parsed = Cli::try_parse_from([
            "pubcite", "extract", "page.html", "--doi", "10.1/x", "--pmid", "1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn config_keys_cover_every_section() {
        let kv = config_key_values(&PubciteConfig::default());
        assert_eq!(kv["fetch.min_interval_ms"], "1000");
        assert_eq!(kv["cache.enabled"], "true");
        assert_eq!(kv["output.path"], "article_metadata.csl.json");
    }
}
