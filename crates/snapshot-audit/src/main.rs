//! snapshot-audit: re-run sanitization, validation and outlier detection over stored snapshots.
//!
//! For each ticker, loads `<dir>/<TICKER>.json`, sanitizes the assumptions against the
//! stored ones, validates the profile and reports the valuation. With `--write` the
//! sanitized assumptions and new exclusion flags are saved back.
//!
//! Usage:
//!   cargo run -p snapshot-audit -- --all
//!   cargo run -p snapshot-audit -- --symbols FTS EMA CU
//!   cargo run -p snapshot-audit -- --all --write --dir ./snapshots
//!   cargo run -p snapshot-audit -- --all --json > audit.jsonl

use analysis_orchestrator::{
    FileSnapshotStore, NoQuotes, OrchestratorConfig, ProfileOrchestrator, ProfileOutcome, ProfileReport,
};
use std::path::PathBuf;
use std::sync::Arc;
use valuation_core::SnapshotStore;

#[derive(Debug, Clone, PartialEq)]
struct AuditArgs {
    dir: Option<PathBuf>,
    /// `None` means every stored snapshot (`--all`)
    symbols: Option<Vec<String>>,
    concurrency: Option<usize>,
    write: bool,
    json: bool,
}

/// `None` when neither `--all` nor `--symbols` was given
fn parse_args(args: &[String]) -> Option<AuditArgs> {
    let flag_value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
    };

    let symbols = if args.iter().any(|a| a == "--all") {
        None
    } else if let Some(idx) = args.iter().position(|a| a == "--symbols") {
        let symbols: Vec<String> = args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .map(|s| s.trim().to_uppercase())
            .collect();
        if symbols.is_empty() {
            return None;
        }
        Some(symbols)
    } else {
        return None;
    };

    Some(AuditArgs {
        dir: flag_value("--dir").map(PathBuf::from),
        symbols,
        concurrency: flag_value("--concurrency").and_then(|v| v.parse().ok()),
        write: args.iter().any(|a| a == "--write"),
        json: args.iter().any(|a| a == "--json"),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  snapshot-audit --all                      Audit every stored snapshot");
    eprintln!("  snapshot-audit --symbols FTS EMA ...      Specific tickers");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --dir PATH         Snapshot directory (default: $SNAPSHOT_DIR or ./snapshots)");
    eprintln!("  --concurrency N    Max parallel tickers (default: $AUDIT_CONCURRENCY or 16)");
    eprintln!("  --write            Save sanitized assumptions and exclusion flags");
    eprintln!("  --json             Print one JSON report per line instead of a summary");
}

fn init_logging() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "snapshot_audit=info,analysis_orchestrator=info".into())
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    // Logs go to stderr so --json output stays clean
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn summary_line(outcome: &ProfileOutcome) -> String {
    match outcome {
        ProfileOutcome::Evaluated(report) => report_line(report),
        ProfileOutcome::Unavailable { ticker, reason } => {
            format!("{:<8} unavailable  {}", ticker, reason)
        }
    }
}

fn report_line(report: &ProfileReport) -> String {
    let excluded: Vec<&str> = report.auto_excluded().iter().map(|m| m.label()).collect();
    let blend = &report.valuation.blend;
    format!(
        "{:<8} {:<11} changes={} errors={} warnings={} excluded=[{}] target={:.2} return={:+.1}% quality={}",
        report.ticker,
        format!("{:?}", report.outcome).to_lowercase(),
        report.sanitized.changes.len(),
        report.validation.errors.len(),
        report.validation.warnings.len(),
        excluded.join(","),
        blend.average_target,
        blend.total_return_pct,
        report.quality.overall_score,
    )
}

/// Worth persisting: the sanitizer corrected something or the detector excluded a metric
fn needs_write(report: &ProfileReport) -> bool {
    report.sanitized.is_modified() || !report.auto_excluded().is_empty()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let Some(audit) = parse_args(&args) else {
        print_usage();
        std::process::exit(1);
    };

    let mut config = OrchestratorConfig::from_env()?;
    if let Some(dir) = audit.dir.clone() {
        config.snapshot_dir = dir;
    }
    if let Some(concurrency) = audit.concurrency {
        config.concurrency = concurrency.max(1);
    }

    let store = Arc::new(FileSnapshotStore::new(&config.snapshot_dir));
    let symbols = match audit.symbols.clone() {
        Some(symbols) => {
            let duplicates = validation::detect_duplicate_tickers(&symbols);
            if !duplicates.is_empty() {
                tracing::warn!("Duplicate tickers requested: {}", duplicates.join(", "));
            }
            symbols
        }
        None => store.list_tickers().await?,
    };

    tracing::info!(
        "snapshot-audit: {} tickers, dir={}, write={}, concurrency={}",
        symbols.len(),
        config.snapshot_dir.display(),
        audit.write,
        config.concurrency
    );

    let orchestrator = Arc::new(ProfileOrchestrator::new(
        store,
        Arc::new(NoQuotes),
        Arc::new(config.bounds_provider()),
    ));

    let outcomes = orchestrator.evaluate_batch(&symbols, config.concurrency).await;

    let mut written = 0usize;
    let mut write_failures = 0usize;
    for outcome in &outcomes {
        if audit.json {
            println!("{}", serde_json::to_string(outcome)?);
        } else {
            println!("{}", summary_line(outcome));
        }

        if let ProfileOutcome::Evaluated(report) = outcome {
            if audit.write && needs_write(report) {
                match orchestrator.persist(report).await {
                    Ok(()) => written += 1,
                    Err(e) => {
                        write_failures += 1;
                        tracing::warn!("Failed to save {}: {}", report.ticker, e);
                    }
                }
            }
        }
    }

    let evaluated = outcomes
        .iter()
        .filter(|o| matches!(o, ProfileOutcome::Evaluated(_)))
        .count();
    let corrected = outcomes
        .iter()
        .filter(|o| matches!(o, ProfileOutcome::Evaluated(r) if needs_write(r)))
        .count();
    tracing::info!(
        "Done! {}/{} evaluated, {} needing correction, {} written ({} failed)",
        evaluated,
        outcomes.len(),
        corrected,
        written,
        write_failures
    );
    Ok(())
}
