//! licprobe CLI - read-only licensing/activation diagnostics.
//!
//! Wires the aggregation engine to the portable provider set plus the
//! real external-interpreter runner and prints the resulting report.
//! On hosts without a licensing stack the report is honest about which
//! sources were unavailable rather than failing.

use clap::Parser;
use licprobe_core::engine::{DiagnosticEngine, ProviderSet};
use licprobe_core::providers::ProcessInterpreter;
use licprobe_core::{CancellationToken, EngineConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// licprobe - read-only licensing/activation diagnostics.
///
/// Runs every available probe (firmware activation table, registry,
/// instrumentation, service state, the native licensing library, and an
/// optional interpreter fallback), normalizes status codes, and prints
/// one aggregated report. Probe failures degrade to notes; the command
/// only fails outright when the run is cancelled.
#[derive(Parser)]
#[command(name = "licprobe")]
#[command(version = VERSION)]
#[command(about = "Read-only licensing/activation diagnostics")]
struct Cli {
    /// Disclose sensitive values (full product keys, installation ids).
    /// Without this flag they appear as a hidden marker.
    #[arg(long)]
    sensitive: bool,

    /// Skip the external-interpreter fallback step.
    #[arg(long)]
    no_fallback: bool,

    /// Output format (json, pretty)
    #[arg(short, long, default_value = "pretty")]
    format: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = EngineConfig::default();
    let mut providers = ProviderSet::unsupported();
    providers.fallback = Box::new(ProcessInterpreter::new(
        config.interpreter_candidates.clone(),
    ));
    let engine = DiagnosticEngine::with_config(providers, config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match engine
        .aggregate(cli.sensitive, !cli.no_fallback, &cancel)
        .await
    {
        Ok(report) => {
            let rendered = if cli.format == "json" {
                serde_json::to_string(&report)
            } else {
                serde_json::to_string_pretty(&report)
            };
            match rendered {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("failed to serialize report: {e}");
                    std::process::exit(1);
                }
            }
            if report.contains_sensitive_data() {
                eprintln!("note: this report contains disclosed sensitive values");
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(130);
        }
    }
}
