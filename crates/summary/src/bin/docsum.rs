//! docsum — summarize one document from the command line.
//!
//! Reads UTF-8 text from a file (or stdin), summarizes it with the strategy
//! for the given document type or classifier label, and prints the response
//! as JSON on stdout. Logs and validation warnings go to stderr.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use docsum_core::config::{load_dotenv, Config};
use docsum_core::{DocumentType, ModelRegistry};
use docsum_llm::create_provider;
use docsum_summary::{validate_summary, DocumentSummaryService, SummaryRequest};

// ── CLI ─────────────────────────────────────────────────────────────

/// Summarize a document with a type-specific model.
#[derive(Parser, Debug)]
#[command(name = "docsum", version, about)]
struct Cli {
    /// Text file to summarize; `-` or omitted reads stdin.
    input: Option<PathBuf>,

    /// Document type (legal_contract, email, financial_report, ...).
    #[arg(long = "type", value_parser = parse_document_type, conflicts_with = "label")]
    document_type: Option<DocumentType>,

    /// Free-text classifier label, mapped to a document type.
    #[arg(long)]
    label: Option<String>,

    /// TOML model table overriding the built-in models.
    #[arg(long, env = "SUMMARY_MODELS_PATH")]
    models: Option<PathBuf>,

    /// Pretty-print the JSON response.
    #[arg(long)]
    pretty: bool,

    /// List document types and their strategies, then exit.
    #[arg(long)]
    list: bool,
}

fn parse_document_type(s: &str) -> Result<DocumentType, String> {
    s.parse::<DocumentType>().map_err(|e| e.to_string())
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)
            .with_context(|| format!("failed to read {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if cli.models.is_some() {
        config.summary.models_path = cli.models.clone();
    }
    config.log_summary();

    let registry = match &config.summary.models_path {
        Some(path) => ModelRegistry::from_file(path)
            .with_context(|| format!("invalid model table {}", path.display()))?,
        None => ModelRegistry::builtin(),
    };

    let backend = create_provider(&config.llm, &config.ollama).context("LLM provider")?;
    info!(provider = backend.provider_name(), "inference backend ready");

    let service = DocumentSummaryService::with_registry(&config, &registry, backend)
        .context("failed to build summary strategies")?;

    if cli.list {
        for (document_type, strategy) in service.available_strategies() {
            let model = registry.config_for(document_type);
            println!(
                "{:<18} {:<16} {} ({} tokens, {} reserved)",
                document_type.as_str(),
                strategy,
                model.model_id,
                model.max_input_tokens,
                model.reserved_output_tokens
            );
        }
        return Ok(());
    }

    let content = read_input(cli.input.as_ref())?;
    let mut request = SummaryRequest::new(content);
    request.document_type = cli.document_type;
    request.classification_label = cli.label;

    let response = service
        .summarize(&request)
        .await
        .map_err(|e| anyhow::anyhow!(e.detailed_message()))?;

    let validation = validate_summary(&response);
    for issue in &validation.issues {
        warn!(request_id = %response.request_id, "{}", issue);
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");
    Ok(())
}
