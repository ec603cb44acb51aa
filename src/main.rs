//! CLI entry point for the group ranking tool.
//!
//! Provides subcommands for ranking a local table file and for ranking the
//! result of a query against the remote query service.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use group_rank::aggregator::types::RankedGroups;
use group_rank::auth::TokenTable;
use group_rank::config::ServiceConfig;
use group_rank::handler::{Credentials, Handler};
use group_rank::infra::sql_api::SqlApiClient;
use group_rank::output::{RankedOutput, print_json, write_csv, write_json};
use group_rank::query::ModelRequest;
use group_rank::table::load_table;
use group_rank::{AggregateOptions, ZeroTotalPolicy, aggregate_with};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_LOG_FILE: &str = "logs/group_rank.log";

#[derive(Parser)]
#[command(name = "group_rank")]
#[command(about = "Group tabular results and rank each group by a score field", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank a local table (.csv or .json array of arrays, header first)
    Rank {
        /// Path to the table file
        #[arg(value_name = "FILE")]
        source: String,

        /// Numeric field to rank and normalize by
        #[arg(short, long)]
        score_field: String,

        /// Comma-separated fields forming the group key, in key order
        #[arg(short, long, value_delimiter = ',', required = true)]
        group_fields: Vec<String>,

        /// Scores for groups whose total is zero: "propagate" (NaN) or "zero"
        #[arg(long, default_value_t = ZeroTotalPolicy::Propagate)]
        zero_total: ZeroTotalPolicy,

        /// Emit one list instead of a mapping keyed by group
        #[arg(long, default_value_t = false)]
        flat: bool,

        /// Output file (.json report or .csv); stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Query the remote service and rank the result
    Query {
        /// Numeric field of the score table to rank by
        #[arg(short, long)]
        score_field: String,

        /// Comma-separated fields of the primary table forming the group key
        #[arg(short, long, value_delimiter = ',', required = true)]
        group_fields: Vec<String>,

        /// Comma-separated primary-table fields to include
        #[arg(long, value_delimiter = ',')]
        show_fields_1: Vec<String>,

        /// Comma-separated score-table fields to include
        #[arg(long, value_delimiter = ',')]
        show_fields_2: Vec<String>,

        /// Period to filter the score table on
        #[arg(short, long)]
        year: i32,

        #[arg(long)]
        username: String,

        #[arg(long)]
        token: String,

        /// Token table JSON file (defaults to TOKENS_FILE or tokens.json)
        #[arg(long)]
        tokens_file: Option<String>,

        /// Scores for groups whose total is zero: "propagate" (NaN) or "zero"
        #[arg(long, default_value_t = ZeroTotalPolicy::Propagate)]
        zero_total: ZeroTotalPolicy,

        /// Emit one list instead of a mapping keyed by group
        #[arg(long, default_value_t = false)]
        flat: bool,

        /// Output file (.json report or .csv); stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let log_file =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let _log_guard = init_tracing(Path::new(&log_file))?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            source,
            score_field,
            group_fields,
            zero_total,
            flat,
            output,
        } => {
            let table = load_table(&source)?;
            info!(source = %source, rows = table.len(), "Table loaded");

            let options = AggregateOptions { zero_total };
            let groups = aggregate_with(&table, &score_field, &group_fields, &options)?;

            emit(groups, &score_field, &group_fields, flat, output.as_deref())?;
        }
        Commands::Query {
            score_field,
            group_fields,
            show_fields_1,
            show_fields_2,
            year,
            username,
            token,
            tokens_file,
            zero_total,
            flat,
            output,
        } => {
            let config = ServiceConfig::from_env()?;
            let tokens_path = tokens_file.unwrap_or_else(|| config.tokens_file.clone());
            let tokens = TokenTable::load(&tokens_path)?;
            info!(path = %tokens_path, users = tokens.len(), "Token table loaded");

            let client = SqlApiClient::from_config(&config)?;
            let handler =
                Handler::new(client, tokens).with_options(AggregateOptions { zero_total });

            let request = ModelRequest {
                score_field,
                group_fields,
                show_fields_1,
                show_fields_2,
                year,
            };
            let credentials = Credentials { username, token };

            let groups = match handler.handle(&credentials, &request).await {
                Ok(groups) => groups,
                Err(e) => {
                    error!(code = e.code(), error = %e, "Request failed");
                    return Err(e.into());
                }
            };

            emit(
                groups,
                &request.score_field,
                &request.group_fields,
                flat,
                output.as_deref(),
            )?;
        }
    }

    Ok(())
}

/// Installs colored stderr logging (`RUST_LOG`, default `info`) and a daily
/// JSON log file (`RUST_LOG_JSON`, default `debug`). The file writer flushes
/// when the returned guard drops, so it must outlive the command.
fn init_tracing(log_file: &Path) -> Result<WorkerGuard> {
    let dir = log_file
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("LOG_FILE_PATH has no file name: {}", log_file.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));

    let filter = |var: &str, fallback: &str| -> Result<EnvFilter> {
        Ok(EnvFilter::from_env(var).add_directive(fallback.parse()?))
    };

    let stderr = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_filter(filter("RUST_LOG", "info")?);
    let json_file = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer)
        .with_filter(filter("RUST_LOG_JSON", "debug")?);

    tracing_subscriber::registry()
        .with(stderr)
        .with(json_file)
        .try_init()?;

    Ok(guard)
}

/// Writes the ranking to stdout, a JSON report or a CSV file.
fn emit(
    groups: RankedGroups,
    score_field: &str,
    group_fields: &[String],
    flat: bool,
    output: Option<&str>,
) -> Result<()> {
    if !groups.warnings().is_empty() {
        warn!(
            rows = groups.warnings().len(),
            "Some score values were not numeric; their groups score NaN"
        );
    }
    info!(groups = groups.len(), "Ranking complete");

    match output {
        None => print_json(&RankedOutput::new(groups, flat)),
        Some(path) if path.ends_with(".csv") => write_csv(path, &groups),
        Some(path) => write_json(
            path,
            score_field,
            group_fields,
            &RankedOutput::new(groups, flat),
        ),
    }
}
