//! flight-probe - connect to an Arrow Flight endpoint, fetch once, print the shape.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use flight_probe::arrow::{export_csv, render_preview};
use flight_probe::{report, run_probe, ProbeConfig, ProbeError};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// flight-probe - Arrow Flight connectivity smoke test
#[derive(Parser, Debug)]
#[command(name = "flight-probe")]
#[command(about = "Fetch one result set from an Arrow Flight endpoint and print its shape", long_about = None)]
struct Args {
    /// Flight endpoint, e.g. grpc://localhost:8815
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Action placed in the JSON ticket
    #[arg(short, long)]
    action: Option<String>,

    /// Extra ticket field as KEY=VALUE (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Raw ticket payload, sent as-is instead of the JSON action
    #[arg(short, long, conflicts_with_all = ["action", "params"])]
    ticket: Option<String>,

    /// Print the first N rows after the summary
    #[arg(long)]
    preview: Option<usize>,

    /// Write the result set to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ProbeError>() {
                Some(probe_err) => eprintln!("[{}] {}", probe_err.kind(), probe_err),
                None => eprintln!("[Error] {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    dotenvy::dotenv().ok();

    let config = resolve_config(&args).context("failed to load configuration")?;
    init_tracing(&config, args.debug);
    info!("probe config:\n{:?}", config);

    let request = config.request()?;

    let result = run_probe(&config.endpoint, &request).await?;

    report(&result);

    if config.preview_rows > 0 {
        let preview = render_preview(&result, config.preview_rows)
            .map_err(|e| anyhow!("failed to render preview: {e}"))?;
        println!("\n{preview}");
    }

    if let Some(path) = &args.output {
        export_csv(&result, path)?;
        println!("\nSaved to {}", path.display());
    }

    Ok(())
}

fn resolve_config(args: &Args) -> Result<ProbeConfig> {
    let mut config = ProbeConfig::load()?;
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(action) = &args.action {
        config.action = action.clone();
        config.ticket = None;
    }
    config.params.extend(args.params.iter().cloned());
    if !args.params.is_empty() {
        config.ticket = None;
    }
    if let Some(ticket) = &args.ticket {
        config.ticket = Some(ticket.clone());
    }
    if let Some(rows) = args.preview {
        config.preview_rows = rows;
    }
    Ok(config)
}

fn init_tracing(config: &ProbeConfig, debug: bool) {
    let log_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}
