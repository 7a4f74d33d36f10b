//! Command-line host for the analyzer: gathers inputs, runs the batch on a
//! blocking worker, prints the summary table and optionally exports it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{signal, task};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tube_analyzer::analyzer::{Analyzer, ItemOutcome};
use tube_analyzer::config::{DEFAULT_CONFIG_PATH, load_settings_from, save_api_key};
use tube_analyzer::export::{ExportFormat, export_records};
use tube_analyzer::extract::collect_inputs;
use tube_analyzer::progress::ConsoleProgress;
use tube_analyzer::report::render_table;

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve YouTube links into normalized metadata records.")]
struct Cli {
    #[arg(value_name = "URL", help = "Video URLs or bare 11-character identifiers")]
    urls: Vec<String>,
    #[arg(
        short = 'f',
        long = "file",
        value_name = "PATH",
        help = "Text file with one URL per line"
    )]
    file: Option<PathBuf>,
    #[arg(long = "api-key", value_name = "KEY", help = "YouTube Data API key for this run")]
    api_key: Option<String>,
    #[arg(
        long = "save-api-key",
        requires = "api_key",
        help = "Persist --api-key into the config file"
    )]
    save_api_key: bool,
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
    #[arg(short = 'o', long = "output", value_name = "PATH", help = "Export destination")]
    output: Option<PathBuf>,
    #[arg(
        long = "format",
        value_enum,
        help = "Export format (default: from the output extension, else csv)"
    )]
    format: Option<ExportFormat>,
    #[arg(long = "no-download-urls", help = "Skip direct stream URL lookups")]
    no_download_urls: bool,
}

impl Cli {
    fn export_format(&self) -> Option<ExportFormat> {
        let output = self.output.as_deref()?;
        Some(
            self.format
                .or_else(|| ExportFormat::from_path(output))
                .unwrap_or(ExportFormat::Csv),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.save_api_key
        && let Some(key) = cli.api_key.as_deref()
    {
        save_api_key(&cli.config, key)
            .with_context(|| format!("saving API key to {}", cli.config.display()))?;
        println!("API key saved to {}", cli.config.display());
    }

    let inputs = collect_inputs(&cli.urls, cli.file.as_deref())?;
    if inputs.is_empty() {
        eprintln!("Usage: analyze_videos [OPTIONS] <URL>... | --file <PATH>");
        eprintln!("Example: analyze_videos https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        std::process::exit(1);
    }

    let mut settings = load_settings_from(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(key) = cli.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        settings.api_key = Some(key.to_string());
    }
    if cli.no_download_urls {
        settings.resolve_download_urls = false;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("Interrupted, finishing the current item...");
                on_interrupt.cancel();
            }
            Err(err) => eprintln!("Failed to install Ctrl+C handler: {}", err),
        }
    });

    println!("===================================");
    println!("YouTube Video Analyzer");
    println!("===================================");
    println!("Inputs: {}", inputs.len());
    println!();

    let worker_cancel = cancel.clone();
    let outcomes = task::spawn_blocking(move || {
        let analyzer = Analyzer::new(&settings);
        println!("Backend: {}", analyzer.mode());
        println!();
        analyzer.analyze_all_with_cancel(&inputs, &ConsoleProgress, &worker_cancel)
    })
    .await
    .context("analysis worker panicked")?;

    let records: Vec<_> = outcomes.into_iter().map(ItemOutcome::into_record).collect();
    println!();
    print!("{}", render_table(&records));

    if let (Some(path), Some(format)) = (cli.output.as_deref(), cli.export_format()) {
        export_records(&records, format, path)
            .with_context(|| format!("exporting results to {}", path.display()))?;
        println!("Results written to {}", path.display());
    }

    if cancel.is_cancelled() {
        std::process::exit(130);
    }
    Ok(())
}
