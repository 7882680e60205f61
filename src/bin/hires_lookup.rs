use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hires_lookup::config::{load_config, LookupConfig};
use hires_lookup::http::UreqTransport;
use hires_lookup::walk::run_lookup;
use hires_lookup::LookupError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hires_lookup")]
#[command(about = "Replace local images with higher-resolution copies found by reverse image search")]
struct Args {
    /// An image file or directory path
    #[arg(short, long)]
    path: PathBuf,

    /// Directory that receives the chosen images
    #[arg(short, long, default_value = "result")]
    output: PathBuf,

    /// Skip files without a large result instead of copying the original
    #[arg(long)]
    no_fallback_copy: bool,

    /// JSON config file; missing keys use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language code sent with the upload (`hl`)
    #[arg(long)]
    language: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn resolve_config(args: &Args) -> Result<LookupConfig, LookupError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => LookupConfig::default(),
    };
    if args.no_fallback_copy {
        config.fallback_copy = false;
    }
    if let Some(language) = &args.language {
        let trimmed = language.trim();
        if !trimmed.is_empty() {
            config.language = trimmed.to_string();
        }
    }
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "config_invalid");
            return ExitCode::FAILURE;
        }
    };

    let transport = UreqTransport::new(config.timeout_secs_clamped());
    match run_lookup(&config, &transport, &args.path, &args.output) {
        Ok(summary) => {
            if args.summary_json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        tracing::error!(error = %err, "summary_encode_failed");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(LookupError::Blocked) => {
            tracing::error!("search service is asking for a captcha; try again later");
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!(error = %err, "please change the file or directory path and try again");
            ExitCode::FAILURE
        }
    }
}
