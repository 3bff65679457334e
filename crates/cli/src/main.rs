mod args;
mod output;
mod runner;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Cli, Commands};
use portgate_api::PortgateApi;
use runner::{describe_config, load_config, run_check, run_scan_range};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let config = load_config(&cli.overrides)?;

    let ok = match cli.command {
        Commands::Check {
            host,
            port,
            timeout,
            client,
        } => {
            let api = PortgateApi::from_config(config);
            run_check(&api, host, port, timeout, client).await?
        }
        Commands::ScanRange {
            host,
            start,
            end,
            timeout,
            concurrency,
            client,
        } => {
            let api = PortgateApi::from_config(config);
            run_scan_range(&api, host, start, end, timeout, concurrency, client).await?
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&describe_config(&config))?);
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn init_logging(verbose: u8, json: bool) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        fmt().with_env_filter(filter).json().with_writer(std::io::stderr).init();
    } else {
        fmt().with_env_filter(filter).compact().with_writer(std::io::stderr).init();
    }
}
