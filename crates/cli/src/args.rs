use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "portgate")]
#[command(version)]
#[command(about = "Allowlist-gated TCP port checks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Command-line overrides applied on top of the PORTGATE_* environment.
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Allowlist rules (CIDR, IP or hostname), replaces PORTGATE_ALLOWLIST
    #[arg(long = "allow", value_delimiter = ',', global = true)]
    pub allow: Vec<String>,

    /// Maximum ports per range scan
    #[arg(long, global = true)]
    pub max_range: Option<usize>,

    /// Maximum in-flight probes per scan
    #[arg(long, global = true)]
    pub max_concurrency: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a single port (GET /tcp/check)
    Check {
        /// Target host or IP
        #[arg(long)]
        host: String,

        /// Port to probe
        #[arg(short, long)]
        port: i64,

        /// Timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Probe a contiguous port range (POST /tcp/scan-range)
    ScanRange {
        /// Target host or IP
        #[arg(long)]
        host: String,

        /// First port (order with --end does not matter)
        #[arg(long)]
        start: i64,

        /// Last port
        #[arg(long)]
        end: i64,

        /// Timeout per probe in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Requested concurrency, clamped to the configured maximum
        #[arg(short, long)]
        concurrency: Option<i64>,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// API key sent with the request
    #[arg(long)]
    pub api_key: Option<String>,

    /// Output format: text, json, csv
    #[arg(short, long, default_value = "text", value_parser = ["text", "json", "csv"])]
    pub output_format: String,
}
