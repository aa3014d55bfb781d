use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crossbook")]
#[command(about = "Crossbook - sharded price-time matching engine")]
#[command(version)]
pub struct Cli {
    /// Log format (overrides monitoring.logging.format)
    #[arg(long, global = true, value_enum, env = "CROSSBOOK_LOG_FORMAT")]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match an order feed and report trades
    Run(RunArgs),

    /// Write a synthetic order feed
    Generate(GenerateArgs),

    /// Validate configuration without running
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "crossbook.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "crossbook.yaml")]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; built-in defaults when omitted
    #[arg(short, long, env = "CROSSBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Order feed (`SIDE SYMBOL QUANTITY PRICE` per line); generated when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override engine.workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Override engine.merge_threshold (0 = merge only at shard end)
    #[arg(short, long)]
    pub merge_threshold: Option<usize>,

    /// Override output.format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormatArg>,

    /// Write trades to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop at the first invalid feed record
    #[arg(long)]
    pub strict: bool,

    /// Serve Prometheus metrics on this port
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Configuration file providing feed.generator defaults
    #[arg(short, long, env = "CROSSBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of orders
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Comma separated symbols
    #[arg(short, long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,

    /// Lower bound of the price range
    #[arg(long)]
    pub price_min: Option<f64>,

    /// Upper bound of the price range (exclusive)
    #[arg(long)]
    pub price_max: Option<f64>,

    /// Largest order quantity
    #[arg(long)]
    pub max_quantity: Option<u64>,

    /// RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormatArg {
    /// `Traded 4 X AT 100 (buy #0, sell #1, worker-0)`
    Text,
    /// One JSON object per trade
    Json,
}

impl ReportFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormatArg::Text => "text",
            ReportFormatArg::Json => "json",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "crossbook", "run", "-i", "orders.txt", "-w", "8", "-m", "0", "--format", "json", "--strict",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, Some(PathBuf::from("orders.txt")));
        assert_eq!(args.workers, Some(8));
        assert_eq!(args.merge_threshold, Some(0));
        assert_eq!(args.format, Some(ReportFormatArg::Json));
        assert!(args.strict);
        assert!(args.output.is_none());
    }

    #[test]
    fn test_generate_symbol_list() {
        let cli = Cli::try_parse_from([
            "crossbook", "generate", "-n", "50", "--symbols", "AAA,BBB", "--seed", "9",
        ])
        .unwrap();

        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.count, Some(50));
        assert_eq!(args.symbols, Some(vec!["AAA".to_string(), "BBB".to_string()]));
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn test_global_log_format() {
        let cli = Cli::try_parse_from(["crossbook", "validate", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
    }
}
