//! Crossbook CLI binary
//!
//! Entry point for running the sharded matching engine over an order feed,
//! generating synthetic feeds and managing the configuration file.

use anyhow::{Context, Result};
use cli::{Cli, Commands, GenerateArgs, LogFormatArg, RunArgs};
use config::{generate_default_config, load_config, save_config, validate_config, CrossbookConfig, ValidationReport};
use feed::{ingest_file, RejectPolicy, ReportFormat, TradeReporter};
use matching_engine::{run_sharded, EngineConfig, EngineSummary};
use observability::{init_logging, init_metrics, LogFormat};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Run(args) => run_command(cli.log_format, args),
        Commands::Generate(args) => generate_command(cli.log_format, args),
        Commands::Validate { config } => {
            start_logging(cli.log_format, None)?;
            validate_command(config)
        }
        Commands::Init { output } => {
            start_logging(cli.log_format, None)?;
            init_command(output)
        }
    }
}

/// CLI flag wins over the configuration file
fn start_logging(flag: Option<LogFormatArg>, config: Option<&CrossbookConfig>) -> Result<()> {
    let logging = config.map(|c| &c.monitoring.logging);
    let format = match flag {
        Some(flag) => LogFormat::parse(flag.as_str()).unwrap_or_default(),
        None => logging
            .and_then(|l| LogFormat::parse(&l.format))
            .unwrap_or_default(),
    };
    let level = logging.map_or("info", |l| l.level.as_str());
    init_logging("crossbook", format, level)
}

fn load_or_default(path: Option<&Path>) -> Result<CrossbookConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(CrossbookConfig::default()),
    }
}

fn apply_run_overrides(config: &mut CrossbookConfig, args: &RunArgs) {
    if let Some(input) = &args.input {
        config.feed.input = Some(input.display().to_string());
    }
    if args.strict {
        config.feed.on_invalid = "fail".to_string();
    }
    if let Some(workers) = args.workers {
        config.engine.workers = workers;
    }
    if let Some(threshold) = args.merge_threshold {
        config.engine.merge_threshold = threshold;
    }
    if let Some(format) = args.format {
        config.output.format = format.as_str().to_string();
    }
    if let Some(output) = &args.output {
        config.output.path = Some(output.display().to_string());
    }
    if let Some(port) = args.metrics_port {
        config.monitoring.metrics.enabled = true;
        config.monitoring.metrics.port = port;
    }
}

fn apply_generate_overrides(config: &mut CrossbookConfig, args: &GenerateArgs) {
    let generator = &mut config.feed.generator;
    if let Some(count) = args.count {
        generator.count = count;
    }
    if let Some(symbols) = &args.symbols {
        generator.symbols = symbols.clone();
    }
    if let Some(price_min) = args.price_min {
        generator.price_min = price_min;
    }
    if let Some(price_max) = args.price_max {
        generator.price_max = price_max;
    }
    if let Some(max_quantity) = args.max_quantity {
        generator.max_quantity = max_quantity;
    }
    if let Some(seed) = args.seed {
        generator.seed = seed;
    }
}

fn generator_settings(section: &config::GeneratorConfig) -> feed::GeneratorConfig {
    feed::GeneratorConfig {
        count: section.count,
        symbols: section.symbols.clone(),
        price_min: section.price_min,
        price_max: section.price_max,
        max_quantity: section.max_quantity,
        seed: section.seed,
    }
}

fn reject_policy(on_invalid: &str) -> RejectPolicy {
    if on_invalid.eq_ignore_ascii_case("fail") {
        RejectPolicy::Fail
    } else {
        RejectPolicy::Skip
    }
}

/// Log warnings and bail on errors
fn check_report(report: &ValidationReport) -> Result<()> {
    for default in &report.defaults_applied {
        debug!(field = %default.field, value = %default.value, "Default applied");
    }
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot run due to configuration errors");
    }
    Ok(())
}

fn create_output(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))
}

fn run_command(log_format: Option<LogFormatArg>, args: RunArgs) -> Result<()> {
    let mut config = load_or_default(args.config.as_deref())?;
    apply_run_overrides(&mut config, &args);

    start_logging(log_format, Some(&config))?;
    info!("Crossbook starting...");
    check_report(&validate_config(&config))?;

    if config.monitoring.metrics.enabled {
        init_metrics(config.monitoring.metrics.port)?;
    }

    let orders = match &config.feed.input {
        Some(input) => {
            let (orders, report) = ingest_file(Path::new(input), reject_policy(&config.feed.on_invalid))
                .with_context(|| format!("Failed to ingest feed {}", input))?;
            if report.rejected > 0 {
                warn!(
                    rejected = report.rejected,
                    accepted = report.accepted,
                    "Some feed records were rejected"
                );
            }
            orders
        }
        None => {
            info!(
                count = config.feed.generator.count,
                seed = config.feed.generator.seed,
                "No input feed, generating orders"
            );
            feed::generate(&generator_settings(&config.feed.generator))?
        }
    };

    let format: ReportFormat = config.output.format.parse().map_err(anyhow::Error::msg)?;
    let writer: Box<dyn Write + Send> = match &config.output.path {
        Some(path) => Box::new(create_output(Path::new(path))?),
        None => Box::new(io::stdout()),
    };
    let reporter = Arc::new(TradeReporter::new(writer, format));

    let engine_config = EngineConfig::new(config.engine.workers, config.engine.merge_threshold);
    let order_count = orders.len();
    let started = Instant::now();

    let summary = run_sharded(engine_config, orders, reporter.clone()).context("Matching failed")?;
    let elapsed = started.elapsed();

    reporter.flush().context("Failed to flush trade report")?;
    if reporter.failed() > 0 {
        anyhow::bail!("{} trades could not be written", reporter.failed());
    }

    if !summary.is_conserved() {
        anyhow::bail!(
            "Quantity not conserved: input {} != 2 x traded {} + resting {}",
            summary.input_quantity(),
            summary.traded_quantity(),
            summary.resting.quantity()
        );
    }

    if config.output.summary {
        log_summary(&summary, order_count, elapsed.as_secs_f64());
    }
    Ok(())
}

fn log_summary(summary: &EngineSummary, orders: usize, seconds: f64) {
    for worker in &summary.workers {
        debug!(
            worker = worker.worker,
            orders = worker.orders,
            trades = worker.trades,
            merges = worker.merges,
            merged_orders = worker.merged_orders,
            "Worker summary"
        );
    }
    info!(
        orders,
        trades = summary.trades(),
        traded_quantity = summary.traded_quantity(),
        local_traded_quantity = summary.local_traded_quantity(),
        aggregator_traded_quantity = summary.aggregator.traded_quantity,
        aggregator_passes = summary.aggregator.passes,
        resting_buy_orders = summary.resting.buy_orders,
        resting_sell_orders = summary.resting.sell_orders,
        elapsed_ms = (seconds * 1000.0) as u64,
        "Run complete"
    );
}

fn generate_command(log_format: Option<LogFormatArg>, args: GenerateArgs) -> Result<()> {
    let mut config = load_or_default(args.config.as_deref())?;
    apply_generate_overrides(&mut config, &args);
    start_logging(log_format, Some(&config))?;

    let settings = generator_settings(&config.feed.generator);
    match &args.output {
        Some(path) => {
            let written = feed::generate_orders(&settings, BufWriter::new(create_output(path)?))?;
            info!(path = ?path, orders = written, "Order feed written");
        }
        None => {
            feed::generate_orders(&settings, BufWriter::new(io::stdout().lock()))?;
        }
    }
    Ok(())
}

fn validate_command(config_path: PathBuf) -> Result<()> {
    info!(path = ?config_path, "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Workers: {}", config.engine.workers);
    println!("Merge threshold: {}", config.engine.merge_threshold);
    match &config.feed.input {
        Some(input) => println!("Feed: {}", input),
        None => println!(
            "Feed: {} generated orders over {} symbol(s)",
            config.feed.generator.count,
            config.feed.generator.symbols.len()
        ),
    }
    println!(
        "Output: {} to {}",
        config.output.format,
        config.output.path.as_deref().unwrap_or("stdout")
    );

    Ok(())
}

fn init_command(output_path: PathBuf) -> Result<()> {
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    save_config(&config, &output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Point feed.input at an order file, or tune feed.generator");
    println!("  2. Adjust engine.workers and engine.merge_threshold");
    println!("  3. Run: crossbook run --config {}", output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_replace_config_values() {
        let mut config = CrossbookConfig::default();
        let args = RunArgs {
            input: Some(PathBuf::from("orders.txt")),
            workers: Some(2),
            merge_threshold: Some(0),
            format: Some(cli::ReportFormatArg::Json),
            strict: true,
            metrics_port: Some(9999),
            ..RunArgs::default()
        };
        apply_run_overrides(&mut config, &args);

        assert_eq!(config.feed.input.as_deref(), Some("orders.txt"));
        assert_eq!(config.feed.on_invalid, "fail");
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.merge_threshold, 0);
        assert_eq!(config.output.format, "json");
        assert!(config.monitoring.metrics.enabled);
        assert_eq!(config.monitoring.metrics.port, 9999);
        assert!(validate_config(&config).is_valid());
    }

    #[test]
    fn test_generate_overrides() {
        let mut config = CrossbookConfig::default();
        let args = GenerateArgs {
            count: Some(10),
            symbols: Some(vec!["A".into(), "B".into()]),
            seed: Some(3),
            ..GenerateArgs::default()
        };
        apply_generate_overrides(&mut config, &args);

        let settings = generator_settings(&config.feed.generator);
        assert_eq!(settings.count, 10);
        assert_eq!(settings.symbols, vec!["A", "B"]);
        assert_eq!(settings.seed, 3);
        assert_eq!(feed::generate(&settings).unwrap().len(), 10);
    }

    #[test]
    fn test_reject_policy() {
        assert_eq!(reject_policy("fail"), RejectPolicy::Fail);
        assert_eq!(reject_policy("FAIL"), RejectPolicy::Fail);
        assert_eq!(reject_policy("skip"), RejectPolicy::Skip);
    }

    #[test]
    fn test_generated_feed_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let feed_path = dir.path().join("orders.txt");
        let trades_path = dir.path().join("out/trades.txt");

        let settings = feed::GeneratorConfig {
            count: 200,
            ..feed::GeneratorConfig::default()
        };
        feed::generate_orders(&settings, create_output(&feed_path).unwrap()).unwrap();

        let (orders, report) = ingest_file(&feed_path, RejectPolicy::Fail).unwrap();
        assert_eq!(report.accepted, 200);

        let reporter = Arc::new(TradeReporter::new(
            create_output(&trades_path).unwrap(),
            ReportFormat::Text,
        ));
        let summary = run_sharded(EngineConfig::new(3, 16), orders, reporter.clone()).unwrap();
        reporter.flush().unwrap();

        assert!(summary.is_conserved());
        let written = std::fs::read_to_string(&trades_path).unwrap();
        assert_eq!(written.lines().count() as u64, summary.trades());
        assert!(written.lines().all(|line| line.starts_with("Traded ")));
    }
}
