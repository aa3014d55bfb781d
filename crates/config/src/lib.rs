use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

// ==================================================================================
// ENGINE CONFIG
// ==================================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Worker threads matching shards
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Orders between periodic merges into the global book (0 = only at shard end)
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            merge_threshold: default_merge_threshold(),
        }
    }
}

// ==================================================================================
// FEED CONFIG
// ==================================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Order feed file; the synthetic generator is used when absent
    #[serde(default)]
    pub input: Option<String>,
    /// `skip` or `fail`
    #[serde(default = "default_on_invalid")]
    pub on_invalid: String,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            input: None,
            on_invalid: default_on_invalid(),
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_order_count")]
    pub count: usize,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_price_min")]
    pub price_min: f64,
    #[serde(default = "default_price_max")]
    pub price_max: f64,
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: default_order_count(),
            symbols: default_symbols(),
            price_min: default_price_min(),
            price_max: default_price_max(),
            max_quantity: default_max_quantity(),
            seed: default_seed(),
        }
    }
}

// ==================================================================================
// OUTPUT CONFIG
// ==================================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// `text` or `json`
    #[serde(default = "default_output_format")]
    pub format: String,
    /// Trade report file; stdout when absent
    #[serde(default)]
    pub path: Option<String>,
    /// Log the run summary after drain
    #[serde(default = "default_enabled")]
    pub summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            path: None,
            summary: default_enabled(),
        }
    }
}

// ==================================================================================
// MONITORING CONFIG
// ==================================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty`, `json` or `compact`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Serve a Prometheus scrape endpoint
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

// ==================================================================================
// ROOT CONFIG
// ==================================================================================

/// Root of `crossbook.yaml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CrossbookConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
engine:
  workers: 8
  merge_threshold: 256
feed:
  input: "orders.txt"
  on_invalid: "fail"
  generator:
    count: 500
    symbols: ["AAPL", "MSFT"]
    price_min: 10.0
    price_max: 20.0
    max_quantity: 5
    seed: 7
output:
  format: "json"
  path: "trades.jsonl"
  summary: false
monitoring:
  logging:
    level: "debug"
    format: "json"
  metrics:
    enabled: true
    port: 9100
"#;
        let config: CrossbookConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.engine.workers, 8);
        assert_eq!(config.engine.merge_threshold, 256);
        assert_eq!(config.feed.input.as_deref(), Some("orders.txt"));
        assert_eq!(config.feed.on_invalid, "fail");
        assert_eq!(config.feed.generator.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(config.output.format, "json");
        assert!(!config.output.summary);
        assert_eq!(config.monitoring.logging.level, "debug");
        assert!(config.monitoring.metrics.enabled);
        assert_eq!(config.monitoring.metrics.port, 9100);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: CrossbookConfig = serde_yaml::from_str("engine:\n  workers: 2\n").unwrap();

        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.merge_threshold, 1024);
        assert_eq!(config.feed, FeedConfig::default());
        assert_eq!(config.output.format, "text");
        assert_eq!(config.monitoring.logging.format, "pretty");
        assert!(!config.monitoring.metrics.enabled);
    }
}
