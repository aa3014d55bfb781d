use crate::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a positive float")]
    InvalidPositiveFloat { field: String },

    #[error("Invalid {field} '{value}'. Must be one of: {allowed}")]
    InvalidChoice {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("Generator: {message}")]
    InvalidGenerator { message: String },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

const ON_INVALID: [&str; 2] = ["skip", "fail"];
const OUTPUT_FORMATS: [&str; 2] = ["text", "json"];
const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &CrossbookConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_engine(&config.engine, &mut report);
    validate_feed(&config.feed, &mut report);
    validate_output(&config.output, &mut report);
    validate_monitoring(&config.monitoring, &mut report);

    report
}

fn validate_engine(engine: &EngineConfig, report: &mut ValidationReport) {
    if engine.workers == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "engine.workers".to_string(),
        });
    }

    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if engine.workers > cores {
        report.add_warning(
            "engine.workers",
            &format!(
                "{} workers configured but only {} CPUs available; the aggregator also needs one",
                engine.workers, cores
            ),
        );
    }

    if engine.merge_threshold == 0 {
        report.add_warning(
            "engine.merge_threshold",
            "0 disables periodic merges; cross-shard orders only meet after each shard completes",
        );
    }
}

fn validate_feed(feed: &FeedConfig, report: &mut ValidationReport) {
    check_choice("feed.on_invalid", &feed.on_invalid, &ON_INVALID, report);

    match &feed.input {
        Some(input) => {
            check_env_var("feed.input", input, report);
            if input.trim().is_empty() {
                report.add_error(ValidationError::InvalidChoice {
                    field: "feed.input".to_string(),
                    value: input.clone(),
                    allowed: "a file path".to_string(),
                });
            }
        }
        None => {
            report.add_default("feed.input", "synthetic generator");
            validate_generator(&feed.generator, report);
        }
    }
}

fn validate_generator(generator: &GeneratorConfig, report: &mut ValidationReport) {
    if generator.count == 0 {
        report.add_warning("feed.generator.count", "Generator configured to produce no orders");
    }

    if generator.symbols.is_empty() {
        report.add_error(ValidationError::InvalidGenerator {
            message: "at least one symbol is required".to_string(),
        });
    }
    for symbol in &generator.symbols {
        if symbol.is_empty() || symbol.contains(char::is_whitespace) {
            report.add_error(ValidationError::InvalidGenerator {
                message: format!("symbol '{}' must be non-empty and contain no whitespace", symbol),
            });
        }
    }

    if !generator.price_min.is_finite() || generator.price_min <= 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "feed.generator.price_min".to_string(),
        });
    }
    if !generator.price_max.is_finite() || generator.price_max <= 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "feed.generator.price_max".to_string(),
        });
    }
    if generator.price_min >= generator.price_max {
        report.add_error(ValidationError::InvalidGenerator {
            message: format!(
                "price_min ({}) must be below price_max ({})",
                generator.price_min, generator.price_max
            ),
        });
    }

    if generator.max_quantity == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "feed.generator.max_quantity".to_string(),
        });
    }
}

fn validate_output(output: &OutputConfig, report: &mut ValidationReport) {
    check_choice("output.format", &output.format, &OUTPUT_FORMATS, report);

    match &output.path {
        Some(path) => check_env_var("output.path", path, report),
        None => report.add_default("output.path", "stdout"),
    }
}

fn validate_monitoring(monitoring: &MonitoringConfig, report: &mut ValidationReport) {
    let logging = &monitoring.logging;
    check_choice("monitoring.logging.format", &logging.format, &LOG_FORMATS, report);

    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        report.add_warning(
            "monitoring.logging.level",
            &format!(
                "'{}' is not a plain level; it is passed to the filter as a directive",
                logging.level
            ),
        );
    }

    let metrics = &monitoring.metrics;
    if metrics.enabled && metrics.port == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "monitoring.metrics.port".to_string(),
        });
    }
}

fn check_choice(field: &str, value: &str, allowed: &[&str], report: &mut ValidationReport) {
    if !allowed.contains(&value.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidChoice {
            field: field.to_string(),
            value: value.to_string(),
            allowed: allowed.join(", "),
        });
    }
}

fn check_env_var(field: &str, value: &str, report: &mut ValidationReport) {
    if has_unresolved_env_vars(value) {
        report.add_error(ValidationError::InvalidEnvVar {
            var: field.to_string(),
            message: format!("unresolved placeholder in '{}'", value),
        });
    }
}
