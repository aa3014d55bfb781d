use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CrossbookConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());
    parse_config(&content)
}

/// Parse configuration text, substituting environment variables first
pub fn parse_config(content: &str) -> Result<CrossbookConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: CrossbookConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> CrossbookConfig {
    CrossbookConfig {
        engine: EngineConfig::default(),
        feed: FeedConfig {
            input: None,
            on_invalid: default_on_invalid(),
            generator: GeneratorConfig {
                symbols: vec!["TSM".to_string(), "AAPL".to_string(), "MSFT".to_string()],
                ..GeneratorConfig::default()
            },
        },
        output: OutputConfig::default(),
        monitoring: MonitoringConfig::default(),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &CrossbookConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crossbook.yaml");

        let config = generate_default_config();
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.feed.generator.symbols.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_parse_with_env_substitution() {
        std::env::set_var("CROSSBOOK_TEST_THRESHOLD", "64");
        let config = parse_config("engine:\n  merge_threshold: ${CROSSBOOK_TEST_THRESHOLD}\n").unwrap();
        assert_eq!(config.engine.merge_threshold, 64);
    }

    #[test]
    fn test_parse_rejects_bad_yaml() {
        assert!(parse_config("engine: [workers").is_err());
        assert!(parse_config("engine:\n  workers: many\n").is_err());
    }
}
