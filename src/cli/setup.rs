use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example configuration to the default config location.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    setup_at_path(path)
}

/// Writes the example configuration to `path`, refusing to overwrite.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    println!("Configuration written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_config_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        setup_at_path(&config_path)?;

        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("funds:"));
        assert!(content.contains("url_template:"));
        assert!(content.contains("# Example configuration file for fundflow"));

        Ok(())
    }

    #[test]
    fn test_setup_fails_if_config_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "test")?;

        let result = setup_at_path(&config_path);

        assert!(result.unwrap_err().to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&config_path)?, "test");
        Ok(())
    }

    #[test]
    fn test_example_config_is_valid() -> Result<()> {
        let config: AppConfig =
            serde_yaml::from_str(EXAMPLE_CONFIG).context("Failed to parse example config")?;

        assert_eq!(config.funds.fund_ids(), vec!["0AB", "0CD", "1XY"]);
        assert_eq!(config.schedule.estimation_window_days, 10);
        assert_eq!(config.schedule.holidays.len(), 3);
        assert!(config.providers.prices.is_some());
        assert!(config.data_path.is_none());

        Ok(())
    }
}
