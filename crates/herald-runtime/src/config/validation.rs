//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DispatchConfig, HeraldConfig, LogOutput, LoggingConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_dispatch(&config.dispatch)?;
    Ok(())
}

fn validate_level(level: &str, field: &str) -> ConfigResult<()> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::validation(format!(
            "Invalid log level for {field}: {level}. Valid values are: {LOG_LEVELS:?}"
        )))
    }
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_level(&logging.level, "logging.level")?;

    for (target, level) in &logging.filters {
        if target.is_empty() {
            return Err(ConfigError::validation("Log filter target cannot be empty"));
        }
        validate_level(level, &format!("logging.filters.{target}"))?;
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

fn validate_dispatch(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.autocomplete_limit == 0 {
        return Err(ConfigError::validation(
            "Autocomplete limit must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&HeraldConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = HeraldConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        let mut config = HeraldConfig::default();
        config
            .logging
            .filters
            .insert("herald_framework".to_string(), "loud".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = HeraldConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { ref field }) if field == "logging.file_path"
        ));

        config.logging.file_path = Some("logs/herald.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_autocomplete_limit() {
        let mut config = HeraldConfig::default();
        config.dispatch.autocomplete_limit = 0;
        assert!(validate_config(&config).is_err());
    }
}
