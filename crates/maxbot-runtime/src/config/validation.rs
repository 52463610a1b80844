//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, BotConfig, LoggingConfig, LogOutput, MaxbotConfig, PollingConfig};

/// Largest `limit` accepted by `GET /updates`.
const MAX_POLL_LIMIT: u32 = 1000;

/// Validates the entire configuration.
pub fn validate_config(config: &MaxbotConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_api_config(&config.api)?;
    validate_polling_config(&config.polling)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.access_token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.access_token"));
    }

    if bot.command_prefixes.is_empty() {
        return Err(ConfigError::validation(
            "At least one command prefix is required",
        ));
    }

    if bot.command_prefixes.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::validation("Command prefixes cannot be empty"));
    }

    Ok(())
}

fn validate_api_config(api: &ApiConfig) -> ConfigResult<()> {
    validate_url(&api.base_url)?;

    if api.timeout_ms == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if polling.limit == 0 || polling.limit > MAX_POLL_LIMIT {
        return Err(ConfigError::validation(format!(
            "Polling limit must be between 1 and {MAX_POLL_LIMIT}"
        )));
    }

    if polling.error_backoff_ms == 0 {
        return Err(ConfigError::validation(
            "Error back-off must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter targets cannot be empty"));
    }

    Ok(())
}

/// Validates an HTTP(S) URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("api.base_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}
