use crate::config::types::{Config, EngineConfig, FetchConfig, OutputConfig, PacingConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent workers
const MAX_WORKERS: u32 = 64;

/// Upper bound on the pacing mean and standard deviation (one day)
const MAX_PACING_SECONDS: f64 = 86_400.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    validate_pacing_config(&config.pacing)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates worker pool and frontier configuration
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.progress_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "progress_dir cannot be empty".to_string(),
        ));
    }

    if !config.name_format.contains("{}") {
        return Err(ConfigError::Validation(format!(
            "name_format must contain a '{{}}' placeholder, got '{}'",
            config.name_format
        )));
    }

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "At least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    if config.max_consecutive_failures == Some(0) {
        return Err(ConfigError::Validation(
            "max_consecutive_failures must be >= 1 when set".to_string(),
        ));
    }

    if config.max_priority_retries == Some(0) {
        return Err(ConfigError::Validation(
            "max_priority_retries must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates a single seed URL
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    // The progress files are line-oriented
    if seed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' contains whitespace",
            seed
        )));
    }

    Ok(())
}

/// Validates pacing parameters
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if !config.mean_seconds.is_finite() || config.mean_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "pacing mean_seconds must be a finite value >= 0, got {}",
            config.mean_seconds
        )));
    }

    if !config.std_seconds.is_finite() || config.std_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "pacing std_seconds must be a finite value >= 0, got {}",
            config.std_seconds
        )));
    }

    if config.mean_seconds > MAX_PACING_SECONDS || config.std_seconds > MAX_PACING_SECONDS {
        return Err(ConfigError::Validation(format!(
            "pacing mean_seconds and std_seconds must be at most {}, got {} and {}",
            MAX_PACING_SECONDS, config.mean_seconds, config.std_seconds
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
