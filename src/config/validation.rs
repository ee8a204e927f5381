use crate::config::types::{
    Config, CrawlConfig, FetchConfig, FetchMode, FootnoteConfig, NoiseConfig, OutputConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_crawl_config(&config.crawl)?;
    validate_noise_config(&config.noise)?;
    validate_footnote_config(&config.footnotes)?;
    validate_output_config(&config.output)?;
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

    Ok(())
}

/// Validates fetch and retry configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_multiplier <= 1.0 || !config.backoff_multiplier.is_finite() {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be a finite value > 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.failure_signatures.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "failure_signatures cannot contain empty entries".to_string(),
        ));
    }

    if reqwest::header::HeaderValue::from_str(&config.accept_language).is_err() {
        return Err(ConfigError::Validation(format!(
            "accept_language is not a valid header value: {:?}",
            config.accept_language
        )));
    }

    if config.mode == FetchMode::Render {
        if config.render_command.is_empty() {
            return Err(ConfigError::Validation(
                "render_command cannot be empty in render mode".to_string(),
            ));
        }
        if !config.render_command.iter().any(|arg| arg.contains("{url}")) {
            return Err(ConfigError::Validation(
                "render_command must contain a {url} placeholder".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if scraper::Selector::parse(&config.next_link_selector).is_err() {
        return Err(ConfigError::InvalidPattern(format!(
            "next_link_selector is not a valid CSS selector: '{}'",
            config.next_link_selector
        )));
    }

    Ok(())
}

/// Validates noise classifier configuration
fn validate_noise_config(config: &NoiseConfig) -> Result<(), ConfigError> {
    for pattern in &config.banner_heading_patterns {
        validate_regex(pattern)?;
    }

    validate_ratio("short_link_ratio", config.short_link_ratio)?;
    validate_ratio("internal_link_ratio", config.internal_link_ratio)?;

    if config.min_links == 0 {
        return Err(ConfigError::Validation(
            "min_links must be >= 1".to_string(),
        ));
    }

    if config.min_keyword_hits == 0 {
        return Err(ConfigError::Validation(
            "min_keyword_hits must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates footnote configuration
fn validate_footnote_config(config: &FootnoteConfig) -> Result<(), ConfigError> {
    if config.container_id.is_empty() && config.container_class.is_empty() {
        return Err(ConfigError::Validation(
            "container_id and container_class cannot both be empty".to_string(),
        ));
    }

    validate_regex(&config.reference_class_pattern)?;

    if config.heading.trim().is_empty() {
        return Err(ConfigError::Validation(
            "footnote heading cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if config.progress_path() == config.path {
        return Err(ConfigError::Validation(
            "progress_path must differ from the output path".to_string(),
        ));
    }

    Ok(())
}

fn validate_ratio(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_regex(pattern: &str) -> Result<(), ConfigError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}
