use crate::config::types::{
    CategoryEntry, Config, DelayWindow, HttpConfig, PacingConfig, ScannerConfig, SelectorConfig,
    SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_http_config(&config.http)?;
    validate_pacing_config(&config.pacing)?;
    validate_scanner_config(&config.scanner)?;
    validate_selector_config(&config.selectors)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates the target site description
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("origin", &config.origin)?;

    if config.listing_path_fragment.is_empty() {
        return Err(ConfigError::Validation(
            "listing_path_fragment cannot be empty".to_string(),
        ));
    }

    if let Some(referer) = &config.detail_referer {
        validate_http_url("detail_referer", referer)?;
    }

    Ok(())
}

/// Validates transport configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_connections == 0 {
        return Err(ConfigError::Validation(
            "max_connections must be >= 1".to_string(),
        ));
    }

    if config.max_connections_per_host == 0
        || config.max_connections_per_host > config.max_connections
    {
        return Err(ConfigError::Validation(format!(
            "max_connections_per_host must be between 1 and {}, got {}",
            config.max_connections, config.max_connections_per_host
        )));
    }

    // Rotation needs a real pool to draw from
    if config.user_agents.len() < 3 {
        return Err(ConfigError::Validation(format!(
            "user_agents needs at least 3 entries, got {}",
            config.user_agents.len()
        )));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates pacing windows
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    validate_window("category_delay", &config.category_delay)?;
    validate_window("cycle_delay", &config.cycle_delay)?;
    validate_window("listing_delay", &config.listing_delay)?;
    validate_window("page_delay", &config.page_delay)?;
    Ok(())
}

fn validate_window(name: &str, window: &DelayWindow) -> Result<(), ConfigError> {
    if window.min_secs > window.max_secs {
        return Err(ConfigError::Validation(format!(
            "{}: min_secs ({}) must not exceed max_secs ({})",
            name, window.min_secs, window.max_secs
        )));
    }
    Ok(())
}

/// Validates scanner behaviour
fn validate_scanner_config(config: &ScannerConfig) -> Result<(), ConfigError> {
    if config.pages_per_category < 1 {
        return Err(ConfigError::Validation(format!(
            "pages_per_category must be >= 1, got {}",
            config.pages_per_category
        )));
    }

    if config.result_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "result_capacity must be >= 1, got {}",
            config.result_capacity
        )));
    }

    if config.private_keywords.is_empty() {
        return Err(ConfigError::Validation(
            "private_keywords cannot be empty".to_string(),
        ));
    }

    if config.private_keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "private_keywords cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every selector chain is non-empty and parses
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (field, chain) in [
        ("listing_links", &config.listing_links),
        ("title", &config.title),
        ("price", &config.price),
        ("area", &config.area),
        ("location", &config.location),
        ("description", &config.description),
    ] {
        if chain.is_empty() {
            return Err(ConfigError::InvalidSelector(format!(
                "{} needs at least one selector",
                field
            )));
        }

        for selector in chain {
            Selector::parse(selector).map_err(|e| {
                ConfigError::InvalidSelector(format!("{}: '{}' ({:?})", field, selector, e))
            })?;
        }
    }

    Ok(())
}

/// Validates category entries
fn validate_categories(categories: &[CategoryEntry]) -> Result<(), ConfigError> {
    if categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in categories {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category name '{}'",
                entry.name
            )));
        }

        validate_http_url(&entry.name, &entry.search_url)?;
    }

    Ok(())
}

/// Parses a URL and requires an HTTP(S) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{}: '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
