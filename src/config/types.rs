use serde::Deserialize;
use std::time::Duration;

const DEFAULT_ORIGIN: &str = "https://www.willhaben.at";

/// Main configuration structure for Immo-Scout
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the built-in target site and its four private-sale categories.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(rename = "category", default = "default_categories")]
    pub categories: Vec<CategoryEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            http: HttpConfig::default(),
            pacing: PacingConfig::default(),
            scanner: ScannerConfig::default(),
            selectors: SelectorConfig::default(),
            categories: default_categories(),
        }
    }
}

/// Target site description
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin used to resolve relative listing links
    pub origin: String,

    /// Path fragment every detail-page URL contains
    #[serde(rename = "listing-path-fragment")]
    pub listing_path_fragment: String,

    /// Referer sent along with detail-page requests
    #[serde(rename = "detail-referer")]
    pub detail_referer: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            listing_path_fragment: "/iad/immobilien/d/".to_string(),
            detail_referer: Some(format!("{}/iad/immobilien/", DEFAULT_ORIGIN)),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Overall request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Ceiling on open connections
    #[serde(rename = "max-connections")]
    pub max_connections: usize,

    /// Ceiling on pooled connections per remote host
    #[serde(rename = "max-connections-per-host")]
    pub max_connections_per_host: usize,

    /// Identity strings rotated across requests
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 10,
            max_connections_per_host: 5,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ],
        }
    }
}

/// Inclusive window a random pause is drawn from (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayWindow {
    #[serde(rename = "min-secs")]
    pub min_secs: u64,

    #[serde(rename = "max-secs")]
    pub max_secs: u64,
}

impl DelayWindow {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    /// A window that never pauses
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn min(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }
}

/// Politeness pacing between units of work
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after each category
    #[serde(rename = "category-delay")]
    pub category_delay: DelayWindow,

    /// Pause after a full pass over all categories
    #[serde(rename = "cycle-delay")]
    pub cycle_delay: DelayWindow,

    /// Pause after each accepted listing
    #[serde(rename = "listing-delay")]
    pub listing_delay: DelayWindow,

    /// Pause after each search-result page
    #[serde(rename = "page-delay")]
    pub page_delay: DelayWindow,

    /// Cool-down after an HTTP 429
    #[serde(rename = "rate-limit-backoff-secs")]
    pub rate_limit_backoff_secs: u64,

    /// Recovery pause after a failed cycle
    #[serde(rename = "error-backoff-secs")]
    pub error_backoff_secs: u64,
}

impl PacingConfig {
    /// Pacing with every pause disabled
    pub fn immediate() -> Self {
        Self {
            category_delay: DelayWindow::zero(),
            cycle_delay: DelayWindow::zero(),
            listing_delay: DelayWindow::zero(),
            page_delay: DelayWindow::zero(),
            rate_limit_backoff_secs: 0,
            error_backoff_secs: 0,
        }
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            category_delay: DelayWindow::new(180, 480),
            cycle_delay: DelayWindow::new(1200, 2700),
            listing_delay: DelayWindow::new(5, 12),
            page_delay: DelayWindow::new(15, 30),
            rate_limit_backoff_secs: 60,
            error_backoff_secs: 600,
        }
    }
}

/// Category scanner behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Result pages visited per category (1..=N)
    #[serde(rename = "pages-per-category")]
    pub pages_per_category: u32,

    /// Listings kept in memory before the oldest are evicted
    #[serde(rename = "result-capacity")]
    pub result_capacity: usize,

    /// Keywords marking an offer as a private sale
    #[serde(rename = "private-keywords")]
    pub private_keywords: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            pages_per_category: 3,
            result_capacity: 5000,
            private_keywords: [
                "privatverkauf",
                "privat verkauf",
                "von privat",
                "privater verkäufer",
                "doppelmarkler",
                "ohne makler",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Ordered selector chains, tried first to last
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    #[serde(rename = "listing-links")]
    pub listing_links: Vec<String>,
    pub title: Vec<String>,
    pub price: Vec<String>,
    pub area: Vec<String>,
    pub location: Vec<String>,
    pub description: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        fn chain(selectors: &[&str]) -> Vec<String> {
            selectors.iter().map(|s| s.to_string()).collect()
        }

        Self {
            listing_links: chain(&[
                r#"a[href*="/iad/immobilien/d/"]"#,
                r#"a[data-testid*="result-item"]"#,
                ".result-item a",
            ]),
            title: chain(&[r#"[data-testid="ad-detail-ad-title"] h1"#, ".AdDetailTitle", "h1"]),
            price: chain(&[
                r#"[data-testid="ad-detail-ad-price"] span"#,
                ".AdDetailPrice",
                ".price-value",
            ]),
            area: chain(&[r#"[data-testid="ad-detail-ad-properties"]"#, ".AdDetailProperties"]),
            location: chain(&[r#"[data-testid="ad-detail-ad-location"]"#, ".AdDetailLocation"]),
            description: chain(&[
                r#"[data-testid="ad-detail-ad-description"] p"#,
                ".AdDescription-description",
            ]),
        }
    }
}

/// A search category: stable key plus its unpaginated query
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    /// Stable key encoding listing type and region (e.g. "grundstueck-wien")
    pub name: String,

    /// Search URL without the page parameter
    #[serde(rename = "search-url")]
    pub search_url: String,
}

fn default_categories() -> Vec<CategoryEntry> {
    const PRIVATE: &str = "rows=25&SELLER_TYPE=PRIVATE&keyword=Privatverkauf";
    let entry = |name: &str, path: &str, areas: &str| CategoryEntry {
        name: name.to_string(),
        search_url: format!("{}/iad/immobilien/{}?{}&{}", DEFAULT_ORIGIN, path, areas, PRIVATE),
    };

    vec![
        entry(
            "eigentumswohnung-wien",
            "eigentumswohnung/eigentumswohnung-angebote",
            "areaId=900&areaId=903",
        ),
        entry(
            "eigentumswohnung-niederoesterreich",
            "eigentumswohnung/eigentumswohnung-angebote",
            "areaId=904",
        ),
        entry(
            "grundstueck-wien",
            "grundstueck/grundstueck-angebote",
            "areaId=900&areaId=903",
        ),
        entry(
            "grundstueck-niederoesterreich",
            "grundstueck/grundstueck-angebote",
            "areaId=904",
        ),
    ]
}
