use std::time::Duration;

pub const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
pub const DEFAULT_DOMAIN_CHECK_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Postgres URL for the lead sink. Without it results are not persisted.
    pub database_url: Option<String>,
    /// Google Places key. Without it directory lookups are disabled.
    pub google_places_api_key: Option<String>,
    pub google_places_base_url: String,
    pub domain_check_timeout_ms: u64,
    pub directory_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            google_places_api_key: std::env::var("GOOGLE_PLACES_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            google_places_base_url: std::env::var("GOOGLE_PLACES_BASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("GOOGLE_PLACES_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })
                .transpose()?
                .unwrap_or_else(|| DEFAULT_PLACES_BASE_URL.to_string()),
            domain_check_timeout_ms: parse_timeout_ms(
                "DOMAIN_CHECK_TIMEOUT_MS",
                std::env::var("DOMAIN_CHECK_TIMEOUT_MS").ok(),
                DEFAULT_DOMAIN_CHECK_TIMEOUT_MS,
            )?,
            directory_timeout_ms: parse_timeout_ms(
                "DIRECTORY_TIMEOUT_MS",
                std::env::var("DIRECTORY_TIMEOUT_MS").ok(),
                DEFAULT_DIRECTORY_TIMEOUT_MS,
            )?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match config.database_url {
            Some(ref url) => tracing::debug!("Database URL: {}...", redacted_prefix(url)),
            None => tracing::warn!("DB_URL not set, enriched leads will not be persisted"),
        }
        if config.google_places_api_key.is_none() {
            tracing::warn!("GOOGLE_PLACES_API_KEY not set, directory lookups disabled");
        }
        tracing::debug!("Places Base URL: {}", config.google_places_base_url);
        tracing::debug!(
            "Timeouts: domain check {}ms, directory {}ms",
            config.domain_check_timeout_ms,
            config.directory_timeout_ms
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn domain_check_timeout(&self) -> Duration {
        Duration::from_millis(self.domain_check_timeout_ms)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            google_places_api_key: None,
            google_places_base_url: DEFAULT_PLACES_BASE_URL.to_string(),
            domain_check_timeout_ms: DEFAULT_DOMAIN_CHECK_TIMEOUT_MS,
            directory_timeout_ms: DEFAULT_DIRECTORY_TIMEOUT_MS,
        }
    }
}

/// First 20 characters of a connection string, safe for logs.
fn redacted_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

/// Parses a millisecond timeout, falling back to `default` when unset.
fn parse_timeout_ms(name: &str, raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a positive number of milliseconds", name))?;
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
