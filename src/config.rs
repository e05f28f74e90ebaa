use serde::Deserialize;
use url::Url;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_VIACEP_BASE_URL: &str = "https://viacep.com.br/ws";
pub const DEFAULT_VIACEP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// `None` runs the service on the in-memory repository.
    pub database_url: Option<String>,
    pub port: u16,
    pub viacep_base_url: String,
    pub viacep_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: DEFAULT_PORT,
            viacep_base_url: DEFAULT_VIACEP_BASE_URL.to_string(),
            viacep_timeout_secs: DEFAULT_VIACEP_TIMEOUT_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            viacep_base_url: std::env::var("VIACEP_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map_or_else(|| Ok::<_, anyhow::Error>(defaults.viacep_base_url.clone()), |url| {
                    let parsed = Url::parse(&url)
                        .map_err(|e| anyhow::anyhow!("VIACEP_BASE_URL is not a valid URL: {}", e))?;
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        anyhow::bail!("VIACEP_BASE_URL must start with http:// or https://");
                    }
                    Ok(url)
                })?,
            viacep_timeout_secs: parse_or("VIACEP_TIMEOUT_SECS", defaults.viacep_timeout_secs)
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("VIACEP_TIMEOUT_SECS must be greater than 0");
                    }
                    Ok(secs)
                })?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", defaults.rate_limit_per_second)?,
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match &config.database_url {
            Some(url) => tracing::debug!("Database URL: {}...", &url[..20.min(url.len())]),
            None => tracing::debug!("Database URL: not set"),
        }
        tracing::debug!("ViaCEP Base URL: {}", config.viacep_base_url);
        tracing::debug!("ViaCEP timeout: {}s", config.viacep_timeout_secs);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", key)),
        _ => Ok(default),
    }
}
