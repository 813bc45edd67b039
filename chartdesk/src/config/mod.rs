//! Process configuration, read once from the environment at startup.

use dotenv::dotenv;

/// Runtime mode. Selects the default data source URL and whether the
/// offline HTTP cache layer in front of the UI is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn from_env() -> Self {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

pub struct Config {
    pub app_env: AppEnv,
    /// Credential for the market data provider, passed through as a query
    /// parameter.
    pub finnhub_api_key: String,
    /// Base URL of the candle endpoint.
    pub market_data_url: String,
    /// Path of the local SQLite database backing the offline cache.
    pub database_path: String,
    pub default_symbol: String,
    pub candle_resolution: String,
    pub candle_count: u32,
    /// Whether the background HTTP cache in front of the UI is active.
    /// Defaults on in production only, matching the desktop shell.
    pub cache_enabled: bool,
    pub api_bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        let app_env = AppEnv::from_env();
        Ok(Config {
            app_env,
            finnhub_api_key: std::env::var("FINNHUB_KEY")?,
            market_data_url: std::env::var("MARKET_DATA_URL")
                .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string()),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "trading-app.db".to_string()),
            default_symbol: std::env::var("DEFAULT_SYMBOL")
                .unwrap_or_else(|_| "AAPL".to_string()),
            candle_resolution: std::env::var("CANDLE_RESOLUTION")
                .unwrap_or_else(|_| "D".to_string()),
            candle_count: std::env::var("CANDLE_COUNT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            cache_enabled: std::env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(app_env == AppEnv::Production),
            api_bind_addr: std::env::var("API_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}
