use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// How long a created order holds its inventory before it may be expired.
    pub reservation_window_minutes: i64,
    pub paguelofacil: PagueloFacilConfig,
}

/// Settings for the PagueloFacil payment-link endpoint.
#[derive(Debug, Clone)]
pub struct PagueloFacilConfig {
    /// Merchant CCLW token. Link requests fail fast when unset.
    pub cclw: Option<String>,
    pub return_url: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    /// Where the browser lands after the redirect callback is processed.
    pub status_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let reservation_window_minutes = env::var("RESERVATION_WINDOW_MINUTES")
            .ok()
            .and_then(|m| m.parse::<i64>().ok())
            .unwrap_or(10);

        Ok(Self {
            database_url,
            host,
            port,
            reservation_window_minutes,
            paguelofacil: PagueloFacilConfig::from_env(),
        })
    }
}

impl PagueloFacilConfig {
    pub fn from_env() -> Self {
        let timeout_secs = env::var("PAGUELOFACIL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        Self {
            cclw: env::var("PAGUELOFACIL_CCLW").ok(),
            return_url: env::var("PAGUELOFACIL_RETURN_URL").ok(),
            base_url: env::var("PAGUELOFACIL_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.paguelofacil.com".to_string()),
            timeout: Duration::from_secs(timeout_secs),
            status_url: env::var("PAYMENT_STATUS_URL")
                .unwrap_or_else(|_| "/payments/status".to_string()),
        }
    }
}
