use std::env;

use comanda_common::Secret;
use log::*;

const DEFAULT_COMANDA_HOST: &str = "127.0.0.1";
const DEFAULT_COMANDA_PORT: u16 = 8660;
const DEFAULT_WOMPI_URL: &str = "https://production.wompi.co/v1";

/// Header carrying the gateway's HMAC signature over the raw webhook body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Event-Checksum";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub wompi: WompiConfig,
}

#[derive(Clone, Debug, Default)]
pub struct WompiConfig {
    /// Base URL of the gateway API, e.g. "https://production.wompi.co/v1".
    pub api_url: String,
    pub public_key: String,
    pub private_key: Secret<String>,
    /// Shared secret for webhook signatures.
    pub events_secret: Secret<String>,
    /// When false, webhook signature checks are skipped. **DANGER**: only for local development.
    pub signature_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_COMANDA_HOST.to_string(),
            port: DEFAULT_COMANDA_PORT,
            database_url: String::default(),
            wompi: WompiConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("COMANDA_HOST").ok().unwrap_or_else(|| DEFAULT_COMANDA_HOST.into());
        let port = env::var("COMANDA_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for COMANDA_PORT. {e} Using the default, \
                         {DEFAULT_COMANDA_PORT}, instead."
                    );
                    DEFAULT_COMANDA_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_COMANDA_PORT);
        let database_url = env::var("COMANDA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ COMANDA_DATABASE_URL is not set. Please set it to the URL for the comanda database.");
            String::default()
        });
        let wompi = WompiConfig::from_env_or_defaults();
        Self { host, port, database_url, wompi }
    }
}

impl WompiConfig {
    pub fn from_env_or_defaults() -> Self {
        let api_url = env::var("COMANDA_WOMPI_URL").ok().unwrap_or_else(|| DEFAULT_WOMPI_URL.into());
        let public_key = env::var("COMANDA_WOMPI_PUBLIC_KEY").unwrap_or_else(|_| {
            warn!("🪛️ COMANDA_WOMPI_PUBLIC_KEY is not set. Gateway calls will be rejected.");
            String::default()
        });
        let private_key = Secret::new(env::var("COMANDA_WOMPI_PRIVATE_KEY").unwrap_or_else(|_| {
            warn!("🪛️ COMANDA_WOMPI_PRIVATE_KEY is not set. Gateway calls will be rejected.");
            String::default()
        }));
        let events_secret = Secret::new(env::var("COMANDA_WOMPI_EVENTS_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ COMANDA_WOMPI_EVENTS_SECRET is not set. Webhook signatures cannot be verified.");
            String::default()
        }));
        let signature_checks =
            env::var("COMANDA_WOMPI_SIGNATURE_CHECKS").map(|s| &s != "0" && &s != "false").unwrap_or(true);
        if !signature_checks {
            warn!("🪛️ Webhook signature checks are DISABLED. Never run like this in production.");
        }
        Self { api_url, public_key, private_key, events_secret, signature_checks }
    }
}
