use std::env;

use anyhow::{bail, Context, Result};

const DEFAULT_VERIFY_TOKEN: &str = "my_verify_token";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v20.0";
const DEFAULT_SPEEDTEST_SERVER: &str = "https://speed.cloudflare.com";

/// Immutable runtime configuration, read once at startup and passed to
/// every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloud API bearer credential.
    pub access_token: String,
    /// Sender account (phone number) identifier on the Cloud API.
    pub phone_number_id: String,
    /// Secret the platform must present during webhook verification.
    pub verify_token: String,
    /// Port the webhook server listens on.
    pub port: u16,
    /// Graph API endpoint base, overridable per deployment.
    pub graph_api_base: String,
    /// Candidate measurement server base URLs.
    pub speedtest_servers: Vec<String>,
}

impl Config {
    /// Load configuration from process environment variables. Missing
    /// required variables are fatal.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let access_token = get("ACCESS_TOKEN")
            .filter(|v| !v.is_empty())
            .context("ACCESS_TOKEN environment variable must be set")?;
        let phone_number_id = get("PHONE_NUMBER_ID")
            .filter(|v| !v.is_empty())
            .context("PHONE_NUMBER_ID environment variable must be set")?;

        let verify_token =
            get("VERIFY_TOKEN").unwrap_or_else(|| DEFAULT_VERIFY_TOKEN.to_string());

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        let graph_api_base = get("GRAPH_API_BASE")
            .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let speedtest_servers = match get("SPEEDTEST_SERVERS") {
            Some(raw) => {
                let servers: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if servers.is_empty() {
                    bail!("SPEEDTEST_SERVERS is set but contains no server URLs");
                }
                servers
            }
            None => vec![DEFAULT_SPEEDTEST_SERVER.to_string()],
        };

        Ok(Self {
            access_token,
            phone_number_id,
            verify_token,
            port,
            graph_api_base,
            speedtest_servers,
        })
    }

    /// Messages endpoint for the configured sender account.
    pub fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.graph_api_base, self.phone_number_id)
    }
}
