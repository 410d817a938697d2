//! Server configuration from the environment

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::http::HttpOptions;

const DEFAULT_ADDR: &str = ":4000";

#[derive(Clone, Debug)]
pub struct Config {
    /// Socket address to listen on
    pub addr: String,

    /// Options for fetching upstream pages
    pub http: HttpOptions,
}

impl Config {
    /// Load configuration from the process environment, after reading `.env`
    /// if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from a variable lookup.
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut http = HttpOptions::default();

        if let Some(secs) = parse_var::<u64>(&var, "SUMMARY_TIMEOUT_SECS") {
            http = http.timeout(Duration::from_secs(secs));
        }
        if let Some(bytes) = parse_var::<usize>(&var, "SUMMARY_MAX_BODY_BYTES") {
            http = http.max_body_size(bytes);
        }
        if let Some(allow) = parse_var::<bool>(&var, "SUMMARY_ALLOW_PRIVATE_IPS") {
            http = http.block_private_ips(!allow);
        }
        if let Some(agent) = var("SUMMARY_USER_AGENT").filter(|a| !a.is_empty()) {
            http = http.user_agent(agent);
        }

        if var("TLSCERT").is_some() || var("TLSKEY").is_some() {
            warn!("TLSCERT/TLSKEY are ignored; terminate TLS in front of this server");
        }

        let addr = var("ADDR")
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());

        Config {
            addr: listen_addr(&addr),
            http,
        }
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

/// Expand a bare `:port` to listen on all interfaces.
fn listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}
