//! Service configuration read from the environment (and `.env`).

use std::time::Duration;

use anyhow::{Context, Result, anyhow};

pub const DEFAULT_ROLE: &str = "admin";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKENS_FILE: &str = "tokens.json";

/// Connection settings for the remote query service plus the location of
/// the token table.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub admin_secret: String,
    pub role: String,
    pub timeout: Duration,
    pub tokens_file: String,
}

impl ServiceConfig {
    /// Reads `QUERY_SERVICE_URL` and `QUERY_SERVICE_SECRET` (required),
    /// `QUERY_SERVICE_ROLE`, `QUERY_TIMEOUT_SECS` and `TOKENS_FILE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let timeout = match lookup("QUERY_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("QUERY_TIMEOUT_SECS is not a number: '{raw}'"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: required("QUERY_SERVICE_URL")?,
            admin_secret: required("QUERY_SERVICE_SECRET")?,
            role: lookup("QUERY_SERVICE_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            timeout: Duration::from_secs(timeout),
            tokens_file: lookup("TOKENS_FILE").unwrap_or_else(|| DEFAULT_TOKENS_FILE.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("QUERY_SERVICE_URL", "https://example.test"),
            ("QUERY_SERVICE_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.role, "admin");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.tokens_file, "tokens.json");
    }

    #[test]
    fn test_missing_secret() {
        let err = ServiceConfig::from_lookup(lookup(&[("QUERY_SERVICE_URL", "https://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("QUERY_SERVICE_SECRET"));
    }

    #[test]
    fn test_bad_timeout() {
        let result = ServiceConfig::from_lookup(lookup(&[
            ("QUERY_SERVICE_URL", "https://x"),
            ("QUERY_SERVICE_SECRET", "s"),
            ("QUERY_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }
}
