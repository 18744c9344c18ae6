//! Provider configuration, read from the environment at startup.
//!
//!   VERIFY_PROVIDER_BASE_URL      provider API base URL (required)
//!   VERIFY_PROVIDER_API_KEY       provider credential (required)
//!   VERIFY_PROVIDER_AUTH_HEADER   header carrying the credential (default: Authorization)
//!   VERIFY_PROVIDER_TIMEOUT_SECS  per-request ceiling (default: 30)

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::types::DEFAULT_SOURCE;

pub const DEFAULT_AUTH_HEADER: &str = "Authorization";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub auth_header: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("auth_header", &self.auth_header)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("VERIFY_PROVIDER_BASE_URL")
            .context("VERIFY_PROVIDER_BASE_URL environment variable not set")?;
        url::Url::parse(&base_url)
            .with_context(|| format!("VERIFY_PROVIDER_BASE_URL is not a valid URL: {base_url}"))?;
        let api_key = std::env::var("VERIFY_PROVIDER_API_KEY")
            .context("VERIFY_PROVIDER_API_KEY environment variable not set")?;
        if api_key.trim().is_empty() {
            return Err(anyhow!("VERIFY_PROVIDER_API_KEY is empty"));
        }

        let mut config = Self::new(base_url, api_key);
        if let Ok(header) = std::env::var("VERIFY_PROVIDER_AUTH_HEADER") {
            if !header.trim().is_empty() {
                config.auth_header = header.trim().to_string();
            }
        }
        if let Some(secs) = std::env::var("VERIFY_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Header name and value for the provider credential. A standard
    /// `Authorization` header carries a bearer token; any custom header
    /// carries the raw key.
    pub fn credential_header(&self) -> (String, String) {
        let value = if self.auth_header.eq_ignore_ascii_case("authorization") {
            format!("Bearer {}", self.api_key)
        } else {
            self.api_key.clone()
        };
        (self.auth_header.clone(), value)
    }
}

/// Provider paths used for one OTP data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoutes {
    pub generate: String,
    pub resolve: String,
    pub passbook: Option<String>,
}

/// Provider paths for the tax (ITR) pull: PAN profile, then the annual
/// information statement for one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItrRoutes {
    pub pan_profile: String,
    pub ais: String,
}

impl Default for ItrRoutes {
    fn default() -> Self {
        Self {
            pan_profile: "/v1/pan/comprehensive-plus".into(),
            ais: "/v1/itr/ais".into(),
        }
    }
}

/// Per-source provider paths. Sources without routes cannot be verified.
#[derive(Debug, Clone)]
pub struct ProviderRoutes {
    otp: BTreeMap<String, SourceRoutes>,
    itr: ItrRoutes,
}

impl Default for ProviderRoutes {
    fn default() -> Self {
        let mut otp = BTreeMap::new();
        otp.insert(
            DEFAULT_SOURCE.to_string(),
            SourceRoutes {
                generate: "/v1/epfo/generate-otp".into(),
                resolve: "/v1/epfo/verify-otp".into(),
                passbook: Some("/v1/epfo/passbook".into()),
            },
        );
        Self {
            otp,
            itr: ItrRoutes::default(),
        }
    }
}

impl ProviderRoutes {
    /// Register (or replace) the OTP routes for `source`.
    pub fn with_source(mut self, source: impl Into<String>, routes: SourceRoutes) -> Self {
        self.otp.insert(source.into(), routes);
        self
    }

    pub fn with_itr(mut self, routes: ItrRoutes) -> Self {
        self.itr = routes;
        self
    }

    /// OTP routes for `source`, if it is an OTP source.
    pub fn get(&self, source: &str) -> Option<&SourceRoutes> {
        self.otp.get(source)
    }

    pub fn itr(&self) -> &ItrRoutes {
        &self.itr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ITR_SOURCE;

    #[test]
    fn authorization_header_uses_bearer() {
        let cfg = ProviderConfig::new("https://provider.test/", "key-1");
        assert_eq!(cfg.base_url, "https://provider.test");
        assert_eq!(
            cfg.credential_header(),
            ("Authorization".to_string(), "Bearer key-1".to_string())
        );
    }

    #[test]
    fn authorization_header_match_is_case_insensitive() {
        let cfg = ProviderConfig::new("https://p.test", "k").with_auth_header("authorization");
        assert_eq!(cfg.credential_header().1, "Bearer k");
    }

    #[test]
    fn custom_header_carries_raw_key() {
        let cfg = ProviderConfig::new("https://p.test", "k").with_auth_header("X-Api-Key");
        assert_eq!(
            cfg.credential_header(),
            ("X-Api-Key".to_string(), "k".to_string())
        );
    }

    #[test]
    fn debug_masks_api_key() {
        let cfg = ProviderConfig::new("https://p.test", "secret-key");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("secret-key"));
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        let cfg = ProviderConfig::new("https://p.test", "k");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn default_routes_cover_epfo() {
        let routes = ProviderRoutes::default();
        let epfo = routes.get("epfo").unwrap();
        assert_eq!(epfo.generate, "/v1/epfo/generate-otp");
        assert_eq!(epfo.resolve, "/v1/epfo/verify-otp");
    }

    #[test]
    fn itr_is_fetched_directly_not_by_otp() {
        let routes = ProviderRoutes::default();
        assert!(routes.get(ITR_SOURCE).is_none());
        assert_eq!(routes.itr().pan_profile, "/v1/pan/comprehensive-plus");
        assert_eq!(routes.itr().ais, "/v1/itr/ais");
    }

    #[test]
    fn extra_sources_and_itr_paths_are_configurable() {
        let routes = ProviderRoutes::default()
            .with_source(
                "epfo-sandbox",
                SourceRoutes {
                    generate: "/sandbox/generate".into(),
                    resolve: "/sandbox/verify".into(),
                    passbook: None,
                },
            )
            .with_itr(ItrRoutes {
                pan_profile: "/v2/pan".into(),
                ais: "/v2/ais".into(),
            });
        assert_eq!(routes.get("epfo-sandbox").unwrap().resolve, "/sandbox/verify");
        assert!(routes.get("epfo").is_some());
        assert_eq!(routes.itr().ais, "/v2/ais");
    }
}
