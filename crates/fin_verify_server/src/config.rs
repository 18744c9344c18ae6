//! Server settings.
//!
//!   VERIFY_JWT_SECRET  JWT HMAC secret (required)
//!   VERIFY_BIND_ADDR   listen address (default: 0.0.0.0:4200)

use anyhow::{bail, Context, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4200";

#[derive(Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("VERIFY_JWT_SECRET")
            .context("VERIFY_JWT_SECRET environment variable not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("VERIFY_JWT_SECRET is empty");
        }
        let bind_addr =
            std::env::var("VERIFY_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
        Ok(Self {
            jwt_secret,
            bind_addr,
        })
    }
}
