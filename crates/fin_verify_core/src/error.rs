use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerifyError>;

/// Message shown to callers for any provider-side failure. Provider detail is
/// logged, never returned.
pub const UPSTREAM_FAILED_MESSAGE: &str = "upstream verification failed";

/// Message shown to callers when a result could not be stored.
pub const PERSISTENCE_FAILED_MESSAGE: &str = "verification result could not be recorded";

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("consent required for source '{data_source}'")]
    ConsentRequired { data_source: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream error: status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl VerifyError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::ConsentRequired { .. } => 403,
            Self::InvalidState(_) => 409,
            Self::Transport(_) | Self::Upstream { .. } => 502,
            Self::Persistence(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable kind, used in error bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ConsentRequired { .. } => "consent_required",
            Self::InvalidState(_) => "invalid_state",
            Self::Transport(_) => "transport",
            Self::Upstream { .. } => "upstream",
            Self::Persistence(_) => "persistence",
            Self::Unauthorized(_) => "unauthorized",
            Self::Internal(_) => "internal",
        }
    }

    /// Message safe to show to the end caller.
    ///
    /// Validation and consent errors carry their actionable message; provider
    /// and storage failures collapse to fixed strings.
    pub fn public_message(&self) -> String {
        match self {
            Self::Transport(_) | Self::Upstream { .. } => UPSTREAM_FAILED_MESSAGE.to_string(),
            Self::Persistence(_) => PERSISTENCE_FAILED_MESSAGE.to_string(),
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}
