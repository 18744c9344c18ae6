//! Bearer-token authentication.
//!
//! Validates an HS256 JWT and inserts the resulting [`Principal`] into the
//! request extensions for handlers to extract.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use fin_verify_core::principal::{JwtClaims, Principal};
use fin_verify_core::VerifyError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::error::AppError;

#[derive(Clone)]
pub struct JwtConfig {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not required.
        validation.required_spec_claims.clear();
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn principal(&self, token: &str) -> Result<Principal, VerifyError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| VerifyError::Unauthorized(format!("invalid token: {e}")))?;
        Principal::from_jwt_claims(&data.claims)
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| VerifyError::Unauthorized("missing bearer token".into()))?;
    let principal = config.principal(token)?;
    tracing::debug!(user_id = %principal.user_id, "authenticated");
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
