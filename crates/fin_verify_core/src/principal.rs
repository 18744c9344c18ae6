use crate::error::VerifyError;

/// The authenticated caller. Every pipeline operation is scoped to
/// `user_id`; core logic never reads raw tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: Option<String>,
}

impl Principal {
    /// Construct from validated JWT claims at the server boundary.
    pub fn from_jwt_claims(claims: &JwtClaims) -> Result<Self, VerifyError> {
        let user_id = claims
            .sub
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VerifyError::Unauthorized("missing sub claim".into()))?;
        Ok(Self {
            user_id: user_id.to_string(),
            email: claims.email.clone(),
        })
    }

    /// Construct explicitly for in-process callers and tests.
    pub fn in_process(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

/// JWT claims shape expected from the identity provider.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_jwt_claims_happy_path() {
        let claims = JwtClaims {
            sub: Some("user-42".into()),
            email: Some("a@example.com".into()),
            exp: None,
        };
        let p = Principal::from_jwt_claims(&claims).unwrap();
        assert_eq!(p.user_id, "user-42");
        assert_eq!(p.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn from_jwt_claims_missing_sub() {
        let claims = JwtClaims {
            sub: None,
            email: None,
            exp: None,
        };
        let err = Principal::from_jwt_claims(&claims).unwrap_err();
        assert!(matches!(err, VerifyError::Unauthorized(_)));
    }

    #[test]
    fn from_jwt_claims_blank_sub() {
        let claims = JwtClaims {
            sub: Some("   ".into()),
            email: None,
            exp: None,
        };
        assert!(Principal::from_jwt_claims(&claims).is_err());
    }
}
