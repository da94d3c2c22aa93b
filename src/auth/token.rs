//! Signed session tokens.
//!
//! HMAC-signed JWTs carrying the caller's identity and tenant. Access and
//! refresh tokens share one claim layout and differ only in `type`. There is
//! no revocation list: a token is valid until its `exp` passes.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Role;
use crate::config::AuthConfig;

/// Distinguishes access from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity encoded into every token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: Uuid,
    pub email: String,
    pub tenant_id: Uuid,
    pub role: Role,
}

/// Wire claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub organization_id: Uuid,
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            subject: self.sub,
            email: self.email.clone(),
            tenant_id: self.organization_id,
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("expected {expected:?} token, got {found:?}")]
    WrongKind { expected: TokenKind, found: TokenKind },

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("unsupported signing algorithm: {0}")]
    Algorithm(String),
}

/// Issues and verifies session tokens. Built once at startup.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], algorithm: Algorithm, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let algorithm = match config.jwt_algorithm.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => return Err(TokenError::Algorithm(other.to_string())),
        };

        Ok(Self::new(
            config.jwt_secret.as_bytes(),
            algorithm,
            Duration::minutes(config.access_token_expire_minutes),
            Duration::days(config.refresh_token_expire_days),
        ))
    }

    /// Access token lifetime in seconds, reported to clients as `expires_in`.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue(identity, TokenKind::Access, self.access_ttl)
    }

    pub fn issue_refresh(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue(identity, TokenKind::Refresh, self.refresh_ttl)
    }

    pub fn issue(&self, identity: &Identity, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(identity, kind, ttl, Utc::now())
    }

    /// Issue with an explicit issue time.
    pub fn issue_at(
        &self,
        identity: &Identity,
        kind: TokenKind,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: identity.subject,
            email: identity.email.clone(),
            organization_id: identity.tenant_id,
            role: identity.role,
            kind,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, shape and expiry. No leeway is applied to `exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// `verify`, then require a specific token kind.
    pub fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.kind,
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-secret", Algorithm::HS256, Duration::minutes(30), Duration::days(7))
    }

    fn identity() -> Identity {
        Identity {
            subject: Uuid::new_v4(),
            email: "a@acme.io".into(),
            tenant_id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_roundtrip_preserves_identity() {
        let codec = codec();
        let id = identity();

        let token = codec.issue_access(&id).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.identity(), id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(2);
        let token = codec
            .issue_at(&identity(), TokenKind::Access, Duration::hours(1), issued)
            .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let codec = codec();
        let token = codec.issue_access(&identity()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let forged = codec.issue_access(&identity()).unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let spliced = parts.join(".");

        assert!(matches!(codec.verify(&spliced), Err(TokenError::Invalid(_))));
        assert!(matches!(codec.verify("not.a.token"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let other = TokenCodec::new(b"other", Algorithm::HS256, Duration::minutes(5), Duration::days(1));
        let token = other.issue_access(&identity()).unwrap();
        assert!(matches!(codec().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_kind_is_enforced() {
        let codec = codec();
        let access = codec.issue_access(&identity()).unwrap();
        let refresh = codec.issue_refresh(&identity()).unwrap();

        assert!(codec.verify_kind(&refresh, TokenKind::Refresh).is_ok());
        assert_eq!(
            codec.verify_kind(&access, TokenKind::Refresh),
            Err(TokenError::WrongKind {
                expected: TokenKind::Refresh,
                found: TokenKind::Access
            })
        );
    }

    #[test]
    fn test_from_config_rejects_asymmetric_algorithms() {
        let mut config = AuthConfig::default();
        config.jwt_algorithm = "RS256".into();
        assert!(matches!(TokenCodec::from_config(&config), Err(TokenError::Algorithm(_))));
    }
}
