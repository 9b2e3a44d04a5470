//! Signed, stateless access tokens.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::{AuthError, AuthResult};
use crate::AegisError;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    /// Claims that were signed.
    pub claims: AccessClaims,
}

/// Creates and verifies access tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime_secs: u64,
}

impl TokenIssuer {
    /// Create an issuer from a secret and a fixed access-token lifetime.
    pub fn new(secret: &str, lifetime_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime_secs: lifetime_secs.max(1),
        }
    }

    /// Configured access-token lifetime in seconds.
    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime_secs
    }

    /// Issue an access token with the configured lifetime.
    pub fn issue(&self, user_id: &str, email: &str) -> AuthResult<IssuedToken> {
        self.issue_with_lifetime(user_id, email, self.lifetime_secs)
    }

    /// Issue an access token with a custom lifetime.
    ///
    /// Not reachable from any public endpoint. A zero lifetime is raised to one
    /// second so `exp` is always after `iat`.
    pub fn issue_with_lifetime(
        &self,
        user_id: &str,
        email: &str,
        lifetime_secs: u64,
    ) -> AuthResult<IssuedToken> {
        let lifetime_secs = lifetime_secs.max(1);
        let iat = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat,
            exp: iat + lifetime_secs as i64,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(AegisError::Task(format!("token signing: {e}"))))?;

        Ok(IssuedToken {
            token,
            expires_in: lifetime_secs,
            claims,
        })
    }

    /// Verify signature and expiry of an access token.
    pub fn verify(&self, token: &str) -> AuthResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!("access token rejected: {}", e);
                    AuthError::InvalidToken
                }
            })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}
