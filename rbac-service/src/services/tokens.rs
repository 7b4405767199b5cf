use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::config::IdentityConfig;
use service_core::error::AppError;

/// Claims carried by the identity provider's session tokens. Only the subject
/// matters downstream; the rest is validated and dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (provider user id)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Verifies provider-issued bearer tokens against the provider's published
/// RS256 public key and issuer. Verification is local; the provider is never
/// called on the request path.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self, AppError> {
        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Failed to read identity provider public key from {}: {}",
                config.public_key_path,
                e
            ))
        })?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Failed to parse identity provider public key: {}",
                e
            ))
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&config.issuer]);

        tracing::info!(issuer = %config.issuer, "Token verifier initialized with RS256 key");

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use secrecy::Secret;

    const TEST_PRIVATE_KEY: &str = include_str!("../../tests/fixtures/jwt_test_private.pem");
    const TEST_ISSUER: &str = "https://identity.test.local";

    fn test_verifier() -> TokenVerifier {
        let config = IdentityConfig {
            issuer: TEST_ISSUER.to_string(),
            public_key_path: "tests/fixtures/jwt_test_public.pem".to_string(),
            superadmin_subject: "user_superadmin".to_string(),
            api_base_url: "http://localhost:8081/v1".to_string(),
            api_key: Secret::new("test".to_string()),
        };
        TokenVerifier::new(&config).expect("Failed to build verifier")
    }

    fn sign(sub: &str, iss: &str, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: sub.to_string(),
            iss: iss.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
        encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
    }

    #[test]
    fn valid_tokens_yield_the_subject() {
        let verifier = test_verifier();
        let token = sign("user_42", TEST_ISSUER, Duration::hours(1));
        let claims = verifier.verify(&token).expect("Token should verify");
        assert_eq!(claims.sub, "user_42");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let verifier = test_verifier();
        let token = sign("user_42", TEST_ISSUER, Duration::hours(-2));
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let verifier = test_verifier();
        let token = sign("user_42", "https://somewhere-else.example", Duration::hours(1));
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let verifier = test_verifier();
        assert!(verifier.verify("not-a-jwt").is_err());
        assert!(verifier.verify("").is_err());
    }
}
