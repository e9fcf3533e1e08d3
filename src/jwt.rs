//! Access-token signing/verification and refresh-secret generation.

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of random bytes in a refresh secret before encoding.
const REFRESH_SECRET_BYTES: usize = 32;

/// Claims carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Owning user's UUID
    pub user_id: String,
    /// Owning user's email
    pub email: String,
    /// Unique token identifier, used as the blacklist key
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Not valid before (Unix timestamp)
    pub nbf: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of issuing an access token.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    /// The signed JWT string
    pub token: String,
    /// The token's unique identifier
    pub jti: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

/// Signing configuration for access tokens.
///
/// Holds the HMAC keys derived from the process-wide secret. Immutable
/// after construction; share via `Arc`.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and access-token TTL.
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    /// Access-token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl.as_secs()
    }

    /// Issue a signed access token for a user.
    ///
    /// Stamps `iat = nbf = now` and `exp = now + access_ttl`, with a fresh
    /// random jti.
    pub fn issue_access_token(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<IssuedAccessToken, JwtError> {
        let now = unix_now()?;
        let jti = uuid::Uuid::new_v4().to_string();

        let claims = AccessClaims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            jti: jti.clone(),
            iat: now,
            nbf: now,
            exp: now + self.access_ttl.as_secs(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedAccessToken {
            token,
            jti,
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Generate an opaque refresh secret: 32 bytes from the OS CSPRNG,
    /// URL-safe base64 encoded.
    ///
    /// An RNG failure is returned as an error, never degraded to a weaker
    /// source.
    pub fn issue_refresh_secret(&self) -> Result<String, JwtError> {
        use rand::TryRngCore;

        let mut bytes = [0u8; REFRESH_SECRET_BYTES];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| JwtError::Rng)?;
        Ok(base64::engine::general_purpose::URL_SAFE.encode(bytes))
    }

    /// Verify and decode an access token.
    ///
    /// Only HS256 is accepted; a token declaring any other algorithm fails
    /// verification regardless of its signature. An expired token yields
    /// [`JwtError::Expired`], every other failure [`JwtError::Invalid`].
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(
                |e| match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                    _ => JwtError::Invalid,
                },
            )?;

        Ok(token_data.claims)
    }

    /// Decode an access token's claims without checking signature or expiry.
    ///
    /// Only used by logout to recover the jti of a token that may already
    /// be expired. Never authenticate with claims from this method.
    pub fn parse_access_token_unverified(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
                .map_err(|_| JwtError::Invalid)?;

        Ok(token_data.claims)
    }
}

/// Current Unix timestamp in seconds.
pub(crate) fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::Time)
}

/// Errors from token operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding/signing a token
    Encoding(jsonwebtoken::errors::Error),
    /// Token is past its expiry
    Expired,
    /// Token is malformed, has a bad signature, or declares a wrong algorithm
    Invalid,
    /// The OS random source failed
    Rng,
    /// System time error
    Time,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::Invalid => write!(f, "Invalid token"),
            JwtError::Rng => write!(f, "Random source failure"),
            JwtError::Time => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_config() -> JwtConfig {
        JwtConfig::new(
            b"test-secret-key-for-testing-only",
            Duration::from_secs(900),
        )
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let config = test_config();

        let issued = config
            .issue_access_token("uuid-123", "alice@example.com")
            .unwrap();
        assert_eq!(issued.expires_in, 900);
        assert!(!issued.jti.is_empty());

        let claims = config.verify_access_token(&issued.token).unwrap();
        assert_eq!(claims.user_id, "uuid-123");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.jti, issued.jti);
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config1 = JwtConfig::new(b"secret-one-secret-one-secret-one", Duration::from_secs(900));
        let config2 = JwtConfig::new(b"secret-two-secret-two-secret-two", Duration::from_secs(900));

        let issued = config1.issue_access_token("uuid-123", "a@b.c").unwrap();

        match config2.verify_access_token(&issued.token) {
            Err(JwtError::Invalid) => {}
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_token_distinct_from_invalid() {
        let config = test_config();
        let now = unix_now().unwrap();

        // Hand-encode claims that expired 50 seconds ago.
        let claims = AccessClaims {
            user_id: "uuid-123".to_string(),
            email: "a@b.c".to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now - 100,
            nbf: now - 100,
            exp: now - 50,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-for-testing-only"),
        )
        .unwrap();

        match config.verify_access_token(&token) {
            Err(JwtError::Expired) => {}
            other => panic!("expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        let config = test_config();
        let now = unix_now().unwrap();

        let claims = AccessClaims {
            user_id: "uuid-123".to_string(),
            email: "a@b.c".to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            nbf: now,
            exp: now + 900,
        };
        // Same secret, different declared algorithm.
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-for-testing-only"),
        )
        .unwrap();

        match config.verify_access_token(&token) {
            Err(JwtError::Invalid) => {}
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_token_invalid() {
        let config = test_config();
        match config.verify_access_token("not-a-token") {
            Err(JwtError::Invalid) => {}
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_unique_jti() {
        let config = test_config();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let issued = config.issue_access_token("uuid-123", "a@b.c").unwrap();
            assert!(seen.insert(issued.jti), "jti collision");
        }
    }

    #[test]
    fn test_refresh_secret_length_and_uniqueness() {
        let config = test_config();
        let mut seen = HashSet::new();

        for _ in 0..100_000 {
            let secret = config.issue_refresh_secret().unwrap();
            // 32 bytes, URL-safe base64 with padding.
            assert_eq!(secret.len(), 44);
            assert!(seen.insert(secret), "refresh secret collision");
        }
    }

    #[test]
    fn test_unverified_parse_of_expired_token() {
        let config = test_config();
        let now = unix_now().unwrap();

        let jti = uuid::Uuid::new_v4().to_string();
        let claims = AccessClaims {
            user_id: "uuid-123".to_string(),
            email: "a@b.c".to_string(),
            jti: jti.clone(),
            iat: now - 100,
            nbf: now - 100,
            exp: now - 50,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-for-testing-only"),
        )
        .unwrap();

        // Verification refuses it, but logout can still recover the jti.
        assert!(config.verify_access_token(&token).is_err());
        let parsed = config.parse_access_token_unverified(&token).unwrap();
        assert_eq!(parsed.jti, jti);
        assert_eq!(parsed.user_id, "uuid-123");
    }
}
