//! JWT-based authentication

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT claims for API authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Role: holder, issuer, or admin
    pub role: String,
}

impl Claims {
    pub fn for_user(user_id: &str, role: &str, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            iss: "cachet-api".to_string(),
            role: role.to_string(),
        }
    }

    /// Admins pass every role check
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role || self.role == "admin"
    }

    /// The subject as a user id
    pub fn user_id(&self) -> Result<Uuid, ApiError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| ApiError::Unauthorized("token subject is not a valid user id".to_string()))
    }
}

/// JWT authentication handler
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::default();
        validation.set_issuer(&["cachet-api"]);
        validation.validate_exp = true;

        Self {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Create from `CACHET_JWT_SECRET` (required in production)
    pub fn from_env() -> Result<Self, ApiError> {
        let secret = std::env::var("CACHET_JWT_SECRET").map_err(|_| {
            ApiError::Internal(
                "CACHET_JWT_SECRET environment variable is required. \
                 Generate with: openssl rand -base64 32"
                    .to_string(),
            )
        })?;

        if secret.len() < 32 {
            return Err(ApiError::Internal(
                "CACHET_JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        Ok(Self::new(&secret))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT encoding error: {e}")))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("Invalid token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token validation failed: {e}")),
            })
    }

    /// Extract the bearer token from an Authorization header value
    pub fn extract_from_header(header: &str) -> Result<&str, ApiError> {
        header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_encode_decode() {
        let auth = JwtAuth::new("test-secret-key-32-bytes-long!!!");
        let id = Uuid::new_v4();
        let claims = Claims::for_user(&id.to_string(), "holder", Duration::hours(1));

        let token = auth.encode(&claims).unwrap();
        let decoded = auth.decode(&token).unwrap();

        assert_eq!(decoded.sub, id.to_string());
        assert_eq!(decoded.role, "holder");
        assert_eq!(decoded.user_id().unwrap(), id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = JwtAuth::new("test-secret-key-32-bytes-long!!!");
        // -300s to clear the default 60s leeway
        let claims = Claims::for_user("user", "holder", Duration::seconds(-300));

        let token = auth.encode(&claims).unwrap();
        assert!(matches!(
            auth.decode(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_admin_passes_every_role_check() {
        let claims = Claims::for_user("user", "admin", Duration::hours(1));
        assert!(claims.has_role("admin"));
        assert!(claims.has_role("issuer"));
        assert!(claims.has_role("holder"));

        let holder = Claims::for_user("user", "holder", Duration::hours(1));
        assert!(!holder.has_role("admin"));
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let claims = Claims::for_user("not-a-uuid", "holder", Duration::hours(1));
        assert!(claims.user_id().is_err());
    }
}
