use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;

pub mod cookies;
pub mod password;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    pub role: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: i64, email: &str, role: &str, token_type: TokenType, config: &AuthConfig) -> Self {
        let now = Utc::now();
        let lifetime = match token_type {
            TokenType::Access => Duration::minutes(config.access_token_minutes),
            TokenType::Refresh => Duration::days(config.refresh_token_days),
        };

        Self {
            user_id,
            email: email.to_string(),
            role: role.to_string(),
            token_type,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("No authentication token provided")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Access and refresh tokens issued together at login
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

pub fn generate_jwt(claims: &Claims, config: &AuthConfig) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn issue_token_pair(user_id: i64, email: &str, role: &str, config: &AuthConfig) -> Result<TokenPair, AuthError> {
    let access = Claims::new(user_id, email, role, TokenType::Access, config);
    let refresh = Claims::new(user_id, email, role, TokenType::Refresh, config);

    Ok(TokenPair {
        access_token: generate_jwt(&access, config)?,
        refresh_token: generate_jwt(&refresh, config)?,
        expires_in: config.access_token_minutes * 60,
        refresh_expires_in: config.refresh_token_days * 24 * 60 * 60,
    })
}

/// Verify signature and expiry, and that the token is of the expected kind
pub fn validate_jwt(token: &str, expected: TokenType, config: &AuthConfig) -> Result<Claims, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default()).map_err(|e| {
        tracing::debug!("Rejected JWT: {}", e);
        AuthError::InvalidToken
    })?;

    if token_data.claims.token_type != expected {
        return Err(AuthError::WrongTokenType);
    }
    Ok(token_data.claims)
}

/// Bearer header first, then the `jwt_token` cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => cookies::read_cookie(headers, cookies::ACCESS_COOKIE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    fn config() -> AuthConfig {
        AppConfig::development().auth
    }

    #[test]
    fn access_token_round_trip() {
        let config = config();
        let pair = issue_token_pair(42, "admin@example.com", "admin", &config).unwrap();
        let claims = validate_jwt(&pair.access_token, TokenType::Access, &config).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, "admin");
        assert_eq!(pair.refresh_expires_in, 7 * 24 * 3600);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let config = config();
        let pair = issue_token_pair(1, "a@b.c", "admin", &config).unwrap();
        assert!(matches!(
            validate_jwt(&pair.refresh_token, TokenType::Access, &config),
            Err(AuthError::WrongTokenType)
        ));
        assert!(validate_jwt(&pair.refresh_token, TokenType::Refresh, &config).is_ok());
    }

    #[test]
    fn expired_and_foreign_tokens_fail() {
        let config = config();
        let mut claims = Claims::new(1, "a@b.c", "admin", TokenType::Access, &config);
        claims.exp = Utc::now().timestamp() - 3600;
        let expired = generate_jwt(&claims, &config).unwrap();
        assert!(matches!(validate_jwt(&expired, TokenType::Access, &config), Err(AuthError::InvalidToken)));

        let mut other = config.clone();
        other.jwt_secret = "another-secret".to_string();
        let foreign = issue_token_pair(1, "a@b.c", "admin", &other).unwrap().access_token;
        assert!(matches!(validate_jwt(&foreign, TokenType::Access, &config), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn empty_secret_fails_closed() {
        let mut config = config();
        config.jwt_secret.clear();
        assert!(matches!(issue_token_pair(1, "a", "admin", &config), Err(AuthError::InvalidSecret)));
        assert!(matches!(validate_jwt("x.y.z", TokenType::Access, &config), Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn token_extraction_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; jwt_token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert("authorization", HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        let mut bare = HeaderMap::new();
        bare.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&bare), None);
    }
}
