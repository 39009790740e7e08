/// JWT Token Issuance and Validation
///
/// The codec half (`decode_token`) verifies signature, structure, expiry,
/// and issuer atomically; every failure mode is logged internally but
/// surfaced to callers as the single uniform `InvalidOrExpiredToken`
/// outcome, so the return value never reveals which check failed.
///
/// The issuer half (`issue_token` / `issue_token_with_expiry`) builds a
/// claim set with a fresh `jti` and signs it. Access and refresh tokens
/// share one issuance path; only the lifetime and the kind flag differ.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Issue a token of the given kind with the configured default lifetime
/// (access: `access_token_expiry`, refresh: `refresh_token_expiry`).
///
/// # Errors
/// Returns error if the algorithm is misconfigured or signing fails.
pub fn issue_token(
    user_id: &Uuid,
    email: &str,
    kind: TokenKind,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let expiry_seconds = match kind {
        TokenKind::Access => config.access_token_expiry,
        TokenKind::Refresh => config.refresh_token_expiry,
    };
    issue_token_with_expiry(user_id, email, kind, expiry_seconds, config)
}

/// Issue a token of the given kind with an explicit lifetime in seconds.
pub fn issue_token_with_expiry(
    user_id: &Uuid,
    email: &str,
    kind: TokenKind,
    expiry_seconds: i64,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *user_id,
        email.to_string(),
        kind.is_refresh(),
        expiry_seconds,
        config.issuer.clone(),
    );

    encode(
        &Header::new(config.signing_algorithm()?),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate a token, returning its claim set.
///
/// # Errors
/// Returns the uniform `InvalidOrExpiredToken` on signature mismatch,
/// malformed input, expired `exp`, or issuer mismatch. The specific cause
/// is retained in logs only.
pub fn decode_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(config.signing_algorithm()?);
    // No grace window: a token is invalid the moment `exp` passes.
    validation.leeway = 0;
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!(error = %e, "token decode rejected");
        AppError::Auth(AuthError::InvalidOrExpiredToken)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 172800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_issue_and_decode_access_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();
        let email = "test@example.com";

        let token = issue_token(&user_id, email, TokenKind::Access, &config)
            .expect("Failed to issue token");
        let claims = decode_token(&token, &config).expect("Failed to decode token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, email);
        assert_eq!(claims.iss, "test");
        assert!(!claims.refresh);
    }

    #[test]
    fn test_refresh_token_carries_kind_flag() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = issue_token(&user_id, "test@example.com", TokenKind::Refresh, &config)
            .expect("Failed to issue token");
        let claims = decode_token(&token, &config).expect("Failed to decode token");

        assert!(claims.refresh);
    }

    #[test]
    fn test_distinct_tokens_have_distinct_jtis() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let a = issue_token(&user_id, "test@example.com", TokenKind::Access, &config).unwrap();
        let b = issue_token(&user_id, "test@example.com", TokenKind::Refresh, &config).unwrap();

        let a = decode_token(&a, &config).unwrap();
        let b = decode_token(&b, &config).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = issue_token_with_expiry(
            &user_id,
            "test@example.com",
            TokenKind::Access,
            -3600,
            &config,
        )
        .expect("Failed to issue token");

        let result = decode_token(&token, &config);
        match result {
            Err(AppError::Auth(AuthError::InvalidOrExpiredToken)) => (),
            other => panic!("Expected uniform invalid-token error, got {:?}", other),
        }
    }

    #[test]
    fn test_token_expired_seconds_ago_is_rejected() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        // Freshly lapsed: there must be no grace window after `exp`.
        let token = issue_token_with_expiry(
            &user_id,
            "test@example.com",
            TokenKind::Access,
            -30,
            &config,
        )
        .expect("Failed to issue token");

        match decode_token(&token, &config) {
            Err(AppError::Auth(AuthError::InvalidOrExpiredToken)) => (),
            other => panic!("Expected uniform invalid-token error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let config = get_test_config();
        let result = decode_token("invalid.token.here", &config);

        assert!(result.is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = issue_token(&user_id, "test@example.com", TokenKind::Access, &config)
            .expect("Failed to issue token");

        let tampered = format!("{}X", token);
        let result = decode_token(&tampered, &config);

        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = issue_token(&user_id, "test@example.com", TokenKind::Access, &config)
            .expect("Failed to issue token");

        let mut other = get_test_config();
        other.secret = "a-completely-different-signing-secret-42".to_string();
        assert!(decode_token(&token, &other).is_err());
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let mut config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = issue_token(&user_id, "test@example.com", TokenKind::Access, &config)
            .expect("Failed to issue token");

        config.issuer = "wrong-issuer".to_string();
        assert!(decode_token(&token, &config).is_err());
    }
}
