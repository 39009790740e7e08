/// Bearer Token Validation
///
/// One terminal decision procedure per request:
/// extract -> decode -> kind check -> revocation check -> claims.
/// Any failure short-circuits the remaining steps and is audit-logged.
/// The revocation check is policy-gated by configuration and fails open:
/// a store error is logged and the token is treated as not revoked.

use actix_web::http::header;
use actix_web::HttpRequest;

use crate::auth::blocklist::TokenBlocklist;
use crate::auth::claims::{Claims, TokenKind};
use crate::auth::jwt::decode_token;
use crate::configuration::{JwtSettings, RevocationSettings};
use crate::error::{AppError, AuthError};

/// Pull the bearer credential out of an `Authorization` header value.
///
/// # Errors
/// Returns `MissingCredential` when the header is absent or does not
/// carry a `Bearer` scheme.
pub fn extract_bearer(header_value: Option<&str>) -> Result<&str, AppError> {
    header_value
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Auth(AuthError::MissingCredential))
}

/// Validate a bearer credential against the expected token kind.
///
/// # Errors
/// - `MissingCredential`: no usable `Authorization: Bearer` header
/// - `InvalidOrExpiredToken`: decode failure of any cause
/// - `WrongTokenKind`: access token where refresh required, or vice versa
/// - `TokenRevoked`: the token identifier is on the blocklist
pub async fn validate_bearer(
    header_value: Option<&str>,
    kind: TokenKind,
    jwt_config: &JwtSettings,
    revocation: &RevocationSettings,
    blocklist: &dyn TokenBlocklist,
) -> Result<Claims, AppError> {
    let token = extract_bearer(header_value).map_err(|e| {
        tracing::warn!("missing or malformed Authorization header");
        e
    })?;

    let claims = decode_token(token, jwt_config)?;

    if !kind.matches(&claims) {
        tracing::warn!(
            jti = %claims.jti,
            expected_refresh = kind.is_refresh(),
            "token kind mismatch"
        );
        return Err(AppError::Auth(AuthError::WrongTokenKind));
    }

    if revocation.enabled {
        match blocklist.is_revoked(&claims.jti).await {
            Ok(true) => {
                tracing::warn!(jti = %claims.jti, "revoked token presented");
                return Err(AppError::Auth(AuthError::TokenRevoked));
            }
            Ok(false) => {}
            Err(e) => {
                // Fail-open: availability wins over strict revocation.
                tracing::warn!(
                    jti = %claims.jti,
                    error = %e,
                    "revocation store unreachable, accepting token"
                );
            }
        }
    }

    Ok(claims)
}

/// Convenience wrapper reading the `Authorization` header off a request.
pub async fn validate_request(
    req: &HttpRequest,
    kind: TokenKind,
    jwt_config: &JwtSettings,
    revocation: &RevocationSettings,
    blocklist: &dyn TokenBlocklist,
) -> Result<Claims, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    validate_bearer(header_value.as_deref(), kind, jwt_config, revocation, blocklist).await
}
