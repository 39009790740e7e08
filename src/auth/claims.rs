/// JWT Claim Set
///
/// Represents the payload of a signed token: subject identity, standard
/// RFC 7519 claims, the unique token identifier used as the revocation
/// key, and the access/refresh kind flag.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Distinguishes the two token kinds an endpoint can require.
///
/// Validation is a single decode path parameterized by the expected kind
/// and dispatched with a plain match, rather than separate validator
/// types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Value the `refresh` claim must carry for this kind.
    pub fn is_refresh(self) -> bool {
        matches!(self, TokenKind::Refresh)
    }

    /// Whether a decoded claim set is of this kind.
    pub fn matches(self, claims: &Claims) -> bool {
        claims.refresh == self.is_refresh()
    }
}

/// Claim set embedded in every issued token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// User email
    pub email: String,
    /// Expiration time (Unix timestamp, UTC)
    pub exp: i64,
    /// Issued at (Unix timestamp, UTC)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token identifier, fresh per issuance; the revocation key
    pub jti: String,
    /// Kind flag: true for refresh tokens, false for access tokens
    pub refresh: bool,
}

impl Claims {
    /// Create new claims with user information and a fresh `jti`.
    ///
    /// Timestamps are always absolute UTC; expiry is computed from the
    /// current UTC time plus `expiry_seconds`.
    pub fn new(
        user_id: Uuid,
        email: String,
        refresh: bool,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
            refresh,
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns error if user ID is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid user ID in token".to_string()))
    }
}
