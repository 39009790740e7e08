/// Authentication Routes
///
/// Handles user signup, login, token refresh, logout (revocation), and
/// current user information. Handlers own no token logic themselves;
/// they orchestrate the hasher, issuer, validator, and blocklist.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    hash_password, issue_token, validate_request, verify_password, Claims, TokenBlocklist,
    TokenKind,
};
use crate::configuration::{JwtSettings, RevocationSettings};
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext};
use crate::validators::{is_valid_email, is_valid_name};

/// User signup request
#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Minimal public identity returned alongside tokens
#[derive(Serialize)]
pub struct PublicUser {
    pub uid: String,
    pub email: String,
}

/// Login response with access and refresh tokens
#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: PublicUser,
}

/// Refresh response carrying only a new access token
#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

/// POST /auth/signup
///
/// Register a new user with email, password, and name. Returns the
/// public profile; tokens are only handed out at login.
///
/// # Errors
/// - 400: Validation errors (invalid email/password/name)
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn signup(
    form: web::Json<SignupRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_signup");

    let email = is_valid_email(&form.email)?;
    let name = is_valid_name(&form.name)?;
    let password_hash = hash_password(&form.password)?;

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool.get_ref())
        .await?;

    if existing.is_some() {
        return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
            format!("user with email {} already exists", email),
        )));
    }

    let user_id = Uuid::new_v4();
    let created_at = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user_id)
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .bind(created_at)
    .bind(created_at)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "user registered"
    );

    Ok(HttpResponse::Created().json(UserResponse {
        uid: user_id.to_string(),
        email,
        name,
        created_at: created_at.to_rfc3339(),
    }))
}

/// POST /auth/login
///
/// Authenticate with email and password; on success mint one access and
/// one refresh token with distinct token identifiers.
///
/// # Security Notes
/// - Unknown email and wrong password produce the same error, preventing
///   user enumeration.
///
/// # Errors
/// - 400: Validation error (invalid email format)
/// - 403: Invalid credentials
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let email = is_valid_email(&form.email)?;

    let user = sqlx::query_as::<_, (Uuid, String, String)>(
        "SELECT id, email, password_hash FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?;

    let (user_id, user_email, password_hash) = match user {
        Some(row) => row,
        None => {
            tracing::warn!(request_id = %context.request_id, "login for unknown email");
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }
    };

    if !verify_password(&form.password, &password_hash) {
        tracing::warn!(
            request_id = %context.request_id,
            user_id = %user_id,
            "login with wrong password"
        );
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let access_token = issue_token(&user_id, &user_email, TokenKind::Access, jwt_config.get_ref())?;
    let refresh_token =
        issue_token(&user_id, &user_email, TokenKind::Refresh, jwt_config.get_ref())?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "user logged in"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful".to_string(),
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
        user: PublicUser {
            uid: user_id.to_string(),
            email: user_email,
        },
    }))
}

/// POST /auth/refresh
///
/// Exchange a refresh token (bearer `Authorization` header) for a fresh
/// access token carrying the same subject claims.
///
/// # Errors
/// - 403: Missing, invalid, expired, revoked, or access-kind token
/// - 500: Internal server error
pub async fn refresh(
    req: HttpRequest,
    jwt_config: web::Data<JwtSettings>,
    revocation: web::Data<RevocationSettings>,
    blocklist: web::Data<dyn TokenBlocklist>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let claims = validate_request(
        &req,
        TokenKind::Refresh,
        jwt_config.get_ref(),
        revocation.get_ref(),
        blocklist.get_ref(),
    )
    .await?;

    let user_id = claims.user_id()?;
    let access_token = issue_token(&user_id, &claims.email, TokenKind::Access, jwt_config.get_ref())?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "access token refreshed"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/logout
///
/// Validate the presented access token and put its identifier on the
/// revocation blocklist. The revocation write is best-effort: once the
/// token validated, a store failure is logged but the call still
/// succeeds.
///
/// # Errors
/// - 403: Missing, invalid, expired, already-revoked, or refresh-kind token
pub async fn logout(
    req: HttpRequest,
    jwt_config: web::Data<JwtSettings>,
    revocation: web::Data<RevocationSettings>,
    blocklist: web::Data<dyn TokenBlocklist>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_logout");

    let claims = validate_request(
        &req,
        TokenKind::Access,
        jwt_config.get_ref(),
        revocation.get_ref(),
        blocklist.get_ref(),
    )
    .await?;

    match blocklist.revoke(&claims.jti).await {
        Ok(()) => {
            tracing::info!(
                request_id = %context.request_id,
                user_id = %claims.sub,
                jti = %claims.jti,
                "token revoked"
            );
        }
        Err(e) => {
            tracing::warn!(
                request_id = %context.request_id,
                jti = %claims.jti,
                error = %e,
                "revocation write failed, token remains valid until expiry"
            );
        }
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

/// GET /api/me
///
/// Get current authenticated user's information.
/// Claims are injected by the JWT middleware.
///
/// # Errors
/// - 403: Missing or invalid token (handled by middleware)
/// - 404: User not found
/// - 500: Internal server error
pub async fn current_user(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, (Uuid, String, String, chrono::DateTime<Utc>)>(
        "SELECT id, email, name, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        uid: user.0.to_string(),
        email: user.1,
        name: user.2,
        created_at: user.3.to_rfc3339(),
    }))
}
