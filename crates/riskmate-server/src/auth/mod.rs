//! Bearer-token authentication
//!
//! Tokens are HS256 JWTs issued by the identity provider. The `sub` claim is
//! the user id; organization and role always come from the `users` table so
//! a role change takes effect on the next request.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::net::SocketAddr;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::config::AuthConfig;
use crate::error::AppError;
use crate::rbac::{ActorContext, Role};

/// JWT claims read by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Failed to issue token: {0}")]
    Issue(String),

    #[error("User is not a member of any organization")]
    UnknownUser,

    #[error("User account has been deactivated")]
    ArchivedUser,

    #[error("User has an unrecognized role")]
    InvalidRole(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                AppError::Unauthorized(err.to_string())
            },
            AuthError::UnknownUser | AuthError::ArchivedUser | AuthError::InvalidRole(_) => {
                AppError::Forbidden(err.to_string())
            },
            AuthError::Issue(msg) => AppError::Internal(msg),
            AuthError::Database(e) => AppError::Database(e),
        }
    }
}

/// Mint a token for `user_id` (local tooling and tests)
pub fn create_token(
    user_id: Uuid,
    email: Option<&str>,
    config: &AuthConfig,
    ttl: Duration,
) -> Result<String, AuthError> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Issue("expiration overflow".to_string()))?
        .timestamp()
        .max(0) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
        email: email.map(str::to_string),
        aud: config.jwt_audience.clone(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::Issue(e.to_string()))
}

/// Verify signature, expiry and (when configured) audience
pub fn verify_token(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    match &config.jwt_audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token.trim())
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    organization_id: Uuid,
    email: String,
    full_name: Option<String>,
    role: String,
    archived_at: Option<DateTime<Utc>>,
}

async fn load_actor(pool: &PgPool, user_id: Uuid) -> Result<ActorContext, AuthError> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, organization_id, email, full_name, role, archived_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::UnknownUser)?;

    if user.archived_at.is_some() {
        return Err(AuthError::ArchivedUser);
    }

    let role: Role = user
        .role
        .parse()
        .map_err(|_| AuthError::InvalidRole(user.role.clone()))?;

    Ok(ActorContext {
        user_id: user.id,
        organization_id: user.organization_id,
        role,
        email: user.email,
        full_name: user.full_name,
        ip_address: None,
        user_agent: None,
    })
}

/// Client address: socket peer first, then the first `x-forwarded-for` hop
pub fn client_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .or_else(|| {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Authentication middleware for `/api/v1`
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip_address = client_ip(&request);
    match resolve_actor(&state, request.headers(), ip_address).await {
        Ok(actor) => {
            debug!(
                user_id = %actor.user_id,
                organization_id = %actor.organization_id,
                role = %actor.role,
                "Authenticated request"
            );
            request.extensions_mut().insert(actor);
            next.run(request).await
        },
        Err(err) => {
            warn!(
                path = %request.uri().path(),
                error = %err,
                "Authentication failed"
            );
            AppError::from(err).into_response()
        },
    }
}

async fn resolve_actor(
    state: &AppState,
    headers: &HeaderMap,
    ip_address: Option<String>,
) -> Result<ActorContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = verify_token(token, &state.auth)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))?;

    let mut actor = load_actor(&state.db, user_id).await?;
    actor.ip_address = ip_address;
    actor.user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Ok(actor)
}
