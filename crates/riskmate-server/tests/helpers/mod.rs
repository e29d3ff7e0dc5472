//! Shared setup for database-backed integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use riskmate_server::{
    audit::PgAuditSink,
    auth::create_token,
    config::{AuthConfig, CorsConfig, UploadConfig, DEFAULT_EVIDENCE_MAX_BYTES},
    create_router,
    rbac::Role,
    storage::{Storage, StorageConfig},
    AppState,
};
use sqlx::PgPool;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub async fn organization(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(format!("org-{}", Uuid::new_v4().simple()))
        .fetch_one(pool)
        .await
        .expect("insert organization")
}

pub async fn user(pool: &PgPool, organization_id: Uuid, role: Role) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO users (organization_id, email, full_name, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(organization_id)
    .bind(format!("{}-{}@example.com", role.as_str(), Uuid::new_v4().simple()))
    .bind(format!("{} User", role.label()))
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .expect("insert user")
}

pub async fn state(pool: PgPool) -> AppState {
    let storage = Storage::new(StorageConfig::for_minio("http://127.0.0.1:9000", "riskmate-test"))
        .await
        .expect("storage client");

    AppState {
        db: pool.clone(),
        storage,
        auth: Arc::new(AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
            jwt_audience: None,
        }),
        uploads: UploadConfig {
            evidence_max_bytes: DEFAULT_EVIDENCE_MAX_BYTES,
        },
        audit_sink: Arc::new(PgAuditSink::new(pool)),
    }
}

pub async fn app(pool: PgPool) -> axum::Router {
    let cors = CorsConfig {
        allowed_origins: vec![],
        allow_credentials: false,
    };
    create_router(state(pool).await, &cors)
}

pub fn bearer(user_id: Uuid) -> String {
    let config = AuthConfig {
        jwt_secret: JWT_SECRET.to_string(),
        jwt_audience: None,
    };
    let token = create_token(user_id, None, &config, Duration::hours(1)).expect("token");
    format!("Bearer {token}")
}
