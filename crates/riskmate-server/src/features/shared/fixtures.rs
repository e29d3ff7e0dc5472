//! Database fixtures for `#[sqlx::test]` cases

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::jobs::commands::{self, CreateJobCommand};
use crate::features::jobs::{Hazard, HazardSeverity, JobRecord};
use crate::rbac::{ActorContext, Role};

pub async fn organization(pool: &PgPool) -> Uuid {
    let slug = format!("org-{}", Uuid::new_v4().simple());
    sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ($1, $2) RETURNING id")
        .bind("Harbor Builders")
        .bind(slug)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn member(pool: &PgPool, organization_id: Uuid, role: Role) -> ActorContext {
    let email = format!("{}-{}@example.com", role.as_str(), Uuid::new_v4().simple());
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (organization_id, email, full_name, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(organization_id)
    .bind(&email)
    .bind(format!("{} User", role.label()))
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .unwrap();

    ActorContext {
        user_id,
        organization_id,
        role,
        email,
        full_name: Some(format!("{} User", role.label())),
        ip_address: Some("10.0.0.1".to_string()),
        user_agent: Some("fixture".to_string()),
    }
}

pub async fn job(pool: &PgPool, actor: &ActorContext) -> JobRecord {
    let command: CreateJobCommand = serde_json::from_value(json!({
        "client_name": "Harbor Logistics",
        "job_type": "Roof repair",
        "location": "Pier 4",
        "hazards": [Hazard {
            code: "WAH".to_string(),
            name: "Working at height".to_string(),
            severity: HazardSeverity::Critical,
        }],
    }))
    .unwrap();
    commands::create::handle(pool, actor, command).await.unwrap()
}
