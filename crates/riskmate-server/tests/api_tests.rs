//! HTTP API tests through the full router: authentication, role checks,
//! feature routes and the ledger events they leave behind
//!
//! Run with `DATABASE_URL` set: `cargo test -p riskmate-server -- --ignored`

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use riskmate_server::rbac::{Role, READ_ONLY_ERROR_CODE};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

mod helpers;

async fn call(app: &Router, method: Method, uri: &str, user: Uuid, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, helpers::bearer(user));
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        },
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn call_json(app: &Router, method: Method, uri: &str, user: Uuid, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = call(app, method, uri, user, body).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn new_job() -> Value {
    json!({
        "client_name": "Harbor Logistics",
        "job_type": "Roof repair",
        "location": "Pier 4, Warehouse B",
        "hazards": [
            {"code": "wah", "name": "Working at height", "severity": "critical"},
            {"code": "elec", "name": "Overhead power lines", "severity": "high"}
        ]
    })
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_job_lifecycle_is_recorded(pool: PgPool) -> sqlx::Result<()> {
    let org = helpers::organization(&pool, "Harbor Builders").await;
    let lead = helpers::user(&pool, org, Role::SafetyLead).await;
    let owner = helpers::user(&pool, org, Role::Owner).await;
    let app = helpers::app(pool.clone()).await;

    let (status, body) = call_json(&app, Method::POST, "/api/v1/jobs", lead, Some(new_job())).await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["risk_score"], 40);
    assert_eq!(body["data"]["risk_level"], "medium");
    assert_eq!(body["data"]["hazards"][0]["code"], "WAH");

    let (status, body) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/jobs/{job_id}/controls"),
        lead,
        Some(json!({"title": "Harness inspection", "hazard_code": "WAH"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let control_id = body["data"]["id"].as_str().unwrap().to_string();

    let complete = format!("/api/v1/jobs/{job_id}/controls/{control_id}/complete");
    let (status, _) = call_json(&app, Method::POST, &complete, lead, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call_json(&app, Method::POST, &complete, lead, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/jobs/{job_id}/attestations"),
        lead,
        Some(json!({"signer_title": "Site Safety Lead", "statement": "Fall protection verified."})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["signature_hash"].as_str().unwrap().len(), 64);

    let (status, _) = call_json(&app, Method::POST, &format!("/api/v1/jobs/{job_id}/archive"), lead, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call_json(
        &app,
        Method::PATCH,
        &format!("/api/v1/jobs/{job_id}"),
        lead,
        Some(json!({"status": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call_json(&app, Method::GET, "/api/v1/audit/events?limit=10", owner, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["job.archived", "attestation.signed", "control.completed", "control.created", "job.created"]
    );
    assert_eq!(body["meta"]["total"], 5);

    let (status, body) = call_json(&app, Method::GET, "/api/v1/audit/verify", owner, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "verified");
    assert_eq!(body["data"]["events_checked"], 5);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_executive_writes_are_blocked_and_logged(pool: PgPool) -> sqlx::Result<()> {
    let org = helpers::organization(&pool, "Harbor Builders").await;
    let exec = helpers::user(&pool, org, Role::Executive).await;
    let app = helpers::app(pool.clone()).await;

    let (status, body) = call_json(&app, Method::POST, "/api/v1/jobs", exec, Some(new_job())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], READ_ONLY_ERROR_CODE);

    let (status, body) = call_json(
        &app,
        Method::GET,
        "/api/v1/audit/events?event_name=auth.role_violation",
        exec,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let event = &body["data"][0];
    assert_eq!(event["outcome"], "blocked");
    assert_eq!(event["severity"], "critical");
    assert_eq!(event["metadata"]["path"], "/api/v1/jobs");

    let (status, _) = call_json(&app, Method::GET, "/api/v1/jobs", exec, None).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_organizations_are_isolated(pool: PgPool) -> sqlx::Result<()> {
    let ours = helpers::organization(&pool, "Harbor Builders").await;
    let theirs = helpers::organization(&pool, "Rival Roofing").await;
    let lead = helpers::user(&pool, ours, Role::SafetyLead).await;
    let outsider = helpers::user(&pool, theirs, Role::Owner).await;
    let app = helpers::app(pool.clone()).await;

    let (_, body) = call_json(&app, Method::POST, "/api/v1/jobs", lead, Some(new_job())).await;
    let job_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call_json(&app, Method::GET, &format!("/api/v1/jobs/{job_id}"), outsider, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call_json(&app, Method::GET, "/api/v1/jobs", outsider, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (_, body) = call_json(&app, Method::GET, "/api/v1/audit/verify", outsider, None).await;
    assert_eq!(body["data"]["status"], "empty");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_ledger_export_downloads(pool: PgPool) -> sqlx::Result<()> {
    let org = helpers::organization(&pool, "Harbor Builders").await;
    let lead = helpers::user(&pool, org, Role::SafetyLead).await;
    let owner = helpers::user(&pool, org, Role::Owner).await;
    let app = helpers::app(pool.clone()).await;

    call_json(&app, Method::POST, "/api/v1/jobs", lead, Some(new_job())).await;

    let (status, bytes) = call(&app, Method::GET, "/api/v1/audit/export?format=csv", owner, None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("ledger_seq,created_at,event_name"));
    assert!(lines.next().unwrap().starts_with("1,"));

    let (status, body) = call_json(&app, Method::GET, "/api/v1/audit/export?format=json", owner, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = call_json(
        &app,
        Method::GET,
        "/api/v1/audit/events?event_name=export.ledger",
        owner,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 2);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_job_report_is_a_pdf(pool: PgPool) -> sqlx::Result<()> {
    let org = helpers::organization(&pool, "Harbor Builders").await;
    let lead = helpers::user(&pool, org, Role::SafetyLead).await;
    let app = helpers::app(pool.clone()).await;

    let (_, body) = call_json(&app, Method::POST, "/api/v1/jobs", lead, Some(new_job())).await;
    let job_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, bytes) = call(&app, Method::GET, &format!("/api/v1/jobs/{job_id}/report.pdf"), lead, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));

    let (_, body) = call_json(
        &app,
        Method::GET,
        "/api/v1/audit/events?event_name=report.generated",
        helpers::user(&pool, org, Role::Owner).await,
        None,
    )
    .await;
    assert_eq!(body["data"][0]["job_id"], job_id.as_str());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_last_owner_cannot_be_demoted(pool: PgPool) -> sqlx::Result<()> {
    let org = helpers::organization(&pool, "Harbor Builders").await;
    let owner = helpers::user(&pool, org, Role::Owner).await;
    let admin = helpers::user(&pool, org, Role::Admin).await;
    let app = helpers::app(pool.clone()).await;

    let (status, _) = call_json(
        &app,
        Method::PATCH,
        &format!("/api/v1/team/{owner}/role"),
        owner,
        Some(json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call_json(
        &app,
        Method::PATCH,
        &format!("/api/v1/team/{owner}/role"),
        admin,
        Some(json!({"role": "member"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_json(
        &app,
        Method::PATCH,
        &format!("/api/v1/team/{admin}/role"),
        owner,
        Some(json!({"role": "safety_lead"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "safety_lead");
    Ok(())
}
