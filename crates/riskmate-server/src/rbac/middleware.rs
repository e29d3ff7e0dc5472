//! Write-denial middleware for read-only roles
//!
//! Runs after authentication. A write verb from a read-only role never
//! reaches the handler: the request is answered with `403 READ_ONLY_ROLE`
//! and an `auth.role_violation` event is appended to the ledger.

use axum::{
    extract::{OriginalUri, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{error, warn};

use super::{is_read_only, ActorContext};
use crate::api::ErrorResponse;
use crate::audit::{AuditSink, NewAuditEvent};

/// Error code returned when a read-only role attempts a write
pub const READ_ONLY_ERROR_CODE: &str = "READ_ONLY_ROLE";

fn is_write_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Rejects write requests from read-only roles
#[derive(Clone)]
pub struct ReadOnlyLayer {
    sink: Arc<dyn AuditSink>,
}

impl ReadOnlyLayer {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }
}

/// Guard for routes behind authentication: read-only roles may only read
pub fn require_write_access(sink: Arc<dyn AuditSink>) -> ReadOnlyLayer {
    ReadOnlyLayer::new(sink)
}

impl<S> Layer<S> for ReadOnlyLayer {
    type Service = ReadOnlyMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ReadOnlyMiddleware {
            inner,
            sink: self.sink.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ReadOnlyMiddleware<S> {
    inner: S,
    sink: Arc<dyn AuditSink>,
}

impl<S> Service<Request> for ReadOnlyMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The clone is not necessarily ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let sink = self.sink.clone();

        Box::pin(async move {
            let actor = request.extensions().get::<ActorContext>().cloned();

            let actor = match actor {
                Some(actor) if is_read_only(actor.role) && is_write_method(request.method()) => {
                    actor
                },
                _ => return inner.call(request).await,
            };

            let method = request.method().to_string();
            // nested routers see the path with their prefix stripped
            let path = request
                .extensions()
                .get::<OriginalUri>()
                .map(|uri| uri.0.path().to_string())
                .unwrap_or_else(|| request.uri().path().to_string());

            warn!(
                user_id = %actor.user_id,
                organization_id = %actor.organization_id,
                role = %actor.role,
                method = %method,
                path = %path,
                "Write attempt by read-only role blocked"
            );

            let event = NewAuditEvent::for_actor(&actor, "auth.role_violation")
                .metadata(serde_json::json!({
                    "method": method,
                    "path": path,
                    "role": actor.role.as_str(),
                }))
                .build();

            if let Err(e) = sink.record(event).await {
                error!(
                    error = %e,
                    user_id = %actor.user_id,
                    "Failed to record role violation"
                );
            }

            Ok(read_only_response())
        })
    }
}

fn read_only_response() -> Response {
    let body = ErrorResponse::new(
        READ_ONLY_ERROR_CODE,
        "Your role has read-only access to this organization",
    );
    (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::test_support::MemorySink;
    use crate::rbac::{test_support, Role};
    use axum::{
        body::Body,
        http::Request as HttpRequest,
        routing::{delete, get, patch, post},
        Extension, Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "ok"
    }

    fn app(sink: MemorySink, actor: Option<ActorContext>) -> Router {
        let router = Router::new()
            .route("/api/v1/jobs", get(ok).post(ok))
            .route("/api/v1/jobs/:id", patch(ok).delete(ok))
            .route("/api/v1/jobs/:id/archive", post(ok))
            .route("/api/v1/team/:id", delete(ok))
            .layer(ReadOnlyLayer::new(Arc::new(sink)));

        match actor {
            Some(actor) => router.layer(Extension(actor)),
            None => router,
        }
    }

    fn request(method: Method, uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_executive_write_is_blocked_and_logged() {
        let sink = MemorySink::default();
        let actor = test_support::actor(Role::Executive);
        let app = app(sink.clone(), Some(actor.clone()));

        let response = app.oneshot(request(Method::POST, "/api/v1/jobs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], READ_ONLY_ERROR_CODE);

        let events = sink.recorded();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.event_name, "auth.role_violation");
        assert_eq!(event.organization_id, actor.organization_id);
        assert_eq!(event.actor_id, Some(actor.user_id));
        assert_eq!(event.metadata["method"], "POST");
        assert_eq!(event.metadata["path"], "/api/v1/jobs");
        assert_eq!(event.metadata["role"], "executive");
    }

    #[tokio::test]
    async fn test_every_write_verb_is_blocked_for_executive() {
        let sink = MemorySink::default();
        let actor = test_support::actor(Role::Executive);
        let id = uuid::Uuid::new_v4();

        let cases = [
            (Method::PATCH, format!("/api/v1/jobs/{id}")),
            (Method::DELETE, format!("/api/v1/jobs/{id}")),
            (Method::POST, format!("/api/v1/jobs/{id}/archive")),
            (Method::DELETE, format!("/api/v1/team/{id}")),
        ];

        for (method, uri) in cases {
            let response = app(sink.clone(), Some(actor.clone()))
                .oneshot(request(method.clone(), &uri))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        }

        assert_eq!(sink.recorded().len(), 4);
    }

    #[tokio::test]
    async fn test_executive_can_read() {
        let sink = MemorySink::default();
        let app = app(sink.clone(), Some(test_support::actor(Role::Executive)));

        let response = app.oneshot(request(Method::GET, "/api/v1/jobs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sink.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_writable_roles_pass_through() {
        for role in [Role::Owner, Role::Admin, Role::SafetyLead, Role::Member] {
            let sink = MemorySink::default();
            let app = app(sink.clone(), Some(test_support::actor(role)));

            let response = app.oneshot(request(Method::POST, "/api/v1/jobs")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "role {role}");
            assert!(sink.recorded().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_request_is_left_to_auth() {
        let sink = MemorySink::default();
        let app = app(sink.clone(), None);

        let response = app.oneshot(request(Method::POST, "/api/v1/jobs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sink.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_still_returns_403() {
        let sink = MemorySink::failing();
        let app = app(sink.clone(), Some(test_support::actor(Role::Executive)));

        let response = app.oneshot(request(Method::POST, "/api/v1/jobs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
