pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::scoring::handlers as scoring;
use crate::screening::{handlers, public};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Recruiter API (bearer)
        .route(
            "/api/v1/candidates/:candidate_id/screening",
            post(handlers::handle_start),
        )
        .route(
            "/api/v1/candidates/:candidate_id/ai-score",
            get(scoring::handle_get_score),
        )
        .route(
            "/api/v1/screening/:session_id",
            get(handlers::handle_get_session),
        )
        .route(
            "/api/v1/screening/:session_id/messages",
            post(handlers::handle_send_message),
        )
        .route(
            "/api/v1/screening/:session_id/close",
            post(handlers::handle_close),
        )
        // Candidate API (public token)
        .route(
            "/api/v1/public/chat/:token",
            get(public::handle_get_chat).post(public::handle_send_message),
        )
        .route(
            "/api/v1/public/chat/:token/status",
            get(public::handle_status),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::access::bearer::{sign, JwtVerifier, Role};
    use crate::access::rate_limit::MemoryRateLimiter;
    use crate::errors::ACCESS_DENIED_MESSAGE;
    use crate::scoring::provider::MemoryScoreProvider;
    use crate::scoring::ScoreRecord;
    use crate::screening::interviewer::ScriptedInterviewer;
    use crate::screening::service::test_support::{fixture, settings, Fixture};

    const SECRET: &str = "router-test-secret";

    struct TestApp {
        router: Router,
        fx: Fixture,
        scores: Arc<MemoryScoreProvider>,
    }

    impl TestApp {
        async fn new(rate_limit: u32) -> Self {
            let fx = fixture(Arc::new(ScriptedInterviewer), settings()).await;
            let scores = Arc::new(MemoryScoreProvider::new());
            let state = AppState {
                screening: fx.service.clone(),
                jwt: JwtVerifier::new(SECRET),
                rate_limiter: Arc::new(MemoryRateLimiter::new(rate_limit)),
                scores: scores.clone(),
            };
            Self {
                router: build_router(state),
                fx,
                scores,
            }
        }

        fn bearer(&self) -> String {
            sign(SECRET, Role::Recruiter, self.fx.tenant_id)
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            bearer: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = bearer {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        async fn start(&self) -> (String, String) {
            let (status, body) = self
                .call(
                    Method::POST,
                    &format!("/api/v1/candidates/{}/screening", self.fx.candidate_id),
                    Some(&self.bearer()),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            (
                body["sessionId"].as_str().unwrap().to_string(),
                body["accessToken"].as_str().unwrap().to_string(),
            )
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new(10).await;
        let (status, body) = app.call(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_recruiter_routes_require_bearer() {
        let app = TestApp::new(10).await;
        let uri = format!("/api/v1/candidates/{}/screening", app.fx.candidate_id);

        let (missing, body) = app.call(Method::POST, &uri, None, None).await;
        let (garbage, _) = app.call(Method::POST, &uri, Some("nope"), None).await;

        assert_eq!(missing, StatusCode::UNAUTHORIZED);
        assert_eq!(garbage, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_full_screening_flow_over_both_paths() {
        let app = TestApp::new(10).await;
        let (session_id, token) = app.start().await;

        let (status, chat) = app
            .call(Method::GET, &format!("/api/v1/public/chat/{token}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(chat["status"], "pending_candidate_response");
        assert_eq!(chat["statusLabel"], "Ready");
        assert!(chat.get("accessToken").is_none());
        assert!(chat["instructions"].is_string());

        let (status, sent) = app
            .call(
                Method::POST,
                &format!("/api/v1/public/chat/{token}"),
                None,
                Some(json!({"content": "I have 5 years of experience"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["status"], "in_progress");
        assert_eq!(sent["reply"]["role"], "assistant");

        let (status, session) = app
            .call(
                Method::GET,
                &format!("/api/v1/screening/{session_id}"),
                Some(&app.bearer()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["messages"].as_array().unwrap().len(), 3);
        assert_eq!(session["accessToken"], token.as_str());

        let (status, public_status) = app
            .call(
                Method::GET,
                &format!("/api/v1/public/chat/{token}/status"),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(public_status["messageCount"], 3);
        assert_eq!(public_status["isActive"], true);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_tokens_are_indistinguishable() {
        let app = TestApp::new(10).await;
        let unknown = crate::access::token::issue_token();

        let (s1, b1) = app
            .call(Method::GET, &format!("/api/v1/public/chat/{unknown}"), None, None)
            .await;
        let (s2, b2) = app
            .call(Method::GET, "/api/v1/public/chat/short", None, None)
            .await;

        assert_eq!(s1, StatusCode::FORBIDDEN);
        assert_eq!((s1, &b1), (s2, &b2));
        assert_eq!(b1["error"]["code"], "ACCESS_DENIED");
        assert_eq!(b1["error"]["message"], ACCESS_DENIED_MESSAGE);
    }

    #[tokio::test]
    async fn test_public_messages_are_rate_limited() {
        let app = TestApp::new(2).await;
        let (_, token) = app.start().await;
        let uri = format!("/api/v1/public/chat/{token}");

        let mut statuses = Vec::new();
        for i in 0..3 {
            let (status, _) = app
                .call(
                    Method::POST,
                    &uri,
                    None,
                    Some(json!({"content": format!("answer {i}")})),
                )
                .await;
            statuses.push(status);
        }

        assert_eq!(
            statuses,
            vec![
                StatusCode::OK,
                StatusCode::OK,
                StatusCode::TOO_MANY_REQUESTS
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_token_post_is_denied_without_using_the_limit() {
        let app = TestApp::new(1).await;

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let (status, body) = app
                .call(
                    Method::POST,
                    "/api/v1/public/chat/short",
                    None,
                    Some(json!({"content": "hello"})),
                )
                .await;
            assert_eq!(body["error"]["code"], "ACCESS_DENIED");
            statuses.push(status);
        }

        assert_eq!(statuses, vec![StatusCode::FORBIDDEN; 3]);
    }

    #[tokio::test]
    async fn test_foreign_tenant_recruiter_is_forbidden() {
        let app = TestApp::new(10).await;
        let (session_id, _) = app.start().await;
        let outsider = sign(SECRET, Role::Admin, Uuid::new_v4());

        let (status, body) = app
            .call(
                Method::GET,
                &format!("/api/v1/screening/{session_id}"),
                Some(&outsider),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_close_then_candidate_message_conflicts() {
        let app = TestApp::new(10).await;
        let (session_id, token) = app.start().await;

        let (status, closed) = app
            .call(
                Method::POST,
                &format!("/api/v1/screening/{session_id}/close"),
                Some(&app.bearer()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(closed["status"], "abandoned");

        let (status, body) = app
            .call(
                Method::POST,
                &format!("/api/v1/public/chat/{token}"),
                None,
                Some(json!({"content": "hello?"})),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "SESSION_CLOSED");
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let app = TestApp::new(10).await;
        let (_, token) = app.start().await;

        let (status, body) = app
            .call(
                Method::POST,
                &format!("/api/v1/public/chat/{token}"),
                None,
                Some(json!({"message": "   "})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_ai_score_is_normalized() {
        let app = TestApp::new(10).await;
        app.scores
            .insert(
                app.fx.candidate_id,
                ScoreRecord {
                    resume_score: Some(json!(73)),
                    overall_score: Some(json!(0.5)),
                    ..Default::default()
                },
            )
            .await;

        let (status, body) = app
            .call(
                Method::GET,
                &format!("/api/v1/candidates/{}/ai-score", app.fx.candidate_id),
                Some(&app.bearer()),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["percent"], 73);
        assert_eq!(body["score"]["state"], "scored");
        assert_eq!(body["score"]["raw"], 73);
    }

    #[tokio::test]
    async fn test_ai_score_unknown_candidate_is_not_found() {
        let app = TestApp::new(10).await;
        let (status, _) = app
            .call(
                Method::GET,
                &format!("/api/v1/candidates/{}/ai-score", Uuid::new_v4()),
                Some(&app.bearer()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
