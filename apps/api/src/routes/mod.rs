pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analytics::handlers as analytics;
use crate::state::AppState;
use crate::student::handlers as student;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Admin analytics
        .route(
            "/api/analytics/usage-trends",
            get(analytics::handle_usage_trends),
        )
        .route(
            "/api/analytics/system-dashboard",
            get(analytics::handle_system_dashboard),
        )
        // Student questions
        .route("/api/student/question", post(student::handle_submit_question))
        .route(
            "/api/student/question/:id/upvote",
            post(student::handle_upvote),
        )
        .route(
            "/api/student/questions/my",
            get(student::handle_my_questions),
        )
        .route(
            "/api/student/questions/community",
            get(student::handle_community_questions),
        )
        .route(
            "/api/student/questions/featured",
            get(student::handle_featured_questions),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::analytics::fallback;
    use crate::auth::{Identity, StaticVerifier};
    use crate::llm_client::{Completer, LlmError};
    use crate::models::question::{NewQuestion, Subject};
    use crate::store::{MemoryStore, QuestionStore};

    const ADMIN_TOKEN: &str = "admin-token";
    const STUDENT_TOKEN: &str = "student-token";
    const OTHER_TOKEN: &str = "other-token";

    struct CannedCompleter(Result<&'static str, u16>);

    #[async_trait]
    impl Completer for CannedCompleter {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(LlmError::Api {
                    status,
                    code: (status == 429).then(|| "insufficient_quota".to_string()),
                    message: "upstream failure".to_string(),
                }),
            }
        }
    }

    fn identity(uid: &str, admin: bool) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: None,
            admin,
        }
    }

    fn app_with(store: Arc<MemoryStore>, llm: CannedCompleter) -> Router {
        let verifier = StaticVerifier::new()
            .with_token(ADMIN_TOKEN, identity("admin-1", true))
            .with_token(STUDENT_TOKEN, identity("student-1", false))
            .with_token(OTHER_TOKEN, identity("student-2", false));
        build_router(AppState {
            store,
            llm: Arc::new(llm),
            verifier: Some(Arc::new(verifier)),
        })
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        app_with(store, CannedCompleter(Ok("Four.")))
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed_question(store: &MemoryStore, text: &str, subject: Subject, asked_by: &str) {
        store
            .insert_question(NewQuestion::submitted(
                text.to_string(),
                subject,
                Some("Topic".to_string()),
                "answer".to_string(),
                Some(asked_by.to_string()),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(get("/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["database"], "connected");
    }

    #[tokio::test]
    async fn test_analytics_requires_token_and_admin_claim() {
        let store = Arc::new(MemoryStore::new());
        let uri = "/api/analytics/usage-trends";

        let response = app(store.clone()).oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(store.clone())
            .oneshot(get(uri, Some("forged")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(store.clone())
            .oneshot(get(uri, Some(STUDENT_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app(store).oneshot(get(uri, Some(ADMIN_TOKEN))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_check_skipped_without_identity_provider() {
        let app = build_router(AppState {
            store: Arc::new(MemoryStore::new()),
            llm: Arc::new(CannedCompleter(Ok("ok"))),
            verifier: None,
        });
        let response = app
            .oneshot(get("/api/analytics/system-dashboard", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_optional_auth_routes_accept_tokens_without_identity_provider() {
        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState {
            store: store.clone(),
            llm: Arc::new(CannedCompleter(Ok("Four."))),
            verifier: None,
        });

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/student/question",
                Some("firebase-id-token"),
                json!({"text": "What is 2+2?", "subject": "Math"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(get(
                "/api/student/questions/community",
                Some("firebase-id-token"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["count"], 1);
        // Unverified callers are anonymous, so nothing is attributed to them.
        assert!(body["questions"][0].get("askedBy").is_none());

        let response = app
            .oneshot(get("/api/student/questions/my", Some("firebase-id-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_query_is_validation_error() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(get("/api/student/questions/featured?limit=abc", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"]["code"],
            "VALIDATION_ERROR"
        );
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_validation_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/student/question")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"text\": \"unterminated"))
            .unwrap();
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"]["code"],
            "VALIDATION_ERROR"
        );
    }

    #[tokio::test]
    async fn test_non_uuid_upvote_id_is_validation_error() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(post_json(
                "/api/student/question/not-a-uuid/upvote",
                None,
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"]["code"],
            "VALIDATION_ERROR"
        );
    }

    #[tokio::test]
    async fn test_system_dashboard_category_distribution() {
        let store = Arc::new(MemoryStore::new());
        seed_question(&store, "a", Subject::Math, "s").await;
        seed_question(&store, "b", Subject::Math, "s").await;
        seed_question(&store, "c", Subject::Science, "s").await;

        let response = app(store)
            .oneshot(get(
                "/api/analytics/system-dashboard?dateRange=all&category=all&search=",
                Some(ADMIN_TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-data-source"], "live");
        let body = json_body(response).await;
        assert_eq!(
            body["categoryDistribution"],
            json!([{"name": "Math", "count": 2}, {"name": "Science", "count": 1}])
        );
        assert_eq!(body["topQuestions"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_store_returns_fallback_with_success() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);

        let response = app(store.clone())
            .oneshot(get("/api/analytics/usage-trends", Some(ADMIN_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-data-source"], "fallback");
        assert_eq!(
            json_body(response).await,
            serde_json::to_value(fallback::usage_trends()).unwrap()
        );

        let response = app(store)
            .oneshot(get("/api/analytics/system-dashboard", Some(ADMIN_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::to_value(fallback::system_dashboard()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_filter_is_bad_request() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(get(
                "/api/analytics/usage-trends?dateRange=fortnight",
                Some(ADMIN_TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_question_persists_and_answers() {
        let store = Arc::new(MemoryStore::new());
        let response = app(store.clone())
            .oneshot(post_json(
                "/api/student/question",
                Some(STUDENT_TOKEN),
                json!({"question": "What is 2+2?", "subject": "Math", "topic": "Arithmetic"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["answer"], "Four.");
        assert_eq!(body["subject"], "Math");
        assert_eq!(body["topic"], "Arithmetic");
        assert!(body["questionId"].is_string());
        assert_eq!(store.question_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_submit_invalid_subject_names_valid_values() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(post_json(
                "/api/student/question",
                None,
                json!({"text": "Why?", "subject": "InvalidSubject"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("Math, Science, English, History, Other"));
    }

    #[tokio::test]
    async fn test_submit_returns_answer_when_persistence_fails() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let response = app(store)
            .oneshot(post_json(
                "/api/student/question",
                None,
                json!({"text": "What is a verb?", "subject": "English"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["answer"], "Four.");
        assert!(body["questionId"].is_null());
    }

    #[tokio::test]
    async fn test_submit_maps_quota_error_to_429() {
        let response = app_with(Arc::new(MemoryStore::new()), CannedCompleter(Err(429)))
            .oneshot(post_json(
                "/api/student/question",
                None,
                json!({"text": "q", "subject": "Math"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(response).await["error"]["code"], "QUOTA_EXCEEDED");
    }

    #[tokio::test]
    async fn test_repeat_submission_increments_ask_count() {
        let store = Arc::new(MemoryStore::new());
        let body = json!({"text": "What is 2+2?", "subject": "Math"});
        for _ in 0..2 {
            let response = app(store.clone())
                .oneshot(post_json("/api/student/question", Some(STUDENT_TOKEN), body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }
        let response = app(store)
            .oneshot(get("/api/student/questions/my", Some(STUDENT_TOKEN)))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["questions"][0]["askCount"], 2);
    }

    #[tokio::test]
    async fn test_my_questions_requires_user() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(get("/api/student/questions/my", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_community_excludes_own_and_anonymises() {
        let store = Arc::new(MemoryStore::new());
        seed_question(&store, "mine", Subject::Math, "student-1").await;
        seed_question(&store, "theirs", Subject::Math, "student-2").await;
        seed_question(&store, "science", Subject::Science, "student-2").await;

        let response = app(store)
            .oneshot(get(
                "/api/student/questions/community?subject=Math",
                Some(STUDENT_TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["questions"][0]["text"], "theirs");
        assert_eq!(body["questions"][0]["askedBy"], "community");
    }

    #[tokio::test]
    async fn test_upvote_increments_and_missing_is_404() {
        let store = Arc::new(MemoryStore::new());
        let saved = store
            .insert_question(NewQuestion::submitted(
                "q".into(),
                Subject::Other,
                None,
                "a".into(),
                None,
            ))
            .await
            .unwrap();

        let uri = format!("/api/student/question/{}/upvote", saved.id);
        let response = app(store.clone())
            .oneshot(post_json(&uri, None, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["upvotes"], 1);

        let uri = format!("/api/student/question/{}/upvote", uuid::Uuid::new_v4());
        let response = app(store).oneshot(post_json(&uri, None, json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_store_failure_is_500() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let response = app(store)
            .oneshot(get("/api/student/questions/featured", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"]["code"], "STORE_ERROR");
    }
}
