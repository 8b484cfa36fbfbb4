//! Router tests against the in-memory store

use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use coe_common::{auth::Role, db::models::User};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "router-test-secret";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    jwt: JwtManager,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            Arc::new(config),
            store.clone(),
            JwtManager::new(SECRET, 3600),
        );

        Self {
            router: create_router(state),
            store,
            jwt: JwtManager::new(SECRET, 3600),
        }
    }

    async fn user(&self, first: &str, role: &str) -> User {
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        self.store
            .insert_user(User {
                id: Uuid::new_v4(),
                email: format!("{}@coe.edu", first.to_lowercase()),
                role: role.to_string(),
                first_name: first.to_string(),
                last_name: "Tester".to_string(),
                uid: None,
                contact: None,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    fn token(&self, user: &User) -> String {
        self.jwt
            .generate_token(user.id, user.role(), Some(user.email.clone()))
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "memory".to_string();
    config.auth.jwt_secret = Some(SECRET.to_string());
    config.rate_limit.enabled = false;
    config
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["store"]["status"], "up");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_401() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/analytics/data-usage", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = app
        .send(Method::GET, "/api/reports", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_data_usage_scenario() {
    let app = TestApp::new();
    let a = app.user("Ada", "researcher").await;
    let b = app.user("Bob", "researcher").await;
    let director = app.user("Dee", "director").await;
    let (ta, tb, td) = (app.token(&a), app.token(&b), app.token(&director));

    for title in ["P1", "P2"] {
        let (status, _) = app
            .send(Method::POST, "/api/records/publications", Some(&ta), Some(json!({"title": title})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    app.send(Method::POST, "/api/records/patents", Some(&ta), Some(json!({"title": "Valve"})))
        .await;
    app.send(Method::POST, "/api/records/events", Some(&tb), Some(json!({"activity": "Expo"})))
        .await;

    let (status, _) = app.send(Method::GET, "/api/analytics/data-usage", Some(&ta), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, "/api/analytics/data-usage", Some(&td), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalRecords"], 4);
    assert_eq!(body["totalUsers"], 3);
    assert_eq!(body["tableStats"]["publications"]["count"], 2);
    assert_eq!(body["tableStats"]["patents"]["count"], 1);
    assert_eq!(body["tableStats"]["events"]["count"], 1);
}

#[tokio::test]
async fn test_analytics_not_found_paths() {
    let app = TestApp::new();
    let director = app.user("Dee", "director").await;
    let td = app.token(&director);

    let (status, _) = app
        .send(Method::GET, "/api/analytics/data-usage/table/spaceships", Some(&td), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::GET, "/api/analytics/data-usage/table/trainings", Some(&td), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["systemWide"], true);

    let uri = format!("/api/analytics/data-usage/user/{}", Uuid::new_v4());
    let (status, _) = app.send(Method::GET, &uri, Some(&td), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_analytics_self_or_director() {
    let app = TestApp::new();
    let a = app.user("Ada", "researcher").await;
    let b = app.user("Bob", "researcher").await;
    let uri = format!("/api/analytics/data-usage/user/{}", a.id);

    let (status, body) = app.send(Method::GET, &uri, Some(&app.token(&a)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalRecords"], 0);

    let (status, _) = app.send(Method::GET, &uri, Some(&app.token(&b)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_record_visibility() {
    let app = TestApp::new();
    let a = app.user("Ada", "researcher").await;
    let b = app.user("Bob", "researcher").await;
    let director = app.user("Dee", "director").await;
    let (ta, tb, td) = (app.token(&a), app.token(&b), app.token(&director));

    app.send(Method::POST, "/api/records/events", Some(&ta), Some(json!({"activity": "A"})))
        .await;
    let (_, theirs) = app
        .send(Method::POST, "/api/records/events", Some(&tb), Some(json!({"activity": "B"})))
        .await;
    app.send(Method::POST, "/api/records/events", Some(&td), Some(json!({"activity": "D"})))
        .await;

    let (status, body) = app.send(Method::GET, "/api/records/events", Some(&ta), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["activity"], "A");

    let uri = format!("/api/records/events/{}", theirs["id"].as_str().unwrap());
    let (status, _) = app.send(Method::GET, &uri, Some(&ta), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&ta), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, all) = app.send(Method::GET, "/api/records/events", Some(&td), None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, mine) = app
        .send(Method::GET, "/api/records/events?onlyMine=true", Some(&td), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["activity"], "D");

    let (status, _) = app.send(Method::GET, "/api/records/spaceships", Some(&td), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_lifecycle() {
    let app = TestApp::new();
    let a = app.user("Ada", "researcher").await;
    let b = app.user("Bob", "researcher").await;
    let (ta, tb) = (app.token(&a), app.token(&b));

    let (_, publication) = app
        .send(
            Method::POST,
            "/api/records/publications",
            Some(&ta),
            Some(json!({"title": "W paper", "hecCategory": "W"})),
        )
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/reports",
            Some(&ta),
            Some(json!({"title": "Bad", "sourceType": "Spaceships", "filterCriteria": {}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UNKNOWN_SOURCE_TYPE");

    let (status, _) = app
        .send(Method::POST, "/api/reports", Some(&ta), Some(json!({"sourceType": "Publications"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = app
        .send(
            Method::POST,
            "/api/reports",
            Some(&ta),
            Some(json!({
                "title": "W pubs",
                "sourceType": "Publications",
                "filterCriteria": {"hecCategory": "W", "year": ""}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["filterCriteria"], json!({"hecCategory": "W"}));
    assert_eq!(report["recordCount"], 1);

    // Mutating the source record leaves the snapshot alone
    let record_uri = format!("/api/records/publications/{}", publication["id"].as_str().unwrap());
    let (status, _) = app
        .send(Method::PUT, &record_uri, Some(&ta), Some(json!({"title": "Renamed"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let report_uri = format!("/api/reports/{}", report["id"].as_str().unwrap());
    let (status, stored) = app.send(Method::GET, &report_uri, Some(&ta), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["reportData"][0]["title"], "W paper");

    let (status, _) = app.send(Method::GET, &report_uri, Some(&tb), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = app.send(Method::GET, "/api/reports", Some(&tb), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);

    let (status, renamed) = app
        .send(Method::PUT, &report_uri, Some(&ta), Some(json!({"title": "Renamed report"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Renamed report");

    let (status, _) = app.send(Method::DELETE, &report_uri, Some(&ta), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::GET, &report_uri, Some(&ta), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_account_report_with_cookie() {
    let app = TestApp::new();
    let a = app.user("Ada", "researcher").await;
    let ta = app.token(&a);
    app.send(
        Method::POST,
        "/api/records/internships",
        Some(&ta),
        Some(json!({"applicantName": "Kim", "year": 2022})),
    )
    .await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/account-report")
        .header(header::COOKIE, format!("theme=dark; token={}", ta))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"accountId": a.id, "detailed": true}).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["summary"]["totalActivities"], 1);
    assert_eq!(body["allActivities"][0]["title"], "Applicant: Kim");
    assert_eq!(body["detailed"], true);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/account-report",
            Some(&ta),
            Some(json!({"accountId": Uuid::new_v4()})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for bad in [json!({"detailed": true}), json!({"accountId": "not-a-uuid"})] {
        let (status, body) = app
            .send(Method::POST, "/api/auth/account-report", Some(&ta), Some(bad))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst = 1;
    let app = TestApp::with_config(config);
    let token = app
        .jwt
        .generate_token(Uuid::new_v4(), Role::Director, None)
        .unwrap();

    let (first, _) = app.send(Method::GET, "/api/reports", Some(&token), None).await;
    assert_eq!(first, StatusCode::OK);
    let (second, body) = app.send(Method::GET, "/api/reports", Some(&token), None).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "RATE_LIMITED");

    // Health stays outside the limiter
    let (health, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(health, StatusCode::OK);
}
