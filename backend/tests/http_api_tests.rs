//! HTTP API tests: the full router over the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mutuelle_server::config::Config;
use mutuelle_server::models::{MemberRole, RegisterRequest};
use mutuelle_server::routes::app_router;
use mutuelle_server::state::AppState;
use mutuelle_server::store::InMemoryStore;

const PASSWORD: &str = "correct horse battery";

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let config = Config {
            bcrypt_cost: 4,
            jwt_secret: "http-test-secret".to_string(),
            ..Config::default()
        };
        let state = AppState::new(Arc::new(InMemoryStore::new()), None, &config);
        let router = app_router(state.clone(), &config);
        Self { router, state }
    }

    async fn request(
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
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Seed a member directly with `role` and log them in over HTTP
    async fn member_with_role(&self, email: &str, role: MemberRole) -> String {
        self.state
            .auth_service
            .register_with_role(
                RegisterRequest {
                    name: "Test".to_string(),
                    first_name: email.to_string(),
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                    npi: "0000000000".to_string(),
                    phone: "+22900000000".to_string(),
                },
                role,
            )
            .await
            .unwrap();
        self.login(email).await
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["accessToken"].as_str().unwrap().to_string()
    }

    async fn submit(&self, token: &str, amount: i64) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/loan_request",
                Some(token),
                Some(json!({ "requestAmount": amount, "reason": "Sewing machine", "duration": 6 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}

struct Officers {
    member: String,
    president: String,
    secretary: String,
    treasurer: String,
}

async fn officers(app: &TestApp) -> Officers {
    Officers {
        member: app.member_with_role("member@example.com", MemberRole::Member).await,
        president: app
            .member_with_role("president@example.com", MemberRole::President)
            .await,
        secretary: app
            .member_with_role("secretary@example.com", MemberRole::Secretary)
            .await,
        treasurer: app
            .member_with_role("treasurer@example.com", MemberRole::Treasurer)
            .await,
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "in-memory");
}

#[tokio::test]
async fn test_register_login_me() {
    let app = TestApp::new();
    let registration = json!({
        "name": "Ahouansou",
        "firstName": "Rachida",
        "email": "Rachida@Example.com",
        "password": PASSWORD,
        "npi": "1234567890",
        "phone": "+22966000000",
    });

    let (status, body) = app
        .request(Method::POST, "/auth/register", None, Some(registration.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "MEMBER");
    assert_eq!(body["email"], "rachida@example.com");
    assert!(body.get("passwordHash").is_none());

    let (status, body) = app
        .request(Method::POST, "/auth/register", None, Some(registration))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let token = app.login("rachida@example.com").await;
    let (status, body) = app.request(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Rachida");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "name": "X", "firstName": "Y", "email": "not-an-email",
                "password": "short", "npi": "1", "phone": "+2290000",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.member_with_role("someone@example.com", MemberRole::Member)
        .await;
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "someone@example.com", "password": "guess" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_and_invalid_tokens() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/loan_request", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");

    let (status, body) = app
        .request(Method::GET, "/loan_request/my-requests", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_full_approval_over_http() {
    let app = TestApp::new();
    let o = officers(&app).await;
    let id = app.submit(&o.member, 300_000).await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/president"),
            Some(&o.president),
            Some(json!({ "comment": "Good record" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_REVIEW");
    assert_eq!(body["presidentApproved"], true);
    assert_eq!(body["presidentComment"], "Good record");
    assert_eq!(body["approvalPercentage"], 33);

    // No body at all is accepted
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/SECRETARY"),
            Some(&o.secretary),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approvedCount"], 2);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/TREASURER"),
            Some(&o.treasurer),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["approvalPercentage"], 100);
    assert_eq!(body["totalApprovers"], 3);

    let (status, body) = app
        .request(Method::GET, "/loan/my-loans", Some(&o.member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let loans = body.as_array().unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["loanRequestId"], id.as_str());
    assert_eq!(loans[0]["repaymentAmount"], 315_000);

    let loan_id = loans[0]["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan/{loan_id}/repaid"),
            Some(&o.secretary),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan/{loan_id}/repaid"),
            Some(&o.treasurer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRepaid"], true);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = TestApp::new();
    let o = officers(&app).await;
    let id = app.submit(&o.member, 10_000).await;

    // Role mismatch
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/PRESIDENT"),
            Some(&o.treasurer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Members never approve
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/PRESIDENT"),
            Some(&o.member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown role in the path
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/CHAIRMAN"),
            Some(&o.president),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown request
    let missing = uuid::Uuid::new_v4();
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan_request/{missing}/approve/PRESIDENT"),
            Some(&o.president),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Blank rejection reason
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/reject"),
            Some(&o.secretary),
            Some(json!({ "rejectionReason": "  ", "rejectedByRole": "SECRETARY" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Real rejection, then the request is frozen
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/reject"),
            Some(&o.secretary),
            Some(json!({ "rejectionReason": "Missing guarantor", "rejectedByRole": "SECRETARY" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["rejectedByRole"], "SECRETARY");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/PRESIDENT"),
            Some(&o.president),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_listing_endpoints() {
    let app = TestApp::new();
    let o = officers(&app).await;
    let first = app.submit(&o.member, 1_000).await;
    let second = app.submit(&o.member, 2_000).await;

    app.request(
        Method::POST,
        &format!("/loan_request/{second}/approve/TREASURER"),
        Some(&o.treasurer),
        None,
    )
    .await;

    let (status, body) = app
        .request(Method::GET, "/loan_request/all", Some(&o.president), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app
        .request(
            Method::GET,
            "/loan_request?status=PENDING",
            Some(&o.president),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let pending = body.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], first.as_str());

    let (status, _) = app
        .request(
            Method::GET,
            "/loan_request?status=SOMETIMES",
            Some(&o.president),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(Method::GET, "/loan_request/all", Some(&o.member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::GET, "/loan_request/my-requests", Some(&o.member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app
        .request(
            Method::GET,
            "/loan_request/validator-stats",
            Some(&o.secretary),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalRequests"], 2);
    assert_eq!(body["pendingRequests"], 2);
    assert_eq!(body["approvedRequests"], 0);

    let (status, body) = app
        .request(Method::GET, "/loan_request/stats", Some(&o.secretary), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inReview"], 1);

    let (status, body) = app
        .request(
            Method::GET,
            "/loan-validator/my-approval-history",
            Some(&o.treasurer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = body.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], second.as_str());

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/loan_request/{first}"),
            Some(&o.member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requestAmount"], 1_000);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new();
    let token = app
        .member_with_role("leaving@example.com", MemberRole::Member)
        .await;

    let (status, _) = app
        .request(Method::POST, "/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.request(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "SESSION_REVOKED");
}

#[tokio::test]
async fn test_role_assignment_applies_to_existing_tokens() {
    let app = TestApp::new();
    let president = app
        .member_with_role("boss@example.com", MemberRole::President)
        .await;
    let member = app
        .member_with_role("newtreasurer@example.com", MemberRole::Member)
        .await;
    let id = app.submit(&member, 5_000).await;

    let (_, me) = app.request(Method::GET, "/auth/me", Some(&member), None).await;
    let member_id = me["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/members/{member_id}/role"),
            Some(&member),
            Some(json!({ "role": "TREASURER" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/members/{member_id}/role"),
            Some(&president),
            Some(json!({ "role": "TREASURER" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "TREASURER");

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/approve/TREASURER"),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["treasurerApproved"], true);

    let (status, body) = app.request(Method::GET, "/members", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_security_headers() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["cache-control"], "no-store");
    assert_eq!(headers["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_malformed_bodies_use_error_format() {
    let app = TestApp::new();
    let o = officers(&app).await;
    let id = app.submit(&o.member, 30_000).await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/reject"),
            Some(&o.member),
            Some(json!({ "rejectionReason": "no", "rejectedByRole": "MEMBER" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].is_string());

    let (status, body) = app
        .request(
            Method::POST,
            "/loan_request",
            Some(&o.member),
            Some(json!({ "requestAmount": "a lot", "reason": "Roof", "duration": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .request(
            Method::PUT,
            "/members/00000000-0000-0000-0000-000000000000/role",
            Some(&o.president),
            Some(json!({ "role": "KING" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Nothing was rejected along the way
    let (_, body) = app
        .request(Method::GET, &format!("/loan_request/{id}"), Some(&o.member), None)
        .await;
    assert_eq!(body["status"], "PENDING");
}

#[tokio::test]
async fn test_disburse_endpoint() {
    let app = TestApp::new();
    let o = officers(&app).await;
    let id = app.submit(&o.member, 80_000).await;

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/disburse"),
            Some(&o.treasurer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for (role, token) in [
        ("PRESIDENT", &o.president),
        ("SECRETARY", &o.secretary),
        ("TREASURER", &o.treasurer),
    ] {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/loan_request/{id}/approve/{role}"),
                Some(token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/disburse"),
            Some(&o.secretary),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, loan) = app
        .request(
            Method::POST,
            &format!("/loan_request/{id}/disburse"),
            Some(&o.treasurer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, loans) = app.request(Method::GET, "/loan/my-loans", Some(&o.member), None).await;
    assert_eq!(loans.as_array().map(Vec::len), Some(1));
    assert_eq!(loans[0]["id"], loan["id"]);
}
