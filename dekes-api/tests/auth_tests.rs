//! Signup, login, logout, and session resolution through the HTTP surface

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{unique_email, unique_name, TestContext, PASSWORD};
use dekes_shared::models::organization::{Organization, OrganizationPlan, OrganizationStatus};
use dekes_shared::models::user::{User, UserRole, UserStatus};
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], "connected");
    assert!(response.headers.get("x-content-type-options").is_some());
}

#[tokio::test]
async fn test_signup_creates_organization_and_owner() {
    let ctx = TestContext::new().await;
    let email = unique_email();
    let org_name = unique_name("Acme");

    let response = ctx
        .post(
            "/api/auth/signup",
            None,
            json!({"email": email, "password": PASSWORD, "organizationName": org_name}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["user"]["email"], email.as_str());
    assert_eq!(response.body["user"]["role"], "ADMIN");
    assert!(!response.body["token"].as_str().unwrap().is_empty());

    let cookie = response.set_cookie().unwrap();
    assert!(cookie.starts_with("DEKES_SESSION="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));

    let user = User::find_by_email(&ctx.db, &email).await.unwrap().unwrap();
    assert_eq!(user.role, UserRole::Admin);
    assert_eq!(user.status, UserStatus::Active);
    assert!(!user.email_verified);

    let org = Organization::find_by_id(&ctx.db, user.organization_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(org.name, org_name);
    assert_eq!(org.owner_id, Some(user.id));
    assert_eq!(org.plan, OrganizationPlan::Free);
    assert_eq!(org.status, OrganizationStatus::Trial);
    assert_eq!(org.monthly_lead_quota, 100);
    assert!(org.slug.starts_with("org-"));
}

#[tokio::test]
async fn test_signup_default_organization_name() {
    let ctx = TestContext::new().await;
    let email = unique_email();

    let response = ctx
        .post("/api/auth/signup", None, json!({"email": email, "password": PASSWORD}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let user = User::find_by_email(&ctx.db, &email).await.unwrap().unwrap();
    let org = Organization::find_by_id(&ctx.db, user.organization_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(org.name, format!("{}'s Organization", email));
}

#[tokio::test]
async fn test_duplicate_signup_creates_no_second_organization() {
    let ctx = TestContext::new().await;
    let email = unique_email();
    let first_org = unique_name("First");
    let second_org = unique_name("Second");

    let first = ctx
        .post(
            "/api/auth/signup",
            None,
            json!({"email": email, "password": PASSWORD, "organizationName": first_org}),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    // Same address, different case
    let second = ctx
        .post(
            "/api/auth/signup",
            None,
            json!({"email": email.to_uppercase(), "password": PASSWORD, "organizationName": second_org}),
        )
        .await;

    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.body["message"], "Email already registered");
    assert_eq!(ctx.count_organizations_named(&first_org).await, 1);
    assert_eq!(ctx.count_organizations_named(&second_org).await, 0);
    assert_eq!(User::count_by_email(&ctx.db, &email).await.unwrap(), 1);
}

#[tokio::test]
async fn test_signup_rejects_invalid_input() {
    let ctx = TestContext::new().await;

    let cases = [
        json!({"email": "not-an-email", "password": PASSWORD}),
        json!({"email": unique_email(), "password": "short1"}),
        json!({"email": unique_email(), "password": "longenoughbutnodigits"}),
        json!({"email": unique_email(), "password": "1234567890"}),
        json!({"email": unique_email(), "password": PASSWORD, "organizationName": ""}),
    ];

    for body in cases {
        let email = body["email"].as_str().unwrap().to_string();

        let response = ctx.post("/api/auth/signup", None, body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
        assert!(User::find_by_email(&ctx.db, &email).await.unwrap().is_none());
    }

    let response = ctx
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_success_updates_last_login() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Login")).await;

    let response = ctx
        .post(
            "/api/auth/login",
            None,
            json!({"email": account.email, "password": PASSWORD}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["user"]["id"], account.user_id.to_string());
    let token = response.body["token"].as_str().unwrap();
    assert_ne!(token, account.token);
    assert!(response.set_cookie().unwrap().contains(token));

    let user = User::find_by_id(&ctx.db, account.user_id).await.unwrap().unwrap();
    assert!(user.last_login_at.is_some());

    let me = ctx.get("/api/user/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Same")).await;

    let wrong_password = ctx
        .post(
            "/api/auth/login",
            None,
            json!({"email": account.email, "password": "wrongpassword9"}),
        )
        .await;
    let unknown_email = ctx
        .post(
            "/api/auth/login",
            None,
            json!({"email": unique_email(), "password": PASSWORD}),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.body["message"], "Invalid credentials");
    assert!(wrong_password.set_cookie().is_none());
}

#[tokio::test]
async fn test_suspended_account_cannot_log_in() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Suspended")).await;

    User::set_status(&ctx.db, account.user_id, UserStatus::Suspended)
        .await
        .unwrap();

    for password in [PASSWORD, "wrongpassword9"] {
        let response = ctx
            .post(
                "/api/auth/login",
                None,
                json!({"email": account.email, "password": password}),
            )
            .await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["message"], "Account is suspended");
    }
}

#[tokio::test]
async fn test_protected_route_requires_session() {
    let ctx = TestContext::new().await;

    let missing = ctx.get("/api/user/me", None).await;
    let garbage = ctx.get("/api/user/me", Some("not-a-token")).await;

    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body, json!({"error": "unauthorized", "message": "Unauthorized"}));
    assert_eq!(missing.body, garbage.body);
}

#[tokio::test]
async fn test_cookie_authenticates_and_bearer_wins() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Cookie")).await;
    let other = ctx.signup(&unique_name("Other")).await;

    let by_cookie = ctx
        .send(
            Request::builder()
                .uri("/api/user/me")
                .header("cookie", format!("theme=dark; DEKES_SESSION={}", account.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(by_cookie.status, StatusCode::OK);
    assert_eq!(by_cookie.body["user"]["id"], account.user_id.to_string());

    let both = ctx
        .send(
            Request::builder()
                .uri("/api/user/me")
                .header("authorization", format!("Bearer {}", other.token))
                .header("cookie", format!("DEKES_SESSION={}", account.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(both.status, StatusCode::OK);
    assert_eq!(both.body["user"]["id"], other.user_id.to_string());
}

#[tokio::test]
async fn test_me_returns_profile_organization_and_stats() {
    let ctx = TestContext::new().await;
    let org_name = unique_name("Me");
    let account = ctx.signup(&org_name).await;

    let response = ctx.get("/api/user/me", Some(&account.token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["email"], account.email.as_str());
    assert_eq!(
        response.body["user"]["organizationId"],
        account.organization_id.to_string()
    );
    assert_eq!(response.body["organization"]["name"], org_name.as_str());
    assert_eq!(response.body["organization"]["plan"], "FREE");
    assert_eq!(response.body["organization"]["status"], "TRIAL");
    assert_eq!(response.body["organization"]["monthlyLeadQuota"], 100);
    assert_eq!(
        response.body["stats"],
        json!({"leads": 0, "qualified": 0, "won": 0, "conversion": 0.0})
    );
}

#[tokio::test]
async fn test_logout_revokes_and_is_idempotent() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Logout")).await;

    let response = ctx.post("/api/auth/logout", Some(&account.token), json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"success": true}));
    let cookie = response.set_cookie().unwrap();
    assert!(cookie.starts_with("DEKES_SESSION=;"));
    assert!(cookie.contains("Max-Age=0"));

    let me = ctx.get("/api/user/me", Some(&account.token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let again = ctx.post("/api/auth/logout", Some(&account.token), json!({})).await;
    assert_eq!(again.status, StatusCode::OK);

    let without_token = ctx.post("/api/auth/logout", None, json!({})).await;
    assert_eq!(without_token.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_only_ends_presented_session() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Two Sessions")).await;

    let second = ctx
        .post(
            "/api/auth/login",
            None,
            json!({"email": account.email, "password": PASSWORD}),
        )
        .await;
    let second_token = second.body["token"].as_str().unwrap().to_string();

    ctx.post("/api/auth/logout", Some(&account.token), json!({}))
        .await;

    assert_eq!(
        ctx.get("/api/user/me", Some(&account.token)).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        ctx.get("/api/user/me", Some(&second_token)).await.status,
        StatusCode::OK
    );
}
