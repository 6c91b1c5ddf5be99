//! Lead listing, outcomes, and search runs, including tenant isolation

mod common;

use axum::http::StatusCode;
use common::{unique_name, TestContext};
use dekes_shared::models::lead::{CreateLead, Lead, LeadEventType, LeadStatus};
use dekes_shared::models::query::Query;
use dekes_shared::models::run::{Run, RunStatus};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn create_lead(ctx: &TestContext, organization_id: Uuid, title: &str) -> Lead {
    Lead::create(
        &ctx.db,
        organization_id,
        CreateLead {
            title: title.to_string(),
            score: 50,
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_list_leads_only_returns_own_organization() {
    let ctx = TestContext::new().await;
    let a = ctx.signup(&unique_name("Tenant A")).await;
    let b = ctx.signup(&unique_name("Tenant B")).await;

    let lead_a = create_lead(&ctx, a.organization_id, "A's lead").await;
    let lead_b = create_lead(&ctx, b.organization_id, "B's lead").await;

    let response = ctx.get("/api/leads", Some(&a.token)).await;
    assert_eq!(response.status, StatusCode::OK);

    let leads = response.body["leads"].as_array().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["id"], lead_a.id.to_string());
    assert_eq!(leads[0]["title"], "A's lead");
    assert_eq!(leads[0]["status"], "NEW");
    assert!(!response.body.to_string().contains(&lead_b.id.to_string()));
}

#[tokio::test]
async fn test_record_outcome() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Outcome")).await;
    let lead = create_lead(&ctx, account.organization_id, "Prospect").await;

    let response = ctx
        .post(
            &format!("/api/leads/{}/outcome", lead.id),
            Some(&account.token),
            json!({"status": "WON", "meta": {"deal": "annual"}}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["lead"]["status"], "WON");

    let events = common::lead_events(&ctx.db, lead.id).await;
    assert_eq!(
        events.last().unwrap(),
        &(LeadEventType::Won, json!({"deal": "annual"}))
    );

    let response = ctx
        .post(
            &format!("/api/leads/{}/outcome", lead.id),
            Some(&account.token),
            json!({"status": "OUTREACH_READY"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let events = common::lead_events(&ctx.db, lead.id).await;
    assert_eq!(events.last().unwrap(), &(LeadEventType::Updated, json!({})));

    let me = ctx.get("/api/user/me", Some(&account.token)).await;
    assert_eq!(me.body["stats"]["leads"], 1);
    assert_eq!(me.body["stats"]["qualified"], 1);
}

#[tokio::test]
async fn test_record_outcome_rejects_invalid_status() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Bad Status")).await;
    let lead = create_lead(&ctx, account.organization_id, "Prospect").await;

    for status in ["NEW", "ARCHIVED", "won"] {
        let response = ctx
            .post(
                &format!("/api/leads/{}/outcome", lead.id),
                Some(&account.token),
                json!({"status": status}),
            )
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "status {}", status);
    }

    let unchanged = Lead::find_for_organization(&ctx.db, account.organization_id, lead.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.status, LeadStatus::New);
}

#[tokio::test]
async fn test_foreign_lead_is_not_found_and_untouched() {
    let ctx = TestContext::new().await;
    let owner = ctx.signup(&unique_name("Owner")).await;
    let intruder = ctx.signup(&unique_name("Intruder")).await;
    let lead = create_lead(&ctx, owner.organization_id, "Private").await;

    let response = ctx
        .post(
            &format!("/api/leads/{}/outcome", lead.id),
            Some(&intruder.token),
            json!({"status": "REJECTED"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Not found");

    let unchanged = Lead::find_for_organization(&ctx.db, owner.organization_id, lead.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.status, LeadStatus::New);

    let events = common::lead_events(&ctx.db, lead.id).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, LeadEventType::Created);
}

#[tokio::test]
async fn test_unknown_lead_is_not_found() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Unknown")).await;

    for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
        let response = ctx
            .post(
                &format!("/api/leads/{}/outcome", id),
                Some(&account.token),
                json!({"status": "WON"}),
            )
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_lead_routes_require_session() {
    let ctx = TestContext::new().await;

    assert_eq!(ctx.get("/api/leads", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        ctx.post("/api/leads/run", None, json!({"query": "x"}))
            .await
            .status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        ctx.post(
            &format!("/api/leads/{}/outcome", Uuid::new_v4()),
            None,
            json!({"status": "WON"})
        )
        .await
        .status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_run_finishes_when_optimization_succeeds() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Run")).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/dekes/optimize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "selectedRegion": "FR",
            "estimatedCO2": 4.2,
            "carbonIntensity": 56
        })))
        .expect(1)
        .mount(&ctx.mock)
        .await;

    let response = ctx
        .post(
            "/api/leads/run",
            Some(&account.token),
            json!({"query": "carbon-aware b2b buyers", "estimatedResults": 25}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(
        response.body["organizationId"],
        account.organization_id.to_string()
    );
    assert_eq!(response.body["query"]["query"], "carbon-aware b2b buyers");
    assert_eq!(response.body["run"]["status"], "FINISHED");
    assert!(response.body["run"]["finishedAt"].is_string());
    assert_eq!(response.body["optimization"]["selectedRegion"], "FR");
    assert_eq!(response.body["optimization"]["carbonIntensity"], 56);

    let run_id: Uuid = response.body["run"]["id"].as_str().unwrap().parse().unwrap();
    let run = Run::find_for_organization(&ctx.db, account.organization_id, run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Finished);
    assert_eq!(run.result_count, 25);
    assert_eq!(run.lead_count, 0);
}

#[tokio::test]
async fn test_run_reuses_own_query_but_never_a_foreign_one() {
    let ctx = TestContext::new().await;
    let a = ctx.signup(&unique_name("Query A")).await;
    let b = ctx.signup(&unique_name("Query B")).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/dekes/optimize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"selectedRegion": "DE"})))
        .mount(&ctx.mock)
        .await;

    let own = Query::create(&ctx.db, a.organization_id, "old text").await.unwrap();
    let foreign = Query::create(&ctx.db, b.organization_id, "b's text").await.unwrap();

    let reused = ctx
        .post(
            "/api/leads/run",
            Some(&a.token),
            json!({"queryId": own.id, "query": "new text"}),
        )
        .await;
    assert_eq!(reused.status, StatusCode::OK);
    assert_eq!(reused.body["query"]["id"], own.id.to_string());

    let fresh = ctx
        .post(
            "/api/leads/run",
            Some(&a.token),
            json!({"queryId": foreign.id, "query": "sneaky"}),
        )
        .await;
    assert_eq!(fresh.status, StatusCode::OK);
    assert_ne!(fresh.body["query"]["id"], foreign.id.to_string());

    let untouched = Query::find_for_organization(&ctx.db, b.organization_id, foreign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.query, "b's text");
}

#[tokio::test]
async fn test_run_fails_when_optimization_fails() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Run Fail")).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/dekes/optimize"))
        .respond_with(ResponseTemplate::new(503).set_body_string("engine overloaded"))
        .mount(&ctx.mock)
        .await;

    let response = ctx
        .post(
            "/api/leads/run",
            Some(&account.token),
            json!({"query": "anything"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["error"], "upstream_error");

    let status: String = sqlx::query_scalar(
        "SELECT status FROM runs WHERE organization_id = $1 ORDER BY started_at DESC LIMIT 1",
    )
    .bind(account.organization_id)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(status, "FAILED");
}

#[tokio::test]
async fn test_run_validates_input() {
    let ctx = TestContext::new().await;
    let account = ctx.signup(&unique_name("Run Invalid")).await;

    for body in [
        json!({"query": ""}),
        json!({"query": "   "}),
        json!({"query": "x", "estimatedResults": 0}),
        json!({"query": "x", "carbonBudget": -1}),
        json!({"query": "x", "regions": []}),
    ] {
        let response = ctx.post("/api/leads/run", Some(&account.token), body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
    }

    let runs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM runs WHERE organization_id = $1")
        .bind(account.organization_id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(runs, 0);
}
