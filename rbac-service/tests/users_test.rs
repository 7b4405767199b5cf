//! The global, superadmin-only user list with its role breakdown.

mod common;

use axum::http::StatusCode;
use common::{TestApp, SUPERADMIN_SUBJECT};
use rbac_service::models::MemberRole;

#[tokio::test]
async fn global_user_list_requires_superadmin() {
    let app = TestApp::spawn().await;

    let org = app.seed_org("Acme").await;
    app.seed_membership("user_a1", "a1@acme.com", MemberRole::Admin, &org.id)
        .await;

    let response = app
        .client
        .get(format!("{}/users", app.address))
        .bearer_auth(app.token_for("user_a1"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::FORBIDDEN, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn global_user_list_reports_role_breakdown() {
    let app = TestApp::spawn().await;

    let org_1 = app.seed_org("Acme").await;
    let org_2 = app.seed_org("Globex").await;
    app.seed_membership("user_a1", "a1@acme.com", MemberRole::Admin, &org_1.id)
        .await;
    app.seed_membership("user_m1", "m1@acme.com", MemberRole::Member, &org_1.id)
        .await;
    app.seed_membership("user_m2", "m2@acme.com", MemberRole::Member, &org_1.id)
        .await;
    app.seed_membership("user_g1", "g1@globex.com", MemberRole::Admin, &org_2.id)
        .await;

    let response = app
        .client
        .get(format!("{}/users", app.address))
        .bearer_auth(app.token_for(SUPERADMIN_SUBJECT))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::OK, response.status());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["total"], 4);
    assert_eq!(body["breakdown"]["admin"], 2);
    assert_eq!(body["breakdown"]["member"], 2);
    assert_eq!(body["usersByRole"]["admin"].as_array().unwrap().len(), 2);
    assert_eq!(body["usersByRole"]["member"].as_array().unwrap().len(), 2);
    assert_eq!(body["users"].as_array().unwrap().len(), 4);

    app.cleanup().await;
}
