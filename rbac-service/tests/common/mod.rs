use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rbac_service::config::RbacConfig;
use rbac_service::models::{MemberRole, Membership, Organization};
use rbac_service::services::{MongoDb, SessionClaims};
use rbac_service::startup::Application;
use secrecy::Secret;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const SUPERADMIN_SUBJECT: &str = "user_superadmin";
pub const TEST_ISSUER: &str = "https://identity.test.local";

const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/jwt_test_private.pem");
const TEST_PUBLIC_KEY_PATH: &str = "tests/fixtures/jwt_test_public.pem";

/// In-process stand-in for the identity provider's invitation API. Records
/// every payload it receives and can be flipped into failure mode.
#[derive(Clone, Default)]
pub struct StubIdp {
    pub invitations: Arc<Mutex<Vec<serde_json::Value>>>,
    pub fail: Arc<AtomicBool>,
}

async fn stub_invitations(
    State(idp): State<StubIdp>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    if idp.fail.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "provider unavailable" })),
        );
    }
    idp.invitations.lock().unwrap().push(body);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": format!("inv_{}", Uuid::new_v4()),
            "status": "pending"
        })),
    )
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: MongoDb,
    pub db_name: String,
    pub idp: StubIdp,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        // Stub provider goes up first so its address can be configured.
        let idp = StubIdp::default();
        let idp_router = Router::new()
            .route("/invitations", post(stub_invitations))
            .with_state(idp.clone());
        let idp_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub provider listener");
        let idp_port = idp_listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(idp_listener, idp_router).await.ok();
        });

        std::env::set_var("MONGODB_URI", "mongodb://localhost:27017");

        let db_name = format!("rbac_test_{}", Uuid::new_v4());

        let mut config = RbacConfig::load().expect("Failed to load configuration");
        config.common.host = "127.0.0.1".to_string();
        config.common.port = 0; // Random port for testing
        config.mongodb.database = db_name.clone();
        config.identity.issuer = TEST_ISSUER.to_string();
        config.identity.public_key_path = TEST_PUBLIC_KEY_PATH.to_string();
        config.identity.superadmin_subject = SUPERADMIN_SUBJECT.to_string();
        config.identity.api_base_url = format!("http://127.0.0.1:{}", idp_port);
        config.identity.api_key = Secret::new("sk_test_key".to_string());

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            db,
            db_name,
            idp,
            client: reqwest::Client::new(),
        }
    }

    /// Mint a valid bearer token for `subject`, signed with the test keypair.
    pub fn token_for(&self, subject: &str) -> String {
        sign_token(subject, TEST_ISSUER, Duration::hours(1))
    }

    pub fn expired_token_for(&self, subject: &str) -> String {
        sign_token(subject, TEST_ISSUER, Duration::hours(-2))
    }

    pub async fn seed_org(&self, name: &str) -> Organization {
        let org = Organization::new(name.to_string());
        self.db
            .organizations()
            .insert_one(&org, None)
            .await
            .expect("Failed to insert organization");
        org
    }

    pub async fn seed_membership(
        &self,
        subject: &str,
        email: &str,
        role: MemberRole,
        org_id: &str,
    ) -> Membership {
        let membership = Membership::new(
            subject.to_string(),
            email.to_string(),
            role,
            org_id.to_string(),
        );
        self.db
            .memberships()
            .insert_one(&membership, None)
            .await
            .expect("Failed to insert membership");
        membership
    }

    /// Cleanup test resources (drops the per-test database).
    pub async fn cleanup(&self) {
        let _ = self.db.client().database(&self.db_name).drop(None).await;
    }
}

pub fn sign_token(subject: &str, issuer: &str, expires_in: Duration) -> String {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: subject.to_string(),
        iss: issuer.to_string(),
        exp: (now + expires_in).timestamp(),
        iat: now.timestamp(),
    };
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes())
        .expect("Failed to parse test private key");
    encode(&Header::new(Algorithm::RS256), &claims, &key).expect("Failed to sign test token")
}
