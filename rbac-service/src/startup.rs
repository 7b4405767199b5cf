use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::future::IntoFuture;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::RbacConfig;
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::{InvitationClient, MongoDb, TokenVerifier};

#[derive(Clone)]
pub struct AppState {
    pub config: RbacConfig,
    pub db: MongoDb,
    pub tokens: TokenVerifier,
    pub invitations: InvitationClient,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: RbacConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let tokens = TokenVerifier::new(&config.identity)?;
        let invitations = InvitationClient::new(config.identity.clone());

        let state = AppState {
            config: config.clone(),
            db: db.clone(),
            tokens,
            invitations,
        };

        // Every route below requires a bearer credential; the per-endpoint
        // role and org-scope policy lives at the top of each handler.
        let protected = Router::new()
            .route(
                "/org",
                get(handlers::orgs::list_organizations).post(handlers::orgs::create_organization),
            )
            .route(
                "/org/:id",
                get(handlers::orgs::get_organization)
                    .patch(handlers::orgs::update_organization)
                    .delete(handlers::orgs::delete_organization),
            )
            .route("/org/:id/invite", post(handlers::orgs::invite_admin))
            .route("/org/:id/invite-member", post(handlers::orgs::invite_member))
            .route("/org/:id/users", get(handlers::users::list_org_users))
            .route(
                "/org/:id/users/:user_id",
                get(handlers::users::get_org_user)
                    .patch(handlers::users::update_org_user_role)
                    .delete(handlers::users::remove_org_user),
            )
            .route("/users", get(handlers::users::list_all_users))
            .route_layer(from_fn_with_state(state.clone(), auth_middleware));

        let app = Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/ready", get(handlers::health::readiness_check))
            .route("/metrics", get(handlers::metrics::metrics_endpoint))
            .merge(protected)
            .route_layer(from_fn(metrics_middleware))
            .layer(cors_layer(&config)?)
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        subject = tracing::field::Empty,
                    )
                }),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind(config.common.address())
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to bind TCP listener to {}: {}",
                    config.common.address(),
                    e
                );
                AppError::from(e)
            })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &MongoDb {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

fn cors_layer(config: &RbacConfig) -> Result<CorsLayer, AppError> {
    let origin = config
        .http
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid CORS origin '{}': {}",
                config.http.cors_origin,
                e
            ))
        })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}
