//! Token-to-identity adapter.
//!
//! Verifies the bearer credential locally against the identity provider's
//! key and issuer, then resolves the subject to an [`Identity`]: the
//! configured superadmin subject short-circuits, every other subject must
//! have a membership record. A verified token without a membership is still
//! unauthenticated as far as this service is concerned.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use mongodb::bson::doc;

use crate::authz::Identity;
use crate::models::MemberRole;
use crate::startup::AppState;
use service_core::error::AppError;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => {
            counter!("auth_failures_total", "reason" => "missing_token").increment(1);
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Authorization token required"
            )));
        }
    };

    let claims = state.tokens.verify(token).map_err(|e| {
        counter!("auth_failures_total", "reason" => "invalid_token").increment(1);
        e
    })?;

    let identity = resolve_identity(&state, claims.sub).await?;

    tracing::Span::current().record("subject", identity.subject());
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

async fn resolve_identity(state: &AppState, subject: String) -> Result<Identity, AppError> {
    if subject == state.config.identity.superadmin_subject {
        return Ok(Identity::Superadmin { subject });
    }

    let membership = state
        .db
        .memberships()
        .find_one(doc! { "subject_id": &subject }, None)
        .await?
        .ok_or_else(|| {
            counter!("auth_failures_total", "reason" => "unknown_subject").increment(1);
            tracing::debug!(subject = %subject, "Verified subject has no membership record");
            AppError::AuthError(anyhow::anyhow!("No account found for this user"))
        })?;

    Ok(match membership.role {
        MemberRole::Admin => Identity::Admin {
            subject,
            org_id: membership.org_id,
        },
        MemberRole::Member => Identity::Member {
            subject,
            org_id: membership.org_id,
        },
    })
}

/// Extractor for the identity resolved by `auth_middleware`.
pub struct CurrentIdentity(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Identity missing from request extensions"))
        })?;

        Ok(CurrentIdentity(identity))
    }
}
