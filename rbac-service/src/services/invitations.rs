//! Identity-provider invitation client.
//!
//! Organization membership is never created directly by this service: an
//! admin or member joins by accepting a provider-side invitation. This client
//! only asks the provider to send one, attaching the organization and role
//! the acceptance should materialize.

use crate::config::IdentityConfig;
use crate::models::MemberRole;
use anyhow::anyhow;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

#[derive(Clone)]
pub struct InvitationClient {
    client: Client,
    config: IdentityConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRequest {
    pub email_address: String,
    pub public_metadata: InvitationMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationMetadata {
    pub org_id: String,
    pub role: MemberRole,
}

/// Response from the provider's invitation endpoint.
#[derive(Debug, Deserialize)]
pub struct Invitation {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl InvitationClient {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if the provider management API is configured (secret key set).
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.expose_secret().is_empty()
    }

    /// Ask the provider to invite `email` into `org_id` with `role`. Email
    /// delivery and acceptance are owned by the provider; the membership
    /// document appears only once the invitee accepts.
    pub async fn send_invitation(
        &self,
        email: &str,
        org_id: &str,
        role: MemberRole,
    ) -> Result<Invitation, AppError> {
        if !self.is_configured() {
            return Err(AppError::Upstream(anyhow!(
                "Identity provider API key not configured"
            )));
        }

        let request = InvitationRequest {
            email_address: email.to_string(),
            public_metadata: InvitationMetadata {
                org_id: org_id.to_string(),
                role,
            },
        };

        let url = format!("{}/invitations", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(anyhow!("Invitation request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(anyhow!("Failed to read invitation response: {}", e)))?;

        tracing::debug!(status = %status, body = %body, "Invitation response");

        if status.is_success() {
            let invitation: Invitation = serde_json::from_str(&body)
                .map_err(|e| AppError::Upstream(anyhow!("Unexpected invitation response: {}", e)))?;
            tracing::info!(
                invitation_id = %invitation.id,
                org_id = %org_id,
                role = %role,
                "Invitation dispatched"
            );
            Ok(invitation)
        } else {
            tracing::error!(status = %status, body = %body, "Invitation dispatch failed");
            Err(AppError::Upstream(anyhow!(
                "Invitation dispatch failed with status {}",
                status
            )))
        }
    }
}
