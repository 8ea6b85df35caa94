use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

use super::TicketGateway;
use crate::config::{RequestConfig, TicketingConfig};
use crate::error::{TicketError, TicketResult};

#[derive(Deserialize)]
struct CreateIssueResponse {
    key: String,
}

/// Jira REST v2 client
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    server: String,
    email: String,
    api_token: String,
    project_key: String,
    issue_type: String,
}

impl JiraClient {
    /// Create a client from fully populated ticketing configuration
    pub fn new(config: &TicketingConfig, request_config: &RequestConfig) -> TicketResult<Self> {
        let missing = |field: &str| TicketError::InvalidResponse {
            message: format!("Jira {} is not configured", field),
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            server: config
                .server
                .as_deref()
                .ok_or_else(|| missing("server"))?
                .trim_end_matches('/')
                .to_string(),
            email: config.email.clone().ok_or_else(|| missing("email"))?,
            api_token: config.api_token.clone().ok_or_else(|| missing("API token"))?,
            project_key: config
                .project_key
                .clone()
                .ok_or_else(|| missing("project key"))?,
            issue_type: config.issue_type.clone(),
        })
    }
}

#[async_trait]
impl TicketGateway for JiraClient {
    async fn create(
        &self,
        summary: &str,
        description: &str,
        issue_type: &str,
    ) -> TicketResult<String> {
        let url = format!("{}/rest/api/2/issue", self.server);
        let body = json!({
            "fields": {
                "project": {"key": self.project_key},
                "summary": summary,
                "description": description,
                "issuetype": {"name": issue_type},
            }
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Jira issue creation failed");
            return Err(TicketError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreateIssueResponse =
            response
                .json()
                .await
                .map_err(|e| TicketError::InvalidResponse {
                    message: format!("Failed to parse create issue response: {}", e),
                })?;

        info!(ticket_id = %created.key, "Jira issue created");
        Ok(created.key)
    }

    fn default_issue_type(&self) -> String {
        self.issue_type.clone()
    }
}
