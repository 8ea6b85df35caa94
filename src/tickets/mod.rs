//! Ticketing Gateway: creates human-support tickets.

mod jira;

pub use jira::JiraClient;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{RequestConfig, TicketingConfig};
use crate::error::{TicketError, TicketResult};

/// Ticket id substituted when ticket creation fails or ticketing is not configured.
pub const DEGRADED_TICKET_ID: &str = "JIRA_DISABLED";

/// Creates a support ticket and returns its identifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketGateway: Send + Sync {
    async fn create(
        &self,
        summary: &str,
        description: &str,
        issue_type: &str,
    ) -> TicketResult<String>;

    /// Issue type used when the caller has no preference.
    fn default_issue_type(&self) -> String {
        "Support".to_string()
    }
}

/// Gateway used when Jira credentials are absent.
#[derive(Debug, Clone, Default)]
pub struct DisabledTicketing;

#[async_trait]
impl TicketGateway for DisabledTicketing {
    async fn create(&self, _summary: &str, _description: &str, _issue_type: &str) -> TicketResult<String> {
        Err(TicketError::Disabled)
    }
}

/// Pick the Jira client when fully configured, the disabled gateway otherwise.
pub fn from_config(
    config: &TicketingConfig,
    request_config: &RequestConfig,
) -> TicketResult<Arc<dyn TicketGateway>> {
    if !config.is_enabled() {
        return Ok(Arc::new(DisabledTicketing));
    }
    Ok(Arc::new(JiraClient::new(config, request_config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_ticketing_always_errors() {
        let gateway = DisabledTicketing;
        let err = gateway.create("summary", "description", "Support").await.unwrap_err();
        assert!(matches!(err, TicketError::Disabled));
    }

    #[test]
    fn test_from_config_without_credentials_is_disabled() {
        let config = TicketingConfig {
            issue_type: "Support".to_string(),
            ..Default::default()
        };
        let gateway = from_config(&config, &RequestConfig::default()).unwrap();
        assert_eq!(gateway.default_issue_type(), "Support");
    }
}
