use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{CreatePipeRequest, CreatePipeResponse, Message, PipeRequest, PipeResponse};
use crate::config::{LangbaseConfig, PipeConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};
use crate::prompts;

/// Model every support pipe is created with.
const PIPE_MODEL: &str = "openai:gpt-4o-mini";

/// Client for the Langbase pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_config: RequestConfig,
}

impl LangbaseClient {
    /// Create a new Langbase client
    pub fn new(config: &LangbaseConfig, request_config: RequestConfig) -> LangbaseResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LangbaseError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// Run a pipe. Makes `1 + max_retries` attempts with exponential backoff between them.
    pub async fn call_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let attempts = self.request_config.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                warn!(
                    pipe = %request.name,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying pipe run"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            debug!(pipe = %request.name, messages = request.messages.len(), "Running pipe");

            match self.post_json::<_, PipeResponse>(&url, &request).await {
                Ok(response) => {
                    debug!(
                        pipe = %request.name,
                        latency_ms = start.elapsed().as_millis(),
                        "Pipe run succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        pipe = %request.name,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        attempt,
                        "Pipe run failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(LangbaseError::Unavailable {
            message: last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string()),
            retries: attempts,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.request_config.retry_delay_ms << (attempt - 1).min(16))
    }

    /// POST a JSON body with bearer auth and decode a JSON reply.
    async fn post_json<B, T>(&self, url: &str, body: &B) -> LangbaseResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| LangbaseError::InvalidResponse {
                message: format!("Failed to parse response from {}: {}", url, e),
            })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create or update a pipe
    pub async fn create_pipe(
        &self,
        request: CreatePipeRequest,
    ) -> LangbaseResult<CreatePipeResponse> {
        let url = format!("{}/v1/pipes", self.base_url);
        let created: CreatePipeResponse = self.post_json(&url, &request).await?;
        debug!(pipe = %created.name, url = %created.url, "Pipe upserted");
        Ok(created)
    }

    /// Upsert one pipe carrying `system_prompt`. A 409 means it already exists.
    pub async fn ensure_pipe(
        &self,
        pipe_name: &str,
        description: &str,
        system_prompt: &str,
    ) -> LangbaseResult<()> {
        let request = CreatePipeRequest::new(pipe_name)
            .with_description(description)
            .with_model(PIPE_MODEL)
            .with_upsert(true)
            .with_temperature(0.0)
            .with_max_tokens(1000)
            .with_messages(vec![Message::system(system_prompt)]);

        match self.create_pipe(request).await {
            Ok(_) => info!(pipe = %pipe_name, "Support pipe ready"),
            Err(LangbaseError::Api { status: 409, .. }) => {
                info!(pipe = %pipe_name, "Support pipe already exists")
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Upsert every support pipe named in the configuration, stopping at the first failure.
    pub async fn ensure_support_pipes(&self, pipes: &PipeConfig) -> LangbaseResult<()> {
        for (name, description, prompt) in prompts::pipe_definitions(pipes) {
            self.ensure_pipe(name, description, &prompt).await?;
        }
        Ok(())
    }
}
