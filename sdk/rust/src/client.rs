use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

/// Payload returned by the counter endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct VisitResponse {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "CurrentVisitorCount")]
    pub current_visitor_count: u64,
}

pub struct CounterClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CounterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            api_key: None,
        }
    }

    /// Attach an API key sent as the `x-api-key` header on every request.
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Record one visit and return the updated count.
    pub async fn record_visit(
        &self,
        route: &str,
    ) -> Result<VisitResponse, Box<dyn std::error::Error>> {
        let mut request = self.client.post(format!("{}{}", self.base_url, route));
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let resp = request.send().await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("service returned status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<VisitResponse>(&text)?)
    }

    /// Raw GET against the service, for callers that need headers or status.
    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        request.send().await
    }
}
