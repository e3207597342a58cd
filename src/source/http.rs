use crate::core::models::CheckoutRecord;
use crate::core::query::CheckoutQuery;
use crate::core::settings::SourceSettings;
use crate::source::{CheckoutSource, FetchError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use std::time::Duration;

const USER_AGENT: &str = concat!("checkout-board/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 200;

pub struct HttpCheckoutSource {
    client: reqwest::Client,
    endpoint: Url,
    query: CheckoutQuery,
}

impl HttpCheckoutSource {
    pub fn new(settings: &SourceSettings, query: CheckoutQuery) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint_url)
            .with_context(|| format!("Invalid endpoint URL: {}", settings.endpoint_url))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            query,
        })
    }
}

#[async_trait]
impl CheckoutSource for HttpCheckoutSource {
    fn describe(&self) -> String {
        self.endpoint.to_string()
    }

    async fn fetch(&self) -> Result<Vec<CheckoutRecord>, FetchError> {
        // The checkouts endpoint serves the HTML board unless JSON is asked for.
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .query(&self.query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let records: Vec<CheckoutRecord> = serde_json::from_slice(&bytes)?;

        tracing::debug!(count = records.len(), endpoint = %self.endpoint, "Fetched checkout records");
        Ok(records)
    }
}
