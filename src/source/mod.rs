mod http;

use crate::core::models::CheckoutRecord;
use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpCheckoutSource;

/// Anything that can hand the board a fresh list of checkout records.
#[async_trait]
pub trait CheckoutSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch(&self) -> Result<Vec<CheckoutRecord>, FetchError>;
}

/// Every way a fetch can fail. The board shows one error state for all of
/// them; the variants only matter for logs.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("data source returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
        }
    }
}
