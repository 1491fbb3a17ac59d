// src/explorer.rs
use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::error::RetrievalError;
use crate::models::RawTransfer;

/// Transfers per page requested from the explorer.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Pause between successive page requests, to stay under rate limits.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(200);

/// Source of historical token transfer activity for one wallet. The
/// analyzer depends only on this trait, so tests can feed it canned pages.
#[async_trait]
pub trait TransferSource {
    /// All transfers of `contract` touching `subject`, oldest first.
    async fn fetch_token_transfers(
        &self,
        subject: Address,
        contract: Address,
    ) -> Result<Vec<RawTransfer>, RetrievalError>;
}

/// Etherscan-style `account/tokentx` response envelope. `result` is a
/// transfer array on success but degrades to a plain string on errors, so
/// it stays untyped until the status is known.
#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    status: String,
    message: String,
    result: serde_json::Value,
}

fn decode_page(body: &str) -> Result<Vec<RawTransfer>, RetrievalError> {
    let envelope: ExplorerEnvelope = serde_json::from_str(body)?;

    if envelope.status == "1" {
        let transfers: Vec<RawTransfer> = serde_json::from_value(envelope.result)?;
        return Ok(transfers);
    }

    // status "0" with an empty result just means no activity
    if envelope.message.starts_with("No transactions found") {
        return Ok(Vec::new());
    }
    if matches!(&envelope.result, serde_json::Value::Array(rows) if rows.is_empty()) {
        return Ok(Vec::new());
    }

    let detail = match envelope.result {
        serde_json::Value::String(s) if !s.is_empty() => s,
        _ => envelope.message,
    };
    Err(RetrievalError::Api(detail))
}

/// HTTP client for an Etherscan-compatible block explorer API.
pub struct ExplorerClient {
    http: Client,
    api_url: String,
    api_key: String,
    page_size: usize,
    page_delay: Duration,
}

impl ExplorerClient {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, RetrievalError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
        })
    }

    pub fn with_paging(mut self, page_size: usize, page_delay: Duration) -> Self {
        self.page_size = page_size.max(1);
        self.page_delay = page_delay;
        self
    }

    /// Fetch one page of `tokentx` results, retrying transport failures.
    async fn fetch_page(
        &self,
        subject: Address,
        contract: Address,
        page: usize,
    ) -> Result<Vec<RawTransfer>, RetrievalError> {
        let params = [
            ("module", "account".to_string()),
            ("action", "tokentx".to_string()),
            ("address", subject.to_string()),
            ("contractaddress", contract.to_string()),
            ("page", page.to_string()),
            ("offset", self.page_size.to_string()),
            ("sort", "asc".to_string()),
            ("apikey", self.api_key.clone()),
        ];

        info!("📡 Requesting tokentx page {} → {}", page, self.api_url);

        for attempt in 1..=3 {
            let res = self.http.get(&self.api_url).query(&params).send().await;

            match res {
                Ok(resp) => {
                    if resp.status() != StatusCode::OK {
                        return Err(RetrievalError::Api(format!("HTTP {}", resp.status())));
                    }
                    let text = resp.text().await?;
                    return decode_page(&text);
                }
                Err(e) if attempt < 3 => {
                    eprintln!(
                        "⚠️ Explorer request failed (attempt {}): {}. Retrying...",
                        attempt, e
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(RetrievalError::Transport(e)),
            }
        }

        Err(RetrievalError::Api("unreachable: retries exhausted".into()))
    }
}

#[async_trait]
impl TransferSource for ExplorerClient {
    async fn fetch_token_transfers(
        &self,
        subject: Address,
        contract: Address,
    ) -> Result<Vec<RawTransfer>, RetrievalError> {
        let mut all = Vec::new();
        let mut page = 1usize;

        loop {
            let batch = self.fetch_page(subject, contract, page).await?;
            let got = batch.len();
            all.extend(batch);

            // a short page is the last page
            if got < self.page_size {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        info!(
            "📩 {} transfers of {} fetched across {} page(s)",
            all.len(),
            contract,
            page
        );
        Ok(all)
    }
}
