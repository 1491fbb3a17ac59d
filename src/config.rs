use dotenvy::dotenv;
use eyre::{eyre, Result, WrapErr};
use rust_decimal::Decimal;
use std::env;
use alloy::primitives::Address;
use tracing::info;

use crate::explorer::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE};
use crate::graph::DEFAULT_MIN_USD;
use crate::models::TokenSpec;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    /// The wallet whose flows are analyzed.
    pub subject: Address,
    /// Tracked tokens in declaration order.
    pub tokens: Vec<TokenSpec>,
    pub min_usd: Decimal,
    pub page_size: usize,
    pub page_delay_ms: u64,
    pub sankey_out: String,
}

/// Default tracking set: CRV at a placeholder price of 1 USD.
const DEFAULT_TOKENS: &str = "CRV:0x331b9182088e2a7d6d3fe4742aba1fb231aecc56:1.0";

pub fn load() -> Result<Config> {
    dotenv().ok();

    let api_url = env::var("EXPLORER_API_URL")
        .unwrap_or_else(|_| "https://api.etherscan.io/api".to_string());

    let api_key = env::var("EXPLORER_API_KEY")
        .or_else(|_| env::var("ETHERSCAN_API_KEY")) // alias support
        .unwrap_or_default();

    let subject = env::var("WALLET_ADDRESS")
        .map_err(|_| eyre!("WALLET_ADDRESS must be set to the wallet under analysis"))?
        .trim()
        .parse::<Address>()
        .map_err(|e| eyre!("WALLET_ADDRESS is not a valid address: {e}"))?;

    let tokens =
        parse_tokens(&env::var("TOKENS").unwrap_or_else(|_| DEFAULT_TOKENS.to_string()))?;

    // graph threshold in USD (default: 100)
    let min_usd = env::var("MIN_USD_VALUE")
        .unwrap_or_default()
        .parse()
        .unwrap_or(DEFAULT_MIN_USD);

    // explorer paging knobs
    let page_size = env::var("PAGE_SIZE")
        .unwrap_or_default()
        .parse()
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let page_delay_ms = env::var("PAGE_DELAY_MS")
        .unwrap_or_default()
        .parse()
        .unwrap_or(DEFAULT_PAGE_DELAY.as_millis() as u64);

    let sankey_out = env::var("SANKEY_OUT").unwrap_or_else(|_| "sankey.json".to_string());

    let cfg = Config {
        api_url,
        api_key,
        subject,
        tokens,
        min_usd,
        page_size,
        page_delay_ms,
        sankey_out,
    };

    info!(
        "Loaded config: wallet {}, {} token(s), min ${}",
        cfg.subject,
        cfg.tokens.len(),
        cfg.min_usd
    );

    Ok(cfg)
}

/// Parse a comma-separated list of `SYMBOL:CONTRACT:PRICE` entries. A
/// malformed entry fails loudly instead of being skipped, and an empty
/// list is refused up front.
fn parse_tokens(raw: &str) -> Result<Vec<TokenSpec>> {
    let tokens = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<TokenSpec>())
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("TOKENS is malformed")?;

    if tokens.is_empty() {
        return Err(eyre!(
            "TOKENS must list at least one SYMBOL:CONTRACT:PRICE entry"
        ));
    }
    Ok(tokens)
}
