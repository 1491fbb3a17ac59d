use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TokenSpecError;

/// One ERC-20 transfer as the block explorer reports it. Every field is a
/// string on the wire; absent fields deserialize to empty strings and are
/// validated later during normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransfer {
    /// Epoch seconds, serialized as a decimal string.
    #[serde(rename = "timeStamp", default)]
    pub timestamp: String,

    #[serde(default)]
    pub hash: String,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: String,

    /// Raw token units as an unsigned base-10 integer string.
    #[serde(default)]
    pub value: String,

    #[serde(rename = "tokenDecimal", default)]
    pub token_decimal: String,
}

impl RawTransfer {
    /// Token decimal precision, falling back to 18 when the field is
    /// absent or unparseable.
    pub fn decimals(&self) -> u32 {
        self.token_decimal.trim().parse().unwrap_or(18)
    }
}

/// Whether a transfer moves value toward or away from the subject wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "inflow")]
    Inflow,
    #[serde(rename = "outflow")]
    Outflow,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inflow => "inflow",
            Direction::Outflow => "outflow",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A normalized, classified transfer. Addresses are stored canonically as
/// lowercase `0x`-prefixed strings so downstream grouping is exact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRecord {
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Human-scale token amount (raw units divided by 10^decimals).
    pub amount: Decimal,
    /// `amount` multiplied by the configured USD price.
    pub usd_value: Decimal,
    pub token: String,
    pub direction: Direction,
    /// The non-subject side of the transfer.
    pub counterparty: String,
}

/// Ordered flow records for one subject wallet, across all tracked tokens.
/// Records are appended in token declaration order and never reordered.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<FlowRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, records: Vec<FlowRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<FlowRecord>> for Ledger {
    fn from(records: Vec<FlowRecord>) -> Self {
        Self { records }
    }
}

/// A token the analyzer tracks: display symbol, contract address and the
/// flat USD price applied to every transfer of that token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpec {
    pub symbol: String,
    pub contract: Address,
    pub usd_price: Decimal,
}

impl FromStr for TokenSpec {
    type Err = TokenSpecError;

    /// Parses `SYMBOL:CONTRACT:PRICE`, e.g. `CRV:0x331b...c56:0.42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = |reason: String| TokenSpecError {
            entry: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(bad("expected SYMBOL:CONTRACT:PRICE".to_string()));
        }

        let symbol = parts[0].trim();
        if symbol.is_empty() {
            return Err(bad("symbol is empty".to_string()));
        }

        let contract = Address::from_str(parts[1].trim())
            .map_err(|e| bad(format!("bad contract address: {e}")))?;

        let usd_price = Decimal::from_str(parts[2].trim())
            .map_err(|e| bad(format!("bad price: {e}")))?;
        if usd_price < Decimal::ZERO {
            return Err(bad("price must not be negative".to_string()));
        }

        Ok(TokenSpec {
            symbol: symbol.to_string(),
            contract,
            usd_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_spec_triple() {
        let spec: TokenSpec = "CRV:0x331b9182088e2a7d6d3fe4742aba1fb231aecc56:0.42"
            .parse()
            .unwrap();
        assert_eq!(spec.symbol, "CRV");
        assert_eq!(
            spec.contract,
            "0x331b9182088e2a7d6d3fe4742aba1fb231aecc56"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(spec.usd_price, Decimal::from_str("0.42").unwrap());
    }

    #[test]
    fn token_spec_trims_whitespace() {
        let spec: TokenSpec = "  WETH : 0x331b9182088e2a7d6d3fe4742aba1fb231aecc56 : 3500 "
            .parse()
            .unwrap();
        assert_eq!(spec.symbol, "WETH");
        assert_eq!(spec.usd_price, Decimal::from(3500));
    }

    #[test]
    fn rejects_malformed_token_specs() {
        assert!("CRV:0x331b9182088e2a7d6d3fe4742aba1fb231aecc56"
            .parse::<TokenSpec>()
            .is_err());
        assert!(":0x331b9182088e2a7d6d3fe4742aba1fb231aecc56:1.0"
            .parse::<TokenSpec>()
            .is_err());
        assert!("CRV:nonsense:1.0".parse::<TokenSpec>().is_err());
        assert!("CRV:0x331b9182088e2a7d6d3fe4742aba1fb231aecc56:abc"
            .parse::<TokenSpec>()
            .is_err());
        assert!("CRV:0x331b9182088e2a7d6d3fe4742aba1fb231aecc56:-1"
            .parse::<TokenSpec>()
            .is_err());
    }

    #[test]
    fn decimals_fall_back_to_eighteen() {
        let mut tx = RawTransfer::default();
        assert_eq!(tx.decimals(), 18);
        tx.token_decimal = "6".to_string();
        assert_eq!(tx.decimals(), 6);
        tx.token_decimal = "garbage".to_string();
        assert_eq!(tx.decimals(), 18);
    }

    #[test]
    fn raw_transfer_deserializes_explorer_row() {
        let row = r#"{
            "blockNumber": "18987654",
            "timeStamp": "1700000000",
            "hash": "0xabc123",
            "from": "0x331b9182088e2a7d6d3fe4742aba1fb231aecc56",
            "to": "0x28c6c06298d514db089934071355e5743bf21d60",
            "value": "2000000000000000000",
            "tokenName": "Curve DAO Token",
            "tokenSymbol": "CRV",
            "tokenDecimal": "18"
        }"#;
        let tx: RawTransfer = serde_json::from_str(row).unwrap();
        assert_eq!(tx.timestamp, "1700000000");
        assert_eq!(tx.value, "2000000000000000000");
        assert_eq!(tx.decimals(), 18);
    }

    #[test]
    fn raw_transfer_tolerates_missing_fields() {
        let tx: RawTransfer = serde_json::from_str(r#"{"hash": "0xdead"}"#).unwrap();
        assert_eq!(tx.hash, "0xdead");
        assert!(tx.timestamp.is_empty());
        assert!(tx.value.is_empty());
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Direction::Inflow).unwrap(),
            r#""inflow""#
        );
        assert_eq!(Direction::Outflow.to_string(), "outflow");
    }
}
