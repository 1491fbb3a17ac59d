use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::error::{FlowError, MalformedRecord};
use crate::models::{Direction, FlowRecord, RawTransfer};

/// Canonical string form of an address: lowercase, `0x`-prefixed, 42 chars.
fn canonical(addr: &Address) -> String {
    addr.to_string().to_lowercase()
}

/// Raw token units divided by 10^decimals, computed exactly.
/// The raw value must be an unsigned base-10 integer string.
fn scaled_amount(raw: &str, decimals: u32) -> Result<Decimal, MalformedRecord> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MalformedRecord::MissingField("value"));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MalformedRecord::Value(raw.to_string()));
    }
    let mut amount =
        Decimal::from_str(raw).map_err(|_| MalformedRecord::Value(raw.to_string()))?;
    amount
        .set_scale(decimals)
        .map_err(|_| MalformedRecord::Value(raw.to_string()))?;
    Ok(amount)
}

/// Turn one raw transfer into a normalized flow record for `subject`.
///
/// A transfer is an inflow when its `to` side equals the subject (compared
/// as parsed addresses, so letter case never matters); everything else,
/// including transfers where the subject appears on neither side, is an
/// outflow. The counterparty is the opposite side of the subject.
pub fn normalize_transfer(
    tx: &RawTransfer,
    subject: Address,
    symbol: &str,
    price: Decimal,
) -> Result<FlowRecord, MalformedRecord> {
    let hash = tx.hash.trim();
    if hash.is_empty() {
        return Err(MalformedRecord::MissingField("hash"));
    }

    let ts = tx.timestamp.trim();
    if ts.is_empty() {
        return Err(MalformedRecord::MissingField("timeStamp"));
    }
    let secs: i64 = ts
        .parse()
        .map_err(|_| MalformedRecord::Timestamp(ts.to_string()))?;
    let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| MalformedRecord::Timestamp(ts.to_string()))?;

    let from = Address::from_str(tx.from.trim())
        .map_err(|_| MalformedRecord::Address(tx.from.clone()))?;
    let to =
        Address::from_str(tx.to.trim()).map_err(|_| MalformedRecord::Address(tx.to.clone()))?;

    let amount = scaled_amount(&tx.value, tx.decimals())?;
    let usd_value = amount
        .checked_mul(price)
        .ok_or_else(|| MalformedRecord::Value(tx.value.clone()))?;

    let direction = if to == subject {
        Direction::Inflow
    } else {
        Direction::Outflow
    };
    let counterparty = match direction {
        Direction::Inflow => canonical(&from),
        Direction::Outflow => canonical(&to),
    };

    Ok(FlowRecord {
        timestamp,
        hash: hash.to_string(),
        from: canonical(&from),
        to: canonical(&to),
        amount,
        usd_value,
        token: symbol.to_string(),
        direction,
        counterparty,
    })
}

/// Build the ordered flow records for one token. The price lookup happens
/// before any record is touched; a missing price fails the token as a whole
/// rather than silently zeroing its USD values. Malformed records are
/// dropped and counted, never partially kept.
pub fn build_token_ledger(
    transfers: &[RawTransfer],
    subject: Address,
    symbol: &str,
    prices: &HashMap<String, Decimal>,
) -> Result<(Vec<FlowRecord>, usize), FlowError> {
    let price = *prices
        .get(symbol)
        .ok_or_else(|| FlowError::MissingPrice(symbol.to_string()))?;

    let mut records = Vec::with_capacity(transfers.len());
    let mut dropped = 0usize;
    for tx in transfers {
        match normalize_transfer(tx, subject, symbol, price) {
            Ok(record) => records.push(record),
            Err(reason) => {
                dropped += 1;
                debug!("dropping malformed {symbol} transfer {:?}: {reason}", tx.hash);
            }
        }
    }
    Ok((records, dropped))
}
