use thiserror::Error;

/// Failures raised by the block explorer retrieval layer.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The explorer answered but refused the request (rate limit, bad key, ...).
    #[error("explorer rejected the request: {0}")]
    Api(String),

    #[error("malformed explorer response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A whole-token analysis failure. One of these never aborts the run;
/// the offending token is skipped and the rest of the list proceeds.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("no USD price configured for token {0}")]
    MissingPrice(String),

    #[error("transfer retrieval failed for {symbol}: {source}")]
    Retrieval {
        symbol: String,
        #[source]
        source: RetrievalError,
    },

    #[error("token list is empty, nothing to analyze")]
    NoTokens,
}

/// Why a single raw transfer was dropped while building a ledger.
#[derive(Debug, Error)]
pub enum MalformedRecord {
    #[error("required field {0} is missing or empty")]
    MissingField(&'static str),

    #[error("unparseable timestamp {0:?}")]
    Timestamp(String),

    #[error("unparseable or out-of-range value {0:?}")]
    Value(String),

    #[error("unparseable address {0:?}")]
    Address(String),
}

/// A `SYMBOL:CONTRACT:PRICE` token entry that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid token entry {entry:?}: {reason}")]
pub struct TokenSpecError {
    pub entry: String,
    pub reason: String,
}
