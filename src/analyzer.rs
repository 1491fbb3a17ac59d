use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::FlowError;
use crate::explorer::TransferSource;
use crate::graph::{build_flow_graph, FlowGraph};
use crate::ledger::build_token_ledger;
use crate::models::{Ledger, TokenSpec};

/// Record counts for one analyzed token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTally {
    /// Raw transfers returned by the source.
    pub fetched: usize,
    /// Normalized records appended to the ledger.
    pub recorded: usize,
    /// Malformed transfers dropped during normalization.
    pub dropped: usize,
}

/// What happened to one token during a run: its tally, or the error that
/// made the analyzer skip it.
#[derive(Debug)]
pub struct TokenOutcome {
    pub symbol: String,
    pub result: Result<TokenTally, FlowError>,
}

/// The combined ledger plus one outcome per tracked token, in token
/// declaration order.
#[derive(Debug)]
pub struct AnalysisReport {
    pub ledger: Ledger,
    pub outcomes: Vec<TokenOutcome>,
}

impl AnalysisReport {
    /// Total malformed records dropped across all tokens.
    pub fn dropped_records(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|t| t.dropped)
            .sum()
    }

    /// Symbols of tokens that failed outright.
    pub fn failed_tokens(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.symbol.as_str())
            .collect()
    }
}

/// Token list plus the price table derived from it. Swapped as one value so
/// the two can never disagree.
#[derive(Debug, Clone, Default)]
struct TokenBook {
    tokens: Vec<TokenSpec>,
    prices: HashMap<String, Decimal>,
}

impl TokenBook {
    fn new(tokens: Vec<TokenSpec>) -> Self {
        let prices = tokens
            .iter()
            .map(|t| (t.symbol.clone(), t.usd_price))
            .collect();
        Self { tokens, prices }
    }
}

/// Drives one analysis run: fetches every tracked token's transfers from
/// the source, normalizes them into a single ledger and reports per-token
/// outcomes. A failing token is skipped, never fatal to the run.
pub struct FlowAnalyzer<S> {
    source: S,
    book: TokenBook,
}

impl<S: TransferSource> FlowAnalyzer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            book: TokenBook::default(),
        }
    }

    /// Replace the tracked token list. The price table is rebuilt from the
    /// same list in the same step.
    pub fn set_tokens(&mut self, tokens: Vec<TokenSpec>) {
        self.book = TokenBook::new(tokens);
    }

    pub fn tokens(&self) -> &[TokenSpec] {
        &self.book.tokens
    }

    /// Analyze all tracked tokens for `subject`. Tokens are processed in
    /// declaration order, so the resulting ledger and report are
    /// deterministic for a given source.
    pub async fn analyze(&self, subject: Address) -> Result<AnalysisReport, FlowError> {
        if self.book.tokens.is_empty() {
            return Err(FlowError::NoTokens);
        }

        let mut ledger = Ledger::new();
        let mut outcomes = Vec::with_capacity(self.book.tokens.len());

        for token in &self.book.tokens {
            info!("Analyzing {} flows for {}", token.symbol, subject);

            let result = match self.source.fetch_token_transfers(subject, token.contract).await {
                Ok(transfers) => {
                    let fetched = transfers.len();
                    match build_token_ledger(&transfers, subject, &token.symbol, &self.book.prices)
                    {
                        Ok((records, dropped)) => {
                            info!(
                                "{}: {} transfers → {} records ({} dropped)",
                                token.symbol,
                                fetched,
                                records.len(),
                                dropped
                            );
                            let tally = TokenTally {
                                fetched,
                                recorded: records.len(),
                                dropped,
                            };
                            ledger.extend(records);
                            Ok(tally)
                        }
                        Err(e) => {
                            warn!("⚠️ Skipping {}: {}", token.symbol, e);
                            Err(e)
                        }
                    }
                }
                Err(e) => {
                    warn!("⚠️ Transfer fetch failed for {}: {}", token.symbol, e);
                    Err(FlowError::Retrieval {
                        symbol: token.symbol.clone(),
                        source: e,
                    })
                }
            };

            outcomes.push(TokenOutcome {
                symbol: token.symbol.clone(),
                result,
            });
        }

        Ok(AnalysisReport { ledger, outcomes })
    }

    /// Build the aggregated flow graph with this analyzer's token coloring.
    pub fn build_flow_graph(&self, ledger: &Ledger, min_usd: Decimal) -> FlowGraph {
        build_flow_graph(ledger, min_usd, &self.book.tokens)
    }
}
