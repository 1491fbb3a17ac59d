//! Token flow analysis for a single wallet.
//!
//! Fetches the full ERC-20 transfer history of a wallet from an
//! Etherscan-compatible explorer, normalizes it into a ledger of directed
//! flows, and derives summary statistics, per-token net positions and a
//! Sankey-ready flow graph.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod explorer;
pub mod graph;
pub mod ledger;
pub mod models;
pub mod render;
pub mod summary;

pub use analyzer::{AnalysisReport, FlowAnalyzer, TokenOutcome, TokenTally};
pub use error::{FlowError, MalformedRecord, RetrievalError};
pub use models::{Direction, FlowRecord, Ledger, RawTransfer, TokenSpec};
