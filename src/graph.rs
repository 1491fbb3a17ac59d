use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Direction, Ledger, TokenSpec};

/// Qualitative 12-color palette (Set3) cycled over the configured token
/// list for node and edge coloring.
const TOKEN_PALETTE: [&str; 12] = [
    "rgb(141,211,199)",
    "rgb(255,255,179)",
    "rgb(190,186,218)",
    "rgb(251,128,114)",
    "rgb(128,177,211)",
    "rgb(253,180,98)",
    "rgb(179,222,105)",
    "rgb(252,205,229)",
    "rgb(217,217,217)",
    "rgb(188,128,189)",
    "rgb(204,235,197)",
    "rgb(255,237,111)",
];

/// Neutral gray for tokens that appear in the ledger but not in the
/// configured token list.
const FALLBACK_COLOR: &str = "rgb(217,217,217)";

/// Default minimum absolute USD value for a transfer to enter the graph.
pub const DEFAULT_MIN_USD: Decimal = Decimal::ONE_HUNDRED;

/// The side of a flow a node stands for: the subject wallet itself, or a
/// shortened counterparty address. Keeping the two apart structurally means
/// no counterparty string can ever collide with the wallet node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Party {
    User,
    Counterparty(String),
}

/// Node identity: one node per (token, party) pair. Counterparties hold the
/// shortened address form, so distinct addresses sharing a shortened form
/// merge into one node and their edge values add up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    token: String,
    party: Party,
}

impl NodeKey {
    fn label(&self) -> String {
        match &self.party {
            Party::User => format!("{} USER", self.token),
            Party::Counterparty(short) => format!("{} {}", self.token, short),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub label: String,
    pub color: String,
}

/// Directed edge between node indices. `value` is the summed USD value of
/// the underlying transfers, saturated at the `Decimal` range boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowEdge {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub color: String,
}

/// Aggregated flow graph. Node and edge order is first appearance while
/// walking the ledger, so identical ledgers produce identical graphs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

/// Shorten a hex address for display: first 6 chars, ellipsis, last 4.
/// Strings of 12 chars or fewer pass through unchanged.
pub fn shorten_address(addr: &str) -> String {
    if addr.len() > 12 && addr.is_ascii() {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    } else {
        addr.to_string()
    }
}

fn intern(index: &mut HashMap<NodeKey, usize>, keys: &mut Vec<NodeKey>, key: NodeKey) -> usize {
    if let Some(&i) = index.get(&key) {
        return i;
    }
    let i = keys.len();
    index.insert(key.clone(), i);
    keys.push(key);
    i
}

/// Build the flow graph for a ledger. Transfers whose absolute USD value is
/// below `min_usd` are skipped; transfers exactly at the threshold stay in.
/// Inflows run counterparty -> wallet, outflows wallet -> counterparty, and
/// repeated (source, target) pairs collapse into one edge with summed value.
pub fn build_flow_graph(ledger: &Ledger, min_usd: Decimal, tokens: &[TokenSpec]) -> FlowGraph {
    let palette: HashMap<&str, &str> = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| (t.symbol.as_str(), TOKEN_PALETTE[i % TOKEN_PALETTE.len()]))
        .collect();
    let color_of = |token: &str| palette.get(token).copied().unwrap_or(FALLBACK_COLOR);

    let mut node_index: HashMap<NodeKey, usize> = HashMap::new();
    let mut node_keys: Vec<NodeKey> = Vec::new();
    let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();
    let mut edge_sums: Vec<(usize, usize, Decimal)> = Vec::new();

    for record in ledger.records() {
        if record.usd_value.abs() < min_usd {
            continue;
        }

        let wallet = NodeKey {
            token: record.token.clone(),
            party: Party::User,
        };
        let other = NodeKey {
            token: record.token.clone(),
            party: Party::Counterparty(shorten_address(&record.counterparty)),
        };

        let (source, target) = match record.direction {
            Direction::Inflow => (other, wallet),
            Direction::Outflow => (wallet, other),
        };
        let source = intern(&mut node_index, &mut node_keys, source);
        let target = intern(&mut node_index, &mut node_keys, target);

        match edge_index.get(&(source, target)) {
            Some(&i) => edge_sums[i].2 = edge_sums[i].2.saturating_add(record.usd_value),
            None => {
                edge_index.insert((source, target), edge_sums.len());
                edge_sums.push((source, target, record.usd_value));
            }
        }
    }

    let nodes = node_keys
        .iter()
        .map(|key| FlowNode {
            label: key.label(),
            color: color_of(&key.token).to_string(),
        })
        .collect();
    let edges = edge_sums
        .iter()
        .map(|&(source, target, value)| FlowEdge {
            source,
            target,
            value: value.to_f64().unwrap_or(0.0),
            color: color_of(&node_keys[source].token).to_string(),
        })
        .collect();

    FlowGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlowRecord;
    use alloy::primitives::Address;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    fn record(token: &str, direction: Direction, counterparty: &str, usd: &str) -> FlowRecord {
        let amount = Decimal::from_str(usd).unwrap();
        FlowRecord {
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            hash: "0xabc".to_string(),
            from: counterparty.to_string(),
            to: counterparty.to_string(),
            amount,
            usd_value: amount,
            token: token.to_string(),
            direction,
            counterparty: counterparty.to_string(),
        }
    }

    fn tokens(symbols: &[&str]) -> Vec<TokenSpec> {
        symbols
            .iter()
            .map(|s| TokenSpec {
                symbol: s.to_string(),
                contract: Address::ZERO,
                usd_price: Decimal::ONE,
            })
            .collect()
    }

    #[test]
    fn shortens_long_addresses_only() {
        assert_eq!(shorten_address(ALICE), "0x1111...1111");
        assert_eq!(shorten_address("0xdeadbeef"), "0xdeadbeef");
        assert_eq!(shorten_address(""), "");
    }

    #[test]
    fn inflow_points_at_the_wallet() {
        let ledger = Ledger::from(vec![record("CRV", Direction::Inflow, ALICE, "500")]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].label, "CRV 0x1111...1111");
        assert_eq!(graph.nodes[1].label, "CRV USER");
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, 0);
        assert_eq!(graph.edges[0].target, 1);
        assert_eq!(graph.edges[0].value, 500.0);
    }

    #[test]
    fn outflow_points_away_from_the_wallet() {
        let ledger = Ledger::from(vec![record("CRV", Direction::Outflow, BOB, "250")]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));

        assert_eq!(graph.nodes[0].label, "CRV USER");
        assert_eq!(graph.nodes[1].label, "CRV 0x2222...2222");
        assert_eq!(graph.edges[0].source, 0);
        assert_eq!(graph.edges[0].target, 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let ledger = Ledger::from(vec![
            record("CRV", Direction::Inflow, ALICE, "100"),
            record("CRV", Direction::Inflow, BOB, "99.99"),
        ]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].value, 100.0);
    }

    #[test]
    fn repeated_pairs_collapse_into_one_edge() {
        let ledger = Ledger::from(vec![
            record("CRV", Direction::Inflow, ALICE, "500"),
            record("CRV", Direction::Inflow, ALICE, "500"),
        ]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].value, 1000.0);
    }

    #[test]
    fn edge_sums_saturate_instead_of_panicking() {
        let max = Decimal::MAX.to_string();
        let ledger = Ledger::from(vec![
            record("CRV", Direction::Inflow, ALICE, &max),
            record("CRV", Direction::Inflow, ALICE, &max),
        ]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].value, Decimal::MAX.to_f64().unwrap());
    }

    #[test]
    fn same_counterparty_in_both_directions_keeps_two_edges() {
        let ledger = Ledger::from(vec![
            record("CRV", Direction::Inflow, ALICE, "500"),
            record("CRV", Direction::Outflow, ALICE, "200"),
        ]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].value, 500.0);
        assert_eq!(graph.edges[1].value, 200.0);
    }

    #[test]
    fn tokens_color_by_declaration_index() {
        let ledger = Ledger::from(vec![
            record("WETH", Direction::Inflow, ALICE, "500"),
            record("CRV", Direction::Inflow, ALICE, "500"),
        ]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV", "WETH"]));

        // WETH is second in the token list even though it appears first
        assert_eq!(graph.nodes[0].color, TOKEN_PALETTE[1]);
        assert_eq!(graph.nodes[1].color, TOKEN_PALETTE[1]);
        assert_eq!(graph.nodes[2].color, TOKEN_PALETTE[0]);
        assert_eq!(graph.edges[0].color, TOKEN_PALETTE[1]);
        assert_eq!(graph.edges[1].color, TOKEN_PALETTE[0]);
    }

    #[test]
    fn unknown_token_gets_fallback_color() {
        let ledger = Ledger::from(vec![record("MYSTERY", Direction::Inflow, ALICE, "500")]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));
        assert_eq!(graph.nodes[0].color, FALLBACK_COLOR);
    }

    #[test]
    fn shortened_collisions_merge_nodes() {
        // same first 6 and last 4 chars, different middles
        let a = "0x123456aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa9999";
        let b = "0x123456bbbbbbbbbbbbbbbbbbbbbbbbbbbbbb9999";
        let ledger = Ledger::from(vec![
            record("CRV", Direction::Inflow, a, "500"),
            record("CRV", Direction::Inflow, b, "300"),
        ]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].value, 800.0);
    }

    #[test]
    fn same_counterparty_different_tokens_stay_separate() {
        let ledger = Ledger::from(vec![
            record("CRV", Direction::Inflow, ALICE, "500"),
            record("WETH", Direction::Inflow, ALICE, "500"),
        ]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV", "WETH"]));
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn everything_below_threshold_yields_empty_graph() {
        let ledger = Ledger::from(vec![record("CRV", Direction::Inflow, ALICE, "5")]);
        let graph = build_flow_graph(&ledger, DEFAULT_MIN_USD, &tokens(&["CRV"]));
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn zero_threshold_keeps_everything() {
        let ledger = Ledger::from(vec![record("CRV", Direction::Inflow, ALICE, "0.01")]);
        let graph = build_flow_graph(&ledger, Decimal::ZERO, &tokens(&["CRV"]));
        assert_eq!(graph.edges.len(), 1);
    }
}
