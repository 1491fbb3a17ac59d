use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::models::{Direction, Ledger};

/// Descriptive statistics for one (token, direction) partition. All values
/// are rounded to 2 decimal places, half to even. Sums saturate at the
/// `Decimal` range boundary. `std` is the sample standard deviation and is
/// `None` for singleton partitions or when its squared deviations leave the
/// representable range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowStats {
    pub token: String,
    pub direction: Direction,
    pub count: usize,
    pub sum: Decimal,
    pub mean: Decimal,
    pub median: Decimal,
    pub std: Option<Decimal>,
    pub usd_sum: Decimal,
    pub usd_mean: Decimal,
    pub usd_median: Decimal,
    pub usd_std: Option<Decimal>,
}

/// Per-token, per-direction statistics in deterministic order: tokens by
/// first appearance in the ledger, inflow row before outflow row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTable {
    rows: Vec<FlowStats>,
}

impl SummaryTable {
    pub fn rows(&self) -> &[FlowStats] {
        &self.rows
    }

    pub fn get(&self, token: &str, direction: Direction) -> Option<&FlowStats> {
        self.rows
            .iter()
            .find(|r| r.token == token && r.direction == direction)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Net position for one token: inflows minus outflows, with a missing side
/// treated as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetFlow {
    pub token: String,
    pub net_amount: Decimal,
    pub net_usd: Decimal,
}

/// One net flow row per token present in the ledger, in first-appearance
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetFlowTable {
    rows: Vec<NetFlow>,
}

impl NetFlowTable {
    pub fn rows(&self) -> &[NetFlow] {
        &self.rows
    }

    pub fn get(&self, token: &str) -> Option<&NetFlow> {
        self.rows.iter().find(|r| r.token == token)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct Descriptive {
    count: usize,
    sum: Decimal,
    mean: Decimal,
    median: Decimal,
    std: Option<Decimal>,
}

fn describe(values: &[Decimal]) -> Descriptive {
    let count = values.len();
    if count == 0 {
        return Descriptive {
            count: 0,
            sum: Decimal::ZERO,
            mean: Decimal::ZERO,
            median: Decimal::ZERO,
            std: None,
        };
    }
    let sum = values
        .iter()
        .fold(Decimal::ZERO, |acc, value| acc.saturating_add(*value));
    let mean = sum / Decimal::from(count as u64);
    Descriptive {
        count,
        sum,
        mean,
        median: median(values),
        std: sample_std(values, mean),
    }
}

fn median(values: &[Decimal]) -> Decimal {
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        match sorted[mid - 1].checked_add(sorted[mid]) {
            Some(total) => total / Decimal::TWO,
            // the pair sums past the range boundary; halve first
            None => (sorted[mid - 1] / Decimal::TWO).saturating_add(sorted[mid] / Decimal::TWO),
        }
    }
}

/// Sample standard deviation (n - 1 denominator). `None` below two samples,
/// and `None` when a squared deviation overflows `Decimal`.
fn sample_std(values: &[Decimal], mean: Decimal) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let mut sum_sq = Decimal::ZERO;
    for value in values {
        let d = value.checked_sub(mean)?;
        sum_sq = sum_sq.checked_add(d.checked_mul(d)?)?;
    }
    let variance = sum_sq / Decimal::from((values.len() - 1) as u64);
    variance.sqrt()
}

const DISPLAY_DP: u32 = 2;

/// Aggregate a ledger into the summary and net flow tables. Pure, total and
/// deterministic: the same ledger always produces the same tables, and
/// aggregates that leave the `Decimal` range saturate instead of panicking.
pub fn summarize(ledger: &Ledger) -> (SummaryTable, NetFlowTable) {
    let mut token_order: Vec<String> = Vec::new();
    let mut groups: HashMap<(String, Direction), (Vec<Decimal>, Vec<Decimal>)> = HashMap::new();

    for record in ledger.records() {
        if !token_order.contains(&record.token) {
            token_order.push(record.token.clone());
        }
        let entry = groups
            .entry((record.token.clone(), record.direction))
            .or_default();
        entry.0.push(record.amount);
        entry.1.push(record.usd_value);
    }

    let mut rows = Vec::new();
    let mut nets = Vec::new();

    for token in &token_order {
        let mut net_amount = Decimal::ZERO;
        let mut net_usd = Decimal::ZERO;

        for direction in [Direction::Inflow, Direction::Outflow] {
            let Some((amounts, usd)) = groups.get(&(token.clone(), direction)) else {
                continue;
            };
            let native = describe(amounts);
            let dollars = describe(usd);

            match direction {
                Direction::Inflow => {
                    net_amount = net_amount.saturating_add(native.sum);
                    net_usd = net_usd.saturating_add(dollars.sum);
                }
                Direction::Outflow => {
                    net_amount = net_amount.saturating_sub(native.sum);
                    net_usd = net_usd.saturating_sub(dollars.sum);
                }
            }

            rows.push(FlowStats {
                token: token.clone(),
                direction,
                count: native.count,
                sum: native.sum.round_dp(DISPLAY_DP),
                mean: native.mean.round_dp(DISPLAY_DP),
                median: native.median.round_dp(DISPLAY_DP),
                std: native.std.map(|s| s.round_dp(DISPLAY_DP)),
                usd_sum: dollars.sum.round_dp(DISPLAY_DP),
                usd_mean: dollars.mean.round_dp(DISPLAY_DP),
                usd_median: dollars.median.round_dp(DISPLAY_DP),
                usd_std: dollars.std.map(|s| s.round_dp(DISPLAY_DP)),
            });
        }

        nets.push(NetFlow {
            token: token.clone(),
            net_amount: net_amount.round_dp(DISPLAY_DP),
            net_usd: net_usd.round_dp(DISPLAY_DP),
        });
    }

    (SummaryTable { rows }, NetFlowTable { rows: nets })
}

fn cell(value: Decimal) -> String {
    format!("{value:.2}")
}

fn opt_cell(value: Option<Decimal>) -> String {
    value.map(cell).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return writeln!(f, "(no flows)");
        }
        writeln!(
            f,
            "{:<8} {:<8} {:>6} {:>14} {:>12} {:>12} {:>12} {:>14} {:>12} {:>12} {:>12}",
            "token",
            "dir",
            "count",
            "sum",
            "mean",
            "median",
            "std",
            "usd_sum",
            "usd_mean",
            "usd_median",
            "usd_std"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<8} {:<8} {:>6} {:>14} {:>12} {:>12} {:>12} {:>14} {:>12} {:>12} {:>12}",
                row.token,
                row.direction,
                row.count,
                cell(row.sum),
                cell(row.mean),
                cell(row.median),
                opt_cell(row.std),
                cell(row.usd_sum),
                cell(row.usd_mean),
                cell(row.usd_median),
                opt_cell(row.usd_std)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for NetFlowTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return writeln!(f, "(no flows)");
        }
        writeln!(f, "{:<8} {:>14} {:>14}", "token", "net_amount", "net_usd")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<8} {:>14} {:>14}",
                row.token,
                cell(row.net_amount),
                cell(row.net_usd)
            )?;
        }
        Ok(())
    }
}
