use std::time::Duration;
use tracing::{info, warn};

use token_flow::analyzer::FlowAnalyzer;
use token_flow::config;
use token_flow::explorer::ExplorerClient;
use token_flow::render;
use token_flow::summary;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Token flow analyzer starting...");

    let cfg = config::load()?;
    info!("  Explorer API: {}", cfg.api_url);
    info!("  Wallet: {}", cfg.subject);
    info!(
        "  Tokens tracked: {:?}",
        cfg.tokens.iter().map(|t| t.symbol.as_str()).collect::<Vec<_>>()
    );
    info!("  Min USD for graph: {}", cfg.min_usd);

    let client = ExplorerClient::new(&cfg.api_url, &cfg.api_key)?
        .with_paging(cfg.page_size, Duration::from_millis(cfg.page_delay_ms));

    let mut analyzer = FlowAnalyzer::new(client);
    analyzer.set_tokens(cfg.tokens.clone());

    let report = analyzer.analyze(cfg.subject).await?;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(tally) => info!(
                "{}: {} records kept, {} dropped",
                outcome.symbol, tally.recorded, tally.dropped
            ),
            Err(e) => warn!("{} skipped: {}", outcome.symbol, e),
        }
    }
    if report.ledger.is_empty() {
        warn!("No transfer activity found for {}", cfg.subject);
    }

    let (summary_table, net_flows) = summary::summarize(&report.ledger);
    println!("\nFlow summary:");
    println!("{summary_table}");
    println!("Net flows:");
    println!("{net_flows}");

    let graph = analyzer.build_flow_graph(&report.ledger, cfg.min_usd);
    render::write_sankey(&graph, &cfg.sankey_out)?;

    info!("Token flow analyzer finished.");
    Ok(())
}
