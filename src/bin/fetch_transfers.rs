use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "timeStamp", default)]
    timestamp: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(rename = "tokenSymbol", default)]
    token_symbol: String,
}

const API_URL: &str = "https://api.etherscan.io/api";
const CRV_TOKEN: &str = "0x331b9182088e2a7d6d3fe4742aba1fb231aecc56";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let wallet = match std::env::args().nth(1) {
        Some(w) => w,
        None => {
            eprintln!("usage: fetch_transfers <wallet> [token-contract]");
            return Ok(());
        }
    };
    let contract = std::env::args().nth(2).unwrap_or_else(|| CRV_TOKEN.to_string());
    let api_key = std::env::var("EXPLORER_API_KEY").unwrap_or_default();

    let client = Client::new();
    println!("Fetching latest token transfers for {wallet}...");

    let envelope: Envelope = client
        .get(API_URL)
        .query(&[
            ("module", "account"),
            ("action", "tokentx"),
            ("address", wallet.as_str()),
            ("contractaddress", contract.as_str()),
            ("page", "1"),
            ("offset", "5"),
            ("sort", "desc"),
            ("apikey", api_key.as_str()),
        ])
        .send()
        .await?
        .json()
        .await?;

    if envelope.status != "1" {
        eprintln!("Explorer error: {} ({})", envelope.message, envelope.result);
        return Ok(());
    }

    let rows: Vec<Row> = serde_json::from_value(envelope.result)?;
    println!("Fetched {} transfers", rows.len());
    for row in rows.iter().take(5) {
        println!(
            "Tx: {} | Time: {} | From: {} | To: {} | Value: {} {}",
            row.hash, row.timestamp, row.from, row.to, row.value, row.token_symbol
        );
    }

    Ok(())
}
