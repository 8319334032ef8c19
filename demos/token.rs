//! Token example.
//!
//! Requests a public WebSocket token and prints the instance servers it is
//! valid for.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example token
//!
//! # Futures endpoint:
//! API_ENDPOINT=https://api-futures.kucoin.com cargo run --example token
//! ```

use kucoin_rust_sdk::GLOBAL_API_ENDPOINT;
use kucoin_rust_sdk::ws::{RestTokenProvider, WsTokenProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let api_endpoint =
        std::env::var("API_ENDPOINT").unwrap_or_else(|_| GLOBAL_API_ENDPOINT.to_string());

    let provider = RestTokenProvider::public(&api_endpoint, reqwest::Client::new());
    println!("Requesting token from {}...\n", provider.url());

    let tokens = provider.get_token().await?;
    println!("=== Instance Servers ===");
    for token in &tokens {
        println!(
            "  {} (protocol: {}, encrypt: {}, ping every {}ms, timeout {}ms)",
            token.endpoint, token.protocol, token.encrypt, token.ping_interval, token.ping_timeout
        );
    }
    if let Some(token) = tokens.first() {
        let preview: String = token.token.chars().take(16).collect();
        println!("\nToken: {preview}...");
    }

    Ok(())
}
