//! WebSocket subscription example.
//!
//! Connects to the spot public channels, subscribes to tickers and trades and
//! prints what arrives. Type `unsub` to drop the ticker subscription or `quit`
//! to stop.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example websocket
//!
//! # Other symbols or endpoint:
//! SYMBOLS=BTC-USDT,SOL-USDT API_ENDPOINT=https://api.kucoin.com cargo run --example websocket
//! ```

use kucoin_rust_sdk::{ClientOption, GLOBAL_API_ENDPOINT, KlineInterval, KucoinClient, WebsocketConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kucoin_rust_sdk=debug".into()),
        )
        .init();

    let api_endpoint =
        std::env::var("API_ENDPOINT").unwrap_or_else(|_| GLOBAL_API_ENDPOINT.to_string());
    let symbols: Vec<String> = std::env::var("SYMBOLS")
        .unwrap_or_else(|_| "BTC-USDT,ETH-USDT".to_string())
        .split(',')
        .map(str::to_string)
        .collect();

    let client = KucoinClient::new(ClientOption {
        spot_endpoint: api_endpoint.clone(),
        websocket: WebsocketConfig::default()
            .with_event_callback(|event, detail| println!("[event] {event:?} {detail}")),
        ..ClientOption::default()
    })?;

    println!("Connecting to {api_endpoint}...");
    let ws = client.new_spot_public_ws();
    ws.start().await?;
    println!("Connected to WebSocket");

    let ticker_id = ws
        .ticker(symbols.clone(), |_, subject, ticker| {
            println!(
                "ticker {subject}: bid {} ask {}",
                ticker.best_bid.unwrap_or_default(),
                ticker.best_ask.unwrap_or_default()
            );
            Ok(())
        })
        .await?;

    ws.trade(symbols.clone(), |topic, _, trade| {
        println!(
            "trade {topic}: {} {} @ {}",
            trade.side.unwrap_or_default(),
            trade.size.unwrap_or_default(),
            trade.price.unwrap_or_default()
        );
        Ok(())
    })
    .await?;

    if let Some(first) = symbols.first() {
        ws.klines(first, KlineInterval::M1, |_, _, kline| {
            println!("kline {}: {:?}", kline.symbol.unwrap_or_default(), kline.candles);
            Ok(())
        })
        .await?;
    }
    println!("Subscribed to topics");

    println!("\nReceiving messages (type unsub or quit):\n");
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        tokio::select! {
            read = reader.read_line(&mut line) => {
                if read? == 0 {
                    break;
                }
                match line.trim() {
                    "unsub" => {
                        let removed = ws.unsubscribe(ticker_id).await?;
                        println!("Ticker unsubscribed: {removed}");
                    }
                    "quit" => break,
                    x => println!("Got unknown input {x}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    ws.stop().await?;
    println!("Stopped");
    Ok(())
}
