//! Spot public channels: tickers, trades, candles and order books.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::SDKResult;
use crate::de::{levels, opt_bool, opt_i64, opt_string, string_vec};
use crate::errors::WSErrors;
use crate::ws::subscriber::CallbackResult;
use crate::ws::topics::{KlineInterval, Topic, prefix};
use crate::ws::{SubscriptionId, WsService};

/// Best bid/ask and last trade of one symbol.
///
/// On `/market/ticker:all` the symbol arrives in the frame subject.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TickerEvent {
    #[serde(default, deserialize_with = "opt_string")]
    pub sequence: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_ask: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_ask_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_bid: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_bid_size: Option<String>,
    /// Milliseconds since epoch.
    #[serde(default, alias = "Time", deserialize_with = "opt_i64")]
    pub time: Option<i64>,
}

/// Alias kept for the `all_tickers` channel, which shares the ticker payload.
pub type AllTickersEvent = TickerEvent;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    #[serde(default, deserialize_with = "opt_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub sequence: Option<String>,
    pub side: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    pub trade_id: Option<String>,
    pub taker_order_id: Option<String>,
    pub maker_order_id: Option<String>,
    /// Nanoseconds since epoch.
    #[serde(default, deserialize_with = "opt_i64")]
    pub time: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// One candle: `[start, open, close, high, low, volume, turnover]`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KlinesEvent {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "string_vec")]
    pub candles: Vec<String>,
    /// Nanoseconds since epoch.
    #[serde(default, deserialize_with = "opt_i64")]
    pub time: Option<i64>,
}

/// `[price, size, sequence]` rows per side.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OrderbookChanges {
    #[serde(default, deserialize_with = "levels")]
    pub asks: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "levels")]
    pub bids: Vec<Vec<String>>,
}

/// Incremental order book update. Apply to a REST snapshot by sequence.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookIncrementEvent {
    #[serde(default)]
    pub changes: OrderbookChanges,
    #[serde(default, deserialize_with = "opt_i64")]
    pub sequence_start: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub sequence_end: Option<i64>,
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub time: Option<i64>,
}

/// Best level only: `[price, size]` per side.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookLevel1Event {
    #[serde(default, deserialize_with = "string_vec")]
    pub asks: Vec<String>,
    #[serde(default, deserialize_with = "string_vec")]
    pub bids: Vec<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

/// Top-N depth snapshot, `[price, size]` rows. Shared by the 5, 50 and call
/// auction depth channels.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookDepthEvent {
    #[serde(default, deserialize_with = "levels")]
    pub asks: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "levels")]
    pub bids: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

pub type OrderbookLevel5Event = OrderbookDepthEvent;
pub type OrderbookLevel50Event = OrderbookDepthEvent;
pub type CallAuctionOrderbookLevel50Event = OrderbookDepthEvent;

/// 24h market statistics of one symbol.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    pub symbol: Option<String>,
    pub symbol_code: Option<String>,
    #[serde(default, deserialize_with = "opt_bool")]
    pub trading: Option<bool>,
    pub base_currency: Option<String>,
    pub quote_currency: Option<String>,
    pub market: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub last_traded_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub buy: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub sell: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub high: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub low: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub open: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub close: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub vol: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub vol_value: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub change_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub change_rate: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub average_price: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub board: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub mark: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub datetime: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEvent {
    #[serde(default, deserialize_with = "opt_string")]
    pub sequence: Option<String>,
    pub data: Option<SnapshotData>,
}

pub type MarketSnapshotEvent = SnapshotEvent;
pub type SymbolSnapshotEvent = SnapshotEvent;

/// Estimated match of a symbol in call auction.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallAuctionInfoEvent {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub estimated_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub estimated_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub sell_order_range_low_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub sell_order_range_high_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub buy_order_range_low_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub buy_order_range_high_price: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub time: Option<i64>,
}

/// Spot public market data over one connection.
///
/// Derefs to [`WsService`] for `start`, `stop` and `unsubscribe`.
pub struct SpotPublicWs {
    service: WsService,
}

impl SpotPublicWs {
    pub fn new(service: WsService) -> Self {
        Self { service }
    }

    /// Tickers of every symbol; the symbol is the frame subject.
    pub async fn all_tickers<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, AllTickersEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::all(prefix::SPOT_TICKER), callback)
            .await
    }

    /// Tickers of the given symbols.
    ///
    /// ```no_run
    /// # use kucoin_rust_sdk::spot::SpotPublicWs;
    /// # async fn example(ws: &SpotPublicWs) -> Result<(), Box<dyn std::error::Error>> {
    /// let id = ws
    ///     .ticker(["BTC-USDT", "ETH-USDT"], |topic, _subject, event| {
    ///         println!("{topic}: {:?}/{:?}", event.best_bid, event.best_ask);
    ///         Ok(())
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ticker<I, S, F>(&self, symbols: I, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, TickerEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::SPOT_TICKER, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn trade<I, S, F>(&self, symbols: I, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, TradeEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::SPOT_TRADE, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn klines<F>(
        &self,
        symbol: &str,
        interval: KlineInterval,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, KlinesEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::kline(prefix::SPOT_KLINES, symbol, interval)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn orderbook_increment<I, S, F>(
        &self,
        symbols: I,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, OrderbookIncrementEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::SPOT_ORDERBOOK_INCREMENT, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn orderbook_level1<I, S, F>(
        &self,
        symbols: I,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, OrderbookLevel1Event) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::SPOT_ORDERBOOK_LEVEL1, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn orderbook_level5<I, S, F>(
        &self,
        symbols: I,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, OrderbookLevel5Event) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::SPOT_ORDERBOOK_LEVEL5, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn orderbook_level50<I, S, F>(
        &self,
        symbols: I,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, OrderbookLevel50Event) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::SPOT_ORDERBOOK_LEVEL50, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }

    /// Snapshots of every symbol of a market, e.g. `"USDS"` or `"BTC"`.
    pub async fn market_snapshot<F>(
        &self,
        market: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, MarketSnapshotEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::SPOT_SNAPSHOT, market)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn symbol_snapshot<F>(
        &self,
        symbol: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, SymbolSnapshotEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::SPOT_SNAPSHOT, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn call_auction_info<F>(
        &self,
        symbol: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, CallAuctionInfoEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::SPOT_CALL_AUCTION_INFO, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn call_auction_orderbook_level50<F>(
        &self,
        symbol: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, CallAuctionOrderbookLevel50Event) -> CallbackResult
            + Send
            + Sync
            + 'static,
    {
        let topic = Topic::with_symbol(prefix::SPOT_CALL_AUCTION_LEVEL50, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }
}

impl Deref for SpotPublicWs {
    type Target = WsService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticker_event() {
        let event: TickerEvent = serde_json::from_value(json!({
            "sequence": "1545896668986",
            "price": "0.08",
            "size": "0.011",
            "bestAsk": "0.08",
            "bestAskSize": "0.18",
            "bestBid": "0.049",
            "bestBidSize": "0.036",
            "Time": 1704873323416_i64
        }))
        .unwrap();

        assert_eq!(event.best_ask.as_deref(), Some("0.08"));
        assert_eq!(event.best_bid.as_deref(), Some("0.049"));
        assert_eq!(event.time, Some(1704873323416));
    }

    #[test]
    fn test_orderbook_increment_event() {
        let event: OrderbookIncrementEvent = serde_json::from_value(json!({
            "changes": {
                "asks": [["18906", "0.00331", "14103845"]],
                "bids": []
            },
            "sequenceEnd": 14103845,
            "sequenceStart": 14103844,
            "symbol": "BTC-USDT",
            "time": 1663747970273_i64
        }))
        .unwrap();

        assert_eq!(event.changes.asks, vec![vec!["18906", "0.00331", "14103845"]]);
        assert!(event.changes.bids.is_empty());
        assert_eq!(event.sequence_end, Some(14103845));
    }

    #[test]
    fn test_market_snapshot_event() {
        let event: MarketSnapshotEvent = serde_json::from_value(json!({
            "sequence": "1545896669291",
            "data": {
                "trading": true,
                "symbol": "KCS-BTC",
                "buy": 0.00011,
                "sell": 0.00012,
                "lastTradedPrice": "0.00011",
                "datetime": 1548388122031_i64
            }
        }))
        .unwrap();

        let data = event.data.unwrap();
        assert_eq!(data.symbol.as_deref(), Some("KCS-BTC"));
        assert_eq!(data.buy.as_deref(), Some("0.00011"));
        assert_eq!(data.trading, Some(true));
    }

    #[test]
    fn test_level1_event() {
        let event: OrderbookLevel1Event = serde_json::from_value(json!({
            "asks": ["9989", "8"],
            "bids": ["9984", "10"],
            "timestamp": 1586948108193_i64
        }))
        .unwrap();
        assert_eq!(event.asks, vec!["9989", "8"]);
    }
}
