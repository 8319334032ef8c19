//! Futures public channels. Every channel takes exactly one contract symbol,
//! e.g. `XBTUSDTM`.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::SDKResult;
use crate::de::{levels, opt_i64, opt_string, string_vec};
use crate::errors::WSErrors;
use crate::ws::subscriber::CallbackResult;
use crate::ws::topics::{KlineInterval, Topic, prefix};
use crate::ws::{SubscriptionId, WsService};

/// Funding settlement notices (`funding.begin`, `funding.end`).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementEvent {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub funding_time: Option<i64>,
    #[serde(default, deserialize_with = "opt_string")]
    pub funding_rate: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub sequence: Option<i64>,
    pub side: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    pub taker_order_id: Option<String>,
    pub maker_order_id: Option<String>,
    pub trade_id: Option<String>,
    /// Nanoseconds since epoch.
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

/// Mark/index price (`mark.index.price`) or funding rate (`funding.rate`),
/// told apart by the frame subject.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentEvent {
    #[serde(default, deserialize_with = "opt_i64")]
    pub granularity: Option<i64>,
    #[serde(default, deserialize_with = "opt_string")]
    pub mark_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub index_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub funding_rate: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

/// One candle: `[start, open, close, high, low, volume, turnover]`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KlinesEvent {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "string_vec")]
    pub candles: Vec<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub time: Option<i64>,
}

/// Incremental update; `change` is `"price,side,size"`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookIncrementEvent {
    #[serde(default, deserialize_with = "opt_i64")]
    pub sequence: Option<i64>,
    pub change: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

impl OrderbookIncrementEvent {
    /// Split `change` into `(price, side, size)`.
    pub fn parsed_change(&self) -> Option<(&str, &str, &str)> {
        let mut parts = self.change.as_deref()?.splitn(3, ',');
        Some((parts.next()?, parts.next()?, parts.next()?))
    }
}

/// Top-N depth snapshot with `[price, size]` rows.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookDepthEvent {
    #[serde(default, deserialize_with = "levels")]
    pub asks: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "levels")]
    pub bids: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub sequence: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

pub type OrderbookLevel5Event = OrderbookDepthEvent;
pub type OrderbookLevel50Event = OrderbookDepthEvent;

/// 24h statistics of one contract.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSnapshotEvent {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub high_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub last_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub low_price: Option<String>,
    #[serde(
        default,
        rename = "price24HoursBefore",
        deserialize_with = "opt_string"
    )]
    pub price_24_hours_before: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price_chg: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price_chg_pct: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub turnover: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub volume: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TickerV1Event {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub sequence: Option<i64>,
    pub side: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_bid_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_bid_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_ask_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_ask_size: Option<String>,
    pub trade_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

/// Best bid/ask only; cheaper than [`TickerV1Event`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TickerV2Event {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub sequence: Option<i64>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_bid_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_bid_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_ask_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub best_ask_size: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

/// Futures public market data over one connection.
pub struct FuturesPublicWs {
    service: WsService,
}

impl FuturesPublicWs {
    pub fn new(service: WsService) -> Self {
        Self { service }
    }

    pub async fn announcement<F>(&self, symbol: &str, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, AnnouncementEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_ANNOUNCEMENT, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn execution<F>(&self, symbol: &str, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, ExecutionEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_EXECUTION, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn instrument<F>(&self, symbol: &str, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, InstrumentEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_INSTRUMENT, symbol)?;
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
        let topic = Topic::kline(prefix::FUTURES_KLINES, symbol, interval)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn orderbook_increment<F>(
        &self,
        symbol: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, OrderbookIncrementEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_ORDERBOOK_INCREMENT, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn orderbook_level5<F>(
        &self,
        symbol: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, OrderbookLevel5Event) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_ORDERBOOK_LEVEL5, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn orderbook_level50<F>(
        &self,
        symbol: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, OrderbookLevel50Event) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_ORDERBOOK_LEVEL50, symbol)?;
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
        let topic = Topic::with_symbol(prefix::FUTURES_SNAPSHOT, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn ticker_v1<F>(&self, symbol: &str, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, TickerV1Event) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_TICKER_V1, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn ticker_v2<F>(&self, symbol: &str, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, TickerV2Event) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_TICKER_V2, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }
}

impl Deref for FuturesPublicWs {
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
    fn test_execution_event() {
        let event: ExecutionEvent = serde_json::from_value(json!({
            "symbol": "XBTUSDTM",
            "sequence": 1794100537695_i64,
            "side": "buy",
            "size": 2,
            "price": "90503.9",
            "takerOrderId": "247822202957807616",
            "makerOrderId": "247822167163555840",
            "tradeId": "1794100537695",
            "ts": 1731898619520000000_i64
        }))
        .unwrap();

        assert_eq!(event.size.as_deref(), Some("2"));
        assert_eq!(event.price.as_deref(), Some("90503.9"));
        assert_eq!(event.sequence, Some(1794100537695));
    }

    #[test]
    fn test_depth_event_with_numeric_sizes() {
        let event: OrderbookLevel50Event = serde_json::from_value(json!({
            "bids": [["89778.6", 1534], ["89778.2", 54]],
            "sequence": 1709294490099_i64,
            "timestamp": 1731680249700_i64,
            "ts": 1731680249700_i64,
            "asks": [["89778.7", 854], ["89779.2", 4]]
        }))
        .unwrap();

        assert_eq!(event.bids[0], vec!["89778.6", "1534"]);
        assert_eq!(event.asks.len(), 2);
    }

    #[test]
    fn test_increment_change() {
        let event: OrderbookIncrementEvent = serde_json::from_value(json!({
            "sequence": 1709400450243_i64,
            "change": "90631.2,sell,2",
            "timestamp": 1731897467182_i64
        }))
        .unwrap();
        assert_eq!(event.parsed_change(), Some(("90631.2", "sell", "2")));
    }

    #[test]
    fn test_snapshot_event() {
        let event: SymbolSnapshotEvent = serde_json::from_value(json!({
            "highPrice": 91512.8,
            "lastPrice": 90326.7,
            "lowPrice": 88747.8,
            "price24HoursBefore": 89880.4,
            "priceChg": 446.3,
            "priceChgPct": 0.0049,
            "symbol": "XBTUSDTM",
            "ts": 1731900415023929239_i64,
            "turnover": 526928331.0482178,
            "volume": 5834.46
        }))
        .unwrap();

        assert_eq!(event.price_24_hours_before.as_deref(), Some("89880.4"));
        assert_eq!(event.last_price.as_deref(), Some("90326.7"));
    }

    #[test]
    fn test_instrument_event() {
        let event: InstrumentEvent = serde_json::from_value(json!({
            "markPrice": 90445.02,
            "indexPrice": 90445.02,
            "granularity": 1000,
            "timestamp": 1731899129000_i64
        }))
        .unwrap();
        assert_eq!(event.mark_price.as_deref(), Some("90445.02"));
        assert!(event.funding_rate.is_none());
    }
}
