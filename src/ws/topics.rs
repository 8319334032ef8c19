//! Strongly-typed WebSocket subscription topics.
//!
//! A KuCoin topic is a prefix optionally followed by `:` and a comma separated
//! argument list, e.g. `/market/ticker:BTC-USDT,ETH-USDT`. Data frames always
//! carry a single argument (`/market/ticker:BTC-USDT`), so a subscription for
//! several symbols receives frames whose topic names only one of them.
//!
//! # Example
//!
//! ```
//! use kucoin_rust_sdk::ws::topics::{Topic, prefix};
//!
//! let topic = Topic::with_symbols(prefix::SPOT_TICKER, ["BTC-USDT", "ETH-USDT"]).unwrap();
//! assert_eq!(topic.to_string(), "/market/ticker:BTC-USDT,ETH-USDT");
//! assert!(topic.matches("/market/ticker:ETH-USDT"));
//! ```

use std::fmt;

use crate::errors::WSErrors;

/// Topic prefixes understood by the exchange.
pub mod prefix {
    // spot public
    pub const SPOT_TICKER: &str = "/market/ticker";
    pub const SPOT_TRADE: &str = "/market/match";
    pub const SPOT_KLINES: &str = "/market/candles";
    pub const SPOT_ORDERBOOK_INCREMENT: &str = "/market/level2";
    pub const SPOT_ORDERBOOK_LEVEL1: &str = "/spotMarket/level1";
    pub const SPOT_ORDERBOOK_LEVEL5: &str = "/spotMarket/level2Depth5";
    pub const SPOT_ORDERBOOK_LEVEL50: &str = "/spotMarket/level2Depth50";
    pub const SPOT_SNAPSHOT: &str = "/market/snapshot";
    pub const SPOT_CALL_AUCTION_INFO: &str = "/callauction/callauctionData";
    pub const SPOT_CALL_AUCTION_LEVEL50: &str = "/callauction/level2Depth50";

    // spot private
    pub const SPOT_ACCOUNT: &str = "/account/balance";
    pub const SPOT_ORDER_V1: &str = "/spotMarket/tradeOrders";
    pub const SPOT_ORDER_V2: &str = "/spotMarket/tradeOrdersV2";
    pub const SPOT_STOP_ORDER: &str = "/spotMarket/advancedOrders";

    // futures public
    pub const FUTURES_ANNOUNCEMENT: &str = "/contract/announcement";
    pub const FUTURES_EXECUTION: &str = "/contractMarket/execution";
    pub const FUTURES_INSTRUMENT: &str = "/contract/instrument";
    pub const FUTURES_KLINES: &str = "/contractMarket/limitCandle";
    pub const FUTURES_ORDERBOOK_INCREMENT: &str = "/contractMarket/level2";
    pub const FUTURES_ORDERBOOK_LEVEL5: &str = "/contractMarket/level2Depth5";
    pub const FUTURES_ORDERBOOK_LEVEL50: &str = "/contractMarket/level2Depth50";
    pub const FUTURES_SNAPSHOT: &str = "/contractMarket/snapshot";
    pub const FUTURES_TICKER_V1: &str = "/contractMarket/ticker";
    pub const FUTURES_TICKER_V2: &str = "/contractMarket/tickerV2";

    // futures private
    pub const FUTURES_ORDER: &str = "/contractMarket/tradeOrders";
    pub const FUTURES_ALL_POSITION: &str = "/contract/positionAll";
    pub const FUTURES_POSITION: &str = "/contract/position";
    pub const FUTURES_BALANCE: &str = "/contractAccount/wallet";
    pub const FUTURES_STOP_ORDERS: &str = "/contractMarket/advancedOrders";
    pub const FUTURES_MARGIN_MODE: &str = "/contract/marginMode";
    pub const FUTURES_CROSS_LEVERAGE: &str = "/contract/crossLeverage";

    // margin
    pub const MARGIN_INDEX_PRICE: &str = "/indicator/index";
    pub const MARGIN_MARK_PRICE: &str = "/indicator/markPrice";
    pub const MARGIN_CROSS_POSITION: &str = "/margin/position";
    pub const MARGIN_ISOLATED_POSITION: &str = "/margin/isolatedPosition";
}

/// The argument used by "all symbols" topics such as `/market/ticker:all`.
pub const ALL: &str = "all";

/// Kline (candlestick) intervals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KlineInterval {
    /// 1 minute
    M1,
    /// 3 minutes
    M3,
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 30 minutes
    M30,
    /// 1 hour
    H1,
    /// 2 hours
    H2,
    /// 4 hours
    H4,
    /// 6 hours
    H6,
    /// 8 hours
    H8,
    /// 12 hours
    H12,
    /// 1 day
    D1,
    /// 1 week
    W1,
    /// 1 month
    Month1,
}

impl KlineInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::M1 => "1min",
            KlineInterval::M3 => "3min",
            KlineInterval::M5 => "5min",
            KlineInterval::M15 => "15min",
            KlineInterval::M30 => "30min",
            KlineInterval::H1 => "1hour",
            KlineInterval::H2 => "2hour",
            KlineInterval::H4 => "4hour",
            KlineInterval::H6 => "6hour",
            KlineInterval::H8 => "8hour",
            KlineInterval::H12 => "12hour",
            KlineInterval::D1 => "1day",
            KlineInterval::W1 => "1week",
            KlineInterval::Month1 => "1month",
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A WebSocket subscription topic: a prefix plus its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    prefix: String,
    args: Vec<String>,
}

impl Topic {
    /// A topic that takes no arguments, e.g. `/spotMarket/tradeOrdersV2`.
    pub fn bare(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            args: Vec::new(),
        }
    }

    /// A topic for one or more symbols.
    ///
    /// Fails with [`WSErrors::EmptySymbols`] when `symbols` is empty and with
    /// [`WSErrors::InvalidArgument`] when a symbol is blank or contains a
    /// topic separator.
    pub fn with_symbols<I, S>(prefix: impl Into<String>, symbols: I) -> Result<Self, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefix = prefix.into();
        let mut args: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol: String = symbol.into();
            let symbol = symbol.trim().to_string();
            if symbol.is_empty() || symbol.contains([',', ':']) {
                return Err(WSErrors::InvalidArgument(format!(
                    "{prefix}: symbol {symbol:?}"
                )));
            }
            if !args.contains(&symbol) {
                args.push(symbol);
            }
        }
        if args.is_empty() {
            return Err(WSErrors::EmptySymbols(prefix));
        }
        Ok(Self { prefix, args })
    }

    /// A topic for exactly one symbol.
    pub fn with_symbol(prefix: impl Into<String>, symbol: impl Into<String>) -> Result<Self, WSErrors> {
        Self::with_symbols(prefix, [symbol.into()])
    }

    /// A kline topic: `{prefix}:{symbol}_{interval}`.
    pub fn kline(
        prefix: impl Into<String>,
        symbol: impl Into<String>,
        interval: KlineInterval,
    ) -> Result<Self, WSErrors> {
        let symbol: String = symbol.into();
        if symbol.trim().is_empty() {
            return Err(WSErrors::EmptySymbols(prefix.into()));
        }
        Self::with_symbol(prefix, format!("{}_{interval}", symbol.trim()))
    }

    /// The "all symbols" variant of a topic, e.g. `/market/ticker:all`.
    pub fn all(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            args: vec![ALL.to_string()],
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Rebuild this topic restricted to `args`.
    pub(crate) fn narrowed(&self, args: Vec<String>) -> Self {
        Self {
            prefix: self.prefix.clone(),
            args,
        }
    }

    /// Split a frame topic into prefix and (optional) argument.
    pub fn split(raw: &str) -> (&str, Option<&str>) {
        match raw.split_once(':') {
            Some((prefix, arg)) => (prefix, Some(arg)),
            None => (raw, None),
        }
    }

    /// Whether a data frame with topic `raw` belongs to this topic.
    ///
    /// Topics without arguments match only frames without an argument, so
    /// `/contractMarket/tradeOrders` never sees `/contractMarket/tradeOrders:XBTUSDTM`.
    pub fn matches(&self, raw: &str) -> bool {
        let (prefix, arg) = Self::split(raw);
        if prefix != self.prefix {
            return false;
        }
        match arg {
            None => self.args.is_empty(),
            Some(arg) => arg.split(',').any(|a| self.args.iter().any(|s| s == a)),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.prefix)
        } else {
            write!(f, "{}:{}", self.prefix, self.args.join(","))
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_topic() {
        let topic = Topic::with_symbols(prefix::SPOT_TICKER, ["BTC-USDT", "ETH-USDT"]).unwrap();
        assert_eq!(topic.to_string(), "/market/ticker:BTC-USDT,ETH-USDT");
    }

    #[test]
    fn test_bare_topic() {
        let topic = Topic::bare(prefix::SPOT_ORDER_V2);
        assert_eq!(topic.to_string(), "/spotMarket/tradeOrdersV2");
        assert!(topic.args().is_empty());
    }

    #[test]
    fn test_all_topic() {
        let topic = Topic::all(prefix::SPOT_TICKER);
        assert_eq!(topic.to_string(), "/market/ticker:all");
        assert!(topic.matches("/market/ticker:all"));
        assert!(!topic.matches("/market/ticker:BTC-USDT"));
    }

    #[test]
    fn test_kline_topic() {
        let topic = Topic::kline(prefix::SPOT_KLINES, "BTC-USDT", KlineInterval::M1).unwrap();
        assert_eq!(topic.to_string(), "/market/candles:BTC-USDT_1min");
        let topic = Topic::kline(prefix::FUTURES_KLINES, "XBTUSDTM", KlineInterval::H4).unwrap();
        assert_eq!(topic.to_string(), "/contractMarket/limitCandle:XBTUSDTM_4hour");
    }

    #[test]
    fn test_empty_symbols_rejected() {
        let err = Topic::with_symbols(prefix::SPOT_TICKER, Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, WSErrors::EmptySymbols(p) if p == "/market/ticker"));
    }

    #[test]
    fn test_bad_symbol_rejected() {
        let err = Topic::with_symbols(prefix::SPOT_TICKER, ["BTC-USDT", "a,b"]).unwrap_err();
        assert!(matches!(err, WSErrors::InvalidArgument(_)));
        let err = Topic::with_symbol(prefix::SPOT_TICKER, "  ").unwrap_err();
        assert!(matches!(err, WSErrors::InvalidArgument(_)));
    }

    #[test]
    fn test_duplicate_symbols_collapsed() {
        let topic = Topic::with_symbols(prefix::SPOT_TRADE, ["BTC-USDT", "BTC-USDT"]).unwrap();
        assert_eq!(topic.to_string(), "/market/match:BTC-USDT");
    }

    #[test]
    fn test_matches() {
        let topic = Topic::with_symbols(prefix::SPOT_TICKER, ["BTC-USDT", "ETH-USDT"]).unwrap();
        assert!(topic.matches("/market/ticker:BTC-USDT"));
        assert!(topic.matches("/market/ticker:ETH-USDT"));
        assert!(!topic.matches("/market/ticker:SOL-USDT"));
        assert!(!topic.matches("/market/match:BTC-USDT"));
        assert!(!topic.matches("/market/ticker"));

        let bare = Topic::bare(prefix::SPOT_ORDER_V2);
        assert!(bare.matches("/spotMarket/tradeOrdersV2"));
        assert!(!bare.matches("/spotMarket/tradeOrders"));
        assert!(!bare.matches("/spotMarket/tradeOrdersV2:BTC-USDT"));
    }

    #[test]
    fn test_split() {
        assert_eq!(
            Topic::split("/market/ticker:BTC-USDT"),
            ("/market/ticker", Some("BTC-USDT"))
        );
        assert_eq!(Topic::split("/account/balance"), ("/account/balance", None));
    }

    #[test]
    fn test_into_string() {
        let topic = Topic::with_symbol(prefix::FUTURES_TICKER_V2, "XBTUSDTM").unwrap();
        let s: String = topic.into();
        assert_eq!(s, "/contractMarket/tickerV2:XBTUSDTM");
    }
}
