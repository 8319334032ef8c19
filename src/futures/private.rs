//! Futures private channels: orders, positions and wallet of the account.

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::SDKResult;
use crate::de::{opt_bool, opt_i64, opt_string};
use crate::errors::WSErrors;
use crate::ws::subscriber::CallbackResult;
use crate::ws::topics::{Topic, prefix};
use crate::ws::{SubscriptionId, WsService};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub symbol: Option<String>,
    pub order_id: Option<String>,
    pub client_oid: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub liquidity: Option<String>,
    pub fee_type: Option<String>,
    pub margin_mode: Option<String>,
    pub trade_type: Option<String>,
    pub position_side: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub filled_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub remain_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub canceled_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub old_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub match_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub match_size: Option<String>,
    pub trade_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub order_time: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

pub type AllOrderEvent = OrderEvent;

/// Position change, including funding settlements (subject
/// `position.settlement`) and adjustments (`position.adjustRiskLimit`).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionEvent {
    pub symbol: Option<String>,
    pub settle_currency: Option<String>,
    pub margin_mode: Option<String>,
    pub position_side: Option<String>,
    pub change_reason: Option<String>,
    #[serde(default, deserialize_with = "opt_bool")]
    pub cross_mode: Option<bool>,
    #[serde(default, deserialize_with = "opt_bool")]
    pub is_open: Option<bool>,
    #[serde(default, deserialize_with = "opt_string")]
    pub current_qty: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub current_cost: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub current_comm: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub avg_entry_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub mark_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub mark_value: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub liquidation_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub bankrupt_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub leverage: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub pos_cost: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub pos_init: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub pos_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub maint_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub realised_pnl: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub unrealised_pnl: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub unrealised_pnl_pcnt: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub unrealised_roe_pcnt: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub funding_fee: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub funding_rate: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub funding_time: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub opening_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub current_timestamp: Option<i64>,
}

pub type AllPositionEvent = PositionEvent;

/// Wallet balance of one settlement currency.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEvent {
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub wallet_balance: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub available_balance: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub hold_balance: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub equity: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub cross_pos_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub cross_order_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub cross_un_pnl: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub total_cross_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub isolated_pos_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub isolated_order_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub isolated_un_pnl: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub isolated_funding_fee_margin: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopOrdersEvent {
    pub symbol: Option<String>,
    pub order_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub order_type: Option<String>,
    pub side: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub order_price: Option<String>,
    pub stop: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub stop_price: Option<String>,
    pub stop_price_type: Option<String>,
    #[serde(default, deserialize_with = "opt_bool")]
    pub trigger_success: Option<bool>,
    pub error: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub created_at: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

/// Margin mode per contract, e.g. `{"XBTUSDTM": "CROSS"}`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct MarginModeEvent {
    pub modes: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CrossLeverage {
    #[serde(default, deserialize_with = "opt_string")]
    pub leverage: Option<String>,
}

/// Cross margin leverage per contract, e.g. `{"XBTUSDTM": {"leverage": "3"}}`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct CrossLeverageEvent {
    pub leverages: BTreeMap<String, CrossLeverage>,
}

/// Futures account streams over one private connection.
pub struct FuturesPrivateWs {
    service: WsService,
}

impl FuturesPrivateWs {
    pub fn new(service: WsService) -> Self {
        Self { service }
    }

    /// Order updates of every contract.
    pub async fn all_order<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, AllOrderEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::FUTURES_ORDER), callback)
            .await
    }

    /// Order updates of one contract.
    pub async fn order<F>(&self, symbol: &str, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, OrderEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_ORDER, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn all_position<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, AllPositionEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::FUTURES_ALL_POSITION), callback)
            .await
    }

    pub async fn position<F>(&self, symbol: &str, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, PositionEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::FUTURES_POSITION, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn balance<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, BalanceEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::FUTURES_BALANCE), callback)
            .await
    }

    pub async fn stop_orders<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, StopOrdersEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::FUTURES_STOP_ORDERS), callback)
            .await
    }

    pub async fn margin_mode<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, MarginModeEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::FUTURES_MARGIN_MODE), callback)
            .await
    }

    pub async fn cross_leverage<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, CrossLeverageEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::FUTURES_CROSS_LEVERAGE), callback)
            .await
    }
}

impl Deref for FuturesPrivateWs {
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
    fn test_margin_mode_event() {
        let event: MarginModeEvent =
            serde_json::from_value(json!({"XBTUSDTM": "CROSS", "ETHUSDTM": "ISOLATED"})).unwrap();
        assert_eq!(event.modes.get("XBTUSDTM").map(String::as_str), Some("CROSS"));
        assert_eq!(event.modes.len(), 2);
    }

    #[test]
    fn test_cross_leverage_event() {
        let event: CrossLeverageEvent =
            serde_json::from_value(json!({"XBTUSDTM": {"leverage": "3"}})).unwrap();
        assert_eq!(event.leverages["XBTUSDTM"].leverage.as_deref(), Some("3"));
    }

    #[test]
    fn test_position_event() {
        let event: PositionEvent = serde_json::from_value(json!({
            "symbol": "XBTUSDTM",
            "crossMode": false,
            "isOpen": true,
            "currentQty": 1,
            "avgEntryPrice": "90000",
            "markPrice": 90445.02,
            "realisedPnl": -0.0005,
            "settleCurrency": "USDT",
            "changeReason": "positionChange",
            "currentTimestamp": 1731899129000_i64
        }))
        .unwrap();

        assert_eq!(event.is_open, Some(true));
        assert_eq!(event.current_qty.as_deref(), Some("1"));
        assert_eq!(event.mark_price.as_deref(), Some("90445.02"));
    }

    #[test]
    fn test_balance_event() {
        let event: BalanceEvent = serde_json::from_value(json!({
            "currency": "USDT",
            "walletBalance": "10.0",
            "availableBalance": 9.5,
            "holdBalance": "0.5",
            "version": "2",
            "timestamp": "1731899129000"
        }))
        .unwrap();

        assert_eq!(event.available_balance.as_deref(), Some("9.5"));
        assert_eq!(event.timestamp, Some(1731899129000));
    }
}
