//! Spot private channels: balances and order updates of the account.

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SDKResult;
use crate::de::{opt_i64, opt_string};
use crate::errors::WSErrors;
use crate::ws::subscriber::CallbackResult;
use crate::ws::topics::{Topic, prefix};
use crate::ws::{SubscriptionId, WsService};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountEvent {
    pub account_id: Option<String>,
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub total: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub available: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub hold: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub available_change: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub hold_change: Option<String>,
    /// Free-form context of the change, e.g. the order that caused it.
    pub relation_context: Option<Value>,
    pub relation_event: Option<String>,
    pub relation_event_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub time: Option<i64>,
}

/// Order lifecycle update (`open`, `match`, `filled`, `canceled`, `update`).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub symbol: Option<String>,
    pub order_id: Option<String>,
    pub client_oid: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    /// Update type, e.g. `open`, `match`, `filled`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub liquidity: Option<String>,
    pub fee_type: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub origin_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub filled_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub remain_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub canceled_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub old_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub funds: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub origin_funds: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub remain_funds: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub canceled_funds: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub match_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub match_size: Option<String>,
    pub trade_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub order_time: Option<i64>,
    /// Nanoseconds since epoch.
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

pub type OrderV1Event = OrderEvent;
pub type OrderV2Event = OrderEvent;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopOrderEvent {
    pub symbol: Option<String>,
    pub order_id: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub trade_type: Option<String>,
    /// `loss` or `entry`.
    pub stop: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub stop_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub order_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub created_at: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub ts: Option<i64>,
}

/// Spot account streams over one private connection.
pub struct SpotPrivateWs {
    service: WsService,
}

impl SpotPrivateWs {
    pub fn new(service: WsService) -> Self {
        Self { service }
    }

    pub async fn account<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, AccountEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::SPOT_ACCOUNT), callback)
            .await
    }

    pub async fn order_v1<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, OrderV1Event) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::SPOT_ORDER_V1), callback)
            .await
    }

    pub async fn order_v2<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, OrderV2Event) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::SPOT_ORDER_V2), callback)
            .await
    }

    pub async fn stop_order<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, StopOrderEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::SPOT_STOP_ORDER), callback)
            .await
    }
}

impl Deref for SpotPrivateWs {
    type Target = WsService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}
