//! Margin public channels: index and mark prices.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::SDKResult;
use crate::de::{opt_i64, opt_string};
use crate::errors::WSErrors;
use crate::ws::subscriber::CallbackResult;
use crate::ws::topics::{Topic, prefix};
use crate::ws::{SubscriptionId, WsService};

/// One price tick. Shared by the index and mark price channels.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceEvent {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub granularity: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "opt_string")]
    pub value: Option<String>,
}

pub type IndexPriceEvent = PriceEvent;
pub type MarkPriceEvent = PriceEvent;

pub struct MarginPublicWs {
    service: WsService,
}

impl MarginPublicWs {
    pub fn new(service: WsService) -> Self {
        Self { service }
    }

    /// Index prices of the given pairs, e.g. `USDT-BTC`.
    pub async fn index_price<I, S, F>(&self, symbols: I, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, IndexPriceEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::MARGIN_INDEX_PRICE, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }

    pub async fn mark_price<I, S, F>(&self, symbols: I, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &str, MarkPriceEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbols(prefix::MARGIN_MARK_PRICE, symbols)?;
        self.service.subscribe_typed(topic, callback).await
    }
}

impl Deref for MarginPublicWs {
    type Target = WsService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}
