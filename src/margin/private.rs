//! Margin private channels: cross and isolated positions.

use std::collections::BTreeMap;
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
pub struct AssetBalance {
    #[serde(default, deserialize_with = "opt_string")]
    pub total: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub available: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub hold: Option<String>,
}

/// Cross margin account state. Subject `debt.ratio` carries the balances,
/// `position.status` a status change.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossMarginPositionEvent {
    #[serde(default, deserialize_with = "opt_string")]
    pub debt_ratio: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub total_asset: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub margin_coefficient_total_asset: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub total_debt: Option<String>,
    #[serde(default)]
    pub asset_list: BTreeMap<String, AssetBalance>,
    /// Debt per currency; values are decimal strings.
    #[serde(default)]
    pub debt_list: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IsolatedAssetChange {
    #[serde(default, deserialize_with = "opt_string")]
    pub total: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub hold: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub liability_principal: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub liability_interest: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IsolatedMarginPositionEvent {
    /// The isolated pair, e.g. `BTC-USDT`.
    pub tag: Option<String>,
    pub status: Option<String>,
    pub status_biz_type: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub accumulated_principal: Option<String>,
    #[serde(default)]
    pub change_assets: BTreeMap<String, IsolatedAssetChange>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub timestamp: Option<i64>,
}

pub struct MarginPrivateWs {
    service: WsService,
}

impl MarginPrivateWs {
    pub fn new(service: WsService) -> Self {
        Self { service }
    }

    pub async fn cross_margin_position<F>(&self, callback: F) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, CrossMarginPositionEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.service
            .subscribe_typed(Topic::bare(prefix::MARGIN_CROSS_POSITION), callback)
            .await
    }

    pub async fn isolated_margin_position<F>(
        &self,
        symbol: &str,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        F: Fn(&str, &str, IsolatedMarginPositionEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let topic = Topic::with_symbol(prefix::MARGIN_ISOLATED_POSITION, symbol)?;
        self.service.subscribe_typed(topic, callback).await
    }
}

impl Deref for MarginPrivateWs {
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
    fn test_cross_position_event() {
        let event: CrossMarginPositionEvent = serde_json::from_value(json!({
            "debtRatio": 0,
            "totalAsset": 0.0005243177228408,
            "marginCoefficientTotalAsset": "0.0005243177228408",
            "totalDebt": "0",
            "assetList": {
                "BTC": {"total": "0.00002", "available": "0", "hold": "0.00002"},
                "USDT": {"total": "33.68855864", "available": "15.01916691", "hold": "18.66939173"}
            },
            "debtList": {"BTC": "0", "USDT": "0"},
            "timestamp": 1729912435657_i64
        }))
        .unwrap();

        assert_eq!(event.debt_ratio.as_deref(), Some("0"));
        assert_eq!(event.asset_list["USDT"].hold.as_deref(), Some("18.66939173"));
        assert_eq!(event.debt_list.len(), 2);
    }

    #[test]
    fn test_isolated_position_event() {
        let event: IsolatedMarginPositionEvent = serde_json::from_value(json!({
            "tag": "BTC-USDT",
            "status": "DEBT",
            "statusBizType": "DEFAULT_DEBT",
            "accumulatedPrincipal": "5.01",
            "changeAssets": {
                "USDT": {
                    "total": "0.98092004",
                    "hold": "0",
                    "liabilityPrincipal": "26",
                    "liabilityInterest": "0.00025644"
                }
            },
            "timestamp": 1730121097742_i64
        }))
        .unwrap();

        assert_eq!(event.status.as_deref(), Some("DEBT"));
        assert_eq!(
            event.change_assets["USDT"].liability_principal.as_deref(),
            Some("26")
        );
    }
}
