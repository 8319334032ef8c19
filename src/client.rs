use std::fmt;
use std::sync::Arc;

use reqwest::Url;

use crate::futures::{FuturesPrivateWs, FuturesPublicWs};
use crate::margin::{MarginPrivateWs, MarginPublicWs};
use crate::spot::{SpotPrivateWs, SpotPublicWs};
use crate::ws::{Connector, ReqwestConnector, RestTokenProvider, WebsocketConfig, WsService, WsTokenProvider};
use crate::{SDKError, SDKResult};

/// REST endpoint of the spot and margin domains.
pub const GLOBAL_API_ENDPOINT: &str = "https://api.kucoin.com";
/// REST endpoint of the futures domain.
pub const GLOBAL_FUTURES_API_ENDPOINT: &str = "https://api-futures.kucoin.com";

/// Everything a [`KucoinClient`] needs. All fields have working defaults for
/// public market data.
///
/// # Example
///
/// ```
/// use kucoin_rust_sdk::{ClientOption, KucoinClient};
/// use kucoin_rust_sdk::ws::WebsocketConfig;
///
/// let option = ClientOption {
///     websocket: WebsocketConfig {
///         reconnect_attempts: Some(5),
///         ..WebsocketConfig::default()
///     },
///     ..ClientOption::default()
/// };
/// let client = KucoinClient::new(option).unwrap();
/// assert_eq!(client.option().spot_endpoint, "https://api.kucoin.com");
/// ```
#[derive(Clone)]
pub struct ClientOption {
    pub spot_endpoint: String,
    pub futures_endpoint: String,
    pub websocket: WebsocketConfig,
    /// HTTP client for token requests; a default client when `None`.
    pub http_client: Option<reqwest::Client>,
    /// Socket connector; `reqwest-websocket` over `http_client` when `None`.
    pub connector: Option<Arc<dyn Connector>>,
    /// Token source for spot and margin private channels.
    pub spot_private_tokens: Option<Arc<dyn WsTokenProvider>>,
    /// Token source for futures private channels.
    pub futures_private_tokens: Option<Arc<dyn WsTokenProvider>>,
}

impl Default for ClientOption {
    fn default() -> Self {
        Self {
            spot_endpoint: GLOBAL_API_ENDPOINT.to_string(),
            futures_endpoint: GLOBAL_FUTURES_API_ENDPOINT.to_string(),
            websocket: WebsocketConfig::default(),
            http_client: None,
            connector: None,
            spot_private_tokens: None,
            futures_private_tokens: None,
        }
    }
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOption")
            .field("spot_endpoint", &self.spot_endpoint)
            .field("futures_endpoint", &self.futures_endpoint)
            .field("websocket", &self.websocket)
            .field("spot_private_tokens", &self.spot_private_tokens.is_some())
            .field("futures_private_tokens", &self.futures_private_tokens.is_some())
            .finish_non_exhaustive()
    }
}

/// Entry point: builds WebSocket services for each market domain.
///
/// Every `new_*_ws` call returns an independent service with its own
/// connection, registry and lifecycle.
///
/// # Example
///
/// ```no_run
/// use kucoin_rust_sdk::KucoinClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KucoinClient::global()?;
/// let futures = client.new_futures_public_ws();
/// futures.start().await?;
/// futures
///     .ticker_v2("XBTUSDTM", |_, _, t| {
///         println!("{:?} / {:?}", t.best_bid_price, t.best_ask_price);
///         Ok(())
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct KucoinClient {
    option: ClientOption,
    http: reqwest::Client,
    connector: Arc<dyn Connector>,
}

impl KucoinClient {
    /// Validate the endpoints and build a client.
    pub fn new(option: ClientOption) -> SDKResult<Self> {
        for endpoint in [&option.spot_endpoint, &option.futures_endpoint] {
            validate_endpoint(endpoint)?;
        }

        let http = option.http_client.clone().unwrap_or_default();
        let connector = option
            .connector
            .clone()
            .unwrap_or_else(|| Arc::new(ReqwestConnector::new(http.clone())) as Arc<dyn Connector>);

        Ok(Self {
            option,
            http,
            connector,
        })
    }

    /// Client for the global KuCoin site with default settings.
    pub fn global() -> SDKResult<Self> {
        Self::new(ClientOption::default())
    }

    pub fn option(&self) -> &ClientOption {
        &self.option
    }

    pub fn new_spot_public_ws(&self) -> SpotPublicWs {
        SpotPublicWs::new(self.public_service(&self.option.spot_endpoint))
    }

    /// Fails with [`SDKError::MissingPrivateTokenProvider`] unless
    /// `spot_private_tokens` is set.
    pub fn new_spot_private_ws(&self) -> SDKResult<SpotPrivateWs> {
        let tokens = self.private_tokens(&self.option.spot_private_tokens, "spot")?;
        Ok(SpotPrivateWs::new(self.service(tokens, true)))
    }

    pub fn new_futures_public_ws(&self) -> FuturesPublicWs {
        FuturesPublicWs::new(self.public_service(&self.option.futures_endpoint))
    }

    pub fn new_futures_private_ws(&self) -> SDKResult<FuturesPrivateWs> {
        let tokens = self.private_tokens(&self.option.futures_private_tokens, "futures")?;
        Ok(FuturesPrivateWs::new(self.service(tokens, true)))
    }

    pub fn new_margin_public_ws(&self) -> MarginPublicWs {
        MarginPublicWs::new(self.public_service(&self.option.spot_endpoint))
    }

    /// Margin private channels use the spot token provider.
    pub fn new_margin_private_ws(&self) -> SDKResult<MarginPrivateWs> {
        let tokens = self.private_tokens(&self.option.spot_private_tokens, "margin")?;
        Ok(MarginPrivateWs::new(self.service(tokens, true)))
    }

    fn public_service(&self, endpoint: &str) -> WsService {
        let tokens = Arc::new(RestTokenProvider::public(endpoint, self.http.clone()));
        self.service(tokens, false)
    }

    fn private_tokens(
        &self,
        provider: &Option<Arc<dyn WsTokenProvider>>,
        domain: &'static str,
    ) -> SDKResult<Arc<dyn WsTokenProvider>> {
        provider
            .clone()
            .ok_or(SDKError::MissingPrivateTokenProvider(domain))
    }

    fn service(&self, tokens: Arc<dyn WsTokenProvider>, private: bool) -> WsService {
        WsService::new(
            self.option.websocket.clone(),
            private,
            tokens,
            self.connector.clone(),
        )
    }
}

impl fmt::Debug for KucoinClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KucoinClient")
            .field("option", &self.option)
            .finish_non_exhaustive()
    }
}

fn validate_endpoint(endpoint: &str) -> SDKResult<()> {
    let parsed =
        Url::parse(endpoint).map_err(|_| SDKError::InvalidNetworkUrl(endpoint.to_string()))?;
    match parsed.scheme() {
        "https" | "http" => Ok(()),
        _ => Err(SDKError::InvalidNetworkUrl(endpoint.to_string())),
    }
}
