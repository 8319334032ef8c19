//! WebSocket connection tokens.
//!
//! Before opening a socket the client asks the REST API for a short-lived
//! token and the list of instance servers that accept it. Public channels use
//! `POST /api/v1/bullet-public`. Private channels need a signed request, so
//! they take a caller-supplied [`WsTokenProvider`].

use futures::future::BoxFuture;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::debug;

use super::models::WsToken;
use crate::errors::WSErrors;
use crate::rest::RestResponse;

/// Path of the public token endpoint.
pub const PUBLIC_TOKEN_PATH: &str = "/api/v1/bullet-public";
/// Path of the private token endpoint.
pub const PRIVATE_TOKEN_PATH: &str = "/api/v1/bullet-private";

/// Supplies fresh connection tokens. Called once per (re)connect.
pub trait WsTokenProvider: Send + Sync {
    fn get_token(&self) -> BoxFuture<'_, Result<Vec<WsToken>, WSErrors>>;
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    token: String,
    #[serde(default)]
    instance_servers: Vec<InstanceServer>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InstanceServer {
    endpoint: String,
    #[serde(default)]
    encrypt: bool,
    #[serde(default)]
    protocol: String,
    ping_interval: u64,
    ping_timeout: u64,
}

impl TokenData {
    fn into_tokens(self) -> Vec<WsToken> {
        let token = self.token;
        self.instance_servers
            .into_iter()
            .map(|server| WsToken {
                token: token.clone(),
                endpoint: server.endpoint,
                encrypt: server.encrypt,
                protocol: server.protocol,
                ping_interval: server.ping_interval,
                ping_timeout: server.ping_timeout,
            })
            .collect()
    }
}

/// Fetches tokens from a REST token endpoint with an unsigned `POST`.
#[derive(Clone, Debug)]
pub struct RestTokenProvider {
    http: reqwest::Client,
    url: String,
}

impl RestTokenProvider {
    /// Provider for the public endpoint of `base_url`, e.g. `https://api.kucoin.com`.
    pub fn public(base_url: &str, http: reqwest::Client) -> Self {
        Self::new(base_url, PUBLIC_TOKEN_PATH, http)
    }

    pub fn new(base_url: &str, path: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<WsToken>, WSErrors> {
        let token_error = |e: crate::SDKError| WSErrors::WsTokenError(e.to_string());

        debug!(url = %self.url, "requesting websocket token");
        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|e| WSErrors::WsTokenError(e.to_string()))?;
        let data = RestResponse::<TokenData>::from_response(response)
            .await
            .map_err(token_error)?
            .into_data()
            .map_err(token_error)?;

        let tokens = data.into_tokens();
        if tokens.is_empty() {
            return Err(WSErrors::WsTokenError(
                "no instance servers in token response".to_string(),
            ));
        }
        Ok(tokens)
    }
}

impl WsTokenProvider for RestTokenProvider {
    fn get_token(&self) -> BoxFuture<'_, Result<Vec<WsToken>, WSErrors>> {
        Box::pin(self.fetch())
    }
}

/// Hands out the same tokens on every call.
#[derive(Clone, Debug)]
pub struct StaticTokenProvider {
    tokens: Vec<WsToken>,
}

impl StaticTokenProvider {
    pub fn new(tokens: Vec<WsToken>) -> Self {
        Self { tokens }
    }
}

impl WsTokenProvider for StaticTokenProvider {
    fn get_token(&self) -> BoxFuture<'_, Result<Vec<WsToken>, WSErrors>> {
        let tokens = self.tokens.clone();
        Box::pin(async move { Ok(tokens) })
    }
}

/// Pick one of the advertised servers at random.
pub(crate) fn choose_token(tokens: &[WsToken]) -> Result<&WsToken, WSErrors> {
    tokens
        .choose(&mut rand::thread_rng())
        .ok_or_else(|| WSErrors::WsTokenError("token provider returned no tokens".to_string()))
}
