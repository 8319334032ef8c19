//! Common envelope of KuCoin REST responses.
//!
//! Every endpoint answers `{"code": "200000", "msg": ..., "data": ...}`; rate
//! limit state comes back in `gw-ratelimit-*` headers.

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{SDKError, SDKResult};

/// Result code of a successful call.
pub const RESULT_CODE_SUCCESS: &str = "200000";

const HEADER_LIMIT: &str = "gw-ratelimit-limit";
const HEADER_REMAINING: &str = "gw-ratelimit-remaining";
const HEADER_RESET: &str = "gw-ratelimit-reset";

/// Rate limit state reported with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestRateLimit {
    /// Total quota of the current window.
    pub limit: i64,
    /// Quota left in the current window.
    pub remaining: i64,
    /// Milliseconds until the window resets.
    pub reset: i64,
}

impl RestRateLimit {
    /// Parse the rate limit headers. Returns `None` unless all three are present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| -> Option<i64> { headers.get(name)?.to_str().ok()?.trim().parse().ok() };
        Some(Self {
            limit: read(HEADER_LIMIT)?,
            remaining: read(HEADER_REMAINING)?,
            reset: read(HEADER_RESET)?,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RestResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(skip)]
    pub rate_limit: Option<RestRateLimit>,
}

impl<T: DeserializeOwned> RestResponse<T> {
    /// Read and decode a response body, keeping its rate limit headers.
    ///
    /// A non-2xx status whose body is not an envelope becomes an
    /// [`SDKError::ApiError`] carrying the HTTP status.
    pub async fn from_response(response: reqwest::Response) -> SDKResult<Self> {
        let status = response.status();
        let rate_limit = RestRateLimit::from_headers(response.headers());
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "rest response");

        let mut parsed: RestResponse<T> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(SDKError::ApiError {
                    code: status.as_u16().to_string(),
                    message: String::from_utf8_lossy(&body).into_owned(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        parsed.rate_limit = rate_limit;
        Ok(parsed)
    }
}

impl<T> RestResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code == RESULT_CODE_SUCCESS
    }

    /// Fails with [`SDKError::ApiError`] unless the result code is success.
    pub fn check_error(&self) -> SDKResult<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(SDKError::ApiError {
            code: self.code.clone(),
            message: self.msg.clone().unwrap_or_default(),
        })
    }

    /// The payload of a successful response.
    pub fn into_data(self) -> SDKResult<T> {
        self.check_error()?;
        self.data.ok_or_else(|| SDKError::ApiError {
            code: self.code,
            message: "response carries no data".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_LIMIT, HeaderValue::from_static("2000"));
        headers.insert(HEADER_REMAINING, HeaderValue::from_static("1999"));
        headers.insert(HEADER_RESET, HeaderValue::from_static("29990"));

        assert_eq!(
            RestRateLimit::from_headers(&headers),
            Some(RestRateLimit {
                limit: 2000,
                remaining: 1999,
                reset: 29990,
            })
        );

        headers.remove(HEADER_RESET);
        assert_eq!(RestRateLimit::from_headers(&headers), None);
    }

    #[test]
    fn test_success_envelope() {
        let resp: RestResponse<Vec<u32>> =
            serde_json::from_str(r#"{"code":"200000","data":[1,2]}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.into_data().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_error_envelope() {
        let resp: RestResponse<Vec<u32>> =
            serde_json::from_str(r#"{"code":"400100","msg":"Invalid request"}"#).unwrap();
        match resp.into_data() {
            Err(SDKError::ApiError { code, message }) => {
                assert_eq!(code, "400100");
                assert_eq!(message, "Invalid request");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
