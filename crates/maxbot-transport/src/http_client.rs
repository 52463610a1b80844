//! HTTP implementation of [`BotApi`].
//!
//! Every request carries the bot token as the `access_token` query
//! parameter. Non-success responses are decoded as `{ code, message }`; the
//! `attachment.not.ready` code maps to [`ApiError::AttachmentNotReady`].

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, ClientBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, trace};

use maxbot_core::{
    ApiError, ApiResult, BotApi, BotInfo, DecodeError, Message, OutgoingMessage, TextFormat,
    TransportError, TransportResult, UpdateBatch,
};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://botapi.max.ru";

/// Default request timeout. Long polls on `/updates` may take up to 30 s.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const ATTACHMENT_NOT_READY: &str = "attachment.not.ready";

/// Configuration of [`HttpApi`].
#[derive(Clone)]
pub struct HttpApiConfig {
    /// Bot access token.
    pub access_token: String,
    /// API endpoint, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpApiConfig {
    /// Creates a configuration for the default endpoint.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the API endpoint.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for HttpApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiConfig")
            .field("access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    message: Message,
}

/// Maps a non-success response body to an [`ApiError`].
fn error_from_body(status: u16, body: &[u8]) -> ApiError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(err) if err.code == ATTACHMENT_NOT_READY => ApiError::AttachmentNotReady,
        Ok(err) => ApiError::Api {
            status,
            code: err.code,
            message: err.message,
        },
        Err(_) => ApiError::Api {
            status,
            code: String::new(),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

/// Max bot API client over HTTP.
///
/// The underlying connection pool is the session: it is created by
/// [`open_session`](BotApi::open_session) and dropped by
/// [`close_session`](BotApi::close_session). Calls made while the session is
/// closed fail with [`TransportError::SessionClosed`].
pub struct HttpApi {
    config: HttpApiConfig,
    base_url: Url,
    client: RwLock<Option<Client>>,
}

impl HttpApi {
    /// Creates a client. No connection is made until the session is opened.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] if the base URL is invalid.
    pub fn new(config: HttpApiConfig) -> TransportResult<Self> {
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base)
            .map_err(|e| TransportError::InvalidConfig(format!("base URL '{base}': {e}")))?;
        Ok(Self {
            config,
            base_url,
            client: RwLock::new(None),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpApiConfig {
        &self.config
    }

    /// Returns `true` while the session is open.
    pub fn is_open(&self) -> bool {
        self.client.read().is_some()
    }

    fn client(&self) -> TransportResult<Client> {
        self.client.read().clone().ok_or(TransportError::SessionClosed)
    }

    /// Builds the URL of `path` with the token and `query` appended.
    fn url(&self, path: &str, query: &[(&str, String)]) -> TransportResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TransportError::InvalidConfig(format!("path '{path}': {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("access_token", &self.config.access_token);
        Ok(url)
    }

    /// Endpoint description for errors and logs; never includes the token.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_failed(&self, path: &str, err: reqwest::Error) -> TransportError {
        TransportError::RequestFailed {
            url: self.endpoint(path),
            reason: err.without_url().to_string(),
        }
    }

    async fn read<T: DeserializeOwned>(
        &self,
        response: Response,
        target: &'static str,
    ) -> ApiResult<T> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.without_url().to_string()))?;
        trace!(status = status.as_u16(), bytes = body.len(), "Response received");

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }
        serde_json::from_slice(&body).map_err(|e| DecodeError::json(target, e).into())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        target: &'static str,
    ) -> ApiResult<T> {
        let client = self.client()?;
        let url = self.url(path, query)?;
        debug!(endpoint = %self.endpoint(path), "GET");
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_failed(path, e))?;
        self.read(response, target).await
    }
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

#[async_trait]
impl BotApi for HttpApi {
    async fn open_session(&self) -> ApiResult<()> {
        let mut client = self.client.write();
        if client.is_none() {
            let built = ClientBuilder::new()
                .timeout(self.config.timeout)
                .build()
                .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;
            *client = Some(built);
            info!(base_url = %self.base_url, "HTTP session opened");
        }
        Ok(())
    }

    async fn close_session(&self) -> ApiResult<()> {
        if self.client.write().take().is_some() {
            info!("HTTP session closed");
        }
        Ok(())
    }

    async fn get_me(&self) -> ApiResult<BotInfo> {
        self.get("me", &[], "bot info").await
    }

    async fn get_updates(&self, limit: u32, marker: Option<i64>) -> ApiResult<UpdateBatch> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(marker) = marker {
            query.push(("marker", marker.to_string()));
        }
        self.get("updates", &query, "updates").await
    }

    async fn send_message(
        &self,
        message: &OutgoingMessage,
        default_format: Option<TextFormat>,
    ) -> ApiResult<Message> {
        let client = self.client()?;
        let url = self.url("messages", &message.query())?;
        debug!(endpoint = %self.endpoint("messages"), "POST");
        let response = client
            .post(url)
            .json(&message.body(default_format))
            .send()
            .await
            .map_err(|e| self.request_failed("messages", e))?;
        let sent: SendMessageResponse = self.read(response, "sent message").await?;
        Ok(sent.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxbot_core::SendTarget;

    fn api() -> HttpApi {
        HttpApi::new(HttpApiConfig::new("secret").base_url("https://example.test/")).unwrap()
    }

    #[test]
    fn test_url_carries_token_and_query() {
        let url = api()
            .url("updates", &[("limit", "100".into()), ("marker", "7".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/updates?limit=100&marker=7&access_token=secret"
        );
    }

    #[test]
    fn test_endpoint_hides_token() {
        let endpoint = api().endpoint("me");
        assert_eq!(endpoint, "https://example.test/me");
        assert!(!format!("{:?}", api()).contains("secret"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpApi::new(HttpApiConfig::new("t").base_url("not a url")).unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfig(_)));
    }

    #[test]
    fn test_error_body_mapping() {
        let err = error_from_body(
            400,
            br#"{"code":"attachment.not.ready","message":"Key: file"}"#,
        );
        assert!(matches!(err, ApiError::AttachmentNotReady));

        let err = error_from_body(401, br#"{"code":"verify.token","message":"Invalid token"}"#);
        assert!(matches!(
            err,
            ApiError::Api { status: 401, ref code, .. } if code == "verify.token"
        ));

        let err = error_from_body(502, b"Bad Gateway");
        assert!(matches!(
            err,
            ApiError::Api { status: 502, ref message, .. } if message == "Bad Gateway"
        ));
    }

    #[tokio::test]
    async fn test_calls_fail_when_session_closed() {
        let api = api();
        assert!(!api.is_open());

        let err = api.get_me().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::SessionClosed)
        ));

        let msg = OutgoingMessage::new(SendTarget::Chat(1), "hi");
        assert!(api.send_message(&msg, None).await.is_err());
    }

    #[tokio::test]
    async fn test_session_open_close() {
        let api = api();
        api.open_session().await.unwrap();
        api.open_session().await.unwrap();
        assert!(api.is_open());

        api.close_session().await.unwrap();
        api.close_session().await.unwrap();
        assert!(!api.is_open());
    }
}
