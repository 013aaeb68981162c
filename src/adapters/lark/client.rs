//! Lark/Feishu REST client implementing the `ChatPlatform` port.
//!
//! Every call authenticates with a tenant access token, fetched lazily
//! and cached until shortly before it expires.

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{MessageId, SessionKey, UserId};
use crate::ports::{ChatPlatform, DownloadedFile, HandoffPost, PlatformError, ThreadRoot};

use super::types::{
    disposition_file_name, file_content, post_content, text_content, AddMembers, AddMembersData,
    CreateMessage, Envelope, FileData, MessageData, ReplyMessage, TokenRequest, TokenResponse,
};

/// Tokens are refreshed this long before the platform expires them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Connection settings for the Lark open platform.
#[derive(Debug, Clone)]
pub struct LarkConfig {
    /// API root, e.g. `https://open.feishu.cn/open-apis`.
    pub base_url: String,
    pub app_id: String,
    app_secret: Secret<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl LarkConfig {
    pub fn new(base_url: impl Into<String>, app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            app_secret: Secret::new(app_secret.into()),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

struct CachedToken {
    value: Secret<String>,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Chat platform adapter for Lark/Feishu.
pub struct LarkChatPlatform {
    config: LarkConfig,
    http: Client,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl LarkChatPlatform {
    pub fn new(config: LarkConfig) -> Result<Self, PlatformError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlatformError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Returns a valid tenant access token, fetching a new one if needed.
    async fn tenant_token(&self) -> Result<String, PlatformError> {
        {
            let cache = self.token.read().await;
            if let Some(ref cached) = *cache {
                if cached.is_fresh() {
                    return Ok(cached.value.expose_secret().clone());
                }
            }
        }

        let response = self
            .http
            .post(self.config.url("/auth/v3/tenant_access_token/internal"))
            .json(&TokenRequest {
                app_id: &self.config.app_id,
                app_secret: self.config.app_secret.expose_secret(),
            })
            .send()
            .await
            .map_err(network)?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        if body.code != 0 || body.tenant_access_token.is_empty() {
            return Err(PlatformError::Auth(format!("code {}: {}", body.code, body.msg)));
        }

        tracing::debug!(expire_secs = body.expire, "fetched tenant access token");
        let token = body.tenant_access_token;
        {
            let mut cache = self.token.write().await;
            *cache = Some(CachedToken {
                value: Secret::new(token.clone()),
                expires_at: Instant::now() + Duration::from_secs(body.expire),
            });
        }
        Ok(token)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, PlatformError> {
        let token = self.tenant_token().await?;
        Ok(builder.bearer_auth(token))
    }

    /// Sends a request and unwraps the `{code, msg, data}` envelope.
    async fn call<T: DeserializeOwned + Default>(&self, builder: RequestBuilder) -> Result<T, PlatformError> {
        let response = self.authorized(builder).await?.send().await.map_err(network)?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned + Default>(response: Response) -> Result<T, PlatformError> {
    let status = response.status();
    let text = response.text().await.map_err(network)?;
    parse_envelope(status, &text)
}

fn parse_envelope<T: DeserializeOwned + Default>(status: StatusCode, text: &str) -> Result<T, PlatformError> {
    let envelope: Envelope<T> = serde_json::from_str(text).map_err(|e| {
        PlatformError::Decode(format!("status {}: {} ({})", status, e, truncate(text, 200)))
    })?;
    if envelope.code != 0 {
        return Err(PlatformError::Api {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    Ok(envelope.data.unwrap_or_default())
}

fn network(e: reqwest::Error) -> PlatformError {
    if e.is_timeout() {
        PlatformError::Timeout
    } else {
        PlatformError::Network(e.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn idempotency_key() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl ChatPlatform for LarkChatPlatform {
    async fn send_text(&self, chat: &SessionKey, text: &str) -> Result<(), PlatformError> {
        let request = self
            .http
            .post(self.config.url("/im/v1/messages"))
            .query(&[("receive_id_type", "chat_id")])
            .json(&CreateMessage {
                receive_id: chat.to_string(),
                msg_type: "text",
                content: text_content(text),
                uuid: idempotency_key(),
            });
        self.call::<MessageData>(request).await.map(|_| ())
    }

    async fn reply_text(&self, message: &MessageId, text: &str) -> Result<(), PlatformError> {
        let request = self
            .http
            .post(self.config.url(&format!("/im/v1/messages/{}/reply", message)))
            .json(&ReplyMessage {
                msg_type: "text",
                content: text_content(text),
                reply_in_thread: false,
                uuid: idempotency_key(),
            });
        self.call::<MessageData>(request).await.map(|_| ())
    }

    async fn invite_user(&self, chat: &str, user: &UserId) -> Result<(), PlatformError> {
        let request = self
            .http
            .post(self.config.url(&format!("/im/v1/chats/{}/members", chat)))
            .query(&[("member_id_type", "open_id")])
            .json(&AddMembers {
                id_list: vec![user.as_str()],
            });
        let data: AddMembersData = self.call(request).await?;
        if !data.invalid_id_list.is_empty() {
            return Err(PlatformError::Api {
                code: -1,
                msg: format!("invalid member ids: {}", data.invalid_id_list.join(",")),
            });
        }
        Ok(())
    }

    async fn post_summary(&self, chat: &str, post: &HandoffPost) -> Result<ThreadRoot, PlatformError> {
        let mention = post.mention.as_ref().map(UserId::as_str);
        let request = self
            .http
            .post(self.config.url("/im/v1/messages"))
            .query(&[("receive_id_type", "chat_id")])
            .json(&CreateMessage {
                receive_id: chat.to_string(),
                msg_type: "post",
                content: post_content(&post.title, &post.body, mention),
                uuid: idempotency_key(),
            });
        let data: MessageData = self.call(request).await?;
        if data.message_id.is_empty() {
            return Err(PlatformError::Decode("post response has no message_id".into()));
        }
        Ok(ThreadRoot(MessageId::new(data.message_id)))
    }

    async fn download_file(
        &self,
        message: &MessageId,
        file_key: &str,
        resource_type: &str,
    ) -> Result<DownloadedFile, PlatformError> {
        let request = self
            .http
            .get(self.config.url(&format!("/im/v1/messages/{}/resources/{}", message, file_key)))
            .query(&[("type", resource_type)]);
        let response = self.authorized(request).await?.send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                code: i64::from(status.as_u16()),
                msg: truncate(&body, 200),
            });
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = response.bytes().await.map_err(network)?.to_vec();

        Ok(DownloadedFile { bytes, file_name })
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, PlatformError> {
        let form = Form::new()
            .text("file_type", "stream")
            .text("file_name", file_name.to_string())
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        let request = self.http.post(self.config.url("/im/v1/files")).multipart(form);

        let data: FileData = self.call(request).await?;
        if data.file_key.is_empty() {
            return Err(PlatformError::Decode("upload response has no file_key".into()));
        }
        Ok(data.file_key)
    }

    async fn reply_file_in_thread(&self, root: &ThreadRoot, file_key: &str) -> Result<(), PlatformError> {
        let request = self
            .http
            .post(self.config.url(&format!("/im/v1/messages/{}/reply", root.message_id())))
            .json(&ReplyMessage {
                msg_type: "file",
                content: file_content(file_key),
                reply_in_thread: true,
                uuid: idempotency_key(),
            });
        self.call::<MessageData>(request).await.map(|_| ())
    }
}

impl std::fmt::Debug for LarkChatPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LarkChatPlatform")
            .field("base_url", &self.config.base_url)
            .field("app_id", &self.config.app_id)
            .finish_non_exhaustive()
    }
}
