//! Lark open-platform request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Standard response envelope: `code == 0` means success.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub(super) struct TokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

/// The token endpoint answers without the `data` wrapper.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub tenant_access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expire: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateMessage {
    pub receive_id: String,
    pub msg_type: &'static str,
    /// JSON-encoded content, as a string.
    pub content: String,
    /// Idempotency key; the platform drops repeats within an hour.
    pub uuid: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ReplyMessage {
    pub msg_type: &'static str,
    pub content: String,
    pub reply_in_thread: bool,
    pub uuid: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AddMembers<'a> {
    pub id_list: Vec<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct MessageData {
    pub message_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileData {
    pub file_key: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AddMembersData {
    #[serde(default)]
    pub invalid_id_list: Vec<String>,
}

pub(super) fn text_content(text: &str) -> String {
    json!({ "text": text }).to_string()
}

pub(super) fn file_content(file_key: &str) -> String {
    json!({ "file_key": file_key }).to_string()
}

/// Rich-text post: optional @mention line, then one paragraph per line.
pub(super) fn post_content(title: &str, body: &str, mention: Option<&str>) -> String {
    let mut paragraphs: Vec<Value> = Vec::new();
    if let Some(user) = mention {
        paragraphs.push(json!([{ "tag": "at", "user_id": user }]));
    }
    for line in body.lines() {
        paragraphs.push(json!([{ "tag": "text", "text": line }]));
    }

    json!({
        "zh_cn": {
            "title": title,
            "content": paragraphs,
        }
    })
    .to_string()
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// Prefers the RFC 5987 `filename*=` form when present.
pub(super) fn disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        if let Some(encoded) = part.strip_prefix("filename*=") {
            let value = encoded.rsplit("''").next().unwrap_or(encoded);
            let decoded = percent_decode(value.trim_matches('"'));
            if !decoded.is_empty() {
                return Some(decoded);
            }
        } else if let Some(value) = part.strip_prefix("filename=") {
            let value = value.trim_matches('"');
            if !value.is_empty() {
                plain = Some(value.to_string());
            }
        }
    }
    plain
}

fn percent_decode(value: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes())).into_owned()
}
