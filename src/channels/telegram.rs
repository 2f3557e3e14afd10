//! Telegram channel over the Bot API.
//!
//! Updates arrive by long polling `getUpdates`. Replies use `sendMessage`
//! with Markdown, and are resent as plain text if Telegram rejects the
//! entities. Charts go out through `sendDocument`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::channels::{
    Channel, IncomingMessage, MessageStream, OutgoingResponse, ReplyKeyboard, StatusUpdate,
};
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "telegram";

/// `sendMessage` text limit, in characters.
const MESSAGE_LIMIT: usize = 4096;

/// `sendDocument` caption limit, in characters.
const CAPTION_LIMIT: usize = 1024;

/// Seconds Telegram holds a `getUpdates` request open.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(5);

// ── Bot API wire types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    from: Option<TgUser>,
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    username: Option<String>,
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<serde_json::Value>,
}

// ── Allow-list ──────────────────────────────────────────────────────

/// Usernames or numeric IDs permitted to use the bot. `*` admits everyone.
#[derive(Debug, Clone)]
pub struct AllowList(Vec<String>);

impl AllowList {
    pub fn new(entries: Vec<String>) -> Self {
        Self(entries)
    }

    /// Whether any of the sender's identities is listed. Matches are exact.
    pub fn admits(&self, identities: &[&str]) -> bool {
        self.0.iter().any(|entry| {
            entry == "*" || identities.iter().any(|id| !id.is_empty() && id == entry)
        })
    }
}

// ── Channel ─────────────────────────────────────────────────────────

pub struct TelegramChannel {
    token: SecretString,
    allow: AllowList,
    http: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            token,
            allow: AllowList::new(allowed_users),
            http: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        method_url(&self.token, method)
    }

    /// Send `text`, split to fit the message limit. The keyboard goes on the
    /// last piece.
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&ReplyKeyboard>,
    ) -> Result<(), ChannelError> {
        let pieces = split_message(text, MESSAGE_LIMIT);
        let last = pieces.len().saturating_sub(1);
        for (i, piece) in pieces.iter().enumerate() {
            let markup = keyboard.filter(|_| i == last).map(reply_markup);
            self.send_piece(chat_id, piece, markup).await?;
        }
        Ok(())
    }

    async fn send_piece(
        &self,
        chat_id: &str,
        text: &str,
        reply_markup: Option<serde_json::Value>,
    ) -> Result<(), ChannelError> {
        let mut body = SendMessage {
            chat_id,
            text,
            parse_mode: Some("Markdown"),
            reply_markup,
        };

        let first = self.post_message(&body).await?;
        if first.is_success() {
            return Ok(());
        }
        tracing::warn!(status = %first, "Markdown rejected by Telegram; resending as plain text");

        body.parse_mode = None;
        let second = self.post_message(&body).await?;
        if second.is_success() {
            Ok(())
        } else {
            Err(send_failed(format!(
                "sendMessage returned {first} (markdown) and {second} (plain)"
            )))
        }
    }

    async fn post_message(
        &self,
        body: &SendMessage<'_>,
    ) -> Result<reqwest::StatusCode, ChannelError> {
        self.http
            .post(self.method_url("sendMessage"))
            .json(body)
            .send()
            .await
            .map(|resp| resp.status())
            .map_err(|e| send_failed(redact(e)))
    }

    /// Upload a file with an optional caption and keyboard.
    pub async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
        keyboard: Option<&ReplyKeyboard>,
    ) -> anyhow::Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chart.svg".to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name.clone()));
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        if let Some(keyboard) = keyboard {
            form = form.text("reply_markup", reply_markup(keyboard).to_string());
        }

        let resp = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("sendDocument returned {status}: {body}");
        }

        tracing::debug!(chat_id = %chat_id, file = %file_name, "Document sent");
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(poll_updates(
            self.http.clone(),
            self.method_url("getUpdates"),
            self.allow.clone(),
            tx,
        ));

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        })))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = chat_id(&msg.metadata)
            .ok_or_else(|| send_failed("message metadata has no chat_id"))?;
        let keyboard = response.keyboard.as_ref();

        let Some(path) = response.attachment.as_deref() else {
            return self.send_text(chat_id, &response.content, keyboard).await;
        };

        // The keyboard rides on whichever message goes out last.
        let (lead, caption) = split_attachment_text(&response.content);
        let doc_keyboard = match lead {
            Some(lead) => {
                self.send_text(chat_id, lead, keyboard).await?;
                None
            }
            None => keyboard,
        };
        self.send_document(chat_id, path, caption, doc_keyboard)
            .await
            .map_err(|e| send_failed(e.to_string()))
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        let Some(chat_id) = chat_id(metadata) else {
            return Ok(());
        };
        match status {
            StatusUpdate::Thinking(_) => {
                // Best effort; the reply follows regardless.
                let _ = self
                    .http
                    .post(self.method_url("sendChatAction"))
                    .json(&serde_json::json!({ "chat_id": chat_id, "action": "typing" }))
                    .send()
                    .await;
                Ok(())
            }
            StatusUpdate::Status(text) if text.is_empty() => Ok(()),
            StatusUpdate::Status(text) => self.send_text(chat_id, &text, None).await,
        }
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let startup_failed = |reason: String| ChannelError::StartupFailed {
            name: CHANNEL_NAME.into(),
            reason,
        };
        let resp = self
            .http
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| startup_failed(redact(e)))?;
        let body: ApiResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| startup_failed(redact(e)))?;
        if body.ok {
            Ok(())
        } else {
            Err(startup_failed(
                body.description.unwrap_or_else(|| "getMe failed".to_string()),
            ))
        }
    }
}

/// Long-poll loop. Ends when the receiving side of `tx` is dropped.
async fn poll_updates(
    http: reqwest::Client,
    url: String,
    allow: AllowList,
    tx: tokio::sync::mpsc::UnboundedSender<IncomingMessage>,
) {
    let mut offset = 0;
    tracing::info!("Telegram long polling started");

    loop {
        let request = GetUpdates {
            offset,
            timeout: POLL_TIMEOUT_SECS,
            allowed_updates: ["message"],
        };
        let batch = match fetch_updates(&http, &url, &request).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!("Telegram poll failed: {}", e);
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in batch {
            offset = offset.max(update.update_id + 1);
            let Some(incoming) = to_incoming(update, &allow) else {
                continue;
            };
            if tx.send(incoming).is_err() {
                tracing::info!("Telegram receiver dropped; polling stopped");
                return;
            }
        }
    }
}

async fn fetch_updates(
    http: &reqwest::Client,
    url: &str,
    request: &GetUpdates,
) -> Result<Vec<Update>, String> {
    let resp = http
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(redact)?;
    let body: ApiResponse<Vec<Update>> = resp.json().await.map_err(redact)?;
    match body {
        ApiResponse {
            ok: true,
            result: Some(updates),
            ..
        } => Ok(updates),
        ApiResponse { description, .. } => {
            Err(description.unwrap_or_else(|| "getUpdates returned no result".to_string()))
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn method_url(token: &SecretString, method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{method}", token.expose_secret())
}

/// Split reply text around a document: `(message sent before it, caption)`.
/// Text too long for a caption goes out as a message of its own.
fn split_attachment_text(text: &str) -> (Option<&str>, Option<&str>) {
    let text = text.trim();
    if text.is_empty() {
        (None, None)
    } else if text.chars().count() <= CAPTION_LIMIT {
        (None, Some(text))
    } else {
        (Some(text), None)
    }
}

/// Error text without the request URL, which embeds the bot token.
fn redact(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

fn chat_id(metadata: &serde_json::Value) -> Option<&str> {
    metadata.get("chat_id").and_then(serde_json::Value::as_str)
}

fn send_failed(reason: impl Into<String>) -> ChannelError {
    ChannelError::SendFailed {
        name: CHANNEL_NAME.into(),
        reason: reason.into(),
    }
}

/// Convert a text update from an allowed sender. Everything else is dropped.
fn to_incoming(update: Update, allow: &AllowList) -> Option<IncomingMessage> {
    let message = update.message?;
    let text = message.text?;
    let from = message.from?;

    let user_id = from.id.to_string();
    let username = from.username.unwrap_or_default();
    if !allow.admits(&[username.as_str(), user_id.as_str()]) {
        tracing::warn!(user_id = %user_id, username = %username, "Ignoring message from user not on the allow-list");
        return None;
    }

    let display = from
        .first_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| username.clone());
    Some(
        IncomingMessage::new(CHANNEL_NAME, user_id, text)
            .with_user_name(display)
            .with_metadata(serde_json::json!({
                "chat_id": message.chat.id.to_string(),
                "username": username,
            })),
    )
}

/// Bot API `reply_markup` for a keyboard.
fn reply_markup(keyboard: &ReplyKeyboard) -> serde_json::Value {
    match keyboard {
        ReplyKeyboard::Suggest(buttons) => serde_json::json!({
            "keyboard": buttons
                .iter()
                .map(|b| vec![serde_json::json!({ "text": b })])
                .collect::<Vec<_>>(),
            "one_time_keyboard": true,
            "resize_keyboard": true,
        }),
        ReplyKeyboard::Remove => serde_json::json!({ "remove_keyboard": true }),
    }
}

/// Break `text` into pieces of at most `limit` characters, preferring a
/// newline, then a space, as the cut point.
fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;

    loop {
        let Some((hard_cut, _)) = rest.char_indices().nth(limit) else {
            pieces.push(rest.to_string());
            return pieces;
        };
        let window = &rest[..hard_cut];
        let cut = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(0) | None => hard_cut,
            Some(i) => i,
        };
        pieces.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
        if rest.is_empty() {
            return pieces;
        }
    }
}
