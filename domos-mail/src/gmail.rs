use crate::error::{MailError, Result};
use crate::mime::{
    build_mime_message, charset_param, decode_charset, decode_header_value, extract_email_address,
};
use crate::traits::{MailTransport, MailboxSource};
use crate::types::{InboundEmail, MailboxSession, OutboundEmail};
use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail pads some body payloads and not others.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Clone)]
pub struct GmailClient {
    http: reqwest::Client,
    access_token: String,
    query: String,
}

impl GmailClient {
    pub fn new(access_token: &str) -> Result<Self> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(MailError::InvalidInput(
                "gmail access token is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MailError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            access_token: token.to_string(),
            query: "in:inbox is:unread".to_string(),
        })
    }

    pub fn with_query(mut self, query: String) -> Self {
        self.query = query;
        self
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{GMAIL_API_BASE}/{path}"))
            .map_err(|e| MailError::InvalidInput(e.to_string()))
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.access_token)
    }

    /// Follows `nextPageToken` until the listing is exhausted or `limit` refs are collected.
    async fn list_message_refs(&self, limit: Option<usize>) -> Result<Vec<GmailMessageRef>> {
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;
        while let Some(page_size) = next_page_size(limit, refs.len()) {
            let url = self.api_url("messages")?;
            let mut req = self.auth(self.http.get(url)).query(&[
                ("q", self.query.clone()),
                ("maxResults", page_size.to_string()),
            ]);
            if let Some(token) = page_token.as_deref() {
                req = req.query(&[("pageToken", token)]);
            }
            let resp = req.send().await?;
            let payload: GmailListMessagesResponse = read_json(resp, "list messages").await?;
            refs.extend(payload.messages);

            match payload.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if let Some(limit) = limit {
            refs.truncate(limit);
        }
        Ok(refs)
    }

    async fn fetch_message(&self, message_id: &str) -> Result<InboundEmail> {
        let url = self.api_url(&format!("messages/{message_id}"))?;
        let resp = self
            .auth(self.http.get(url).query(&[("format", "full")]))
            .send()
            .await?;
        let message: GmailMessage =
            read_json(resp, &format!("get message id={message_id}")).await?;

        let payload = message.payload.ok_or_else(|| {
            MailError::InvalidMessage(format!("gmail message {message_id} has no payload"))
        })?;
        let from = payload.header_value("From").ok_or_else(|| {
            MailError::InvalidMessage(format!("gmail message {message_id} missing From header"))
        })?;
        let subject = payload
            .header_value("Subject")
            .map(|s| decode_header_value(&s))
            .unwrap_or_default();
        let body = self.body_text(message_id, &payload).await?;

        Ok(InboundEmail {
            id: message.id,
            sender_address: extract_email_address(&from),
            from,
            subject,
            body,
        })
    }

    async fn body_text(&self, message_id: &str, payload: &GmailPart) -> Result<String> {
        let Some(part) = payload.body_part() else {
            tracing::debug!(message_id, "message has no text/plain part");
            return Ok(String::new());
        };

        let bytes = match part.body.as_ref() {
            Some(GmailBody {
                data: Some(data), ..
            }) => decode_body_data(data)?,
            Some(GmailBody {
                attachment_id: Some(attachment_id),
                ..
            }) => {
                let data = self.fetch_attachment(message_id, attachment_id).await?;
                decode_body_data(&data)?
            }
            _ => Vec::new(),
        };

        let charset = part
            .header_value("Content-Type")
            .and_then(|ct| charset_param(&ct))
            .unwrap_or_else(|| "utf-8".to_string());
        Ok(decode_charset(&charset, &bytes))
    }

    async fn fetch_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        let url = self.api_url(&format!(
            "messages/{message_id}/attachments/{attachment_id}"
        ))?;
        let resp = self.auth(self.http.get(url)).send().await?;
        let body: GmailBody = read_json(resp, "get attachment").await?;
        body.data.ok_or_else(|| {
            MailError::InvalidMessage(format!(
                "attachment {attachment_id} of message {message_id} has no data"
            ))
        })
    }
}

#[async_trait]
impl MailboxSource for GmailClient {
    #[tracing::instrument(level = "info", skip_all)]
    async fn connect(&self) -> Result<MailboxSession> {
        let url = self.api_url("profile")?;
        let resp = self.auth(self.http.get(url)).send().await?;
        let profile: GmailProfile = read_json(resp, "get profile").await?;
        tracing::info!(email_address = %profile.email_address, "gmail mailbox connected");
        Ok(MailboxSession {
            email_address: profile.email_address,
        })
    }

    #[tracing::instrument(level = "info", skip_all)]
    async fn list_unread(
        &self,
        _session: &MailboxSession,
        limit: Option<usize>,
    ) -> Result<Vec<InboundEmail>> {
        let refs = self.list_message_refs(limit).await?;
        let mut out = Vec::with_capacity(refs.len());
        for message_ref in refs {
            match self.fetch_message(&message_ref.id).await {
                Ok(message) => out.push(message),
                Err(e) => {
                    tracing::warn!(message_id = %message_ref.id, error = %e, "skipping unreadable message");
                }
            }
        }
        tracing::info!(count = out.len(), "unread messages fetched");
        Ok(out)
    }

    async fn mark_processed(&self, _session: &MailboxSession, message_id: &str) -> Result<()> {
        let url = self.api_url(&format!("messages/{message_id}/modify"))?;
        let payload = serde_json::json!({
            "removeLabelIds": ["UNREAD"]
        });
        let resp = self.auth(self.http.post(url)).json(&payload).send().await?;
        ensure_success(resp, &format!("modify id={message_id}")).await?;
        Ok(())
    }
}

#[async_trait]
impl MailTransport for GmailClient {
    async fn deliver(&self, message: &OutboundEmail) -> Result<()> {
        let mime = build_mime_message(
            &message.from,
            &message.to,
            message.cc.as_deref(),
            &message.subject,
            &message.body,
        );
        let payload = serde_json::json!({ "raw": URL_SAFE_NO_PAD.encode(mime.as_bytes()) });

        let url = self.api_url("messages/send")?;
        let resp = self.auth(self.http.post(url)).json(&payload).send().await?;
        ensure_success(resp, "send").await?;

        tracing::info!(to = %message.to, cc = ?message.cc, "email message sent");
        Ok(())
    }
}

async fn ensure_success(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response body>".to_string());
    let detail = format!("gmail {what} failed: status={status} body={body}");
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(MailError::Auth(detail));
    }
    Err(MailError::Api(detail))
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> Result<T> {
    let resp = ensure_success(resp, what).await?;
    resp.json()
        .await
        .map_err(|e| MailError::Api(format!("gmail {what} returned unexpected json: {e}")))
}

fn decode_body_data(data: &str) -> Result<Vec<u8>> {
    GMAIL_BASE64
        .decode(data.trim())
        .map_err(|e| MailError::InvalidMessage(format!("body is not base64url: {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailProfile {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct GmailListMessagesResponse {
    #[serde(default)]
    messages: Vec<GmailMessageRef>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Gmail caps `maxResults` at 500.
const MAX_PAGE_SIZE: usize = 500;

fn next_page_size(limit: Option<usize>, collected: usize) -> Option<usize> {
    match limit {
        None => Some(MAX_PAGE_SIZE),
        Some(limit) if collected >= limit => None,
        Some(limit) => Some((limit - collected).min(MAX_PAGE_SIZE)),
    }
}

#[derive(Debug, Deserialize)]
struct GmailMessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    payload: Option<GmailPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<GmailHeader>,
    #[serde(default)]
    body: Option<GmailBody>,
    #[serde(default)]
    parts: Vec<GmailPart>,
}

impl GmailPart {
    fn header_value(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    }

    fn is_multipart(&self) -> bool {
        self.mime_type
            .to_ascii_lowercase()
            .starts_with("multipart/")
    }

    /// A single-part message is its own body; a multipart one yields its first
    /// `text/plain` part in depth-first order.
    fn body_part(&self) -> Option<&GmailPart> {
        if !self.is_multipart() {
            return Some(self);
        }
        self.first_text_plain()
    }

    fn first_text_plain(&self) -> Option<&GmailPart> {
        if self.mime_type.eq_ignore_ascii_case("text/plain") {
            return Some(self);
        }
        self.parts.iter().find_map(GmailPart::first_text_plain)
    }
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailBody {
    #[serde(default)]
    attachment_id: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(json: serde_json::Value) -> GmailPart {
        serde_json::from_value(json).expect("valid part")
    }

    #[test]
    fn listing_pages_until_limit_is_met() {
        assert_eq!(next_page_size(None, 0), Some(500));
        assert_eq!(next_page_size(None, 1500), Some(500));
        assert_eq!(next_page_size(Some(20), 0), Some(20));
        assert_eq!(next_page_size(Some(700), 500), Some(200));
        assert_eq!(next_page_size(Some(20), 20), None);
    }

    #[test]
    fn list_response_carries_page_token() {
        let page: GmailListMessagesResponse = serde_json::from_value(serde_json::json!({
            "messages": [{ "id": "a", "threadId": "t" }],
            "nextPageToken": "p2",
            "resultSizeEstimate": 201
        }))
        .expect("list page");
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("p2"));

        let last: GmailListMessagesResponse =
            serde_json::from_value(serde_json::json!({ "resultSizeEstimate": 0 })).expect("empty");
        assert!(last.messages.is_empty());
        assert!(last.next_page_token.is_none());
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(matches!(GmailClient::new("  "), Err(MailError::InvalidInput(_))));
        assert!(GmailClient::new("ya29.token").is_ok());
    }

    #[test]
    fn multipart_selects_first_plain_text_part_depth_first() {
        let payload = part(serde_json::json!({
            "mimeType": "multipart/mixed",
            "parts": [
                {
                    "mimeType": "multipart/alternative",
                    "parts": [
                        { "mimeType": "text/html", "body": { "data": "PGI-aGk8L2I-" } },
                        { "mimeType": "text/plain", "body": { "data": "Zmlyc3Q" } }
                    ]
                },
                { "mimeType": "text/plain", "body": { "data": "c2Vjb25k" } }
            ]
        }));
        let chosen = payload.body_part().expect("plain part");
        let data = chosen.body.as_ref().and_then(|b| b.data.clone()).expect("data");
        assert_eq!(decode_body_data(&data).expect("decode"), b"first");
    }

    #[test]
    fn multipart_without_plain_text_has_no_body() {
        let payload = part(serde_json::json!({
            "mimeType": "multipart/alternative",
            "parts": [{ "mimeType": "text/html", "body": { "data": "PHA-aGk8L3A-" } }]
        }));
        assert!(payload.body_part().is_none());
    }

    #[test]
    fn single_part_message_is_its_own_body() {
        let payload = part(serde_json::json!({
            "mimeType": "text/plain",
            "headers": [{ "name": "content-type", "value": "text/plain; charset=ISO-8859-1" }],
            "body": { "data": "Y2Fm6Q==" }
        }));
        let chosen = payload.body_part().expect("body");
        let bytes = decode_body_data(
            chosen.body.as_ref().and_then(|b| b.data.as_deref()).expect("data"),
        )
        .expect("decode");
        let charset = chosen
            .header_value("Content-Type")
            .and_then(|ct| charset_param(&ct))
            .expect("charset");
        assert_eq!(decode_charset(&charset, &bytes), "café");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let payload = part(serde_json::json!({
            "mimeType": "text/plain",
            "headers": [{ "name": "SUBJECT", "value": "Leak" }]
        }));
        assert_eq!(payload.header_value("Subject").as_deref(), Some("Leak"));
        assert_eq!(payload.header_value("From"), None);
    }
}
