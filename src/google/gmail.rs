//! Gmail API client for listing recent inbox mail and normalizing each
//! message into a flat record. The Gmail API output is messy; missing
//! headers and malformed dates are expected and take defaults.

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

const SNIPPET_MAX_CHARS: usize = 200;

/// Message structures from Gmail API documentation
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    pub snippet: Option<String>,
    pub payload: Option<MessagePayload>,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub headers: Option<Vec<MessageHeader>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

/// Normalized email record. The first five fields are always present
/// with deterministic defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub snippet: String,
    pub thread_id: String,
    pub labels: Vec<String>,
}

/// Handle for issuing Gmail requests with an access token already
/// attached.
pub struct GmailClient {
    http: Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    pub fn new(access_token: &str) -> Self {
        Self::with_base_url(access_token, GMAIL_API_BASE)
    }

    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Verify Gmail access and return the authenticated email address.
    pub async fn check_access(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Profile {
            #[serde(rename = "emailAddress")]
            email_address: Option<String>,
        }

        let url = format!("{}/users/me/profile", self.base_url);
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Gmail profile fetch failed: {} ({})", status, text);
        }
        let profile: Profile = serde_json::from_str(&text)?;
        Ok(profile.email_address.unwrap_or_else(|| "Unknown".to_string()))
    }

    /// Fetch up to `max_results` recent inbox messages as normalized
    /// records, one detail request per message. Any transport failure
    /// fails the whole fetch so a partial result is never mistaken for
    /// a complete one.
    pub async fn fetch_recent(&self, max_results: u32) -> Result<Vec<EmailRecord>> {
        let refs = self.list_inbox(max_results).await?;
        let mut records = Vec::with_capacity(refs.len());
        for msg_ref in refs {
            let message = self.get_message(&msg_ref.id).await?;
            records.push(normalize_message(message));
        }
        Ok(records)
    }

    async fn list_inbox(&self, max_results: u32) -> Result<Vec<MessageRef>> {
        let url = format!(
            "{}/users/me/messages?labelIds=INBOX&maxResults={}",
            self.base_url, max_results
        );
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Message list failed: {} ({})", status, text);
        }
        let msgs: ListMessagesResponse = serde_json::from_str(&text)?;
        Ok(msgs.messages.unwrap_or_default())
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        let url = format!("{}/users/me/messages/{}?format=full", self.base_url, id);
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Message fetch failed for {}: {} ({})", id, status, text);
        }
        let message: Message = serde_json::from_str(&text)?;
        Ok(message)
    }
}

/// Collapse a raw Gmail message into the canonical record.
pub fn normalize_message(message: Message) -> EmailRecord {
    let headers = message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_deref())
        .unwrap_or_default();

    let subject = header_value(headers, "subject")
        .map(clean_unicode)
        .unwrap_or_else(|| "No Subject".to_string());
    let sender = header_value(headers, "from")
        .map(clean_unicode)
        .unwrap_or_else(|| "Unknown".to_string());
    let date = normalize_date(header_value(headers, "date"));
    let snippet = truncate_chars(
        &message.snippet.as_deref().map(clean_unicode).unwrap_or_default(),
        SNIPPET_MAX_CHARS,
    );

    EmailRecord {
        id: message.id,
        subject,
        sender,
        date,
        snippet,
        thread_id: message.thread_id.unwrap_or_default(),
        labels: message.label_ids.unwrap_or_default(),
    }
}

/// Header names are matched case-insensitively; providers disagree on
/// casing.
fn header_value<'a>(headers: &'a [MessageHeader], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Parse an RFC 2822 Date header into RFC 3339. A missing or
/// malformed date substitutes the current wall-clock time, a
/// deliberate lossy fallback.
fn normalize_date(raw: Option<&str>) -> String {
    raw.and_then(|value| DateTime::parse_from_rfc2822(value.trim()).ok())
        .map(|parsed| parsed.to_rfc3339())
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

/// Truncation is by character count with no word-boundary awareness.
fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Decode unicode characters from quoted-printable or HTML entities
fn clean_unicode(content: &str) -> String {
    let mut content = content.to_string();

    // Decode quoted-printable (common in Gmail)
    // Handle patterns like =E2=80=99, =20, etc.
    content = decode_quoted_printable(&content);

    // Decode HTML entities (e.g., &amp; &#x2019;)
    content = html_entity_decode(&content);

    // Clean up common encoding artifacts (escaped sequences like \u2019)
    let escape_re = Regex::new(r"\\u([0-9a-fA-F]{4})").unwrap();
    content = escape_re
        .replace_all(&content, |caps: &regex::Captures| {
            if let Some(hex) = caps.get(1)
                && let Ok(codepoint) = u32::from_str_radix(hex.as_str(), 16)
                && let Some(c) = char::from_u32(codepoint)
            {
                return c.to_string();
            }
            caps.get(0).unwrap().as_str().to_string()
        })
        .to_string();

    // Convert smart quotes to regular quotes
    content = content.replace('\u{2019}', "'");
    content = content.replace('\u{2018}', "'");
    content = content.replace('\u{201c}', "\"");
    content = content.replace('\u{201d}', "\"");

    content
}

/// Decode quoted-printable encoded strings (e.g., =E2=80=99)
fn decode_quoted_printable(input: &str) -> String {
    let mut bytes = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '=' && i + 2 < chars.len() {
            // Check for soft line break: =\n
            if chars[i + 1] == '\n' {
                i += 2;
            } else if chars[i + 1] == '\r' && i + 3 < chars.len() && chars[i + 2] == '\n' {
                i += 3;
            } else {
                // Try to parse =XX hex sequence
                let hex_str: String = chars[i + 1..=i + 2].iter().collect();
                if let Ok(byte_val) = u8::from_str_radix(&hex_str, 16) {
                    bytes.push(byte_val);
                    i += 3;
                } else {
                    // Invalid hex, keep the '=' and continue
                    bytes.push(b'=');
                    i += 1;
                }
            }
        } else {
            for byte in chars[i].to_string().bytes() {
                bytes.push(byte);
            }
            i += 1;
        }
    }

    String::from_utf8_lossy(&bytes).to_string()
}

/// Decode HTML entities in a string
fn html_entity_decode(input: &str) -> String {
    let mut result = input.to_string();

    // Named entities
    result = result.replace("&amp;", "&");
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&apos;", "'");
    result = result.replace("&nbsp;", " ");

    // Numeric entities (&#123; or &#x1F600;)
    let numeric_entity = Regex::new(r"&(#(\d+)|#x([0-9a-fA-F]+));").unwrap();
    result = numeric_entity
        .replace_all(&result, |caps: &regex::Captures| {
            if let Some(decimal) = caps.get(2) {
                if let Ok(codepoint) = decimal.as_str().parse::<u32>()
                    && let Some(c) = char::from_u32(codepoint)
                {
                    return c.to_string();
                }
            } else if let Some(hex) = caps.get(3) {
                if let Ok(codepoint) = u32::from_str_radix(hex.as_str(), 16)
                    && let Some(c) = char::from_u32(codepoint)
                {
                    return c.to_string();
                }
            }
            caps.get(0).unwrap().as_str().to_string()
        })
        .to_string();

    result
}
