//! OAuth 2.0 exchanges against Google's token endpoint

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

pub const GMAIL_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Client registration downloaded from the Google Cloud Console
/// (`credentials.json`). Only the `installed` application type is
/// supported.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: ClientSecrets,
}

impl ClientSecrets {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secrets from {}", path.display()))?;
        let file: ClientSecretsFile = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed client secrets file {}", path.display()))?;
        Ok(file.installed)
    }

    /// Build the URL the user must open in a browser to grant read
    /// access to Gmail and Calendar.
    pub fn authorization_url(&self, redirect_uri: &str) -> String {
        let scope = format!("{} {}", GMAIL_SCOPE, CALENDAR_SCOPE);
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_uri,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
        )
    }
}

/// Token payload returned by both the code and refresh exchanges.
/// Google omits `refresh_token` on refresh responses.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

/// Exchange an authorization code for an access and refresh token.
pub async fn exchange_code_for_token(
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    let client = Client::new();
    let params = [
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("grant_type", "authorization_code"),
    ];
    let res = client.post(&secrets.token_uri).form(&params).send().await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Code exchange failed: {} ({})", status, text);
    }
    let token: TokenResponse = serde_json::from_str(&text)?;
    Ok(token)
}

/// Exchange a refresh token for a fresh access token.
pub async fn refresh_access_token(
    secrets: &ClientSecrets,
    refresh_token: &str,
) -> Result<TokenResponse> {
    let client = Client::new();
    let params = [
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    let res = client.post(&secrets.token_uri).form(&params).send().await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Token refresh failed: {} ({})", status, text);
    }
    let token: TokenResponse = serde_json::from_str(&text)?;
    Ok(token)
}
