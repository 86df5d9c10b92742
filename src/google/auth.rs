//! Credential lifecycle: load, validate, refresh, interactive consent, persist

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::gcal::CalendarClient;
use super::gmail::GmailClient;
use super::oauth::{self, ClientSecrets, TokenResponse};

/// OAuth token bundle persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

impl Credential {
    /// Google omits the refresh token from refresh responses, so the
    /// prior one is carried forward.
    pub fn from_token_response(token: TokenResponse, prior_refresh_token: Option<String>) -> Self {
        let expiry = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        let scopes = token
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or(prior_refresh_token),
            expiry,
            scopes,
        }
    }

    /// A credential with no recorded expiry is treated as expired.
    pub fn is_valid(&self) -> bool {
        self.expiry.is_some_and(|expiry| expiry > Utc::now())
    }

    pub fn is_refreshable(&self) -> bool {
        !self.is_valid() && self.refresh_token.is_some()
    }
}

/// Read/write contract for the persisted credential. `load` returning
/// `Ok(None)` is the first-run state, not an error.
pub trait CredentialStore {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
}

/// Credential persisted as a JSON file (`token.json`), overwritten on
/// every refresh or consent.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credential from {}", self.path.display()))?;
        let credential = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed credential file {}", self.path.display()))?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let raw = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write credential to {}", self.path.display()))?;
        Ok(())
    }
}

/// Obtains an authorization code from the user. Split out as a trait
/// so the consent path can be driven without a terminal.
pub trait ConsentPrompt {
    fn obtain_code(&self, auth_url: &str) -> Result<String>;
}

/// Prints the authorization URL and reads the pasted code from stdin.
pub struct StdinConsent;

impl ConsentPrompt for StdinConsent {
    fn obtain_code(&self, auth_url: &str) -> Result<String> {
        println!(
            "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
            auth_url
        );
        print!("Paste the authorization code shown by Google here: ");
        io::stdout().flush()?;
        let mut code = String::new();
        io::stdin()
            .read_line(&mut code)
            .context("Failed to read authorization code")?;
        Ok(code.trim().to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(
        "client secrets not found at {}; download credentials.json from the Google Cloud Console",
        .0.display()
    )]
    MissingClientSecrets(PathBuf),
    #[error("failed to load client secrets: {0:#}")]
    BadClientSecrets(#[source] anyhow::Error),
    #[error("credential store error: {0:#}")]
    Store(#[source] anyhow::Error),
    #[error("authorization failed: {0:#}")]
    Consent(#[source] anyhow::Error),
}

/// Service handles bound to an authenticated access token. The raw
/// credential stays inside the manager.
pub struct AuthenticatedServices {
    pub gmail: GmailClient,
    pub calendar: CalendarClient,
}

pub struct CredentialManager<S, P> {
    store: S,
    consent: P,
    secrets_path: PathBuf,
    redirect_uri: String,
}

impl<S: CredentialStore, P: ConsentPrompt> CredentialManager<S, P> {
    pub fn new(
        store: S,
        consent: P,
        secrets_path: impl Into<PathBuf>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            store,
            consent,
            secrets_path: secrets_path.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Produce one handle per service, refreshing the credential or
    /// running the consent flow as needed.
    pub async fn authenticate(&self) -> Result<AuthenticatedServices, AuthError> {
        let credential = self.obtain_credential().await?;
        Ok(AuthenticatedServices {
            gmail: GmailClient::new(&credential.access_token),
            calendar: CalendarClient::new(&credential.access_token),
        })
    }

    /// Load, refresh, or mint a credential. The store is only written
    /// after a successful exchange.
    pub async fn obtain_credential(&self) -> Result<Credential, AuthError> {
        let existing = self.store.load().map_err(AuthError::Store)?;

        if let Some(credential) = &existing
            && credential.is_valid()
        {
            return Ok(credential.clone());
        }

        // Both the refresh and the consent exchange need the client
        // registration artifact.
        let secrets = self.load_secrets()?;

        if let Some(credential) = &existing
            && let Some(refresh_token) = credential.refresh_token.clone()
        {
            match oauth::refresh_access_token(&secrets, &refresh_token).await {
                Ok(token) => {
                    let refreshed = Credential::from_token_response(token, Some(refresh_token));
                    self.store.save(&refreshed).map_err(AuthError::Store)?;
                    tracing::info!("Refreshed access token");
                    return Ok(refreshed);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Token refresh failed, starting interactive consent");
                }
            }
        }

        self.interactive_consent(&secrets).await
    }

    async fn interactive_consent(&self, secrets: &ClientSecrets) -> Result<Credential, AuthError> {
        let auth_url = secrets.authorization_url(&self.redirect_uri);
        let code = self
            .consent
            .obtain_code(&auth_url)
            .map_err(AuthError::Consent)?;
        let token = oauth::exchange_code_for_token(secrets, &code, &self.redirect_uri)
            .await
            .map_err(AuthError::Consent)?;
        let credential = Credential::from_token_response(token, None);
        self.store.save(&credential).map_err(AuthError::Store)?;
        tracing::info!("Saved new credential");
        Ok(credential)
    }

    fn load_secrets(&self) -> Result<ClientSecrets, AuthError> {
        if !self.secrets_path.exists() {
            return Err(AuthError::MissingClientSecrets(self.secrets_path.clone()));
        }
        ClientSecrets::from_file(&self.secrets_path).map_err(AuthError::BadClientSecrets)
    }
}
