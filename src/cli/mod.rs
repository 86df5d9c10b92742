//! Command line entry point: authenticate, fetch, validate, write.

use clap::Parser;

use crate::core::AppConfig;
use crate::extract::render::{self, OutputFormat};
use crate::extract::{self, validate};
use crate::google::auth::{
    AuthError, AuthenticatedServices, CredentialManager, FileCredentialStore, StdinConsent,
};

#[derive(Parser)]
#[command(author, version, about = "Extract recent Gmail and Google Calendar data", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    output_format: OutputFormat,

    /// Verify API access without fetching any data
    #[arg(long, action, default_value = "false")]
    test: bool,

    /// Fetch and validate without writing an output file
    #[arg(long, action, default_value = "false")]
    validate_only: bool,

    /// Maximum number of inbox messages to fetch
    #[arg(long, default_value_t = 50)]
    max_results: u32,

    /// Number of days of upcoming calendar events to fetch
    #[arg(long, default_value_t = 7)]
    days_ahead: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("API access check failed: {0:#}")]
    AccessCheck(#[source] anyhow::Error),
    #[error("output failed validation")]
    Validation,
    #[error("failed to serialize result: {0:#}")]
    Serialize(#[source] anyhow::Error),
    #[error("failed to save output: {0:#}")]
    Save(#[source] anyhow::Error),
}

impl RunError {
    /// Save failures get their own exit code so callers can tell a
    /// write error apart from an authentication or validation error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Save(_) => 2,
            _ => 1,
        }
    }
}

pub async fn run() -> Result<(), RunError> {
    let args = Cli::parse();
    let config = AppConfig::default();

    let manager = CredentialManager::new(
        FileCredentialStore::new(&config.token_path),
        StdinConsent,
        &config.credentials_path,
        config.redirect_uri.clone(),
    );
    let services = manager.authenticate().await?;
    tracing::info!("Authentication successful");

    if args.test {
        return check_access(&services).await;
    }

    let result = extract::extract_all(
        &services.gmail,
        &services.calendar,
        args.max_results,
        args.days_ahead,
    )
    .await;

    let value = serde_json::to_value(&result).map_err(|err| RunError::Serialize(err.into()))?;
    if !validate::validate(&value) {
        return Err(RunError::Validation);
    }

    if args.validate_only {
        println!("Output format is valid");
        return Ok(());
    }

    let path = render::write_output(&result, args.output_format).map_err(RunError::Save)?;
    println!("Output saved to {}", path.display());
    Ok(())
}

/// Access-check-only mode: verify both services answer with this
/// credential, print what was verified, fetch nothing.
async fn check_access(services: &AuthenticatedServices) -> Result<(), RunError> {
    let email = services
        .gmail
        .check_access()
        .await
        .map_err(RunError::AccessCheck)?;
    println!("Gmail access verified: {email}");

    let summary = services
        .calendar
        .check_access()
        .await
        .map_err(RunError::AccessCheck)?;
    println!("Calendar access verified: {summary}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunError::Validation.exit_code(), 1);
        assert_eq!(
            RunError::Save(anyhow::anyhow!("disk full")).exit_code(),
            2
        );
        assert_eq!(
            RunError::Auth(AuthError::MissingClientSecrets("credentials.json".into())).exit_code(),
            1
        );
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["gfetch"]);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert!(!cli.test);
        assert!(!cli.validate_only);
        assert_eq!(cli.max_results, 50);
        assert_eq!(cli.days_ahead, 7);
    }

    #[test]
    fn test_cli_markdown_format() {
        let cli = Cli::parse_from(["gfetch", "--output-format", "md", "--days-ahead", "14"]);
        assert_eq!(cli.output_format, OutputFormat::Md);
        assert_eq!(cli.days_ahead, 14);
    }
}
