//! Produce, validate, and serialize the combined Gmail and Calendar
//! extract.

pub mod render;
pub mod validate;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::google::gcal::{CalendarClient, CalendarEvent};
use crate::google::gmail::{EmailRecord, GmailClient};

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractMetadata {
    pub extracted_at: String,
    pub total_emails: usize,
    pub total_calendar_events: usize,
    pub version: String,
}

/// The single structure handed from the fetchers to the validator and
/// the renderers. Built fresh on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub metadata: ExtractMetadata,
    pub emails: Vec<EmailRecord>,
    pub calendar_events: Vec<CalendarEvent>,
}

impl ExtractionResult {
    pub fn new(emails: Vec<EmailRecord>, calendar_events: Vec<CalendarEvent>) -> Self {
        Self {
            metadata: ExtractMetadata {
                extracted_at: Utc::now().to_rfc3339(),
                total_emails: emails.len(),
                total_calendar_events: calendar_events.len(),
                version: SCHEMA_VERSION.to_string(),
            },
            emails,
            calendar_events,
        }
    }
}

/// Run both fetchers and merge into a single result. The fetchers are
/// independent and run concurrently; neither starts before the caller
/// has an authenticated handle. A failed fetch is logged with its
/// source and degrades to an empty list so the other source still
/// makes it into the output.
pub async fn extract_all(
    gmail: &GmailClient,
    calendar: &CalendarClient,
    max_results: u32,
    days_ahead: i64,
) -> ExtractionResult {
    tracing::info!(max_results, days_ahead, "Starting data extraction");

    let (emails, events) = tokio::join!(
        gmail.fetch_recent(max_results),
        calendar.fetch_upcoming(days_ahead),
    );

    let emails = match emails {
        Ok(emails) => {
            tracing::info!(count = emails.len(), "Fetched emails");
            emails
        }
        Err(err) => {
            tracing::error!(source = "gmail", error = %err, "Fetch failed, continuing with no emails");
            Vec::new()
        }
    };

    let calendar_events = match events {
        Ok(events) => {
            tracing::info!(count = events.len(), "Fetched calendar events");
            events
        }
        Err(err) => {
            tracing::error!(source = "calendar", error = %err, "Fetch failed, continuing with no events");
            Vec::new()
        }
    };

    ExtractionResult::new(emails, calendar_events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::gcal::Attendee;

    pub(crate) fn sample_email() -> EmailRecord {
        EmailRecord {
            id: "msg_001".to_string(),
            subject: "Q1 Report".to_string(),
            sender: "a@b.com".to_string(),
            date: "2024-01-01T10:00:00+00:00".to_string(),
            snippet: "Numbers attached".to_string(),
            thread_id: "thr_001".to_string(),
            labels: vec!["INBOX".to_string()],
        }
    }

    pub(crate) fn sample_event() -> CalendarEvent {
        CalendarEvent {
            id: "evt_001".to_string(),
            summary: "Planning sync".to_string(),
            description: "Quarterly planning".to_string(),
            start: "2024-03-15T10:00:00+00:00".to_string(),
            end: "2024-03-15T11:00:00+00:00".to_string(),
            location: "Room 2".to_string(),
            attendees: vec![Attendee {
                email: "a@b.com".to_string(),
                display_name: "Alice".to_string(),
                response_status: "accepted".to_string(),
            }],
            creator: "organizer@example.com".to_string(),
            status: "confirmed".to_string(),
        }
    }

    #[test]
    fn test_metadata_counts_match_lists() {
        let result = ExtractionResult::new(vec![sample_email()], vec![sample_event(), sample_event()]);
        assert_eq!(result.metadata.total_emails, 1);
        assert_eq!(result.metadata.total_calendar_events, 2);
        assert_eq!(result.metadata.version, SCHEMA_VERSION);
        assert!(chrono::DateTime::parse_from_rfc3339(&result.metadata.extracted_at).is_ok());
    }

    #[tokio::test]
    async fn test_extract_all_degrades_failed_sources_to_empty() {
        // Neither mock server exists, so both fetches fail; the run
        // still produces a well-formed result.
        let gmail = GmailClient::with_base_url("t", "http://127.0.0.1:1");
        let calendar = CalendarClient::with_base_url("t", "http://127.0.0.1:1");

        let result = extract_all(&gmail, &calendar, 5, 7).await;
        assert!(result.emails.is_empty());
        assert!(result.calendar_events.is_empty());
        assert_eq!(result.metadata.total_emails, 0);
    }
}
