//! Google Calendar API client for listing upcoming events on the
//! primary calendar, recurring events pre-expanded to single
//! occurrences.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const MAX_EVENTS: u32 = 50;

/// Event structures from Calendar API documentation
#[derive(Debug, Deserialize)]
pub struct ListEventsResponse {
    pub items: Option<Vec<Event>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub creator: Option<EventCreator>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub attendees: Option<Vec<EventAttendee>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventCreator {
    pub email: Option<String>,
}

/// Either `date` (all-day events) or `dateTime` is set, never both.
#[derive(Debug, Clone, Deserialize)]
pub struct EventTime {
    pub date: Option<String>,
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventAttendee {
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "responseStatus")]
    pub response_status: Option<String>,
}

/// Normalized calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub attendees: Vec<Attendee>,
    pub creator: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub display_name: String,
    pub response_status: String,
}

/// Handle for issuing Calendar requests with an access token already
/// attached.
pub struct CalendarClient {
    http: Client,
    access_token: String,
    base_url: String,
}

impl CalendarClient {
    pub fn new(access_token: &str) -> Self {
        Self::with_base_url(access_token, CALENDAR_API_BASE)
    }

    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Verify Calendar access and return the primary calendar summary.
    pub async fn check_access(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Calendar {
            summary: Option<String>,
        }

        let url = format!("{}/calendars/primary", self.base_url);
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Calendar fetch failed: {} ({})", status, text);
        }
        let calendar: Calendar = serde_json::from_str(&text)?;
        Ok(calendar.summary.unwrap_or_else(|| "Unknown".to_string()))
    }

    /// Fetch upcoming events in the window `[now, now + days_ahead]`
    /// as normalized records, ordered by start time ascending.
    pub async fn fetch_upcoming(&self, days_ahead: i64) -> Result<Vec<CalendarEvent>> {
        let now = Utc::now();
        let end = now + chrono::Duration::days(days_ahead);
        let events = self.list_events(now, end).await?;
        Ok(events.into_iter().map(normalize_event).collect())
    }

    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let url = format!(
            "{}/calendars/primary/events?timeMin={}&timeMax={}&maxResults={}&singleEvents=true&orderBy=startTime",
            self.base_url,
            urlencoding::encode(&time_min.to_rfc3339_opts(SecondsFormat::Secs, true)),
            urlencoding::encode(&time_max.to_rfc3339_opts(SecondsFormat::Secs, true)),
            MAX_EVENTS,
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
            anyhow::bail!("Event list failed: {} ({})", status, text);
        }
        let events: ListEventsResponse = serde_json::from_str(&text)?;
        Ok(events.items.unwrap_or_default())
    }
}

/// Collapse a raw Calendar event into the canonical record. A bad
/// timestamp never fails the event; the raw value passes through.
pub fn normalize_event(event: Event) -> CalendarEvent {
    let start = event
        .start
        .as_ref()
        .map(normalize_event_time)
        .unwrap_or_default();
    let end = event
        .end
        .as_ref()
        .map(normalize_event_time)
        .unwrap_or_default();

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .map(|attendee| Attendee {
            email: attendee.email.unwrap_or_default(),
            display_name: attendee.display_name.unwrap_or_default(),
            response_status: attendee
                .response_status
                .unwrap_or_else(|| "needsAction".to_string()),
        })
        .collect();

    CalendarEvent {
        id: event.id,
        summary: event.summary.unwrap_or_else(|| "No Title".to_string()),
        description: event.description.unwrap_or_default(),
        start,
        end,
        location: event.location.unwrap_or_default(),
        attendees,
        creator: event
            .creator
            .and_then(|creator| creator.email)
            .unwrap_or_default(),
        status: event.status.unwrap_or_else(|| "confirmed".to_string()),
    }
}

fn normalize_event_time(time: &EventTime) -> String {
    let raw = time
        .date_time
        .as_deref()
        .or(time.date.as_deref())
        .unwrap_or_default();
    normalize_timestamp(raw)
}

/// Timestamps are re-rendered as RFC 3339 with their offset; date-only
/// values stay date-only rather than being promoted to midnight
/// timestamps. Anything unparsable passes through unchanged.
fn normalize_timestamp(raw: &str) -> String {
    if !raw.contains('T') {
        return raw.to_string();
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.to_rfc3339(),
        Err(_) => raw.to_string(),
    }
}
