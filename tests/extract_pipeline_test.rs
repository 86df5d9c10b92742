//! End-to-end tests for the fetch, validate, and render pipeline
//! against mocked Gmail and Calendar APIs.

#[cfg(test)]
mod tests {
    use gfetch::extract::render::{render_json, render_markdown};
    use gfetch::extract::{extract_all, validate::validate, ExtractionResult};
    use gfetch::google::gcal::CalendarClient;
    use gfetch::google::gmail::GmailClient;

    async fn mock_gmail(server: &mut mockito::ServerGuard) -> (mockito::Mock, mockito::Mock) {
        let list = server
            .mock("GET", "/users/me/messages")
            .match_query(mockito::Matcher::Regex("labelIds=INBOX".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"messages": [{"id": "msg_001", "threadId": "thr_001"}]}"#)
            .create_async()
            .await;

        let detail = server
            .mock("GET", "/users/me/messages/msg_001?format=full")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "msg_001",
                    "threadId": "thr_001",
                    "snippet": "Numbers attached",
                    "labelIds": ["INBOX", "IMPORTANT"],
                    "payload": {
                        "mimeType": "text/plain",
                        "headers": [
                            {"name": "Subject", "value": "Q1 Report"},
                            {"name": "From", "value": "a@b.com"},
                            {"name": "Date", "value": "Mon, 01 Jan 2024 10:00:00 +0000"}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        (list, detail)
    }

    async fn mock_calendar(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/calendars/primary/events")
            .match_query(mockito::Matcher::Regex("singleEvents=true".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "items": [
                        {
                            "id": "evt_001",
                            "summary": "Planning sync",
                            "status": "confirmed",
                            "creator": {"email": "organizer@example.com"},
                            "start": {"dateTime": "2024-03-15T10:00:00Z"},
                            "end": {"dateTime": "2024-03-15T11:00:00Z"},
                            "attendees": [
                                {"email": "a@b.com", "displayName": "Alice", "responseStatus": "accepted"},
                                {"email": "b@b.com"}
                            ]
                        },
                        {
                            "id": "evt_002",
                            "summary": "Offsite",
                            "start": {"date": "2024-03-16"},
                            "end": {"date": "2024-03-17"}
                        }
                    ]
                }"#,
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn it_extracts_validates_and_renders() {
        let mut gmail_server = mockito::Server::new_async().await;
        let mut calendar_server = mockito::Server::new_async().await;
        let _gmail_mocks = mock_gmail(&mut gmail_server).await;
        let _calendar_mock = mock_calendar(&mut calendar_server).await;

        let gmail = GmailClient::with_base_url("test_token", &gmail_server.url());
        let calendar = CalendarClient::with_base_url("test_token", &calendar_server.url());

        let result = extract_all(&gmail, &calendar, 50, 7).await;

        assert_eq!(result.metadata.total_emails, 1);
        assert_eq!(result.metadata.total_calendar_events, 2);
        assert_eq!(result.emails[0].date, "2024-01-01T10:00:00+00:00");
        assert_eq!(result.calendar_events[1].start, "2024-03-16");

        // The produced result satisfies the required-field contract
        let value = serde_json::to_value(&result).unwrap();
        assert!(validate(&value));

        // JSON output parses back to a structurally identical result
        let rendered = render_json(&result).unwrap();
        let parsed: ExtractionResult = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, result);

        // Markdown output carries one bullet per attendee and a
        // subsection per record
        let markdown = render_markdown(&result);
        assert!(markdown.contains("### Email 1: Q1 Report"));
        assert!(markdown.contains("### Event 1: Planning sync"));
        assert!(markdown.contains("- **Attendees:** 2"));
        assert!(markdown.contains("  - a@b.com (accepted)"));
        assert!(markdown.contains("  - b@b.com (needsAction)"));
        // The all-day event has no attendees and no attendee field
        let offsite = markdown.split("### Event 2: Offsite").nth(1).unwrap();
        assert!(!offsite.contains("Attendees"));
    }

    #[tokio::test]
    async fn it_produces_a_valid_result_when_one_source_fails() {
        let mut gmail_server = mockito::Server::new_async().await;
        let _gmail_mocks = mock_gmail(&mut gmail_server).await;

        let gmail = GmailClient::with_base_url("test_token", &gmail_server.url());
        // No calendar server: the fetch fails and degrades to empty
        let calendar = CalendarClient::with_base_url("test_token", "http://127.0.0.1:1");

        let result = extract_all(&gmail, &calendar, 50, 7).await;

        assert_eq!(result.metadata.total_emails, 1);
        assert_eq!(result.metadata.total_calendar_events, 0);
        assert!(result.calendar_events.is_empty());

        let value = serde_json::to_value(&result).unwrap();
        assert!(validate(&value));
    }
}
