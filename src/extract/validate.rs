//! Required-field checks over the serialized result. Operates on the
//! JSON value rather than the typed structs so the check covers what
//! actually lands in the output file.

use serde_json::Value;

const REQUIRED_TOP_LEVEL: [&str; 3] = ["metadata", "emails", "calendar_events"];
const REQUIRED_EMAIL_FIELDS: [&str; 5] = ["id", "subject", "sender", "date", "snippet"];
const REQUIRED_EVENT_FIELDS: [&str; 4] = ["id", "summary", "start", "end"];

/// Check the serialized result against the required-field contract.
/// Stops at the first missing field, naming it in the diagnostic.
pub fn validate(output: &Value) -> bool {
    for field in REQUIRED_TOP_LEVEL {
        if output.get(field).is_none() {
            tracing::error!(field, "Missing required field");
            return false;
        }
    }

    if let Some(emails) = output["emails"].as_array() {
        for (index, email) in emails.iter().enumerate() {
            for field in REQUIRED_EMAIL_FIELDS {
                if email.get(field).is_none() {
                    tracing::error!(field, index, "Missing email field");
                    return false;
                }
            }
        }
    }

    if let Some(events) = output["calendar_events"].as_array() {
        for (index, event) in events.iter().enumerate() {
            for field in REQUIRED_EVENT_FIELDS {
                if event.get(field).is_none() {
                    tracing::error!(field, index, "Missing calendar field");
                    return false;
                }
            }
        }
    }

    true
}
