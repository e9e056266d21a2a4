use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors produced while talking to the remote item store or reconciling
/// its responses.
///
/// These cover the full lifecycle of a remote call: transport problems,
/// non-2xx responses, undecodable payloads, and schema lookups that come
/// back without the configuration an operation depends on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {status}")]
    Status { status: u16, body: String },
    /// Response body could not be decoded into the expected shape
    #[error("Invalid response payload: {0}")]
    Decode(String),
    /// Request body could not be serialized
    #[error("Failed to encode request: {0}")]
    Encode(String),
    /// Base URL or a derived endpoint could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The list's item configuration has no field configuration with this label
    #[error("No field configuration labeled \"{label}\" for this list")]
    MissingFieldConfiguration { label: String },
}

impl SyncError {
    /// HTTP status of the failed response, if a response was received at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Status { status, .. } => Some(*status),
            SyncError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Build a user-facing message from the server's error payload.
    ///
    /// Validation errors come back as `{"field": ["msg", ...], ...}` or
    /// `{"field": "msg"}`; each entry is rendered as `"field msg"` and the
    /// entries are joined with `" and "`. Anything else falls back to the
    /// raw body, and an empty body to the error's own description.
    pub fn surface_message(&self) -> String {
        let SyncError::Status { body, .. } = self else {
            return self.to_string();
        };

        let trimmed = body.trim();
        if trimmed.is_empty() {
            return self.to_string();
        }

        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(serde_json::Value::Object(map)) if !map.is_empty() => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(key, value)| {
                        let message = match value {
                            serde_json::Value::Array(values) => values
                                .iter()
                                .map(json_text)
                                .collect::<Vec<_>>()
                                .join(", "),
                            other => json_text(other),
                        };
                        format!("{} {}", key, message)
                    })
                    .collect();
                parts.join(" and ")
            }
            Ok(serde_json::Value::String(s)) => s,
            _ => trimmed.to_string(),
        }
    }
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, body: &str) -> SyncError {
        SyncError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_reported_for_status_errors_only() {
        assert_eq!(status_error(404, "").status(), Some(404));
        assert_eq!(SyncError::Timeout.status(), None);
        assert_eq!(SyncError::Decode("bad".into()).status(), None);
    }

    #[test]
    fn test_surface_message_joins_validation_errors() {
        let err = status_error(422, r#"{"data":["can't be blank"],"label":"is invalid"}"#);
        assert_eq!(err.surface_message(), "data can't be blank and label is invalid");
    }

    #[test]
    fn test_surface_message_uses_plain_body() {
        let err = status_error(500, "Internal Server Error");
        assert_eq!(err.surface_message(), "Internal Server Error");
    }

    #[test]
    fn test_surface_message_empty_body_falls_back_to_display() {
        let err = status_error(500, "   ");
        assert_eq!(err.surface_message(), "HTTP error: status 500");
    }

    #[test]
    fn test_surface_message_non_status_error() {
        assert_eq!(SyncError::Timeout.surface_message(), "Request timed out");
    }
}
