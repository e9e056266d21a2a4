//! Classification of failed remote calls into user-facing outcomes.
use crate::error::SyncError;
use crate::notify::NotificationSink;

pub const SIGN_IN_PATH: &str = "/users/sign_in";
pub const LISTS_PATH: &str = "/lists";
const SIGN_IN_MESSAGE: &str = "You must sign in";
const GENERIC_MESSAGE: &str = "Something went wrong";

/// Moves the user to another location. Implemented by the routing layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// What the handler did with a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureAction {
    /// 401: the user was sent to the sign-in page.
    SignIn,
    /// 403/404: the user was sent to a safe location with a contextual message.
    Redirect { url: String, message: String },
    /// Anything else: the message was surfaced in place.
    Surfaced { message: String },
}

/// Context for one failure, mirroring what the caller knows about the action.
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    pub not_found_message: &'a str,
    /// Where 403/404 failures send the user. Defaults to the list overview.
    pub redirect_uri: Option<&'a str>,
}

impl<'a> FailureContext<'a> {
    pub fn new(not_found_message: &'a str) -> Self {
        Self {
            not_found_message,
            redirect_uri: None,
        }
    }

    pub fn redirect_to(mut self, uri: &'a str) -> Self {
        self.redirect_uri = Some(uri);
        self
    }
}

/// Reports failures through a sink and optionally navigates away.
pub struct FailureHandler<'a> {
    sink: &'a dyn NotificationSink,
    navigator: Option<&'a dyn Navigator>,
}

impl<'a> FailureHandler<'a> {
    pub fn new(sink: &'a dyn NotificationSink) -> Self {
        Self {
            sink,
            navigator: None,
        }
    }

    pub fn with_navigator(mut self, navigator: &'a dyn Navigator) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn sink(&self) -> &'a dyn NotificationSink {
        self.sink
    }

    /// Classify `error`, notify the user, and navigate if a navigator is set.
    pub fn handle(&self, error: &SyncError, context: FailureContext<'_>) -> FailureAction {
        let action = classify(error, context);
        match &action {
            FailureAction::SignIn => {
                tracing::info!(error = %error, "Remote call rejected as unauthenticated");
                self.sink.error(SIGN_IN_MESSAGE);
                self.go(SIGN_IN_PATH);
            }
            FailureAction::Redirect { url, message } => {
                tracing::info!(error = %error, redirect = %url, "Remote resource unavailable");
                self.sink.error(message);
                self.go(url);
            }
            FailureAction::Surfaced { message } => {
                tracing::warn!(error = %error, "Remote call failed");
                self.sink.error(message);
            }
        }
        action
    }

    fn go(&self, url: &str) {
        if let Some(navigator) = self.navigator {
            navigator.navigate(url);
        }
    }
}

/// Pure classification by HTTP status.
pub fn classify(error: &SyncError, context: FailureContext<'_>) -> FailureAction {
    match error.status() {
        Some(401) => FailureAction::SignIn,
        Some(403) | Some(404) => FailureAction::Redirect {
            url: context.redirect_uri.unwrap_or(LISTS_PATH).to_string(),
            message: context.not_found_message.to_string(),
        },
        Some(_) => FailureAction::Surfaced {
            message: error.surface_message(),
        },
        None => match error {
            SyncError::MissingFieldConfiguration { .. } | SyncError::Decode(_) => {
                FailureAction::Surfaced {
                    message: error.to_string(),
                }
            }
            _ => FailureAction::Surfaced {
                message: GENERIC_MESSAGE.to_string(),
            },
        },
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingNavigator;
    use super::*;
    use crate::notify::{MemorySink, Severity};

    fn status(code: u16, body: &str) -> SyncError {
        SyncError::Status {
            status: code,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_unauthenticated_redirects_to_sign_in() {
        let sink = MemorySink::new();
        let nav = RecordingNavigator::default();
        let handler = FailureHandler::new(&sink).with_navigator(&nav);

        let action = handler.handle(&status(401, ""), FailureContext::new("Item not found"));

        assert_eq!(action, FailureAction::SignIn);
        assert_eq!(nav.visited(), vec![SIGN_IN_PATH.to_string()]);
        assert_eq!(sink.notifications()[0].text, SIGN_IN_MESSAGE);
    }

    #[test]
    fn test_not_found_uses_redirect_uri_and_message() {
        let sink = MemorySink::new();
        let nav = RecordingNavigator::default();
        let handler = FailureHandler::new(&sink).with_navigator(&nav);

        let ctx = FailureContext::new("List not found").redirect_to("/lists/list-1");
        let action = handler.handle(&status(404, ""), ctx);

        assert_eq!(
            action,
            FailureAction::Redirect {
                url: "/lists/list-1".to_string(),
                message: "List not found".to_string()
            }
        );
        assert_eq!(nav.visited(), vec!["/lists/list-1".to_string()]);
    }

    #[test]
    fn test_forbidden_defaults_to_lists() {
        let action = classify(&status(403, ""), FailureContext::new("nope"));
        assert!(matches!(action, FailureAction::Redirect { ref url, .. } if url == LISTS_PATH));
    }

    #[test]
    fn test_validation_error_surfaces_payload() {
        let sink = MemorySink::new();
        let handler = FailureHandler::new(&sink);
        let action = handler.handle(
            &status(422, r#"{"data":["is too long"]}"#),
            FailureContext::new("Item not found"),
        );
        assert_eq!(
            action,
            FailureAction::Surfaced {
                message: "data is too long".to_string()
            }
        );
        let got = sink.notifications();
        assert_eq!(got[0].severity, Severity::Error);
        assert_eq!(got[0].text, "data is too long");
    }

    #[test]
    fn test_no_response_is_generic() {
        let action = classify(&SyncError::Timeout, FailureContext::new("x"));
        assert_eq!(
            action,
            FailureAction::Surfaced {
                message: GENERIC_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn test_without_navigator_only_notifies() {
        let sink = MemorySink::new();
        let handler = FailureHandler::new(&sink);
        handler.handle(&status(401, ""), FailureContext::new("x"));
        assert_eq!(sink.notifications().len(), 1);
    }
}
