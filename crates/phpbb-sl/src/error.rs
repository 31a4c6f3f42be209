//! Error taxonomy for the forum client.
//!
//! Three families:
//!
//! - **Transport**: network failures, non-2xx responses, use after close.
//! - **Structure**: the page no longer looks the way the client expects
//!   (missing form, missing action, unparsable message locator).
//! - Business negatives (bad credentials, unknown recipient, unknown member)
//!   are *not* errors; they come back as `Ok(false)` or `Ok(None)`.

/// All errors that can occur while driving the forum.
#[derive(thiserror::Error, Debug)]
pub enum PhpbbError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("browser session already closed")]
    Closed,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The selector matched nothing. Often means the session is not (or no
    /// longer) logged in, so retrying after a login can make sense.
    #[error("form `{selector}` not found")]
    FormNotFound { selector: String },

    /// The form exists but carries no usable `action` attribute.
    #[error("form `{selector}` has no action attribute")]
    MissingAction { selector: String },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("unexpected markup: {0}")]
    Markup(String),

    #[error("malformed private message url: {0}")]
    MessageUrl(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl PhpbbError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Dropped connections, timeouts and gateway errors qualify. Structural
    /// errors never do.
    pub fn is_transient(&self) -> bool {
        match self {
            PhpbbError::Transport { source, .. } => {
                source.is_connect() || source.is_timeout() || source.is_request()
            }
            PhpbbError::Status { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }

    /// Whether this error means a page did not have the expected shape.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PhpbbError::FormNotFound { .. }
                | PhpbbError::MissingAction { .. }
                | PhpbbError::InvalidSelector(_)
                | PhpbbError::Markup(_)
                | PhpbbError::MessageUrl(_)
        )
    }
}

pub type PhpbbResult<T> = Result<T, PhpbbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_is_transient() {
        let err = PhpbbError::Status {
            url: "http://forum.test/viewforum.php".into(),
            status: 503,
        };
        assert!(err.is_transient());
        assert!(!err.is_structural());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        let err = PhpbbError::Status {
            url: "http://forum.test/ucp.php".into(),
            status: 404,
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_form_errors_are_distinguishable() {
        let missing = PhpbbError::FormNotFound {
            selector: "form#postform".into(),
        };
        let no_action = PhpbbError::MissingAction {
            selector: "form#postform".into(),
        };
        assert!(matches!(missing, PhpbbError::FormNotFound { .. }));
        assert!(matches!(no_action, PhpbbError::MissingAction { .. }));
        assert!(missing.is_structural() && no_action.is_structural());
        assert_eq!(missing.to_string(), "form `form#postform` not found");
    }
}
