//! Client configuration: transport settings, politeness delays and the
//! board's localized submit labels.

use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (ForumBot/1.0)";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_REDIRECTS: usize = 10;
const DEFAULT_TOPICS_PER_PAGE: u32 = 40;

/// Values a browser would send for the submit buttons phpBB checks for.
///
/// phpBB only tests that the key is present, but the value is what the
/// board's language pack prints on the button, so keep them overridable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitLabels {
    /// `login` button on the login form.
    pub login: String,
    /// `add_to` button on the compose form.
    pub add_recipient: String,
    /// `post` button on the compose form.
    pub send: String,
    /// `confirm` button on confirmation pages.
    pub confirm: String,
}

impl Default for SubmitLabels {
    fn default() -> Self {
        Self {
            login: "Connexion".to_string(),
            add_recipient: "Ajouter".to_string(),
            send: "Envoyer".to_string(),
            confirm: "Oui".to_string(),
        }
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Settings for a [`ForumClient`](crate::ForumClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Fixed per-request timeout.
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Pause between loading the login form and posting it.
    pub login_delay: Duration,
    /// Pause between the two phases of sending a private message.
    pub politeness_delay: Duration,
    pub labels: SubmitLabels,
    /// Retry policy for paginated topic listings.
    pub retry: RetryPolicy,
    /// Topics per listing page, the step of the `start` parameter.
    pub topics_per_page: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            login_delay: Duration::from_secs(1),
            politeness_delay: Duration::from_secs(2),
            labels: SubmitLabels::default(),
            retry: RetryPolicy::default(),
            topics_per_page: DEFAULT_TOPICS_PER_PAGE,
        }
    }
}

impl ClientConfig {
    /// Same configuration with every sleep set to zero.
    pub fn without_delays(mut self) -> Self {
        self.login_delay = Duration::ZERO;
        self.politeness_delay = Duration::ZERO;
        self.retry.base_delay = Duration::ZERO;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_labels(mut self, labels: SubmitLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
