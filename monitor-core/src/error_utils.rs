//! Classification of failures and how they are reported to whoever runs the
//! monitor.

use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

pub trait ErrorExt {
    /// Stable code attached to every logged failure.
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same call shortly after can succeed.
    fn is_transient(&self) -> bool;

    /// Delay requested by the remote side, if it named one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// What the operator should check, phrased for the log.
    fn operator_hint(&self) -> String;
}

impl ErrorExt for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(e) => e.error_code(),
            CoreError::Delivery(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::Initialization { .. } => "INITIALIZATION",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::Timeout { .. } => "TIMEOUT",
            CoreError::AllChannelsFailed { .. } => "ALL_CHANNELS_FAILED",
            CoreError::Internal { .. } => "INTERNAL",
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_transient(),
            CoreError::Delivery(e) => e.is_transient(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::Timeout { .. } | CoreError::AllChannelsFailed { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            _ => None,
        }
    }

    fn operator_hint(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.operator_hint(),
            CoreError::Delivery(e) => e.operator_hint(),
            CoreError::Config(e) => e.operator_hint(),
            CoreError::Io(_) => "local I/O failed; check disk and file permissions".to_string(),
            CoreError::Serialization(_) => {
                "Reddit sent JSON the monitor could not decode".to_string()
            }
            CoreError::Network(_) => {
                "Reddit could not be reached; check outbound HTTPS from this host".to_string()
            }
            CoreError::Initialization { .. } => {
                "no Reddit session could be opened; check the [reddit] section".to_string()
            }
            CoreError::AllChannelsFailed { .. } => {
                "every channel failed this cycle; backing off before the next attempt".to_string()
            }
            CoreError::InvalidInput { .. } | CoreError::Internal { .. } => {
                "unexpected internal failure; the cycle is retried after the backoff".to_string()
            }
            CoreError::Timeout { seconds } => format!("gave up after {}s", seconds),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn error_code(&self) -> &'static str {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED",
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT",
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN",
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND",
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN",
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT",
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE",
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR",
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            RedditApiError::RateLimitExceeded { .. } | RedditApiError::RequestTimeout => true,
            RedditApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn operator_hint(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => {
                "Reddit rejected the app credentials; check reddit.client_id and REDDIT_CLIENT_SECRET"
                    .to_string()
            }
            RedditApiError::InvalidToken => {
                "access token was refused; a new one is requested on the next call".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => {
                format!("Reddit rate limit hit; requests resume in {}s", retry_after)
            }
            RedditApiError::Forbidden { resource } => format!(
                "{} is private or quarantined; drop it from monitor.channels if this persists",
                resource
            ),
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("r/{} does not exist; check monitor.channels", subreddit)
            }
            RedditApiError::RequestTimeout | RedditApiError::ServerError { .. } => {
                "Reddit is slow or failing; the channel is polled again next cycle".to_string()
            }
            RedditApiError::InvalidResponse { .. } => {
                "unexpected payload from Reddit; the channel is polled again next cycle".to_string()
            }
        }
    }
}

impl ErrorExt for DeliveryError {
    fn error_code(&self) -> &'static str {
        match self {
            DeliveryError::InvalidAddress { .. } => "MAIL_INVALID_ADDRESS",
            DeliveryError::MessageBuild { .. } => "MAIL_MESSAGE_BUILD",
            DeliveryError::ConnectionFailed { .. } => "MAIL_CONNECTION_FAILED",
            DeliveryError::Rejected { .. } => "MAIL_REJECTED",
            DeliveryError::Transport { .. } => "MAIL_TRANSPORT",
        }
    }

    fn is_transient(&self) -> bool {
        matches!(
            self,
            DeliveryError::ConnectionFailed { .. } | DeliveryError::Transport { .. }
        )
    }

    fn operator_hint(&self) -> String {
        match self {
            DeliveryError::InvalidAddress { address, .. } => {
                format!("'{}' is not a valid mailbox; fix email.from or email.to", address)
            }
            DeliveryError::ConnectionFailed { server, .. } => format!(
                "mail server {} unreachable; check email.smtp_server and email.smtp_port",
                server
            ),
            DeliveryError::Rejected { .. } => {
                "mail server refused the alert; check email.from and SMTP_PASSWORD".to_string()
            }
            DeliveryError::MessageBuild { .. } | DeliveryError::Transport { .. } => {
                "alert for this post was dropped; the post is not re-sent".to_string()
            }
        }
    }
}

impl ErrorExt for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }

    fn is_transient(&self) -> bool {
        false
    }

    fn operator_hint(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => format!(
                "create {} or point REDDIT_MONITOR_CONFIG at the config file",
                path
            ),
            ConfigError::MissingField { field } => format!("set {} in the config file", field),
            ConfigError::InvalidValue { field, value } => {
                format!("{} = {} is not accepted", field, value)
            }
            ConfigError::ValidationFailed { reason } => reason.clone(),
            ConfigError::PermissionDenied { path } => {
                format!("the monitor cannot read {}", path)
            }
            ConfigError::Parse(e) => format!("fix the TOML syntax: {}", e),
        }
    }
}

/// Logs failures with their code and hint and keeps running totals.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    warnings: u64,
    errors: u64,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A failure the monitor recovered from on its own.
    pub fn report_warning(&mut self, context: &str, error: &CoreError) {
        self.warnings += 1;
        warn!(
            code = error.error_code(),
            hint = %error.operator_hint(),
            "{}: {}",
            context,
            error
        );
    }

    /// A failure that changed the monitor's state.
    pub fn report_error(&mut self, context: &str, error: &CoreError) {
        self.errors += 1;
        error!(
            code = error.error_code(),
            hint = %error.operator_hint(),
            "{}: {}",
            context,
            error
        );
    }

    pub fn warnings(&self) -> u64 {
        self.warnings
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }
}
