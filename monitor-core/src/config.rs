use crate::error::{ConfigError, CoreError};
use crate::matcher::KeywordSet;
use crate::types::Channel;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const CONFIG_PATH_ENV: &str = "REDDIT_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "monitor.toml";

const DEFAULT_CHANNELS: &[&str] = &[
    "Tucson",
    "arizona",
    "AgingParents",
    "caregivers",
    "dementia",
    "AlzheimersGroup",
];

const DEFAULT_KEYWORDS: &[&str] = &[
    "senior care",
    "assisted living",
    "memory care",
    "senior housing",
    "elderly care",
    "nursing home",
    "senior living",
    "senior placement",
    "alzheimer",
    "dementia care",
    "independent living",
    "senior community",
];

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub reddit: RedditConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

#[derive(Clone, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub to: Vec<String>,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("from", &self.from)
            .field("password", &"<redacted>")
            .field("to", &self.to)
            .finish()
    }
}

/// Everything the monitor loop needs, fixed for the lifetime of a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub channels: Vec<Channel>,
    pub keywords: KeywordSet,
    pub poll_interval_secs: u64,
    pub retry_backoff_secs: u64,
    pub fetch_limit: u32,
    pub ledger_soft_cap: usize,
    pub ledger_retain: usize,
    pub permalink_base: String,
    pub excerpt_chars: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS.iter().map(|c| Channel::new(*c)).collect(),
            keywords: KeywordSet::new(DEFAULT_KEYWORDS.iter()),
            poll_interval_secs: 900,
            retry_backoff_secs: 300,
            fetch_limit: 10,
            ledger_soft_cap: 1000,
            ledger_retain: 500,
            permalink_base: "https://reddit.com".to_string(),
            excerpt_chars: 500,
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn permalink_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.permalink_base).map_err(|e| ConfigError::InvalidValue {
            field: "monitor.permalink_base".to_string(),
            value: format!("{} ({})", self.permalink_base, e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::MissingField {
                field: "monitor.channels".to_string(),
            });
        }
        if let Some(channel) = self.channels.iter().find(|c| c.name().trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "monitor.channels".to_string(),
                value: format!("{:?}", channel.name()),
            });
        }
        if !(1..=100).contains(&self.fetch_limit) {
            return Err(ConfigError::InvalidValue {
                field: "monitor.fetch_limit".to_string(),
                value: self.fetch_limit.to_string(),
            });
        }
        if self.ledger_retain > self.ledger_soft_cap {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "ledger_retain ({}) must not exceed ledger_soft_cap ({})",
                    self.ledger_retain, self.ledger_soft_cap
                ),
            });
        }
        self.permalink_url()?;
        Ok(())
    }
}

impl AppConfig {
    /// Reads the file named by `REDDIT_MONITOR_CONFIG` (or `monitor.toml`),
    /// applies secret overrides from the environment and validates.
    pub fn load_from_env() -> Result<Self, CoreError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::load(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::Config(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }),
            std::io::ErrorKind::PermissionDenied => {
                CoreError::Config(ConfigError::PermissionDenied {
                    path: path.display().to_string(),
                })
            }
            _ => CoreError::Io(e),
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(Self::from_toml_str(&contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Secrets may live outside the config file.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("REDDIT_CLIENT_SECRET") {
            debug!("Using Reddit client secret from environment");
            self.reddit.client_secret = secret;
        }
        if let Some(password) = lookup("SMTP_PASSWORD") {
            debug!("Using SMTP password from environment");
            self.email.password = password;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.client_secret", &self.reddit.client_secret),
            ("reddit.user_agent", &self.reddit.user_agent),
            ("email.smtp_server", &self.email.smtp_server),
            ("email.from", &self.email.from),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }
        if self.email.to.is_empty() {
            return Err(ConfigError::MissingField {
                field: "email.to".to_string(),
            });
        }
        self.monitor.validate()
    }
}

fn default_user_agent() -> String {
    format!("reddit-monitor/{}", env!("CARGO_PKG_VERSION"))
}

fn default_smtp_port() -> u16 {
    587
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
        [reddit]
        client_id = "abc"
        client_secret = "shh"

        [email]
        smtp_server = "smtp.example.com"
        from = "alerts@example.com"
        password = "pw"
        to = ["team@example.com", "lead@example.com"]
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(900));
        assert_eq!(config.monitor.retry_backoff(), Duration::from_secs(300));
        assert_eq!(config.monitor.fetch_limit, 10);
        assert_eq!(config.monitor.channels.len(), 6);
        assert_eq!(config.monitor.channels[0], Channel::new("Tucson"));
        assert_eq!(config.monitor.keywords.len(), 12);
        assert!(config.reddit.user_agent.starts_with("reddit-monitor/"));
    }

    #[test]
    fn test_monitor_section_overrides() {
        let toml = format!(
            "{}\n[monitor]\nchannels = [\"dementia\"]\nkeywords = [\"Dementia Care\"]\npoll_interval_secs = 60\n",
            MINIMAL
        );
        let config = AppConfig::from_toml_str(&toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.monitor.channels, vec![Channel::new("dementia")]);
        assert_eq!(config.monitor.keywords.as_slice(), &["dementia care"]);
        assert_eq!(config.monitor.poll_interval_secs, 60);
        assert_eq!(config.monitor.retry_backoff_secs, 300);
    }

    #[test]
    fn test_missing_recipients_rejected() {
        let toml = MINIMAL.replace(
            "to = [\"team@example.com\", \"lead@example.com\"]",
            "to = []",
        );
        let config = AppConfig::from_toml_str(&toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { field }) if field == "email.to"
        ));
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        let env: HashMap<&str, &str> = [
            ("REDDIT_CLIENT_SECRET", "from-env"),
            ("SMTP_PASSWORD", "mail-env"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.reddit.client_secret, "from-env");
        assert_eq!(config.email.password, "mail-env");
    }

    #[test]
    fn test_secret_filled_from_env_passes_validation() {
        let toml = MINIMAL.replace("client_secret = \"shh\"", "");
        let mut config = AppConfig::from_toml_str(&toml).unwrap();
        assert!(config.validate().is_err());

        config.apply_overrides(|key| (key == "REDDIT_CLIENT_SECRET").then(|| "s".to_string()));
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_ledger_limits() {
        let settings = MonitorSettings {
            ledger_soft_cap: 100,
            ledger_retain: 200,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_invalid_fetch_limit() {
        let settings = MonitorSettings {
            fetch_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_permalink_base() {
        let settings = MonitorSettings {
            permalink_base: "not a url".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("[reddit\nclient_id = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::load("/nonexistent/monitor.toml");
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("shh"));
        assert!(debug.contains("<redacted>"));
    }
}
