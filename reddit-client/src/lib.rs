//! Reddit channel fetcher.
//!
//! Holds an application-only OAuth2 session (client-credentials grant) and
//! reads `/r/{subreddit}/new` listings through the rate-limited API client.

pub mod api;
pub mod rate_limiter;
pub mod retry;

#[cfg(test)]
mod tests;

use crate::api::RedditApiClient;
use crate::retry::{RetryConfig, RetryPolicy};
use async_trait::async_trait;
use monitor_core::{Channel, ChannelFetcher, CoreError, Item, RedditApiError, RedditConfig};
use oauth2::basic::BasicClient;
use oauth2::http::header::{HeaderValue, USER_AGENT};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are renewed this long before Reddit would reject them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Reddit app-only tokens last an hour when the response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl RedditOAuth2Config {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
        }
    }
}

impl From<&RedditConfig> for RedditOAuth2Config {
    fn from(config: &RedditConfig) -> Self {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.user_agent.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + TOKEN_EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { expires_at: SystemTime },
    TokenExpired { expired_at: SystemTime },
}

pub struct RedditClient {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    api: RedditApiClient,
    retry: RetryPolicy,
    token: Mutex<Option<RedditToken>>,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            CoreError::Initialization {
                reason: format!("invalid auth url: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| {
            CoreError::Initialization {
                reason: format!("invalid token url: {}", e),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        let api = RedditApiClient::new(config.user_agent.clone())?;

        Ok(Self {
            config,
            oauth_client,
            api,
            retry: RetryPolicy::new(RetryConfig::reddit()),
            token: Mutex::new(None),
        })
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = RetryPolicy::new(config);
        self
    }

    pub fn config(&self) -> &RedditOAuth2Config {
        &self.config
    }

    /// Obtains an application-only access token.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let user_agent = self.config.user_agent.clone();
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .add_scope(Scope::new("read".to_string()))
            .request_async(move |mut request: HttpRequest| async move {
                if let Ok(value) = HeaderValue::from_str(&user_agent) {
                    request.headers.insert(USER_AGENT, value);
                }
                async_http_client(request).await
            })
            .await
            .map_err(|e| {
                let reason = match e {
                    RequestTokenError::ServerResponse(response) => response.to_string(),
                    other => other.to_string(),
                };
                warn!("Reddit token request failed: {}", reason);
                CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let token = RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
                .unwrap_or_default(),
        };

        info!("Obtained Reddit access token valid for {:?}", lifetime);
        self.set_token(token).await;
        Ok(())
    }

    pub async fn set_token(&self, token: RedditToken) {
        *self.token.lock().await = Some(token);
    }

    pub async fn clear_token(&self) {
        *self.token.lock().await = None;
    }

    pub async fn get_auth_state(&self) -> AuthState {
        match self.token.lock().await.as_ref() {
            None => AuthState::NotAuthenticated,
            Some(token) if token.is_expired() => AuthState::TokenExpired {
                expired_at: token.expires_at,
            },
            Some(token) => AuthState::Authenticated {
                expires_at: token.expires_at,
            },
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(self.get_auth_state().await, AuthState::Authenticated { .. })
    }

    /// A valid access token, renewing the session when it is missing or stale.
    async fn access_token(&self) -> Result<String, CoreError> {
        {
            let token = self.token.lock().await;
            if let Some(token) = token.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Reddit access token missing or expired, renewing");
        self.authenticate().await?;

        let token = self.token.lock().await;
        token
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or_else(|| CoreError::Internal {
                message: "access token missing after authentication".to_string(),
            })
    }

    async fn fetch_once(&self, subreddit: &str, limit: u32) -> Result<Vec<Item>, CoreError> {
        let access_token = self.access_token().await?;
        let listing = self
            .retry
            .run(&format!("fetch r/{}", subreddit), || {
                self.api.get_new_posts(&access_token, subreddit, limit)
            })
            .await?;
        Ok(listing.into_items())
    }

    /// Newest posts of `subreddit`, newest first, at most `limit`.
    ///
    /// A rejected token is renewed once before the failure is reported.
    pub async fn fetch_new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Item>, CoreError> {
        match self.fetch_once(subreddit, limit).await {
            Err(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
                warn!("Reddit rejected access token, re-authenticating");
                self.clear_token().await;
                self.fetch_once(subreddit, limit).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl ChannelFetcher for RedditClient {
    async fn connect(&self) -> Result<(), CoreError> {
        self.authenticate().await
    }

    async fn fetch_recent(&self, channel: &Channel, limit: u32) -> Result<Vec<Item>, CoreError> {
        let mut items = self.fetch_new_posts(channel.name(), limit).await?;
        items.truncate(limit as usize);
        Ok(items)
    }
}
