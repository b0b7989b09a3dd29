#[cfg(test)]
mod tests {
    use crate::retry::RetryConfig;
    use crate::{AuthState, RedditClient, RedditOAuth2Config, RedditToken};
    use monitor_core::RedditConfig;
    use std::time::{Duration, SystemTime};

    fn create_test_config() -> RedditOAuth2Config {
        RedditOAuth2Config::new(
            "test_client_id".to_string(),
            "test_client_secret".to_string(),
            "reddit-monitor/1.0 by test_user".to_string(),
        )
    }

    fn token_expiring_in(offset: Duration, future: bool) -> RedditToken {
        let now = SystemTime::now();
        RedditToken {
            access_token: "token".to_string(),
            expires_at: if future { now + offset } else { now - offset },
            scope: vec!["read".to_string()],
        }
    }

    #[test]
    fn test_config_creation() {
        let config = create_test_config();
        assert_eq!(config.client_id, "test_client_id");
        assert_eq!(config.client_secret, "test_client_secret");
        assert_eq!(config.user_agent, "reddit-monitor/1.0 by test_user");
    }

    #[test]
    fn test_config_from_app_config() {
        let app_config: RedditConfig = toml::from_str(
            r#"
            client_id = "id"
            client_secret = "secret"
            user_agent = "ua/1.0"
            "#,
        )
        .unwrap();

        let config = RedditOAuth2Config::from(&app_config);
        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.user_agent, "ua/1.0");
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = RedditClient::new(create_test_config()).unwrap();

        assert!(!client.is_authenticated().await);
        assert_eq!(client.get_auth_state().await, AuthState::NotAuthenticated);
        assert_eq!(client.config().client_id, "test_client_id");
    }

    #[tokio::test]
    async fn test_token_creation_and_expiry() {
        let client = RedditClient::new(create_test_config()).unwrap();

        client
            .set_token(token_expiring_in(Duration::from_secs(3600), true))
            .await;
        assert!(client.is_authenticated().await);
        assert!(matches!(
            client.get_auth_state().await,
            AuthState::Authenticated { .. }
        ));

        client
            .set_token(token_expiring_in(Duration::from_secs(3600), false))
            .await;
        assert!(!client.is_authenticated().await);
        assert!(matches!(
            client.get_auth_state().await,
            AuthState::TokenExpired { .. }
        ));

        client.clear_token().await;
        assert_eq!(client.get_auth_state().await, AuthState::NotAuthenticated);
    }

    #[test]
    fn test_token_near_expiry_counts_as_expired() {
        assert!(token_expiring_in(Duration::from_secs(30), true).is_expired());
        assert!(!token_expiring_in(Duration::from_secs(600), true).is_expired());
    }

    #[test]
    fn test_token_serialization() {
        let token = token_expiring_in(Duration::from_secs(3600), true);

        let serialized = serde_json::to_string(&token).unwrap();
        let deserialized: RedditToken = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.access_token, token.access_token);
        assert_eq!(deserialized.expires_at, token.expires_at);
        assert_eq!(deserialized.scope, token.scope);
    }

    #[test]
    fn test_client_with_retry_config() {
        let client = RedditClient::new(create_test_config())
            .unwrap()
            .with_retry_config(RetryConfig::disabled());
        assert_eq!(client.retry.config().max_attempts, 1);
    }
}
