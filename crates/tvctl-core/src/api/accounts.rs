//! Accounts, authentication and server info

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use super::decode;
use crate::error::ApiResult;
use crate::gateway::{Target, Transport};
use crate::models::{SuperuserStatus, TokenPair, User, Version};

/// Login, token refresh and first-run bootstrap
pub struct Accounts {
    transport: Arc<dyn Transport>,
}

impl Accounts {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Whether the first administrator has been created
    pub async fn superuser_status(&self) -> ApiResult<SuperuserStatus> {
        let target = Target::get("accounts/initialize-superuser/").without_auth();
        decode(self.transport.send(target).await?)
    }

    /// Create the first administrator on a fresh install
    pub async fn create_superuser(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<Value> {
        let target = Target::post("accounts/initialize-superuser/")
            .without_auth()
            .json(json!({
                "username": username,
                "password": password,
                "email": email,
            }));
        let body = self.transport.send(target).await?;
        info!("Created superuser {}", username);
        Ok(body)
    }

    /// Exchange credentials for an access/refresh token pair
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<TokenPair> {
        let target = Target::post("accounts/token/")
            .without_auth()
            .json(json!({ "username": username, "password": password }));
        let pair = decode(self.transport.send(target).await?)?;
        info!("Logged in as {}", username);
        Ok(pair)
    }

    pub async fn refresh_token(&self, refresh: &str) -> ApiResult<TokenPair> {
        let target = Target::post("accounts/token/refresh/")
            .without_auth()
            .json(json!({ "refresh": refresh }));
        decode(self.transport.send(target).await?)
    }

    /// End the session on the server; the caller discards its tokens
    pub async fn logout(&self) -> ApiResult<()> {
        self.transport
            .send(Target::post("accounts/auth/logout/"))
            .await?;
        Ok(())
    }

    pub async fn me(&self) -> ApiResult<User> {
        decode(self.transport.send(Target::get("accounts/users/me/")).await?)
    }

    pub async fn version(&self) -> ApiResult<Version> {
        let target = Target::get("core/version/").without_auth();
        decode(self.transport.send(target).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Auth;
    use crate::testing::ScriptedTransport;
    use reqwest::Method;

    #[tokio::test]
    async fn test_login_without_session() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(
            json!({"access": "a1", "refresh": "r1"}),
        )]));
        let accounts = Accounts::new(transport.clone());

        let pair = accounts.login("admin", "pw").await.unwrap();

        assert_eq!(pair.access, "a1");
        assert_eq!(pair.refresh.as_deref(), Some("r1"));
        let sent = &transport.sent()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.path, "accounts/token/");
        assert_eq!(sent.auth, Auth::None);
        assert_eq!(sent.body, Some(json!({"username": "admin", "password": "pw"})));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Err(
            crate::ApiError::from_response(
                401,
                r#"{"detail": "No active account found with the given credentials"}"#.to_string(),
            ),
        )]));
        let accounts = Accounts::new(transport);

        let err = accounts.login("admin", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_superuser_bootstrap() {
        let transport = Arc::new(ScriptedTransport::replies(vec![
            Ok(json!({"superuser_exists": false})),
            Ok(json!({"superuser_exists": true})),
        ]));
        let accounts = Accounts::new(transport.clone());

        let status = accounts.superuser_status().await.unwrap();
        assert!(!status.superuser_exists);

        accounts
            .create_superuser("admin", "admin@example.com", "pw")
            .await
            .unwrap();

        let sent = transport.sent();
        assert!(sent.iter().all(|s| s.auth == Auth::None));
        assert_eq!(sent[1].body.as_ref().unwrap()["email"], json!("admin@example.com"));
    }

    #[tokio::test]
    async fn test_logout_and_me_use_session() {
        let transport = Arc::new(ScriptedTransport::replies(vec![
            Ok(json!({"id": 1, "username": "admin"})),
            Ok(Value::Null),
        ]));
        let accounts = Accounts::new(transport.clone());

        let user = accounts.me().await.unwrap();
        assert_eq!(user.username, "admin");
        accounts.logout().await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[1].path, "accounts/auth/logout/");
        assert!(sent.iter().all(|s| s.auth == Auth::Session));
    }

    #[tokio::test]
    async fn test_version_without_auth() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(
            json!({"version": "0.9.1", "timestamp": "2025-01-01"}),
        )]));
        let accounts = Accounts::new(transport.clone());

        let version = accounts.version().await.unwrap();
        assert_eq!(version.version, "0.9.1");
        assert_eq!(transport.sent()[0].auth, Auth::None);
    }

    #[tokio::test]
    async fn test_refresh_token() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(json!({"access": "a2"}))]));
        let accounts = Accounts::new(transport.clone());

        let pair = accounts.refresh_token("r1").await.unwrap();
        assert_eq!(pair.access, "a2");
        assert_eq!(transport.sent()[0].body, Some(json!({"refresh": "r1"})));
    }
}
