//! Identity Toolkit REST client.
//!
//! Email/password sign-in and sign-up, identity-provider sign-in (Google ID
//! token exchange) and ID token refresh. Every provider failure is mapped to
//! an [`AuthError`] whose display text is what the user sees.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use soundsync_models::default_display_name;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationErrors};

use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::session::{RefreshedToken, Session, TokenRefresher};

/// Provider id for Google sign-in.
pub const GOOGLE_PROVIDER: &str = "google.com";

/// Email/password sign-in form.
#[derive(Debug, Clone, Validate)]
pub struct SignInForm {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Email/password sign-up form.
#[derive(Debug, Clone, Validate)]
pub struct SignUpForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub confirm_password: String,
    /// Falls back to the local part of the email
    pub display_name: Option<String>,
}

/// Map validation failures to the message the provider would have given.
fn validation_error(errors: &ValidationErrors) -> AuthError {
    let fields = errors.field_errors();
    if fields.contains_key("confirm_password") {
        AuthError::PasswordMismatch
    } else if fields.contains_key("email") {
        AuthError::InvalidEmail
    } else if fields.contains_key("password") {
        AuthError::WeakPassword
    } else {
        AuthError::Other("VALIDATION".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

fn expiry_from(expires_in: &str) -> chrono::DateTime<Utc> {
    let secs: i64 = expires_in.parse().unwrap_or(3600);
    Utc::now() + ChronoDuration::seconds(secs)
}

/// Identity Toolkit client.
#[derive(Clone)]
pub struct IdentityClient {
    http: Client,
    api_key: String,
    identity_endpoint: String,
    secure_token_endpoint: String,
}

impl IdentityClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("soundsync-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            identity_endpoint: config.identity_endpoint.trim_end_matches('/').to_string(),
            secure_token_endpoint: config.secure_token_endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn accounts_url(&self, method: &str) -> String {
        format!("{}/v1/accounts:{}?key={}", self.identity_endpoint, method, self.api_key)
    }

    /// POST a JSON body and decode the success body, mapping provider errors.
    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.http.post(url).json(body).send().await.map_err(|e| {
            warn!("Identity request failed: {}", e);
            AuthError::Network
        })?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, AuthError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                warn!("Unexpected identity response: {}", e);
                AuthError::Other("INVALID_RESPONSE".to_string())
            });
        }

        let code = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP_{}", status.as_u16()));
        debug!(status = status.as_u16(), code = %code, "Identity provider rejected request");
        Err(AuthError::from_code(&code))
    }

    fn session_from(resp: AuthResponse) -> Session {
        Session {
            expires_at: expiry_from(&resp.expires_in),
            uid: resp.local_id,
            email: resp.email,
            display_name: resp.display_name.filter(|n| !n.is_empty()),
            id_token: resp.id_token,
            refresh_token: resp.refresh_token,
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(&self, form: &SignInForm) -> Result<Session, AuthError> {
        form.validate().map_err(|e| validation_error(&e))?;

        let resp: AuthResponse = self
            .post(
                &self.accounts_url("signInWithPassword"),
                &PasswordRequest {
                    email: form.email.trim(),
                    password: &form.password,
                    return_secure_token: true,
                },
            )
            .await?;

        info!(uid = %resp.local_id, "Password sign-in succeeded");
        Ok(Self::session_from(resp))
    }

    /// Create an account, then set its display name.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<Session, AuthError> {
        form.validate().map_err(|e| validation_error(&e))?;

        let email = form.email.trim();
        let resp: AuthResponse = self
            .post(
                &self.accounts_url("signUp"),
                &PasswordRequest {
                    email,
                    password: &form.password,
                    return_secure_token: true,
                },
            )
            .await?;
        let mut session = Self::session_from(resp);
        info!(uid = %session.uid, "Account created");

        let display_name = form
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| default_display_name(email));

        if let Some(name) = display_name {
            // The account exists at this point; a failed profile update is not a sign-up failure
            match self.update_display_name(&session.id_token, &name).await {
                Ok(()) => session.display_name = Some(name),
                Err(e) => warn!(uid = %session.uid, "Failed to set display name: {:?}", e),
            }
        }

        Ok(session)
    }

    async fn update_display_name(&self, id_token: &str, name: &str) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .post(
                &self.accounts_url("update"),
                &json!({
                    "idToken": id_token,
                    "displayName": name,
                    "returnSecureToken": false
                }),
            )
            .await?;
        Ok(())
    }

    /// Exchange an identity provider's ID token for a session.
    ///
    /// An empty token means the user dismissed the provider prompt.
    pub async fn sign_in_with_idp(&self, provider_id: &str, provider_token: &str) -> Result<Session, AuthError> {
        if provider_token.trim().is_empty() {
            return Err(AuthError::PopupClosed);
        }

        let post_body = format!("id_token={}&providerId={}", provider_token.trim(), provider_id);
        let resp: AuthResponse = self
            .post(
                &self.accounts_url("signInWithIdp"),
                &json!({
                    "postBody": post_body,
                    "requestUri": "http://localhost",
                    "returnIdpCredential": true,
                    "returnSecureToken": true
                }),
            )
            .await?;

        info!(uid = %resp.local_id, provider = %provider_id, "Provider sign-in succeeded");
        Ok(Self::session_from(resp))
    }
}

#[async_trait]
impl TokenRefresher for IdentityClient {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError> {
        let url = format!("{}/v1/token?key={}", self.secure_token_endpoint, self.api_key);
        let response = self
            .http
            .post(&url)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| {
                warn!("Token refresh request failed: {}", e);
                AuthError::Network
            })?;

        let resp: RefreshResponse = Self::decode(response).await?;
        Ok(RefreshedToken {
            expires_at: expiry_from(&resp.expires_in),
            id_token: resp.id_token,
            refresh_token: resp.refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> IdentityClient {
        let config = ClientConfig {
            api_key: "test-key".into(),
            identity_endpoint: server.uri(),
            secure_token_endpoint: server.uri(),
            ..Default::default()
        };
        IdentityClient::new(&config).unwrap()
    }

    fn auth_body(uid: &str) -> serde_json::Value {
        json!({
            "localId": uid,
            "email": "jane@example.com",
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        })
    }

    fn provider_error(code: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": code, "errors": []}
        }))
    }

    fn sign_in(email: &str, password: &str) -> SignInForm {
        SignInForm {
            email: email.into(),
            password: password.into(),
        }
    }

    fn sign_up(email: &str, password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({"email": "jane@example.com", "returnSecureToken": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("u1")))
            .mount(&server)
            .await;

        let session = client(&server)
            .sign_in_with_password(&sign_in("jane@example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(session.uid, "u1");
        assert_eq!(session.id_token, "id-token");
        assert!(!session.needs_refresh(Utc::now()));
    }

    #[tokio::test]
    async fn test_provider_errors_map_to_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(provider_error("INVALID_LOGIN_CREDENTIALS"))
            .mount(&server)
            .await;

        let err = client(&server)
            .sign_in_with_password(&sign_in("jane@example.com", "nope123"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect password.");
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .sign_in_with_password(&sign_in("not-an-email", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidEmail);
    }

    #[tokio::test]
    async fn test_sign_up_password_mismatch() {
        let server = MockServer::start().await;
        let err = client(&server)
            .sign_up(&sign_up("jane@example.com", "secret1", "secret2"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match.");
    }

    #[tokio::test]
    async fn test_sign_up_weak_password() {
        let server = MockServer::start().await;
        let err = client(&server)
            .sign_up(&sign_up("jane@example.com", "abc", "abc"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::WeakPassword);
    }

    #[tokio::test]
    async fn test_sign_up_sets_default_display_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("u2")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:update"))
            .and(body_partial_json(json!({"idToken": "id-token", "displayName": "jane"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"localId": "u2"})))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server)
            .sign_up(&sign_up("jane@example.com", "secret1", "secret1"))
            .await
            .unwrap();
        assert_eq!(session.display_name.as_deref(), Some("jane"));
    }

    #[tokio::test]
    async fn test_sign_up_existing_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(provider_error("EMAIL_EXISTS"))
            .mount(&server)
            .await;

        let err = client(&server)
            .sign_up(&sign_up("jane@example.com", "secret1", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already in use.");
    }

    #[tokio::test]
    async fn test_idp_sign_in_and_cancellation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithIdp"))
            .and(body_string_contains("providerId=google.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("g1")))
            .mount(&server)
            .await;

        let client = client(&server);
        let session = client.sign_in_with_idp(GOOGLE_PROVIDER, "google-id-token").await.unwrap();
        assert_eq!(session.uid, "g1");

        let err = client.sign_in_with_idp(GOOGLE_PROVIDER, "").await.unwrap_err();
        assert_eq!(err.to_string(), "Popup closed before completing sign in.");
    }

    #[tokio::test]
    async fn test_refresh_token_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "new-id",
                "refresh_token": "new-refresh",
                "expires_in": "3600",
                "user_id": "u1"
            })))
            .mount(&server)
            .await;

        let refreshed = client(&server).refresh("old-refresh").await.unwrap();
        assert_eq!(refreshed.id_token, "new-id");
        assert_eq!(refreshed.refresh_token, "new-refresh");
    }

    #[tokio::test]
    async fn test_refresh_unreachable_is_network_error() {
        let config = ClientConfig {
            api_key: "test-key".into(),
            identity_endpoint: "http://127.0.0.1:1".into(),
            secure_token_endpoint: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        let err = IdentityClient::new(&config).unwrap().refresh("r").await.unwrap_err();
        assert_eq!(err, AuthError::Network);
        assert!(!err.revokes_session());
    }

    #[tokio::test]
    async fn test_unparseable_error_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = client(&server)
            .sign_in_with_password(&sign_in("jane@example.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Other("HTTP_500".into()));
    }
}
