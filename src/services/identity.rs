// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider clients.
//!
//! Production talks to the Firebase Auth (Identity Toolkit) REST API; the
//! in-memory provider backs `BACKEND=memory` and the tests.

use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// An authenticated account as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    /// Provider token used for later lookups and profile edits
    pub id_token: String,
}

/// Editable account fields. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthSession, AppError>;

    /// Resolve a provider token to its account.
    async fn lookup(&self, id_token: &str) -> Result<Identity, AppError>;

    async fn update_profile(
        &self,
        id_token: &str,
        update: &IdentityUpdate,
    ) -> Result<Identity, AppError>;
}

/// Translate an Identity Toolkit error code into a caller-facing error.
///
/// Codes arrive as e.g. `EMAIL_EXISTS` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
pub fn map_provider_error(message: &str) -> AppError {
    let code = message
        .split(|c: char| c == ' ' || c == ':')
        .next()
        .unwrap_or_default();

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            AppError::InvalidCredentials("Incorrect email or password".to_string())
        }
        "USER_DISABLED" => {
            AppError::InvalidCredentials("This account has been disabled".to_string())
        }
        "EMAIL_EXISTS" => {
            AppError::Identity("An account with this email already exists".to_string())
        }
        "WEAK_PASSWORD" => {
            AppError::Identity("Password should be at least 6 characters".to_string())
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            AppError::Identity("The email address is badly formatted".to_string())
        }
        "MISSING_PASSWORD" => AppError::Identity("A password is required".to_string()),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AppError::Identity(
            "Too many unsuccessful attempts. Try again later".to_string(),
        ),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            AppError::InvalidToken
        }
        other => AppError::Identity(format!("Identity provider rejected the request ({})", other)),
    }
}

// ─── Firebase Auth REST client ───────────────────────────────

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    display_name: Option<String>,
    id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    #[serde(default)]
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl From<AccountInfo> for Identity {
    fn from(info: AccountInfo) -> Self {
        Identity {
            uid: info.local_id,
            email: info.email,
            display_name: info.display_name.filter(|n| !n.is_empty()),
            photo_url: info.photo_url.filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

/// Firebase Auth REST API client.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirebaseAuthClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
            api_key,
        }
    }

    /// Client for the Auth emulator at `host` (e.g. `localhost:9099`).
    pub fn emulator(host: &str, api_key: String) -> Self {
        tracing::info!(host, "Using Firebase Auth emulator");
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{}/identitytoolkit.googleapis.com/v1", host),
            api_key,
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(method, error = %e, "Identity provider unreachable");
                AppError::Identity("Identity provider is unreachable".to_string())
            })?;

        self.check_response_json(method, response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));

            tracing::debug!(method, %status, message = %message, "Identity provider rejected request");
            return Err(map_provider_error(&message));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("Unexpected identity provider response: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let token: TokenResponse = self
            .call(
                "signInWithPassword",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        // signInWithPassword omits the photo URL, so read the full account
        let identity = self.lookup(&token.id_token).await?;
        Ok(AuthSession {
            identity,
            id_token: token.id_token,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthSession, AppError> {
        let token: TokenResponse = self
            .call(
                "signUp",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let mut identity = Identity {
            uid: token.local_id,
            email: token.email,
            display_name: token.display_name.filter(|n| !n.is_empty()),
            photo_url: None,
        };

        if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
            let update = IdentityUpdate {
                display_name: Some(name.trim().to_string()),
                photo_url: None,
            };
            identity = self.update_profile(&token.id_token, &update).await?;
        }

        Ok(AuthSession {
            identity,
            id_token: token.id_token,
        })
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, AppError> {
        let response: LookupResponse = self
            .call("lookup", serde_json::json!({ "idToken": id_token }))
            .await?;

        response
            .users
            .into_iter()
            .next()
            .map(Identity::from)
            .ok_or(AppError::InvalidToken)
    }

    async fn update_profile(
        &self,
        id_token: &str,
        update: &IdentityUpdate,
    ) -> Result<Identity, AppError> {
        let mut body = serde_json::json!({
            "idToken": id_token,
            "returnSecureToken": false,
        });
        if let Some(name) = &update.display_name {
            body["displayName"] = serde_json::Value::String(name.clone());
        }
        if let Some(photo) = &update.photo_url {
            body["photoUrl"] = serde_json::Value::String(photo.clone());
        }

        let info: AccountInfo = self.call("update", body).await?;
        Ok(info.into())
    }
}

// ─── In-memory provider ──────────────────────────────────────

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
    disabled: bool,
}

/// Offline identity provider. Accounts and tokens live in process memory.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: DashMap<String, Account>,
    tokens: DashMap<String, String>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block further sign-ins for an account.
    pub fn disable(&self, email: &str) {
        if let Some(mut account) = self.accounts.get_mut(&normalize_email(email)) {
            account.disabled = true;
        }
    }

    /// Invalidate every token issued for `uid`.
    pub fn revoke_tokens(&self, uid: &str) {
        self.tokens.retain(|_, owner| owner != uid);
    }

    fn issue_token(&self, uid: &str) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), uid.to_string());
        token
    }

    fn account_for_token(&self, id_token: &str) -> Result<String, AppError> {
        let uid = self
            .tokens
            .get(id_token)
            .map(|uid| uid.clone())
            .ok_or(AppError::InvalidToken)?;

        self.accounts
            .iter()
            .find(|entry| entry.identity.uid == uid)
            .map(|entry| entry.key().clone())
            .ok_or(AppError::InvalidToken)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let account = self
            .accounts
            .get(&normalize_email(email))
            .map(|a| a.clone())
            .ok_or_else(|| map_provider_error("EMAIL_NOT_FOUND"))?;

        if account.password != password {
            return Err(map_provider_error("INVALID_PASSWORD"));
        }
        if account.disabled {
            return Err(map_provider_error("USER_DISABLED"));
        }

        Ok(AuthSession {
            id_token: self.issue_token(&account.identity.uid),
            identity: account.identity,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthSession, AppError> {
        let key = normalize_email(email);
        if key.is_empty() {
            return Err(map_provider_error("MISSING_EMAIL"));
        }
        if !key.contains('@') {
            return Err(map_provider_error("INVALID_EMAIL"));
        }
        if password.len() < 6 {
            return Err(map_provider_error("WEAK_PASSWORD"));
        }

        let identity = Identity {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email: key.clone(),
            display_name: display_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            photo_url: None,
        };

        match self.accounts.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(map_provider_error("EMAIL_EXISTS"))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                    disabled: false,
                });
            }
        }

        Ok(AuthSession {
            id_token: self.issue_token(&identity.uid),
            identity,
        })
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, AppError> {
        let key = self.account_for_token(id_token)?;
        self.accounts
            .get(&key)
            .map(|account| account.identity.clone())
            .ok_or(AppError::InvalidToken)
    }

    async fn update_profile(
        &self,
        id_token: &str,
        update: &IdentityUpdate,
    ) -> Result<Identity, AppError> {
        let key = self.account_for_token(id_token)?;
        let mut account = self.accounts.get_mut(&key).ok_or(AppError::InvalidToken)?;

        if let Some(name) = &update.display_name {
            account.identity.display_name = Some(name.clone()).filter(|n| !n.is_empty());
        }
        if let Some(photo) = &update.photo_url {
            account.identity.photo_url = Some(photo.clone()).filter(|p| !p.is_empty());
        }
        Ok(account.identity.clone())
    }
}
