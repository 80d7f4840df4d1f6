// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side session over an [`IdentityProvider`].
//!
//! Holds the current identity (or its absence) and a loading flag, both
//! observable through [`SessionManager::watch`]. While `loading` is set the
//! identity is unknown and [`SessionManager::scope`] refuses to hand out an
//! owner scope. Observers that hold live subscriptions should release them
//! whenever the identity changes.

use crate::error::AppError;
use crate::models::ProfileUpdate;
use crate::services::identity::{Identity, IdentityProvider, IdentityUpdate};
use crate::services::profile::ProfileService;
use crate::services::scope::OwnerScope;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Observable session snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub loading: bool,
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    profiles: ProfileService,
    state: watch::Sender<SessionState>,
    /// Provider token of the signed-in account. The lock also serializes
    /// identity resolution so only one is in flight at a time.
    token: Mutex<Option<String>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, profiles: ProfileService) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            provider,
            profiles,
            state,
            token: Mutex::new(None),
        }
    }

    /// Current snapshot.
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every session change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Owner scope for data calls. `Unauthorized` while loading or signed out.
    pub fn scope(&self) -> Result<OwnerScope, AppError> {
        let state = self.state.borrow();
        if state.loading {
            return Err(AppError::Unauthorized);
        }
        match &state.identity {
            Some(identity) => OwnerScope::new(identity.uid.clone()),
            None => Err(AppError::Unauthorized),
        }
    }

    fn publish(&self, identity: Option<Identity>, loading: bool) {
        self.state.send_replace(SessionState { identity, loading });
    }

    fn set_loading(&self) {
        self.state.send_modify(|state| state.loading = true);
    }

    /// Resolve a stored provider token into the current identity.
    ///
    /// Background resolution never fails: a rejected or unreachable lookup is
    /// logged and leaves the session signed out.
    pub async fn resolve(&self, id_token: &str) -> Option<Identity> {
        let mut token = self.token.lock().await;
        self.set_loading();

        match self.provider.lookup(id_token).await {
            Ok(identity) => {
                tracing::info!(uid = %identity.uid, "Session resolved");
                *token = Some(id_token.to_string());
                self.publish(Some(identity.clone()), false);
                Some(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session resolution failed");
                *token = None;
                self.publish(None, false);
                None
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let mut token = self.token.lock().await;
        self.set_loading();

        match self.provider.sign_in(email, password).await {
            Ok(session) => {
                tracing::info!(uid = %session.identity.uid, "Signed in");
                *token = Some(session.id_token);
                self.publish(Some(session.identity.clone()), false);
                Ok(session.identity)
            }
            Err(e) => {
                let previous = self.state.borrow().identity.clone();
                self.publish(previous, false);
                Err(e)
            }
        }
    }

    /// Create an account, provision its profile and sign in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AppError> {
        let mut token = self.token.lock().await;
        self.set_loading();

        let result = async {
            let session = self.provider.sign_up(email, password, display_name).await?;
            let scope = OwnerScope::new(session.identity.uid.clone())?;
            self.profiles
                .ensure_profile(
                    &scope,
                    &session.identity.email,
                    session.identity.display_name.as_deref(),
                )
                .await?;
            Ok::<_, AppError>(session)
        }
        .await;

        match result {
            Ok(session) => {
                tracing::info!(uid = %session.identity.uid, "Signed up");
                *token = Some(session.id_token);
                self.publish(Some(session.identity.clone()), false);
                Ok(session.identity)
            }
            Err(e) => {
                let previous = self.state.borrow().identity.clone();
                self.publish(previous, false);
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self) {
        let mut token = self.token.lock().await;
        *token = None;
        self.publish(None, false);
        tracing::info!("Signed out");
    }

    /// Reload the signed-in account from the provider.
    ///
    /// A rejected token signs the session out.
    pub async fn refresh(&self) -> Result<Identity, AppError> {
        let mut token = self.token.lock().await;
        let Some(id_token) = token.clone() else {
            return Err(AppError::Unauthorized);
        };
        self.set_loading();

        match self.provider.lookup(&id_token).await {
            Ok(identity) => {
                self.publish(Some(identity.clone()), false);
                Ok(identity)
            }
            Err(AppError::InvalidToken) => {
                tracing::info!("Session token rejected, signing out");
                *token = None;
                self.publish(None, false);
                Err(AppError::InvalidToken)
            }
            Err(e) => {
                let previous = self.state.borrow().identity.clone();
                self.publish(previous, false);
                Err(e)
            }
        }
    }

    /// Change display name or photo on the account and mirror it to the
    /// stored profile.
    pub async fn update_profile(&self, update: IdentityUpdate) -> Result<Identity, AppError> {
        let token = self.token.lock().await;
        let Some(id_token) = token.as_deref() else {
            return Err(AppError::Unauthorized);
        };

        let identity = self.provider.update_profile(id_token, &update).await?;
        self.publish(Some(identity.clone()), false);

        let scope = OwnerScope::new(identity.uid.clone())?;
        let profile_update = ProfileUpdate {
            display_name: update.display_name,
            phone_number: None,
            photo_url: update.photo_url,
        };
        match self.profiles.update(&scope, &profile_update).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                tracing::warn!(uid = %scope, "No stored profile to mirror account update");
            }
            Err(e) => return Err(e),
        }

        Ok(identity)
    }
}
