//! Persisted login session.
//!
//! The token is stored verbatim under `authToken` and the user as JSON under
//! `currentUser`, so a restarted client resumes where it left off.

use taskboard_core::User;
use taskboard_store_fs::{KeyValueStore, StoreError};
use tracing::{info, warn};

use crate::api::{AuthResponse, LoginRequest};
use crate::backend::AuthBackend;
use crate::error::{AuthError, TaskError};

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "authToken";
/// Storage key of the logged-in user.
pub const USER_KEY: &str = "currentUser";

/// Login state bound to an [`AuthBackend`].
pub struct Session<A, K> {
    auth: A,
    storage: K,
}

impl<A: AuthBackend, K: KeyValueStore> Session<A, K> {
    /// Create a session over `auth`, persisting into `storage`.
    pub const fn new(auth: A, storage: K) -> Self {
        Self { auth, storage }
    }

    /// Underlying auth backend.
    pub const fn auth(&self) -> &A {
        &self.auth
    }

    /// Log in and persist the session.
    ///
    /// # Errors
    /// Returns [`TaskError::Validation`] for bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, TaskError> {
        let request = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let response = self.auth.login(&request).await?;
        self.persist(&response)?;
        info!(user = %response.user.id, role = %response.user.role, "Logged in");
        Ok(response.user)
    }

    /// Log out. Local state is cleared even when the backend call fails.
    ///
    /// # Errors
    /// Returns an error only if local storage cannot be cleared.
    pub async fn logout(&self) -> Result<(), TaskError> {
        match self.token() {
            Ok(Some(token)) => {
                if let Err(err) = self.auth.logout(&token).await {
                    warn!(error = %err, "Logout request failed; clearing local session anyway");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Stored token unreadable; clearing local session anyway"),
        }
        self.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Exchange the current token for a fresh one.
    ///
    /// # Errors
    /// Returns [`TaskError::AuthExpired`] when there is no usable session; the
    /// session is cleared in that case.
    pub async fn refresh(&self) -> Result<User, TaskError> {
        let token = self.token()?.ok_or(TaskError::AuthExpired)?;
        match self.auth.refresh(&token).await {
            Ok(response) => {
                self.persist(&response)?;
                Ok(response.user)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Confirm the stored token with the backend and return its user.
    ///
    /// # Errors
    /// Returns [`TaskError::AuthExpired`] when there is no usable session; the
    /// session is cleared in that case.
    pub async fn verify(&self) -> Result<User, TaskError> {
        let token = self.token()?.ok_or(TaskError::AuthExpired)?;
        match self.auth.profile(&token).await {
            Ok(user) => Ok(user),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// The stored user, without contacting the backend.
    ///
    /// # Errors
    /// Returns [`TaskError::AuthExpired`] when nobody is logged in.
    pub fn require_user(&self) -> Result<User, TaskError> {
        self.current_user()?.ok_or(TaskError::AuthExpired)
    }

    /// Stored bearer token.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn token(&self) -> Result<Option<String>, TaskError> {
        Ok(self.storage.get(TOKEN_KEY)?)
    }

    /// Stored user. An unreadable entry counts as logged out.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn current_user(&self) -> Result<Option<User>, TaskError> {
        match self.storage.get_json(USER_KEY) {
            Ok(user) => Ok(user),
            Err(StoreError::Decode { key, source }) => {
                warn!(%key, error = %source, "Ignoring unreadable stored user");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Whether both a token and a user are stored.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn is_authenticated(&self) -> Result<bool, TaskError> {
        Ok(self.token()?.is_some() && self.current_user()?.is_some())
    }

    /// `Authorization` header value for the stored token.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn authorization_header(&self) -> Result<Option<String>, TaskError> {
        Ok(self.token()?.map(|token| format!("Bearer {token}")))
    }

    /// Force a logout after the backend reported the session as expired.
    ///
    /// # Errors
    /// Returns an error if storage cannot be cleared.
    pub fn handle_auth_expired(&self) -> Result<(), TaskError> {
        warn!("Session expired; clearing stored credentials");
        self.clear()
    }

    /// Pass `result` through, forcing a logout when it reports an expired session.
    ///
    /// # Errors
    /// Returns the original error, or the storage error if clearing fails.
    pub fn guard<T>(&self, result: Result<T, TaskError>) -> Result<T, TaskError> {
        result.map_err(|err| self.expire_if_needed(err))
    }

    fn fail(&self, err: AuthError) -> TaskError {
        self.expire_if_needed(TaskError::from(err))
    }

    fn expire_if_needed(&self, err: TaskError) -> TaskError {
        if err.requires_login()
            && let Err(clear_err) = self.handle_auth_expired()
        {
            return clear_err;
        }
        err
    }

    fn persist(&self, response: &AuthResponse) -> Result<(), TaskError> {
        self.storage.set(TOKEN_KEY, &response.token)?;
        self.storage.set_json(USER_KEY, &response.user)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TaskError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        Ok(())
    }
}
