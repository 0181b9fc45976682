//! Mock authentication: a local user directory and a persisted session record
//! with an expiry. Nothing here is cryptographically verified; the session is a
//! plain record checked against the clock.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::storage::{load_json, save_json, LocalStore, SESSION_KEY};

/// Accepted for any well-formed email as a demo shortcut.
pub const DEMO_BYPASS_PASSWORD: &str = "password";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(User),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    UserExists,
    Validation,
    Storage,
}

/// Result of a login or registration. Credential problems are reported here,
/// never as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip)]
    pub failure: Option<AuthFailure>,
}

impl AuthOutcome {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            failure: None,
        }
    }

    fn fail(failure: AuthFailure, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            failure: Some(failure),
        }
    }
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    user: User,
    password: String,
}

/// In-memory account directory keyed by lower-cased email.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    entries: HashMap<String, DirectoryEntry>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory seeded with the demo account.
    pub fn demo() -> Self {
        let mut dir = Self::new();
        dir.insert(
            User {
                id: "user-1".to_string(),
                email: "user@example.com".to_string(),
                display_name: "Demo User".to_string(),
            },
            "password123",
        );
        dir
    }

    pub fn contains(&self, email: &str) -> bool {
        self.entries.contains_key(&email.trim().to_lowercase())
    }

    pub fn insert(&mut self, user: User, password: impl Into<String>) {
        self.entries.insert(
            user.email.trim().to_lowercase(),
            DirectoryEntry {
                user,
                password: password.into(),
            },
        );
    }

    fn verify(&self, email: &str, password: &str) -> Option<User> {
        self.entries
            .get(&email.trim().to_lowercase())
            .filter(|e| e.password == password)
            .map(|e| e.user.clone())
    }
}

pub struct SessionManager {
    store: Arc<dyn LocalStore>,
    directory: Mutex<UserDirectory>,
    ttl: chrono::Duration,
    state: watch::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn LocalStore>, directory: UserDirectory, ttl: chrono::Duration) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            store,
            directory: Mutex::new(directory),
            ttl,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        match &*self.state.borrow() {
            AuthState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let email = email.trim();
        if !is_well_formed_email(email) || password.is_empty() {
            return AuthOutcome::fail(AuthFailure::Validation, "Enter a valid email and password");
        }

        let previous = self.state.send_replace(AuthState::Authenticating);
        let known = self.directory.lock().await.verify(email, password);
        let user = match known {
            Some(user) => user,
            None if password == DEMO_BYPASS_PASSWORD => {
                debug!("Demo password accepted for {}", email);
                User {
                    id: new_user_id(),
                    email: email.to_string(),
                    display_name: display_name_from_email(email),
                }
            }
            None => {
                self.state.send_replace(previous);
                info!("Rejected login for {}", email);
                return AuthOutcome::fail(
                    AuthFailure::InvalidCredentials,
                    "Invalid email or password",
                );
            }
        };

        match self.start_session(user, previous).await {
            Ok(()) => AuthOutcome::ok("Login successful"),
            Err(outcome) => outcome,
        }
    }

    pub async fn register(&self, email: &str, name: &str, password: &str) -> AuthOutcome {
        let email = email.trim();
        let name = name.trim();
        if !is_well_formed_email(email) || password.is_empty() || name.is_empty() {
            return AuthOutcome::fail(
                AuthFailure::Validation,
                "Enter a name, a valid email and a password",
            );
        }

        let user = {
            let mut directory = self.directory.lock().await;
            if directory.contains(email) {
                return AuthOutcome::fail(AuthFailure::UserExists, "User already exists");
            }
            let user = User {
                id: new_user_id(),
                email: email.to_string(),
                display_name: name.to_string(),
            };
            directory.insert(user.clone(), password);
            user
        };

        let previous = self.state.send_replace(AuthState::Authenticating);
        match self.start_session(user, previous).await {
            Ok(()) => AuthOutcome::ok("Registration successful"),
            Err(outcome) => outcome,
        }
    }

    /// True only for a present, readable, unexpired session. Anything else
    /// clears the session. Expiry is never extended.
    pub async fn check_auth(&self) -> bool {
        let stored: Option<Session> = match load_json(self.store.as_ref(), SESSION_KEY).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Discarding unreadable session: {:#}", e);
                self.clear().await;
                return false;
            }
        };
        let Some(session) = stored else {
            self.state.send_replace(AuthState::Unauthenticated);
            return false;
        };
        if session.token.is_empty() {
            warn!("Discarding session without token");
            self.clear().await;
            return false;
        }
        if session.is_expired_at(Utc::now().timestamp()) {
            info!("Session for {} expired", session.user.email);
            self.clear().await;
            return false;
        }

        let authenticated = AuthState::Authenticated(session.user);
        self.state.send_if_modified(|current| {
            if *current == authenticated {
                false
            } else {
                *current = authenticated;
                true
            }
        });
        true
    }

    /// Startup hook: adopt a persisted session if it is still valid.
    pub async fn restore(&self) -> bool {
        let valid = self.check_auth().await;
        match self.current_user() {
            Some(user) if valid => info!("Restored session for {}", user.email),
            _ => debug!("No session to restore"),
        }
        valid
    }

    pub async fn logout(&self) {
        self.clear().await;
    }

    async fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY).await {
            error!("Failed to remove persisted session: {:#}", e);
        }
        self.state.send_replace(AuthState::Unauthenticated);
    }

    async fn start_session(&self, user: User, previous: AuthState) -> Result<(), AuthOutcome> {
        let now = Utc::now();
        let issued_at = now.timestamp();
        let session = Session {
            token: format!("session-{}-{}", user.id, now.timestamp_millis()),
            user: user.clone(),
            issued_at,
            expires_at: issued_at + self.ttl.num_seconds(),
        };
        if let Err(e) = save_json(self.store.as_ref(), SESSION_KEY, &session).await {
            error!("Failed to persist session: {:#}", e);
            self.state.send_replace(previous);
            return Err(AuthOutcome::fail(
                AuthFailure::Storage,
                "Could not save your session. Please try again.",
            ));
        }
        info!("Signed in {}", user.email);
        self.state.send_replace(AuthState::Authenticated(user));
        Ok(())
    }
}

fn new_user_id() -> String {
    format!("user-{}", Utc::now().timestamp_millis())
}

fn display_name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

pub fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
