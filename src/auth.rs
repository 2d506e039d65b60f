//! Console users and bearer sessions.
//!
//! Passwords are stored as Argon2id PHC strings. Sessions live in memory and
//! end on logout, expiry or restart; expired ones are swept on every login.

use crate::domain::User;
use crate::error::{ConsoleError, Result};
use crate::storage::Repository;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConsoleError::Validation(format!("Failed to hash password: {e}")))
}

/// Constant-time check of a password against a stored PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    repo: Repository,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl AuthService {
    pub fn new(repo: Repository, session_ttl_hours: i64) -> Self {
        Self {
            repo,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::hours(session_ttl_hours.max(1)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        self.repo.find_one(|u: &User| u.email == email).await
    }

    pub async fn create_user(&self, email: &str, password: &str, full_name: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ConsoleError::Validation(format!("Invalid email: {email}")));
        }
        if password.len() < 8 {
            return Err(ConsoleError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(ConsoleError::Conflict(format!("User {email} already exists")));
        }
        let now = Utc::now();
        let user = self
            .repo
            .create(User {
                id: 0,
                email,
                full_name: full_name.trim().to_string(),
                password_hash: hash_password(password)?,
                active: true,
                created_at: now,
                updated_at: now,
                last_login_at: None,
            })
            .await?;
        info!("Created user {} ({})", user.id, user.email);
        Ok(user)
    }

    /// Create the user unless the email is already registered.
    pub async fn ensure_user(&self, email: &str, password: &str, full_name: &str) -> Result<User> {
        match self.find_by_email(email).await? {
            Some(user) => Ok(user),
            None => self.create_user(email, password, full_name).await,
        }
    }

    pub async fn has_users(&self) -> Result<bool> {
        Ok(self.repo.count::<User, _>(|u| u.active).await? > 0)
    }

    pub async fn set_active(&self, user_id: i64, active: bool) -> Result<User> {
        let mut user: User = self.repo.require(user_id).await?;
        user.active = active;
        user.updated_at = Utc::now();
        self.repo.update(&user).await?;
        if !active {
            self.sessions.write().await.retain(|_, s| s.user_id != user_id);
        }
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(Session, User)> {
        let invalid = || ConsoleError::Unauthorized("Invalid email or password".into());
        let mut user = self.find_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            warn!("Failed login for {}", user.email);
            return Err(invalid());
        }
        if !user.active {
            return Err(ConsoleError::Forbidden(format!("User {} is inactive", user.email)));
        }

        let now = Utc::now();
        self.prune_expired(now).await;
        user.last_login_at = Some(now);
        user.updated_at = now;
        self.repo.update(&user).await?;

        let session = Session {
            token: random_hex(32),
            user_id: user.id,
            expires_at: now + self.ttl,
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        info!("User {} logged in", user.id);
        Ok((session, user))
    }

    async fn prune_expired(&self, now: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!("Pruned {} expired sessions", pruned);
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns whether a session was ended.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// The active user behind a bearer token, if the session is still valid.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>> {
        let session = self.sessions.read().await.get(token).cloned();
        let Some(session) = session else {
            return Ok(None);
        };
        if session.expires_at <= Utc::now() {
            self.sessions.write().await.remove(token);
            return Ok(None);
        }
        Ok(self
            .repo
            .get::<User>(session.user_id)
            .await?
            .filter(|u| u.active))
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}
