//! Identity: sign-up, sign-in and profile storage.
//!
//! The board never authenticates anyone itself. It asks an
//! [`IdentityService`] for the current [`User`] and turns it into a
//! [`Principal`]. `InMemoryIdentity` is the bundled implementation used by
//! the CLI and tests.

use crate::capability::Principal;
use crate::types::{SubscriptionTier, User, UserRole};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("username must be at least {} characters", MIN_USERNAME_LEN)]
    InvalidUsername,

    #[error("an account already exists for {0}")]
    AlreadyRegistered(String),

    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("no profile for user {0}")]
    ProfileNotFound(String),

    #[error("not signed in")]
    NotAuthenticated,
}

/// Backend that owns accounts and profiles.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<User, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Profile of the signed-in user, if a session exists.
    async fn current_user(&self) -> Result<Option<User>, IdentityError>;

    async fn update_subscription(&self, user_id: &str, tier: SubscriptionTier) -> Result<User, IdentityError>;
}

struct Account {
    user_id: String,
    password_digest: String,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    profiles: HashMap<String, User>,
    session: Option<String>,
}

/// Identity service backed by in-process maps.
#[derive(Default)]
pub struct InMemoryIdentity {
    directory: Mutex<Directory>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with the given role and a full profile.
    pub fn with_account(self, email: &str, password: &str, username: &str, role: UserRole) -> Self {
        {
            let mut dir = self.lock();
            let user_id = Uuid::now_v7().to_string();
            dir.accounts.insert(
                normalize_email(email),
                Account {
                    user_id: user_id.clone(),
                    password_digest: digest(password),
                },
            );
            dir.profiles.insert(
                user_id.clone(),
                User {
                    id: user_id,
                    email: normalize_email(email),
                    username: Some(username.to_string()),
                    role,
                    subscription: SubscriptionTier::Free,
                },
            );
        }
        self
    }

    /// Register credentials without a profile; one is created on first sign-in.
    pub fn with_credentials(self, email: &str, password: &str) -> Self {
        self.lock().accounts.insert(
            normalize_email(email),
            Account {
                user_id: Uuid::now_v7().to_string(),
                password_digest: digest(password),
            },
        );
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<User, IdentityError> {
        validate_email(email)?;
        validate_password(password)?;
        if username.trim().chars().count() < MIN_USERNAME_LEN {
            return Err(IdentityError::InvalidUsername);
        }

        let email = normalize_email(email);
        let mut dir = self.lock();
        if dir.accounts.contains_key(&email) {
            return Err(IdentityError::AlreadyRegistered(email));
        }

        let user = User {
            id: Uuid::now_v7().to_string(),
            email: email.clone(),
            username: Some(username.trim().to_string()),
            role: UserRole::User,
            subscription: SubscriptionTier::Free,
        };
        dir.accounts.insert(
            email,
            Account {
                user_id: user.id.clone(),
                password_digest: digest(password),
            },
        );
        dir.profiles.insert(user.id.clone(), user.clone());
        dir.session = Some(user.id.clone());

        info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, IdentityError> {
        let email = normalize_email(email);
        let mut dir = self.lock();

        let user_id = match dir.accounts.get(&email) {
            Some(account) if account.password_digest == digest(password) => account.user_id.clone(),
            _ => return Err(IdentityError::InvalidCredentials),
        };

        // Accounts without a profile get a default one named after the mailbox.
        let user = dir
            .profiles
            .entry(user_id.clone())
            .or_insert_with(|| User {
                id: user_id.clone(),
                email: email.clone(),
                username: email.split('@').next().map(str::to_string),
                role: UserRole::User,
                subscription: SubscriptionTier::Free,
            })
            .clone();
        dir.session = Some(user_id);

        info!(user_id = %user.id, role = user.role.as_str(), "signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.lock().session = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, IdentityError> {
        let dir = self.lock();
        match dir.session {
            None => Ok(None),
            Some(ref id) => dir
                .profiles
                .get(id)
                .cloned()
                .map(Some)
                .ok_or_else(|| IdentityError::ProfileNotFound(id.clone())),
        }
    }

    async fn update_subscription(&self, user_id: &str, tier: SubscriptionTier) -> Result<User, IdentityError> {
        let mut dir = self.lock();
        let profile = dir
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| IdentityError::ProfileNotFound(user_id.to_string()))?;
        profile.subscription = tier;
        info!(user_id, tier = tier.as_str(), "subscription updated");
        Ok(profile.clone())
    }
}

/// Client-side view of who is signed in.
pub struct AuthSession {
    service: Arc<dyn IdentityService>,
    user: Option<User>,
}

impl AuthSession {
    pub fn new(service: Arc<dyn IdentityService>) -> Self {
        Self { service, user: None }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Principal for board operations; fails when nobody is signed in.
    pub fn principal(&self) -> Result<Principal, IdentityError> {
        self.user
            .as_ref()
            .map(Principal::from_user)
            .ok_or(IdentityError::NotAuthenticated)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User, IdentityError> {
        let user = self.service.sign_in(email, password).await?;
        Ok(self.user.insert(user))
    }

    pub async fn register(&mut self, email: &str, password: &str, username: &str) -> Result<&User, IdentityError> {
        let user = self.service.sign_up(email, password, username).await?;
        Ok(self.user.insert(user))
    }

    pub async fn logout(&mut self) -> Result<(), IdentityError> {
        self.service.sign_out().await?;
        self.user = None;
        Ok(())
    }

    pub async fn update_subscription(&mut self, tier: SubscriptionTier) -> Result<&User, IdentityError> {
        let user_id = self
            .user
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or(IdentityError::NotAuthenticated)?;
        let user = self.service.update_subscription(&user_id, tier).await?;
        Ok(self.user.insert(user))
    }

    /// Pick up an existing session from the service.
    pub async fn restore_session(&mut self) -> Result<Option<&User>, IdentityError> {
        self.user = self.service.current_user().await?;
        Ok(self.user.as_ref())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), IdentityError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !email.chars().any(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(IdentityError::InvalidEmail(email.to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword);
    }
    Ok(())
}

fn digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
