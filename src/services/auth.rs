//! Authentication service: passwords, registration, sessions and API tokens

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::RngCore;
use validator::Validate;

use crate::{
    access::{Identity, Principal},
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        normalize_username, AuthToken, Credentials, NewUser, Registration, Role, SessionClaims, User,
    },
    repository::Repository,
};

/// Length in bytes of a freshly generated API token (hex-encoded to 40 chars)
const TOKEN_BYTES: usize = 20;

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Check a username/password pair; inactive accounts never authenticate
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .repository
            .users
            .get_by_username(&normalize_username(username))
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !self.verify_password(&user, password)? || !user.is_active {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        self.repository.users.touch_last_login(user.id).await?;
        tracing::info!(user_id = user.id, "User authenticated");
        Ok(user)
    }

    /// Create an account with a `Member` profile
    pub async fn register(&self, mut form: Registration) -> AppResult<User> {
        form.username = normalize_username(&form.username);
        form.validate()?;

        if self.repository.users.username_exists(&form.username).await? {
            return Err(AppError::Validation("A user with that username already exists".to_string()));
        }

        // A concurrent registration can still win the insert
        let user = self
            .repository
            .users
            .create_user(&NewUser {
                username: form.username,
                password_hash: self.hash_password(&form.password1)?,
                email: None,
                is_superuser: false,
            })
            .await
            .map_err(|e| match e {
                AppError::Conflict(message) => AppError::Validation(message),
                other => other,
            })?;

        self.repository
            .users
            .set_profile(user.id, Some(Role::Member))
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Return the caller's API token, creating it on first use
    pub async fn obtain_token(&self, credentials: &Credentials) -> AppResult<AuthToken> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(AppError::Validation(
                "Must include \"username\" and \"password\"".to_string(),
            ));
        }

        let user = self
            .authenticate(&credentials.username, &credentials.password)
            .await
            .map_err(|e| match e {
                AppError::Authentication(_) => AppError::Validation(
                    "Unable to log in with provided credentials".to_string(),
                ),
                other => other,
            })?;

        self.repository
            .users
            .token_get_or_create(user.id, &generate_token_key())
            .await
    }

    /// Resolve an `Authorization: Token <key>` credential
    pub async fn principal_for_token(&self, key: &str) -> AppResult<Principal> {
        let user = self
            .repository
            .users
            .token_user(key)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid token".to_string()))?;

        if !user.is_active {
            return Err(AppError::Authentication("User inactive or deleted".to_string()));
        }

        self.principal(user).await
    }

    /// Sign a session cookie value for the user
    pub fn issue_session(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.session_expiration_hours as i64 * 3600);

        let claims = SessionClaims {
            sub: user.username.clone(),
            user_id: user.id,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.session_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create session: {}", e)))
    }

    /// Resolve the session cookie; a missing, expired or stale session is anonymous
    pub async fn identity_from_session(&self, session: Option<&str>) -> AppResult<Identity> {
        let Some(session) = session else {
            return Ok(Identity::Anonymous);
        };

        let claims = match SessionClaims::from_token(session, &self.config.session_secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Ignoring session cookie: {}", e);
                return Ok(Identity::Anonymous);
            }
        };

        let user = match self.repository.users.get_by_id(claims.user_id).await {
            Ok(user) if user.is_active => user,
            Ok(_) | Err(AppError::NotFound(_)) => return Ok(Identity::Anonymous),
            Err(e) => return Err(e),
        };

        Ok(Identity::Authenticated(self.principal(user).await?))
    }

    /// Load the profile and permissions of a user
    pub async fn principal(&self, user: User) -> AppResult<Principal> {
        let profile = self.repository.users.profile(user.id).await?;
        let permissions = self.repository.users.permissions(user.id).await?;
        Ok(Principal {
            user,
            profile,
            permissions,
        })
    }

    /// Create the configured superuser with an Admin profile if it is missing.
    /// Returns whether an account was created.
    pub async fn ensure_superuser(&self, username: &str, password: &str) -> AppResult<bool> {
        let username = normalize_username(username);
        if self.repository.users.username_exists(&username).await? {
            return Ok(false);
        }

        let user = self
            .repository
            .users
            .create_user(&NewUser {
                username,
                password_hash: self.hash_password(password)?,
                email: None,
                is_superuser: true,
            })
            .await?;
        self.repository
            .users
            .set_profile(user.id, Some(Role::Admin))
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "Superuser created");
        Ok(true)
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}

/// 40 lowercase hex characters from 20 random bytes
fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
