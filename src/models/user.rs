//! User model, profile roles and named permissions

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::AppError;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Role held by a user profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Librarian => "Librarian",
            Role::Member => "Member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Role strings are compared exactly, as stored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Librarian" => Ok(Role::Librarian),
            "Member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Named permissions consumed by the page handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "bookshelf.can_view")]
    CanView,
    #[serde(rename = "relationship_app.can_add_book")]
    CanAddBook,
    #[serde(rename = "relationship_app.can_change_book")]
    CanChangeBook,
    #[serde(rename = "relationship_app.can_delete_book")]
    CanDeleteBook,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::CanView,
        Permission::CanAddBook,
        Permission::CanChangeBook,
        Permission::CanDeleteBook,
    ];

    /// Fully qualified codename (`app_label.codename`)
    pub fn codename(&self) -> &'static str {
        match self {
            Permission::CanView => "bookshelf.can_view",
            Permission::CanAddBook => "relationship_app.can_add_book",
            Permission::CanChangeBook => "relationship_app.can_change_book",
            Permission::CanDeleteBook => "relationship_app.can_delete_book",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.codename())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.codename() == s)
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    id: i32,
    username: String,
    password: String,
    email: Option<String>,
    is_active: bool,
    is_superuser: bool,
    date_joined: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password: row.password,
            email: row.email,
            is_active: row.is_active,
            is_superuser: row.is_superuser,
            date_joined: row.date_joined,
            last_login: row.last_login,
        }
    }
}

/// Full user model
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Profile attached one-to-one to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserProfile {
    pub user_id: i32,
    pub role: Role,
}

/// Values needed to insert a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub is_superuser: bool,
}

/// Opaque API token
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthToken {
    pub key: String,
    #[serde(skip_serializing)]
    pub user_id: i32,
    #[serde(skip_serializing)]
    pub created: DateTime<Utc>,
}

/// Username/password pair posted to the token and login endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_password_confirmation", skip_on_field_errors = false))]
pub struct Registration {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters"),
        regex(path = *USERNAME_RE, message = "Username may contain only letters, digits and @/./+/-/_")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

fn validate_password_confirmation(form: &Registration) -> Result<(), ValidationError> {
    if form.password1 != form.password2 {
        let mut error = ValidationError::new("password_mismatch");
        error.message = Some("The two password fields didn't match".into());
        return Err(error);
    }
    Ok(())
}

/// Usernames are compared in NFKC form
pub fn normalize_username(username: &str) -> String {
    username.nfkc().collect()
}

/// User with its access data, as returned by the administration endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<Role>,
    pub permissions: Vec<Permission>,
}

/// Set or clear the profile role
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    /// `null` removes the profile
    pub role: Option<Role>,
}

/// Replace the permission set
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePermissions {
    pub permissions: Vec<Permission>,
}

/// Session cookie claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub user_id: i32,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    /// Sign the claims into a session token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a session token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, AppError> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Authentication(e.to_string()))?;
        Ok(token_data.claims)
    }
}
