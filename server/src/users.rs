//! User accounts: signup and lookups on top of the directory.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::{Argon2PasswordHasher, PasswordHashError};
use crate::directory::{DirectoryError, UserDirectory, UserRecord};

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Minimum email length accepted at signup.
pub const MIN_EMAIL_LENGTH: usize = 2;

/// Signup request body.
#[derive(Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub pwd: String,
}

/// Public view of a user. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub email: String,
    pub name: String,
    pub user_id: String,
}

impl From<UserRecord> for UserView {
    fn from(record: UserRecord) -> Self {
        Self {
            email: record.email,
            name: record.name,
            user_id: record.id,
        }
    }
}

#[derive(Debug)]
pub enum UserServiceError {
    /// A signup field failed validation.
    Validation(String),
    /// The email is already registered.
    DuplicateEmail,
    /// No user with the requested id.
    NotFound,
    Directory(DirectoryError),
    Hashing(PasswordHashError),
    /// The operation did not run to completion.
    Interrupted(String),
}

impl std::fmt::Display for UserServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(reason) => write!(f, "invalid user: {reason}"),
            Self::DuplicateEmail => write!(f, "email already exists"),
            Self::NotFound => write!(f, "user not found"),
            Self::Directory(e) => write!(f, "directory error: {e}"),
            Self::Hashing(e) => write!(f, "{e}"),
            Self::Interrupted(reason) => write!(f, "interrupted: {reason}"),
        }
    }
}

impl std::error::Error for UserServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Directory(e) => Some(e),
            Self::Hashing(e) => Some(e),
            Self::Validation(_) | Self::DuplicateEmail | Self::NotFound | Self::Interrupted(_) => {
                None
            }
        }
    }
}

impl From<DirectoryError> for UserServiceError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::DuplicateEmail(_) => Self::DuplicateEmail,
            other => Self::Directory(other),
        }
    }
}

impl From<PasswordHashError> for UserServiceError {
    fn from(e: PasswordHashError) -> Self {
        Self::Hashing(e)
    }
}

pub struct UserService {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<Argon2PasswordHasher>,
}

impl UserService {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, hasher: Arc<Argon2PasswordHasher>) -> Self {
        Self { directory, hasher }
    }

    #[must_use]
    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    /// Register a user under a fresh random id.
    ///
    /// Hashes the password, so this is CPU-bound; async callers should run it
    /// on a blocking thread.
    ///
    /// # Errors
    /// Returns `UserServiceError::Validation` for bad fields and
    /// `UserServiceError::DuplicateEmail` if the email is taken.
    pub fn create_user(&self, new_user: NewUser) -> Result<UserView, UserServiceError> {
        validate(&new_user)?;

        if self.directory.find_by_email(&new_user.email)?.is_some() {
            return Err(UserServiceError::DuplicateEmail);
        }

        let record = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: new_user.email,
            name: new_user.name,
            password_hash: self.hasher.hash(&new_user.pwd)?,
        };
        // The directory re-checks the email under its write lock.
        self.directory.insert(record.clone())?;

        tracing::info!(user_id = %record.id, "created user");
        Ok(record.into())
    }

    pub fn user_by_id(&self, user_id: &str) -> Result<UserView, UserServiceError> {
        self.directory
            .find_by_id(user_id)?
            .map(UserView::from)
            .ok_or(UserServiceError::NotFound)
    }

    pub fn all_users(&self) -> Result<Vec<UserView>, UserServiceError> {
        let mut users: Vec<UserView> = self
            .directory
            .all()?
            .into_iter()
            .map(UserView::from)
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }
}

fn validate(new_user: &NewUser) -> Result<(), UserServiceError> {
    let email = new_user.email.trim();
    if email.chars().count() < MIN_EMAIL_LENGTH || !email.contains('@') {
        return Err(UserServiceError::Validation(
            "email must be a valid address".to_string(),
        ));
    }
    if new_user.name.trim().is_empty() {
        return Err(UserServiceError::Validation(
            "name must not be empty".to_string(),
        ));
    }
    if new_user.pwd.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
