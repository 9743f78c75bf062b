//! User directory: lookup of stored user records by email or id.
//!
//! The authentication core depends only on the `UserDirectory` trait.
//! `InMemoryUserDirectory` is the implementation the service runs with.
//!
//! # Invariants
//!
//! - Each email maps to at most one user record
//! - The email index and the id map always agree

use std::collections::HashMap;
use std::sync::RwLock;

/// A stored user.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Opaque user identifier (a UUID string).
    pub id: String,
    pub email: String,
    pub name: String,
    /// PHC-format password hash.
    pub password_hash: String,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Errors returned by directory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// A user with this email already exists.
    DuplicateEmail(String),
    /// A user with this id already exists.
    DuplicateId(String),
    /// The backing store could not be read or written.
    Unavailable(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEmail(email) => write!(f, "email already exists: {email}"),
            Self::DuplicateId(id) => write!(f, "user id already exists: {id}"),
            Self::Unavailable(reason) => write!(f, "user directory unavailable: {reason}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Store of user records.
///
/// Lookups are synchronous; callers on the async runtime run them on a
/// blocking thread together with password verification.
pub trait UserDirectory: Send + Sync {
    /// Look up a user by email.
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Look up a user by id.
    fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Store a new user.
    ///
    /// # Errors
    /// Returns `DirectoryError::DuplicateEmail` if the email is taken.
    fn insert(&self, record: UserRecord) -> Result<(), DirectoryError>;

    /// All users, in no particular order.
    fn all(&self) -> Result<Vec<UserRecord>, DirectoryError>;
}

#[derive(Default)]
struct Tables {
    /// Records keyed by id.
    by_id: HashMap<String, UserRecord>,
    /// Email to id.
    email_index: HashMap<String, String>,
}

/// Process-local user directory.
///
/// # Thread Safety
///
/// Uses `RwLock` so concurrent logins read in parallel while signups take
/// exclusive access. The duplicate-email check and the insert happen under
/// the same write lock.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    tables: RwLock<Tables>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> DirectoryError {
    DirectoryError::Unavailable("lock poisoned".to_string())
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .email_index
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.by_id.get(id).cloned())
    }

    fn insert(&self, record: UserRecord) -> Result<(), DirectoryError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        if tables.email_index.contains_key(&record.email) {
            return Err(DirectoryError::DuplicateEmail(record.email));
        }
        if tables.by_id.contains_key(&record.id) {
            return Err(DirectoryError::DuplicateId(record.id));
        }
        tables
            .email_index
            .insert(record.email.clone(), record.id.clone());
        tables.by_id.insert(record.id.clone(), record);
        Ok(())
    }

    fn all(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.by_id.values().cloned().collect())
    }
}
