//! Account registry and signed-in session.
//!
//! [`SessionService`] is the capability the rest of the application sees.
//! [`SqliteSessionService`] keeps the registry and the current session in
//! the database, so a restart restores whoever was signed in.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::Database;
use crate::error::StoreError;

/// Avatar assigned to new accounts.
pub const DEFAULT_PHOTO_URL: &str = "https://cdn-icons-png.flaticon.com/512/3135/3135715.png";

const MIN_PASSWORD_LEN: usize = 6;

/// Public view of an account. Never carries password material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration details.
#[derive(Clone, Debug)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Authentication and session capability.
pub trait SessionService: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Result<Option<User>, StoreError>;
    /// Sign in, replacing any existing session.
    fn login(&self, credentials: &Credentials) -> Result<User, StoreError>;
    fn logout(&self) -> Result<(), StoreError>;
    /// Create an account and sign it in.
    fn register(&self, profile: &Profile) -> Result<User, StoreError>;
}

/// Lowercased, trimmed email used as the account key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Session service backed by the `users` and `session` tables.
pub struct SqliteSessionService {
    db: Arc<Database>,
}

impl SqliteSessionService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn start_session(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session (slot, user_id, signed_in_at) VALUES (1, ?1, ?2)",
                rusqlite::params![user_id.to_string(), Utc::now().timestamp()],
            )?;
            Ok(())
        })
    }
}

impl SessionService for SqliteSessionService {
    fn current_user(&self) -> Result<Option<User>, StoreError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT u.id, u.name, u.email, u.photo_url, u.created_at
                     FROM session s JOIN users u ON u.id = s.user_id
                     WHERE s.slot = 1",
                    [],
                    read_user,
                )
                .optional()?;
            row.map(RawUser::into_user).transpose()
        })
    }

    fn login(&self, credentials: &Credentials) -> Result<User, StoreError> {
        let email = normalize_email(&credentials.email);

        let found = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, email, photo_url, created_at, password_salt, password_hash
                     FROM users WHERE email = ?1",
                    rusqlite::params![email],
                    |row| Ok((read_user(row)?, row.get::<_, String>(5)?, row.get::<_, String>(6)?)),
                )
                .optional()?)
        })?;

        let (raw, salt, stored_hash) = found.ok_or(StoreError::InvalidCredentials)?;
        if hash_password(&salt, &credentials.password) != stored_hash {
            tracing::info!("Rejected sign-in with wrong password");
            return Err(StoreError::InvalidCredentials);
        }

        let user = raw.into_user()?;
        self.start_session(user.id)?;
        tracing::info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    fn logout(&self) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM session WHERE slot = 1", [])?;
            Ok(())
        })?;
        tracing::info!("User signed out");
        Ok(())
    }

    fn register(&self, profile: &Profile) -> Result<User, StoreError> {
        let name = profile.name.trim();
        if name.is_empty() {
            return Err(StoreError::validation("name", "must not be empty"));
        }
        let email = normalize_email(&profile.email);
        if !email.contains('@') {
            return Err(StoreError::validation("email", "must be an email address"));
        }
        if profile.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(StoreError::validation(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            photo_url: DEFAULT_PHOTO_URL.to_string(),
            created_at: Utc
                .timestamp_opt(now.timestamp(), 0)
                .single()
                .unwrap_or(now),
        };
        let salt = generate_salt();
        let hash = hash_password(&salt, &profile.password);

        self.db.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM users WHERE email = ?1)",
                rusqlite::params![user.email],
                |row| row.get(0),
            )?;
            if taken {
                return Err(StoreError::EmailTaken);
            }
            conn.execute(
                "INSERT INTO users (id, name, email, password_salt, password_hash, photo_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    salt,
                    hash,
                    user.photo_url,
                    user.created_at.timestamp(),
                ],
            )?;
            Ok(())
        })?;

        self.start_session(user.id)?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }
}

struct RawUser {
    id: String,
    name: String,
    email: String,
    photo_url: String,
    created_at: i64,
}

impl RawUser {
    fn into_user(self) -> Result<User, StoreError> {
        Ok(User {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| StoreError::Corrupt(format!("user id '{}': {}", self.id, e)))?,
            name: self.name,
            email: self.email,
            photo_url: self.photo_url,
            created_at: Utc
                .timestamp_opt(self.created_at, 0)
                .single()
                .ok_or_else(|| StoreError::Corrupt(format!("timestamp {}", self.created_at)))?,
        })
    }
}

fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
    Ok(RawUser {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        photo_url: row.get(3)?,
        created_at: row.get(4)?,
    })
}
