//! Credential collaborator for the UI/CLI callers
//!
//! Authentication is deliberately thin: the core only exposes the single
//! `validate(user, pass) -> Option<Role>` contract, backed by the `users`
//! table with SHA-256 digests. Scheme selection beyond that is out of scope.

use crate::domain::ParkingError;
use crate::store::Store;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

pub const DEFAULT_ADMIN_USER: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "admin" => Role::Admin,
            _ => Role::Staff,
        })
    }
}

/// Single abstracted credential contract consumed by login flows.
pub trait CredentialValidator {
    fn validate(&self, username: &str, password: &str) -> Result<Option<Role>, ParkingError>;
}

/// Store-backed user directory.
pub struct UserDirectory {
    store: Store,
}

impl UserDirectory {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create the default admin account if missing. Never overwrites an
    /// existing one.
    pub fn ensure_default_admin(&self) -> Result<(), ParkingError> {
        self.store.with_write_tx(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO users (username, password_hash, role) \
                 VALUES (?1, ?2, 'admin')",
                params![DEFAULT_ADMIN_USER, sha256_hex(DEFAULT_ADMIN_PASSWORD)],
            )?;
            if inserted > 0 {
                info!(username = %DEFAULT_ADMIN_USER, "default_admin_created");
            }
            Ok(())
        })
    }

    /// Create a user; returns false if the username is taken.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<bool, ParkingError> {
        self.store.with_write_tx(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO users (username, password_hash, role) \
                 VALUES (?1, ?2, ?3)",
                params![username, sha256_hex(password), role.as_str()],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Change a password after re-authenticating with the old one.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool, ParkingError> {
        if self.validate(username, old_password)?.is_none() {
            warn!(username = %username, "password_change_rejected");
            return Ok(false);
        }
        self.store.with_write_tx(|tx| {
            tx.execute(
                "UPDATE users SET password_hash = ?2 WHERE username = ?1",
                params![username, sha256_hex(new_password)],
            )?;
            Ok(true)
        })
    }

    /// Delete a user account. The built-in admin cannot be deleted.
    pub fn delete_user(&self, username: &str) -> Result<bool, ParkingError> {
        if username.eq_ignore_ascii_case(DEFAULT_ADMIN_USER) {
            return Ok(false);
        }
        self.store.with_write_tx(|tx| {
            let deleted = tx.execute("DELETE FROM users WHERE username = ?1", [username])?;
            Ok(deleted > 0)
        })
    }
}

impl CredentialValidator for UserDirectory {
    fn validate(&self, username: &str, password: &str) -> Result<Option<Role>, ParkingError> {
        self.store
            .with_read(|conn| lookup_role(conn, username, password))
    }
}

fn lookup_role(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Option<Role>, ParkingError> {
    let role: Option<String> = conn
        .query_row(
            "SELECT role FROM users WHERE username = ?1 AND password_hash = ?2",
            params![username, sha256_hex(password)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(role.map(|r| r.parse().expect("infallible")))
}

fn sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        let dir = UserDirectory::new(Store::open_in_memory().unwrap());
        dir.ensure_default_admin().unwrap();
        dir
    }

    #[test]
    fn test_default_admin_validates() {
        let dir = directory();
        let role = dir.validate("admin", "admin123").unwrap();
        assert_eq!(role, Some(Role::Admin));
    }

    #[test]
    fn test_wrong_password_is_none() {
        let dir = directory();
        assert_eq!(dir.validate("admin", "nope").unwrap(), None);
        assert_eq!(dir.validate("nobody", "admin123").unwrap(), None);
    }

    #[test]
    fn test_ensure_default_admin_is_idempotent() {
        let dir = directory();
        dir.change_password("admin", "admin123", "rotated").unwrap();
        // A second ensure must not restore the default password
        dir.ensure_default_admin().unwrap();
        assert_eq!(dir.validate("admin", "admin123").unwrap(), None);
        assert_eq!(dir.validate("admin", "rotated").unwrap(), Some(Role::Admin));
    }

    #[test]
    fn test_create_user_rejects_duplicate() {
        let dir = directory();
        assert!(dir.create_user("gate1", "pw", Role::Staff).unwrap());
        assert!(!dir.create_user("gate1", "other", Role::Staff).unwrap());
        assert_eq!(dir.validate("gate1", "pw").unwrap(), Some(Role::Staff));
    }

    #[test]
    fn test_change_password_requires_old() {
        let dir = directory();
        dir.create_user("gate1", "pw", Role::Staff).unwrap();
        assert!(!dir.change_password("gate1", "wrong", "new").unwrap());
        assert!(dir.change_password("gate1", "pw", "new").unwrap());
        assert_eq!(dir.validate("gate1", "new").unwrap(), Some(Role::Staff));
    }

    #[test]
    fn test_admin_cannot_be_deleted() {
        let dir = directory();
        assert!(!dir.delete_user("admin").unwrap());
        assert!(!dir.delete_user("ADMIN").unwrap());
        dir.create_user("gate1", "pw", Role::Staff).unwrap();
        assert!(dir.delete_user("gate1").unwrap());
        assert_eq!(dir.validate("gate1", "pw").unwrap(), None);
    }
}
