use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::index_store::{IndexStore, UserDocument};

/// Signup payload carrying the plaintext password. The stored record keeps
/// only a bcrypt hash of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    pub age: u32,
    pub gender: String,
}

/// Usernames are lowercase alphanumerics and underscores only
pub fn valid_username(username: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new("^[a-z0-9_]+$").expect("valid username pattern"))
        .is_match(username)
}

/// Identity directory backed by the index store
#[derive(Clone)]
pub struct UserDirectory {
    index: Arc<IndexStore>,
}

impl UserDirectory {
    pub fn new(index: Arc<IndexStore>) -> Self {
        Self { index }
    }

    /// Check a username/password pair against the stored record. The first
    /// decoded hit decides; no hit means unknown user.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn find_user(&self, username: &str, password: &str) -> bool {
        let hits = match self.index.find_users(username).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "User lookup failed");
                return false;
            }
        };

        let Some(user) = hits.into_iter().next() else {
            return false;
        };

        user.username == username && bcrypt::verify(password, &user.password).unwrap_or(false)
    }

    /// Create a new user record keyed by username. Refuses duplicates.
    /// The existence check and the write are not atomic: two concurrent
    /// signups for the same username can both pass the check, last write
    /// wins.
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn create_user(&self, user: &User) -> bool {
        match self.index.find_users(&user.username).await {
            Ok(hits) if !hits.is_empty() => {
                info!("Username already taken");
                return false;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Duplicate check failed");
                return false;
            }
        }

        let password_hash = match bcrypt::hash(&user.password, bcrypt::DEFAULT_COST) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "Password hashing failed");
                return false;
            }
        };

        let document = UserDocument {
            username: user.username.clone(),
            password: password_hash,
            age: user.age,
            gender: user.gender.clone(),
        };

        match self.index.put_user(&document).await {
            Ok(()) => {
                info!("User created");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to store user");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(valid_username("alice"));
        assert!(valid_username("bob_1"));
        assert!(valid_username("a"));
        assert!(valid_username("user_name_42"));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!valid_username(""));
        assert!(!valid_username("Alice"));
        assert!(!valid_username("bob smith"));
        assert!(!valid_username("carol!"));
        assert!(!valid_username("dave-7"));
        assert!(!valid_username("势利"));
    }

    #[test]
    fn test_password_hash_round_trip() {
        // Low cost keeps the test fast; production uses DEFAULT_COST
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        assert!(bcrypt::verify("hunter2", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }
}
