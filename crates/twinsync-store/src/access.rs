//! Credential-gated access to the variable store.
//!
//! The external variable server authenticates each connection through an
//! [`AccessGate`]. A successful login yields a [`Session`] that may read
//! and write; an anonymous session may read, and every write it attempts
//! is rejected with [`StoreError::Unauthorized`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use twinsync_core::{ExchangeSnapshot, StoreError, Value};

use crate::store::VariableStore;

/// Username/password pairs allowed to write.
#[derive(Clone, Default)]
pub struct UserDatabase {
    users: HashMap<String, String>,
}

impl UserDatabase {
    /// An empty database: every login fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.insert(username, password);
        self
    }

    /// Add or replace a user.
    pub fn insert(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(username.into(), password.into());
    }

    /// Check a credential pair.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if no users are registered.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl std::fmt::Debug for UserDatabase {
    // Never print passwords.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.users.keys().collect();
        names.sort();
        f.debug_struct("UserDatabase").field("users", &names).finish()
    }
}

/// Hands out sessions on the shared store.
#[derive(Debug)]
pub struct AccessGate {
    store: Arc<VariableStore>,
    users: UserDatabase,
}

impl AccessGate {
    /// Create a gate over `store` checking logins against `users`.
    pub fn new(store: Arc<VariableStore>, users: UserDatabase) -> Self {
        Self { store, users }
    }

    /// Authenticate and open a write-capable session.
    pub fn login(&self, username: &str, password: &str) -> Result<Session, StoreError> {
        let ok = self.users.verify(username, password);
        info!(username, success = ok, "login attempt");
        if ok {
            Ok(Session {
                store: Arc::clone(&self.store),
                user: Some(username.to_string()),
            })
        } else {
            Err(StoreError::Unauthorized)
        }
    }

    /// Open a read-only session without credentials.
    pub fn anonymous(&self) -> Session {
        Session {
            store: Arc::clone(&self.store),
            user: None,
        }
    }
}

/// A client's view of the store.
#[derive(Clone, Debug)]
pub struct Session {
    store: Arc<VariableStore>,
    user: Option<String>,
}

impl Session {
    /// The authenticated username, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Whether this session may write at all.
    pub fn can_write(&self) -> bool {
        self.user.is_some()
    }

    /// Read one variable.
    pub fn read(&self, name: &str) -> Result<Value, StoreError> {
        self.store.read(name)
    }

    /// Read several variables atomically.
    pub fn read_all<S: AsRef<str>>(&self, names: &[S]) -> Result<ExchangeSnapshot, StoreError> {
        self.store.read_all(names)
    }

    /// Write one variable. Anonymous sessions are always rejected.
    pub fn write(&self, name: &str, value: Value) -> Result<(), StoreError> {
        if !self.can_write() {
            return Err(StoreError::Unauthorized);
        }
        self.store.write(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinsync_core::{VariableDef, VariableKind};

    fn gate() -> AccessGate {
        let store = VariableStore::new(vec![
            VariableDef::input("delta_p_primary_set", Value::Real(0.0)),
            VariableDef::output("m_flow_return_primary", VariableKind::Real),
        ])
        .unwrap();
        AccessGate::new(
            Arc::new(store),
            UserDatabase::new().with_user("operator", "s3cret"),
        )
    }

    #[test]
    fn valid_login_can_write() {
        let gate = gate();
        let session = gate.login("operator", "s3cret").unwrap();
        assert_eq!(session.user(), Some("operator"));
        session
            .write("delta_p_primary_set", Value::Real(150_000.0))
            .unwrap();
        assert_eq!(
            session.read("delta_p_primary_set").unwrap(),
            Value::Real(150_000.0)
        );
    }

    #[test]
    fn bad_password_rejected() {
        let gate = gate();
        assert_eq!(
            gate.login("operator", "guess").unwrap_err(),
            StoreError::Unauthorized
        );
        assert_eq!(
            gate.login("nobody", "s3cret").unwrap_err(),
            StoreError::Unauthorized
        );
    }

    #[test]
    fn anonymous_reads_but_never_writes() {
        let gate = gate();
        let session = gate.anonymous();
        assert!(!session.can_write());
        assert_eq!(
            session.write("delta_p_primary_set", Value::Real(1.0)),
            Err(StoreError::Unauthorized)
        );
        assert_eq!(
            session.read("delta_p_primary_set").unwrap(),
            Value::Real(0.0)
        );
    }

    #[test]
    fn authenticated_session_still_respects_writability() {
        let gate = gate();
        let session = gate.login("operator", "s3cret").unwrap();
        assert!(matches!(
            session.write("m_flow_return_primary", Value::Real(1.0)),
            Err(StoreError::NotWritable { .. })
        ));
    }

    #[test]
    fn debug_hides_passwords() {
        let db = UserDatabase::new().with_user("operator", "s3cret");
        let text = format!("{db:?}");
        assert!(text.contains("operator"));
        assert!(!text.contains("s3cret"));
    }
}
