//! Session registry
//!
//! Maps registration keys to live sessions so the front doors can find the
//! right SSH connection for every public request, with a per-user inverse
//! index for dashboards and renames. The registry holds weak references:
//! it never extends a session's lifetime, and sessions remove themselves on
//! shutdown.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::trace;

use crate::policy::{slug_reserved, slug_well_formed};
use crate::session::Session;
use crate::{KeyKind, SessionKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("'{0}' is reserved")]
    Reserved(String),

    #[error("'{0}' is not a valid subdomain label")]
    Invalid(String),

    #[error("no tunnel registered under '{0}' for this user")]
    NotFound(String),

    #[error("'{0}' is already taken")]
    Taken(String),
}

#[derive(Default)]
struct Indices {
    by_key: HashMap<SessionKey, Weak<Session>>,
    by_user: HashMap<String, HashSet<SessionKey>>,
}

impl Indices {
    // Drop `key` from every user set; needed when the owning session is
    // gone and its user can no longer be asked.
    fn sweep_user_sets(&mut self, key: &SessionKey) {
        for set in self.by_user.values_mut() {
            set.remove(key);
        }
        self.by_user.retain(|_, set| !set.is_empty());
    }

    fn unlink_user(&mut self, user: &str, key: &SessionKey) {
        if let Some(set) = self.by_user.get_mut(user) {
            set.remove(key);
            if set.is_empty() {
                self.by_user.remove(user);
            }
        }
    }
}

/// Concurrent slug/port/session index.
///
/// Both maps live under one read/write lock; every mutation leaves them
/// consistent with each other before the lock is released.
#[derive(Default)]
pub struct SessionRegistry {
    indices: RwLock<Indices>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session by key. Entries whose session has already been
    /// dropped read as absent.
    pub fn get(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.indices.read().by_key.get(key).and_then(Weak::upgrade)
    }

    /// Register a session under `key`. Returns `false` when the key is
    /// already held by a live session; a stale entry left behind by a dead
    /// session is replaced.
    pub fn register(&self, key: SessionKey, session: &Arc<Session>) -> bool {
        let mut indices = self.indices.write();

        let stale = match indices.by_key.get(&key) {
            Some(existing) => {
                if existing.upgrade().is_some() {
                    return false;
                }
                true
            }
            None => false,
        };
        if stale {
            indices.sweep_user_sets(&key);
        }

        trace!(key = %key, user = session.user(), "registering session");
        indices.by_key.insert(key.clone(), Arc::downgrade(session));
        indices
            .by_user
            .entry(session.user().to_string())
            .or_default()
            .insert(key);
        true
    }

    /// Rename a session's registration from `old` to `new` atomically.
    ///
    /// HTTP keys are validated against the slug rules. On success both
    /// indices move and the session's slug holder is updated before the
    /// lock is released.
    pub fn update(
        &self,
        user: &str,
        old: &SessionKey,
        new: SessionKey,
    ) -> Result<(), RegistryError> {
        if new.kind == KeyKind::Http {
            if slug_reserved(&new.id) {
                return Err(RegistryError::Reserved(new.id));
            }
            if !slug_well_formed(&new.id) {
                return Err(RegistryError::Invalid(new.id));
            }
        }

        if new == *old {
            return Ok(());
        }

        let mut indices = self.indices.write();

        let owned = indices
            .by_user
            .get(user)
            .is_some_and(|set| set.contains(old));
        if !owned {
            return Err(RegistryError::NotFound(old.id.clone()));
        }

        let stale_target = match indices.by_key.get(&new) {
            Some(existing) => {
                if existing.upgrade().is_some() {
                    return Err(RegistryError::Taken(new.id));
                }
                true
            }
            None => false,
        };
        if stale_target {
            indices.sweep_user_sets(&new);
        }

        let weak = match indices.by_key.remove(old) {
            Some(weak) => weak,
            None => return Err(RegistryError::NotFound(old.id.clone())),
        };

        let session = match weak.upgrade() {
            Some(session) => session,
            None => {
                // Owner vanished between lookups; finish the cleanup its
                // close would have done.
                indices.sweep_user_sets(old);
                return Err(RegistryError::NotFound(old.id.clone()));
            }
        };

        trace!(old = %old, new = %new, user, "renaming session");
        indices.by_key.insert(new.clone(), weak);
        indices.unlink_user(user, old);
        indices
            .by_user
            .entry(user.to_string())
            .or_default()
            .insert(new.clone());
        session.slug().set(new.id);
        Ok(())
    }

    /// Remove a registration. No-op when the key is absent.
    pub fn remove(&self, key: &SessionKey) {
        let mut indices = self.indices.write();
        match indices.by_key.remove(key) {
            Some(weak) => match weak.upgrade() {
                Some(session) => {
                    let user = session.user().to_string();
                    indices.unlink_user(&user, key);
                }
                None => indices.sweep_user_sets(key),
            },
            None => {}
        }
    }

    /// Snapshot of the user's live sessions.
    pub fn all_for_user(&self, user: &str) -> Vec<Arc<Session>> {
        let indices = self.indices.read();
        indices
            .by_user
            .get(user)
            .map(|keys| {
                keys.iter()
                    .filter_map(|key| indices.by_key.get(key).and_then(Weak::upgrade))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Keys currently registered for a user.
    pub fn keys_for_user(&self, user: &str) -> Vec<SessionKey> {
        self.indices
            .read()
            .by_user
            .get(user)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TunnelKind;

    #[test]
    fn test_register_and_get() {
        let registry = SessionRegistry::new();
        let session = Session::detached("alice");
        session.slug().set("abc123");
        session.set_kind(TunnelKind::Http);

        assert!(registry.register(SessionKey::http("abc123"), &session));

        let found = registry.get(&SessionKey::http("abc123")).unwrap();
        assert_eq!(found.user(), "alice");
    }

    #[test]
    fn test_register_duplicate_refused() {
        let registry = SessionRegistry::new();
        let first = Session::detached("alice");
        let second = Session::detached("bob");

        assert!(registry.register(SessionKey::http("abc123"), &first));
        assert!(!registry.register(SessionKey::http("abc123"), &second));

        // the original owner is still there
        assert_eq!(
            registry.get(&SessionKey::http("abc123")).unwrap().user(),
            "alice"
        );
    }

    #[test]
    fn test_key_kinds_are_disjoint_namespaces() {
        let registry = SessionRegistry::new();
        let http = Session::detached("alice");
        let tcp = Session::detached("bob");

        assert!(registry.register(SessionKey::http("10042"), &http));
        assert!(registry.register(SessionKey::tcp(10042), &tcp));

        assert_eq!(registry.get(&SessionKey::http("10042")).unwrap().user(), "alice");
        assert_eq!(registry.get(&SessionKey::tcp(10042)).unwrap().user(), "bob");
    }

    #[test]
    fn test_remove_then_reregister() {
        let registry = SessionRegistry::new();
        let session = Session::detached("alice");
        let key = SessionKey::http("abc123");

        assert!(registry.register(key.clone(), &session));
        registry.remove(&key);
        assert!(registry.get(&key).is_none());
        assert!(registry.all_for_user("alice").is_empty());

        assert!(registry.register(key.clone(), &session));
        assert!(registry.get(&key).is_some());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = SessionRegistry::new();
        registry.remove(&SessionKey::http("nothing"));
    }

    #[test]
    fn test_dead_entry_reads_as_absent_and_is_replaceable() {
        let registry = SessionRegistry::new();
        let key = SessionKey::http("abc123");

        {
            let session = Session::detached("alice");
            assert!(registry.register(key.clone(), &session));
        }
        // session dropped without remove()
        assert!(registry.get(&key).is_none());

        let next = Session::detached("bob");
        assert!(registry.register(key.clone(), &next));
        assert_eq!(registry.get(&key).unwrap().user(), "bob");
        // the stale owner's user index is gone too
        assert!(registry.all_for_user("alice").is_empty());
    }

    #[test]
    fn test_by_user_is_inverse_index() {
        let registry = SessionRegistry::new();
        let web = Session::detached("alice");
        let db = Session::detached("alice");

        registry.register(SessionKey::http("webslug"), &web);
        registry.register(SessionKey::tcp(10042), &db);

        let mut keys = registry.keys_for_user("alice");
        keys.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(keys, vec![SessionKey::tcp(10042), SessionKey::http("webslug")]);
        assert_eq!(registry.all_for_user("alice").len(), 2);

        registry.remove(&SessionKey::tcp(10042));
        assert_eq!(registry.keys_for_user("alice"), vec![SessionKey::http("webslug")]);
    }

    #[test]
    fn test_update_rename_roundtrip() {
        let registry = SessionRegistry::new();
        let session = Session::detached("alice");
        session.slug().set("s0slug");
        session.set_kind(TunnelKind::Http);
        let old = SessionKey::http("s0slug");
        registry.register(old.clone(), &session);

        registry
            .update("alice", &old, SessionKey::http("my-app"))
            .unwrap();

        assert!(registry.get(&old).is_none());
        let found = registry.get(&SessionKey::http("my-app")).unwrap();
        assert_eq!(found.user(), "alice");
        assert_eq!(found.slug().get(), "my-app");
        assert_eq!(registry.keys_for_user("alice"), vec![SessionKey::http("my-app")]);
    }

    #[test]
    fn test_update_reserved_slug_refused() {
        let registry = SessionRegistry::new();
        let session = Session::detached("alice");
        session.slug().set("s0slug");
        let old = SessionKey::http("s0slug");
        registry.register(old.clone(), &session);

        let err = registry
            .update("alice", &old, SessionKey::http("admin"))
            .unwrap_err();
        assert_eq!(err, RegistryError::Reserved("admin".into()));

        // nothing moved
        assert!(registry.get(&old).is_some());
        assert!(registry.get(&SessionKey::http("admin")).is_none());
        assert_eq!(session.slug().get(), "s0slug");
    }

    #[test]
    fn test_update_malformed_slug_refused() {
        let registry = SessionRegistry::new();
        let session = Session::detached("alice");
        let old = SessionKey::http("s0slug");
        registry.register(old.clone(), &session);

        for bad in ["ab", "-app", "app-", "My_App"] {
            let err = registry
                .update("alice", &old, SessionKey::http(bad))
                .unwrap_err();
            assert_eq!(err, RegistryError::Invalid(bad.into()));
        }
    }

    #[test]
    fn test_update_taken_refused() {
        let registry = SessionRegistry::new();
        let first = Session::detached("alice");
        let second = Session::detached("bob");
        registry.register(SessionKey::http("s0slug"), &first);
        registry.register(SessionKey::http("my-app"), &second);

        let err = registry
            .update("alice", &SessionKey::http("s0slug"), SessionKey::http("my-app"))
            .unwrap_err();
        assert_eq!(err, RegistryError::Taken("my-app".into()));
    }

    #[test]
    fn test_update_not_owned_refused() {
        let registry = SessionRegistry::new();
        let session = Session::detached("alice");
        registry.register(SessionKey::http("s0slug"), &session);

        let err = registry
            .update("mallory", &SessionKey::http("s0slug"), SessionKey::http("my-app"))
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound("s0slug".into()));
    }

    #[test]
    fn test_update_same_key_is_noop() {
        let registry = SessionRegistry::new();
        let session = Session::detached("alice");
        session.slug().set("my-app");
        let key = SessionKey::http("my-app");
        registry.register(key.clone(), &session);

        registry.update("alice", &key, key.clone()).unwrap();
        assert!(registry.get(&key).is_some());
        assert_eq!(session.slug().get(), "my-app");
    }
}
