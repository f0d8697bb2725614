//! Connection Registry
//!
//! Bidirectional index between users and their live connections. A user
//! may hold several connections at once (several devices or tabs); each
//! one is admitted and evicted on its own.
//!
//! The index sits behind a single `parking_lot::Mutex`. Nothing in here
//! awaits or touches a socket, so the lock is only ever held for a map
//! update.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use super::connection::{ConnectionHandle, ConnectionId};

#[derive(Default)]
struct RegistryIndex {
    by_user: HashMap<Uuid, HashMap<ConnectionId, ConnectionHandle>>,
    by_connection: HashMap<ConnectionId, Uuid>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    index: Mutex<RegistryIndex>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a connection under its user.
    ///
    /// Admitting the same connection twice is a no-op; returns whether the
    /// connection was new.
    pub fn admit(&self, handle: &ConnectionHandle) -> bool {
        let mut index = self.index.lock();
        if index.by_connection.contains_key(&handle.id()) {
            return false;
        }
        index.by_connection.insert(handle.id(), handle.user_id());
        index
            .by_user
            .entry(handle.user_id())
            .or_default()
            .insert(handle.id(), handle.clone());
        true
    }

    /// Remove a connection's entries; unknown connections are ignored.
    ///
    /// Returns the user the connection belonged to.
    pub fn evict(&self, connection_id: ConnectionId) -> Option<Uuid> {
        let mut index = self.index.lock();
        let user_id = index.by_connection.remove(&connection_id)?;
        if let Some(connections) = index.by_user.get_mut(&user_id) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                index.by_user.remove(&user_id);
            }
        }
        Some(user_id)
    }

    pub fn user_for(&self, connection_id: ConnectionId) -> Option<Uuid> {
        self.index.lock().by_connection.get(&connection_id).copied()
    }

    /// Every live connection of a user
    pub fn connections_for(&self, user_id: Uuid) -> Vec<ConnectionHandle> {
        self.index
            .lock()
            .by_user
            .get(&user_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.index.lock().by_user.contains_key(&user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.index.lock().by_connection.len()
    }

    pub fn online_user_count(&self) -> usize {
        self.index.lock().by_user.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_and_evict() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (handle, _inbox) = ConnectionHandle::new(user);

        assert!(registry.admit(&handle));
        assert!(!registry.admit(&handle));
        assert_eq!(registry.user_for(handle.id()), Some(user));
        assert!(registry.is_online(user));

        assert_eq!(registry.evict(handle.id()), Some(user));
        assert_eq!(registry.user_for(handle.id()), None);
        assert!(!registry.is_online(user));
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_evict_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        let (kept, _inbox) = ConnectionHandle::new(Uuid::new_v4());
        registry.admit(&kept);

        assert_eq!(registry.evict(Uuid::new_v4()), None);
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_multiple_devices_are_indexed_independently() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (phone, _p) = ConnectionHandle::new(user);
        let (laptop, _l) = ConnectionHandle::new(user);
        registry.admit(&phone);
        registry.admit(&laptop);

        assert_eq!(registry.connections_for(user).len(), 2);
        assert_eq!(registry.online_user_count(), 1);

        registry.evict(phone.id());
        let remaining = registry.connections_for(user);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), laptop.id());
    }
}
