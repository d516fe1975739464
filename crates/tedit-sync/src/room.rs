//! Document Room Registry
//!
//! Tracks which connections are members of which document rooms. Rooms are
//! created on first join and torn down when their last member leaves, so
//! the registry never grows beyond the set of live documents.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Shared registry of document rooms and their members
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, HashSet<Uuid>>>>,
}

impl RoomRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Returns false if it was already a member.
    pub async fn join(&self, document_id: &str, user_id: Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let inserted = rooms
            .entry(document_id.to_string())
            .or_default()
            .insert(user_id);
        if inserted {
            debug!(document_id, user_id = %user_id, "joined room");
        }
        inserted
    }

    /// Remove a connection from a room. Returns false if it was not a
    /// member. An emptied room is removed from the registry.
    pub async fn leave(&self, document_id: &str, user_id: Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(document_id) else {
            return false;
        };
        let removed = members.remove(&user_id);
        if members.is_empty() {
            rooms.remove(document_id);
            debug!(document_id, "room emptied");
        }
        removed
    }

    /// Remove a connection from every room it joined. Returns the rooms
    /// it was removed from.
    pub async fn disconnect(&self, user_id: Uuid) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|document_id, members| {
            if members.remove(&user_id) {
                left.push(document_id.clone());
            }
            !members.is_empty()
        });
        left
    }

    /// Whether a connection is a member of a room
    pub async fn is_member(&self, document_id: &str, user_id: Uuid) -> bool {
        self.rooms
            .read()
            .await
            .get(document_id)
            .is_some_and(|members| members.contains(&user_id))
    }

    /// Current members of a room
    pub async fn members(&self, document_id: &str) -> Vec<Uuid> {
        self.rooms
            .read()
            .await
            .get(document_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_leave_lifecycle() {
        let rooms = RoomRegistry::new();
        let user = Uuid::new_v4();

        assert!(rooms.join("doc-1", user).await);
        assert!(!rooms.join("doc-1", user).await);
        assert!(rooms.is_member("doc-1", user).await);
        assert_eq!(rooms.room_count().await, 1);

        assert!(rooms.leave("doc-1", user).await);
        assert!(!rooms.is_member("doc-1", user).await);
        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_leave_unknown_room() {
        let rooms = RoomRegistry::new();
        assert!(!rooms.leave("doc-1", Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_empty_room_teardown_keeps_other_members() {
        let rooms = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        rooms.join("doc-1", a).await;
        rooms.join("doc-1", b).await;

        rooms.leave("doc-1", a).await;
        assert_eq!(rooms.room_count().await, 1);
        assert!(rooms.is_member("doc-1", b).await);
    }

    #[tokio::test]
    async fn test_disconnect_leaves_all_rooms() {
        let rooms = RoomRegistry::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        rooms.join("doc-1", user).await;
        rooms.join("doc-2", user).await;
        rooms.join("doc-2", other).await;

        let mut left = rooms.disconnect(user).await;
        left.sort();
        assert_eq!(left, vec!["doc-1".to_string(), "doc-2".to_string()]);

        // doc-1 emptied, doc-2 survives with its other member.
        assert_eq!(rooms.room_count().await, 1);
        assert!(rooms.is_member("doc-2", other).await);
    }
}
