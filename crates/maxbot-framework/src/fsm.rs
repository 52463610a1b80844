//! Per-user finite-state and data store.
//!
//! [`FsmStore`] keeps two independent maps keyed by user ID: the current
//! conversation state (of an application-defined type `S`) and a free-form
//! JSON data map. Entries are created lazily; a user with no entry has no
//! state and an empty data map.
//!
//! The store uses interior locking and is meant to be shared through an
//! [`Arc`]. Locks are never held across an `.await`, so handlers may use the
//! store freely between network calls.
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(Clone, PartialEq)]
//! enum Signup { AskName, AskAge }
//!
//! let store = Arc::new(FsmStore::<Signup>::new());
//! let cursor = store.cursor(42);
//! cursor.change_state(Signup::AskName);
//! cursor.update_data(FsmData::from([("name".to_owned(), json!("Ann"))]));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FsmError, FsmResult};
use maxbot_core::UserId;

/// Free-form data attached to a user.
pub type FsmData = HashMap<String, Value>;

// ============================================================================
// FsmStore
// ============================================================================

/// In-memory state and data store keyed by user ID.
pub struct FsmStore<S> {
    states: RwLock<HashMap<UserId, S>>,
    data: RwLock<HashMap<UserId, FsmData>>,
}

impl<S> Default for FsmStore<S> {
    fn default() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl<S: Clone> FsmStore<S> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cursor bound to `user_id`.
    pub fn cursor(self: &Arc<Self>, user_id: UserId) -> FsmCursor<S> {
        FsmCursor {
            store: Arc::clone(self),
            user_id,
        }
    }

    /// Returns the user's state, or `None` if no state is set.
    pub fn get_state(&self, user_id: UserId) -> Option<S> {
        self.states.read().get(&user_id).cloned()
    }

    /// Returns a copy of the user's data; empty if none is set.
    pub fn get_data(&self, user_id: UserId) -> FsmData {
        self.data.read().get(&user_id).cloned().unwrap_or_default()
    }

    /// Returns one value from the user's data.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::KeyNotFound`] if the key is not set.
    pub fn get_data_key(&self, user_id: UserId, key: &str) -> FsmResult<Value> {
        self.data
            .read()
            .get(&user_id)
            .and_then(|data| data.get(key))
            .cloned()
            .ok_or_else(|| FsmError::KeyNotFound {
                user_id,
                key: key.to_owned(),
            })
    }

    /// Returns one value from the user's data, decoded as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::KeyNotFound`] if the key is not set, or
    /// [`FsmError::Decode`] if the value does not have the shape of `T`.
    pub fn get_data_as<T: DeserializeOwned>(&self, user_id: UserId, key: &str) -> FsmResult<T> {
        let value = self.get_data_key(user_id, key)?;
        serde_json::from_value(value).map_err(|source| FsmError::Decode {
            key: key.to_owned(),
            source,
        })
    }

    /// Sets the user's state, replacing any previous state.
    pub fn change_state(&self, user_id: UserId, state: S) {
        self.states.write().insert(user_id, state);
    }

    /// Merges `partial` into the user's data. Keys in `partial` win.
    pub fn update_data(&self, user_id: UserId, partial: FsmData) {
        self.data.write().entry(user_id).or_default().extend(partial);
    }

    /// Replaces the user's data.
    pub fn set_data(&self, user_id: UserId, data: FsmData) {
        self.data.write().insert(user_id, data);
    }

    /// Removes and returns the user's state.
    pub fn clear_state(&self, user_id: UserId) -> Option<S> {
        self.states.write().remove(&user_id)
    }

    /// Removes and returns the user's data; empty if none was set.
    pub fn clear_data(&self, user_id: UserId) -> FsmData {
        self.data.write().remove(&user_id).unwrap_or_default()
    }

    /// Removes both state and data for the user.
    pub fn clear(&self, user_id: UserId) {
        self.clear_state(user_id);
        self.clear_data(user_id);
    }
}

impl<S> std::fmt::Debug for FsmStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsmStore")
            .field("states", &self.states.read().len())
            .field("data", &self.data.read().len())
            .finish()
    }
}

// ============================================================================
// FsmCursor
// ============================================================================

/// A view of an [`FsmStore`] bound to a single user.
pub struct FsmCursor<S> {
    store: Arc<FsmStore<S>>,
    user_id: UserId,
}

impl<S> Clone for FsmCursor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            user_id: self.user_id,
        }
    }
}

impl<S: Clone> FsmCursor<S> {
    /// Returns the user this cursor is bound to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<FsmStore<S>> {
        &self.store
    }

    /// See [`FsmStore::get_state`].
    pub fn get_state(&self) -> Option<S> {
        self.store.get_state(self.user_id)
    }

    /// See [`FsmStore::get_data`].
    pub fn get_data(&self) -> FsmData {
        self.store.get_data(self.user_id)
    }

    /// See [`FsmStore::get_data_key`].
    pub fn get_data_key(&self, key: &str) -> FsmResult<Value> {
        self.store.get_data_key(self.user_id, key)
    }

    /// See [`FsmStore::get_data_as`].
    pub fn get_data_as<T: DeserializeOwned>(&self, key: &str) -> FsmResult<T> {
        self.store.get_data_as(self.user_id, key)
    }

    /// See [`FsmStore::change_state`].
    pub fn change_state(&self, state: S) {
        self.store.change_state(self.user_id, state);
    }

    /// See [`FsmStore::update_data`].
    pub fn update_data(&self, partial: FsmData) {
        self.store.update_data(self.user_id, partial);
    }

    /// See [`FsmStore::set_data`].
    pub fn set_data(&self, data: FsmData) {
        self.store.set_data(self.user_id, data);
    }

    /// See [`FsmStore::clear_state`].
    pub fn clear_state(&self) -> Option<S> {
        self.store.clear_state(self.user_id)
    }

    /// See [`FsmStore::clear_data`].
    pub fn clear_data(&self) -> FsmData {
        self.store.clear_data(self.user_id)
    }

    /// See [`FsmStore::clear`].
    pub fn clear(&self) {
        self.store.clear(self.user_id);
    }
}

impl<S> std::fmt::Debug for FsmCursor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsmCursor")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Step {
        AskName,
        AskAge,
    }

    fn data(value: Value) -> FsmData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_update_merges_and_set_replaces() {
        let store = FsmStore::<Step>::new();

        store.update_data(1, data(json!({ "a": 1 })));
        store.update_data(1, data(json!({ "b": 2 })));
        assert_eq!(store.get_data(1), data(json!({ "a": 1, "b": 2 })));

        store.set_data(1, data(json!({ "c": 3 })));
        assert_eq!(store.get_data(1), data(json!({ "c": 3 })));
    }

    #[test]
    fn test_update_partial_wins() {
        let store = FsmStore::<Step>::new();
        store.update_data(1, data(json!({ "a": 1, "b": 1 })));
        store.update_data(1, data(json!({ "a": 5 })));
        assert_eq!(store.get_data(1), data(json!({ "a": 5, "b": 1 })));
    }

    #[test]
    fn test_clear_state_without_state() {
        let store = FsmStore::<Step>::new();

        assert_eq!(store.clear_state(7), None);
        assert_eq!(store.get_state(7), None);

        store.change_state(7, Step::AskName);
        store.change_state(7, Step::AskAge);
        assert_eq!(store.get_state(7), Some(Step::AskAge));
        assert_eq!(store.clear_state(7), Some(Step::AskAge));
        assert_eq!(store.get_state(7), None);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let store = FsmStore::<Step>::new();
        store.update_data(1, data(json!({ "a": 1 })));

        assert_eq!(store.get_data_key(1, "a").unwrap(), json!(1));
        let err = store.get_data_key(1, "missing").unwrap_err();
        assert!(matches!(err, FsmError::KeyNotFound { user_id: 1, ref key } if key == "missing"));

        // No entry at all behaves the same.
        assert!(store.get_data_key(2, "a").is_err());
    }

    #[test]
    fn test_get_data_as() {
        let store = FsmStore::<Step>::new();
        store.update_data(1, data(json!({ "count": 3, "name": "Ann" })));

        assert_eq!(store.get_data_as::<u32>(1, "count").unwrap(), 3);
        assert!(matches!(
            store.get_data_as::<u32>(1, "name"),
            Err(FsmError::Decode { .. })
        ));
    }

    #[test]
    fn test_clear_data_and_clear() {
        let store = FsmStore::<Step>::new();
        assert!(store.clear_data(3).is_empty());

        store.change_state(3, Step::AskName);
        store.update_data(3, data(json!({ "x": true })));
        store.clear(3);

        assert_eq!(store.get_state(3), None);
        assert!(store.get_data(3).is_empty());
    }

    #[test]
    fn test_users_are_independent() {
        let store = FsmStore::<Step>::new();
        store.change_state(1, Step::AskName);
        store.update_data(2, data(json!({ "k": "v" })));

        assert_eq!(store.get_state(2), None);
        assert!(store.get_data(1).is_empty());
    }

    #[test]
    fn test_cursor_delegates() {
        let store = Arc::new(FsmStore::<Step>::new());
        let cursor = store.cursor(9);

        cursor.change_state(Step::AskAge);
        cursor.update_data(data(json!({ "age": 30 })));

        assert_eq!(cursor.user_id(), 9);
        assert_eq!(store.get_state(9), Some(Step::AskAge));
        assert_eq!(cursor.get_data_as::<u8>("age").unwrap(), 30);

        let other = store.cursor(10);
        assert_eq!(other.get_state(), None);

        cursor.clear();
        assert_eq!(store.get_state(9), None);
    }
}
