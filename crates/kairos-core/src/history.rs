//! Chat history persistence
//!
//! History is the serialized final markup of finished messages, stored as a
//! JSON array under [`HISTORY_KEY`]. Timestamps are not kept; restored
//! messages are stamped when they are loaded.

use serde::{Deserialize, Serialize};

use crate::state::{ChatMessage, ChatRole};
use crate::storage::{KeyValueStore, StorageError, HISTORY_KEY, LOGO_KEY};

#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    // Older saves used `type` for the role
    #[serde(alias = "type")]
    role: ChatRole,
    content: String,
}

/// Overwrite the stored history with `messages`, in order
pub fn save_history(store: &mut dyn KeyValueStore, messages: &[ChatMessage]) -> Result<(), StorageError> {
    let stored: Vec<StoredMessage> = messages
        .iter()
        .map(|m| StoredMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();
    let json = serde_json::to_string(&stored)?;
    store.set(HISTORY_KEY, &json)
}

/// Load the stored history. Missing or corrupt history is an empty history.
pub fn load_history(store: &dyn KeyValueStore) -> Vec<ChatMessage> {
    let Some(json) = store.get(HISTORY_KEY) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<StoredMessage>>(&json) {
        Ok(stored) => stored
            .into_iter()
            .map(|m| ChatMessage::new(m.role, m.content))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "error loading chat history, starting empty");
            Vec::new()
        }
    }
}

pub fn clear_history(store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
    store.remove(HISTORY_KEY)
}

pub fn save_logo(store: &mut dyn KeyValueStore, data_url: &str) -> Result<(), StorageError> {
    store.set(LOGO_KEY, data_url)
}

pub fn load_logo(store: &dyn KeyValueStore) -> Option<String> {
    store.get(LOGO_KEY).filter(|logo| !logo.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_round_trip_preserves_order_role_and_content() {
        let mut store = MemoryStore::new();
        let messages = vec![
            ChatMessage::new(ChatRole::User, "<p>hola</p>"),
            ChatMessage::new(ChatRole::System, "<p><strong>Hola!</strong> ¿Cómo estás?</p>"),
            ChatMessage::new(ChatRole::Error, "<p>Error: cuota</p>"),
        ];

        save_history(&mut store, &messages).unwrap();
        let loaded = load_history(&store);

        assert_eq!(loaded.len(), 3);
        for (saved, restored) in messages.iter().zip(&loaded) {
            assert_eq!(saved.role, restored.role);
            assert_eq!(saved.content, restored.content);
        }
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let mut store = MemoryStore::new();
        save_history(&mut store, &[ChatMessage::new(ChatRole::User, "a")]).unwrap();
        save_history(&mut store, &[]).unwrap();
        assert!(load_history(&store).is_empty());
    }

    #[test]
    fn test_missing_and_corrupt_history_is_empty() {
        let mut store = MemoryStore::new();
        assert!(load_history(&store).is_empty());

        store.set(HISTORY_KEY, "[{\"role\": \"user\"").unwrap();
        assert!(load_history(&store).is_empty());
    }

    #[test]
    fn test_legacy_type_field_is_accepted() {
        let mut store = MemoryStore::new();
        store
            .set(HISTORY_KEY, r#"[{"type":"user","content":"<p>hola</p>"},{"type":"system","content":"<p>hey</p>"}]"#)
            .unwrap();
        let loaded = load_history(&store);
        assert_eq!(loaded[0].role, ChatRole::User);
        assert_eq!(loaded[1].content, "<p>hey</p>");
    }

    #[test]
    fn test_logo() {
        let mut store = MemoryStore::new();
        assert_eq!(load_logo(&store), None);
        save_logo(&mut store, "data:image/png;base64,AA==").unwrap();
        assert_eq!(load_logo(&store).as_deref(), Some("data:image/png;base64,AA=="));
    }
}
