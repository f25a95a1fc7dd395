use std::collections::HashMap;
use std::collections::HashSet;

use uuid::Uuid;

use crate::model::Message;

/// In-memory, append-only store of a single conversation's messages.
#[derive(Debug, Default)]
pub struct MessageStore {
    entries: Vec<Message>,
    seen_ids: HashSet<Uuid>,
    /// Maps message UUID → index in `entries` for O(1) lookup.
    by_id: HashMap<Uuid, usize>,
}

impl MessageStore {
    pub fn insert(&mut self, message: Message) -> bool {
        if self.seen_ids.contains(&message.id) {
            return false;
        }

        let idx = self.entries.len();
        self.by_id.insert(message.id, idx);
        self.seen_ids.insert(message.id);
        self.entries.push(message);
        true
    }

    pub fn all(&self) -> &[Message] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.by_id.get(&id).and_then(|&i| self.entries.get(i))
    }

    /// Last `n` messages, oldest-first.
    pub fn last_n(&self, n: usize) -> &[Message] {
        let len = self.entries.len();
        &self.entries[len.saturating_sub(n)..]
    }

    /// Page of messages, oldest-first, `offset` messages in from the start.
    pub fn paginated(&self, offset: usize, limit: usize) -> &[Message] {
        if offset >= self.entries.len() {
            return &[];
        }
        let end = (offset + limit).min(self.entries.len());
        &self.entries[offset..end]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen_ids.clear();
        self.by_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageRole;

    fn msg(content: &str) -> Message {
        Message::new(Uuid::new_v4(), MessageRole::User, content, "req", serde_json::json!({}))
    }

    #[test]
    fn insert_deduplicates_by_id() {
        let mut store = MessageStore::default();
        let m = msg("hi");
        assert!(store.insert(m.clone()));
        assert!(!store.insert(m));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn last_n_returns_tail_oldest_first() {
        let mut store = MessageStore::default();
        for i in 0..5 {
            store.insert(msg(&format!("m{i}")));
        }
        let last = store.last_n(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].content, "m3");
        assert_eq!(last[1].content, "m4");
    }

    #[test]
    fn paginated_returns_empty_past_end() {
        let mut store = MessageStore::default();
        store.insert(msg("only"));
        assert!(store.paginated(5, 10).is_empty());
        assert_eq!(store.paginated(0, 10).len(), 1);
    }
}
