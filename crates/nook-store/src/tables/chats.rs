use nook_types::{Chat, ChatMessage};

use super::Repository;
use crate::Store;

/// Id of the private chat between two users. Both sides derive the same id.
pub fn private_chat_id(a: &str, b: &str) -> String {
    if a <= b {
        nook_types::composite_key(a, b)
    } else {
        nook_types::composite_key(b, a)
    }
}

/// Facade over the `chats` table.
///
/// Private chats are keyed by [`private_chat_id`]; group chats reuse the
/// group's id.
pub struct Chats<'a> {
    repo: Repository<'a, Chat>,
}

impl<'a> Chats<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, id: &str) -> Option<Chat> {
        self.repo.get(id)
    }

    pub fn get_all(&self) -> Vec<Chat> {
        self.repo.get_all(0)
    }

    /// Chats `email` takes part in, most recently active first.
    pub fn for_user(&self, email: &str) -> Vec<Chat> {
        let mut chats: Vec<Chat> = self
            .repo
            .get_all(0)
            .into_iter()
            .filter(|c| c.participants.iter().any(|p| p == email))
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        chats
    }

    pub async fn set(&self, chat: &Chat) {
        self.repo.set(chat).await;
    }

    /// Append `message` to chat `id`, creating the chat if needed. The
    /// sender is added to the participants.
    pub async fn append(&self, id: &str, message: ChatMessage) {
        let mut chat = self.repo.get(id).unwrap_or_else(|| Chat {
            id: id.to_string(),
            participants: vec![message.sender_email.clone()],
            ..Chat::default()
        });
        if !chat.participants.contains(&message.sender_email) {
            chat.participants.push(message.sender_email.clone());
        }
        chat.updated_at = chat.updated_at.max(message.timestamp);
        chat.messages.push(message);
        self.repo.set(&chat).await;
    }

    pub async fn delete(&self, id: &str) {
        self.repo.delete(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::test_support;

    fn message(id: &str, sender: &str, timestamp: i64) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            sender_email: sender.into(),
            text: "hi".into(),
            timestamp,
        }
    }

    #[test]
    fn test_private_chat_id_is_symmetric() {
        assert_eq!(
            private_chat_id("b@test.com", "a@test.com"),
            "a@test.com_b@test.com"
        );
        assert_eq!(
            private_chat_id("a@test.com", "b@test.com"),
            private_chat_id("b@test.com", "a@test.com")
        );
    }

    #[tokio::test]
    async fn test_append_creates_and_extends() {
        let store = test_support::store().await;
        let chats = store.chats();
        let id = private_chat_id("a@test.com", "b@test.com");

        chats.append(&id, message("m1", "a@test.com", 10)).await;
        chats.append(&id, message("m2", "b@test.com", 20)).await;

        let chat = chats.get(&id).expect("chat");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.participants, ["a@test.com", "b@test.com"]);
        assert_eq!(chat.updated_at, 20);
    }

    #[tokio::test]
    async fn test_for_user_orders_by_activity() {
        let store = test_support::store().await;
        let chats = store.chats();
        chats.append("g-old", message("m1", "a@test.com", 5)).await;
        chats.append("g-new", message("m2", "a@test.com", 50)).await;
        chats.append("g-other", message("m3", "c@test.com", 99)).await;

        let ids: Vec<String> = chats.for_user("a@test.com").into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["g-new", "g-old"]);
    }
}
