//! Append-only conversation history plus the single in-flight phase.
//!
//! The store is shared by cloning; every clone publishes to the same watch
//! channel, so observers always see the latest state. Only the dispatcher
//! mutates it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use crate::message::ChatMessage;

/// Where the session is in the submission cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Submitting { ticket: u64, question: String },
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    phase: Phase,
    next_ticket: u64,
}

impl Conversation {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Submitting { .. })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Clone)]
pub struct ConversationStore {
    tx: Arc<watch::Sender<Conversation>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Conversation::default());
        Self { tx: Arc::new(tx) }
    }

    /// Receiver that wakes on every change.
    pub fn subscribe(&self) -> watch::Receiver<Conversation> {
        self.tx.subscribe()
    }

    /// Borrows the current state. Do not hold across an await.
    pub fn read(&self) -> watch::Ref<'_, Conversation> {
        self.tx.borrow()
    }

    pub fn snapshot(&self) -> Conversation {
        self.tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Appends the user turn and enters `Submitting` in one step, unless a
    /// submission is already in flight. Returns the ticket of the new
    /// submission.
    pub(crate) fn try_begin(&self, message: ChatMessage) -> Option<u64> {
        let mut ticket = None;
        self.tx.send_if_modified(|conversation| {
            if conversation.is_loading() {
                return false;
            }
            let t = conversation.next_ticket;
            conversation.next_ticket += 1;
            conversation.phase = Phase::Submitting {
                ticket: t,
                question: message.content.clone(),
            };
            conversation.messages.push(message);
            ticket = Some(t);
            true
        });
        ticket
    }

    /// Appends the assistant turn for `ticket` and returns to `Idle`.
    pub(crate) fn complete(&self, ticket: u64, message: ChatMessage) -> bool {
        self.tx.send_if_modified(|conversation| {
            if !is_current(&conversation.phase, ticket) {
                warn!(ticket, "dropping answer for a submission that is no longer in flight");
                return false;
            }
            conversation.messages.push(message);
            conversation.phase = Phase::Idle;
            true
        })
    }

    /// Returns to `Idle` without appending, if `ticket` is still in flight.
    pub(crate) fn finish(&self, ticket: u64) -> bool {
        self.tx.send_if_modified(|conversation| {
            if !is_current(&conversation.phase, ticket) {
                return false;
            }
            conversation.phase = Phase::Idle;
            true
        })
    }
}

fn is_current(phase: &Phase, ticket: u64) -> bool {
    matches!(phase, Phase::Submitting { ticket: t, .. } if *t == ticket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> ChatMessage {
        ChatMessage::user(text).unwrap()
    }

    #[test]
    fn test_begin_appends_and_blocks_second_submission() {
        let store = ConversationStore::new();
        let ticket = store.try_begin(user("first")).unwrap();
        assert!(store.is_loading());
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.read().phase(),
            &Phase::Submitting {
                ticket,
                question: "first".to_string()
            }
        );

        assert!(store.try_begin(user("second")).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_complete_appends_in_order_and_goes_idle() {
        let store = ConversationStore::new();
        let ticket = store.try_begin(user("q")).unwrap();
        assert!(store.complete(ticket, ChatMessage::error()));
        assert!(!store.is_loading());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.messages()[0].content, "q");
        assert!(snapshot.messages()[1].is_error);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let store = ConversationStore::new();
        let first = store.try_begin(user("one")).unwrap();
        assert!(store.finish(first));
        let second = store.try_begin(user("two")).unwrap();
        assert_ne!(first, second);

        assert!(!store.finish(first));
        assert!(!store.complete(first, ChatMessage::error()));
        assert!(store.is_loading());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = ConversationStore::new();
        let mut rx = store.subscribe();
        let ticket = store.try_begin(user("q")).unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_loading());

        store.finish(ticket);
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_loading());
    }
}
