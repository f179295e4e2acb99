use crate::ledger::MessageLedger;
use crate::models::chat::{ ConversationSnapshot, TurnId };
use log::info;
use std::collections::HashMap;

/// Conversation metadata plus the ledger of its turns.
///
/// `id` stays `None` until the backend has saved the first turn. `title` and the
/// template/business pair are write-once.
#[derive(Debug, Default)]
pub struct Conversation {
    id: Option<String>,
    title: Option<String>,
    template_id: Option<String>,
    business_id: Option<String>,
    chat_ids: HashMap<TurnId, String>,
    ledger: MessageLedger,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a saved conversation, one completed turn per stored chat.
    pub fn from_snapshot(snapshot: &ConversationSnapshot) -> Self {
        let mut conversation = Self::new();
        conversation.apply_snapshot(snapshot);
        for chat in &snapshot.chats {
            let turn_id = conversation.ledger.restore_turn(
                chat.query.as_deref().unwrap_or(""),
                chat.message.as_deref().unwrap_or("")
            );
            if let Some(chat_id) = &chat.id {
                conversation.chat_ids.insert(turn_id, chat_id.clone());
            }
        }
        conversation
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    pub fn business_id(&self) -> Option<&str> {
        self.business_id.as_deref()
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut MessageLedger {
        &mut self.ledger
    }

    pub fn set_title_if_absent(&mut self, title: &str) -> bool {
        if self.title.is_some() || title.is_empty() {
            return false;
        }
        self.title = Some(title.to_string());
        true
    }

    /// Adopts the server-assigned identity. Fields that are already set are kept.
    pub fn apply_snapshot(&mut self, snapshot: &ConversationSnapshot) {
        if self.id.is_none() {
            if let Some(id) = &snapshot.id {
                info!("Conversation saved as {}", id);
                self.id = Some(id.clone());
            }
        }
        if let Some(title) = &snapshot.title {
            self.set_title_if_absent(title);
        }
        if self.template_id.is_none() {
            self.template_id = snapshot.template_id.clone();
        }
        if self.business_id.is_none() {
            self.business_id = snapshot.business_id.clone();
        }
    }

    pub fn link_chat(&mut self, turn_id: TurnId, chat_id: &str) {
        self.chat_ids.insert(turn_id, chat_id.to_string());
    }

    pub fn chat_id(&self, turn_id: TurnId) -> Option<&str> {
        self.chat_ids.get(&turn_id).map(String::as_str)
    }

    /// Starts over as a brand-new conversation. Subscribers stay attached.
    pub fn reset(&mut self) {
        self.id = None;
        self.title = None;
        self.template_id = None;
        self.business_id = None;
        self.chat_ids.clear();
        self.ledger.clear();
    }
}
