use crate::models::chat::{ ConversationTurn, TurnId, TurnStatus };
use log::debug;

#[derive(Clone, Debug, PartialEq)]
pub enum LedgerChange {
    TurnStarted {
        turn_id: TurnId,
    },
    TurnRestored {
        turn_id: TurnId,
    },
    ReplyAppended {
        turn_id: TurnId,
        text: String,
    },
    TurnFinalized {
        turn_id: TurnId,
    },
    TurnCompleted {
        turn_id: TurnId,
    },
    TurnFailed {
        turn_id: TurnId,
    },
    ReplyRevised {
        turn_id: TurnId,
    },
    TurnRemoved {
        turn_id: TurnId,
    },
    Cleared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&LedgerChange, &[ConversationTurn]) + Send>;

/// Ordered, append-only list of turns for one conversation view.
///
/// Every mutation is addressed by `TurnId`; operations against a turn that does not
/// exist (for example after `clear`) are no-ops and return `false`. Subscribers only
/// ever see shared borrows, so they cannot mutate the ledger from a notification.
#[derive(Default)]
pub struct MessageLedger {
    turns: Vec<ConversationTurn>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl MessageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
        where F: FnMut(&LedgerChange, &[ConversationTurn]) + Send + 'static
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Caller guarantees no other turn is streaming.
    pub fn start_turn(&mut self, prompt: &str) -> TurnId {
        let turn = ConversationTurn::streaming(prompt);
        let turn_id = turn.id;
        self.turns.push(turn);
        debug!("Turn {} started", turn_id);
        self.notify(LedgerChange::TurnStarted { turn_id });
        turn_id
    }

    /// Appends an already-finished turn, e.g. when loading a saved conversation.
    pub fn restore_turn(&mut self, prompt: &str, reply: &str) -> TurnId {
        let mut turn = ConversationTurn::streaming(prompt);
        turn.reply = reply.to_string();
        turn.status = TurnStatus::Complete;
        let turn_id = turn.id;
        self.turns.push(turn);
        self.notify(LedgerChange::TurnRestored { turn_id });
        turn_id
    }

    pub fn append_reply(&mut self, turn_id: TurnId, text: &str) -> bool {
        let Some(turn) = self.turn_mut(turn_id) else {
            return false;
        };
        if turn.status != TurnStatus::Streaming {
            return false;
        }
        turn.reply.push_str(text);
        self.notify(LedgerChange::ReplyAppended { turn_id, text: text.to_string() });
        true
    }

    /// Replaces the streamed text with the server's authoritative reply.
    pub fn finalize_turn(&mut self, turn_id: TurnId, authoritative_reply: &str) -> bool {
        let Some(turn) = self.live_turn_mut(turn_id) else {
            return false;
        };
        turn.reply = authoritative_reply.to_string();
        turn.status = TurnStatus::Complete;
        debug!("Turn {} finalized ({} bytes)", turn_id, authoritative_reply.len());
        self.notify(LedgerChange::TurnFinalized { turn_id });
        true
    }

    /// Marks the turn complete with whatever text has accumulated.
    pub fn complete_turn(&mut self, turn_id: TurnId) -> bool {
        let Some(turn) = self.live_turn_mut(turn_id) else {
            return false;
        };
        turn.status = TurnStatus::Complete;
        debug!("Turn {} completed without a final record", turn_id);
        self.notify(LedgerChange::TurnCompleted { turn_id });
        true
    }

    pub fn fail_turn(&mut self, turn_id: TurnId) -> bool {
        let Some(turn) = self.live_turn_mut(turn_id) else {
            return false;
        };
        turn.status = TurnStatus::Failed;
        debug!("Turn {} failed, keeping {} bytes of partial reply", turn_id, turn.reply.len());
        self.notify(LedgerChange::TurnFailed { turn_id });
        true
    }

    /// Wholesale replacement of a completed reply (expand/shorten).
    pub fn revise_reply(&mut self, turn_id: TurnId, reply: &str) -> bool {
        let Some(turn) = self.turn_mut(turn_id) else {
            return false;
        };
        if turn.status != TurnStatus::Complete {
            return false;
        }
        turn.reply = reply.to_string();
        self.notify(LedgerChange::ReplyRevised { turn_id });
        true
    }

    pub fn remove_turn(&mut self, turn_id: TurnId) -> bool {
        let before = self.turns.len();
        self.turns.retain(|turn| turn.id != turn_id);
        if self.turns.len() == before {
            return false;
        }
        self.notify(LedgerChange::TurnRemoved { turn_id });
        true
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.notify(LedgerChange::Cleared);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn turn(&self, turn_id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|turn| turn.id == turn_id)
    }

    pub fn streaming_turn(&self) -> Option<&ConversationTurn> {
        self.turns.iter().find(|turn| turn.status == TurnStatus::Streaming)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn turn_mut(&mut self, turn_id: TurnId) -> Option<&mut ConversationTurn> {
        self.turns.iter_mut().find(|turn| turn.id == turn_id)
    }

    fn live_turn_mut(&mut self, turn_id: TurnId) -> Option<&mut ConversationTurn> {
        self.turn_mut(turn_id).filter(|turn| !turn.status.is_terminal())
    }

    fn notify(&mut self, change: LedgerChange) {
        let turns = &self.turns;
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&change, turns);
        }
    }
}

impl std::fmt::Debug for MessageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLedger")
            .field("turns", &self.turns)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
