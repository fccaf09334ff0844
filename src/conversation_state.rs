//! Per-caller conversation records and the store that owns them.
//!
//! The store is the single source of truth for where a caller is in the
//! scripted flow.  Everything is keyed by canonical phone number; raw caller
//! ids never reach this module.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::capabilities::CustomerInfo;

/// Where a caller's interaction stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversationStep {
    #[default]
    New,
    AwaitingDetails,
    Scheduling,
    /// Terminal.  A further inbound SMS resets the conversation explicitly
    /// rather than being dropped; the previous booking is already persisted.
    Done,
}

/// How the conversation was initiated.  Affects wording and whether the
/// voicemail transcription is appended to the stored details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversationOrigin {
    #[default]
    MissedCallNoVoicemail,
    Voicemail,
}

/// The mutable record for one caller.  Superseded in place when a new call
/// arrives for the same number; never deleted.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub step: ConversationStep,
    pub origin: ConversationOrigin,
    /// Present only when `origin` is `Voicemail`.
    pub transcription: Option<String>,
    pub customer_info: Option<CustomerInfo>,
    /// Guards duplicate owner notifications for this conversation instance.
    pub notified_owner: bool,
    /// Guards more than one automated follow-up per voicemail.
    pub ai_followup_sent: bool,
}

impl ConversationState {
    /// Fresh record for a conversation that starts (or restarts) now.  The
    /// previous booking, if any, is already persisted, so everything resets.
    pub fn begin(origin: ConversationOrigin) -> Self {
        Self {
            step: ConversationStep::AwaitingDetails,
            origin,
            ..Self::default()
        }
    }
}

/// Canonical phone number -> conversation state.  The mutex is held only for
/// the read or the read-modify-write itself, never across an await; the
/// long-latency extraction and transcription calls happen between a `get`
/// and the `upsert` that commits their outcome.
#[derive(Default)]
pub struct ConversationStore {
    conversations: Mutex<HashMap<String, ConversationState>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, phone: &str) -> Option<ConversationState> {
        self.conversations.lock().unwrap().get(phone).cloned()
    }

    /// The only mutation path.  `mutate` sees the current state (or a fresh
    /// default) and returns the next one; the swap is atomic per number.
    pub fn upsert<F>(&self, phone: &str, mutate: F) -> ConversationState
    where
        F: FnOnce(ConversationState) -> ConversationState,
    {
        let mut conversations = self.conversations.lock().unwrap();
        let current = conversations.get(phone).cloned().unwrap_or_default();
        let next = mutate(current);
        conversations.insert(phone.to_string(), next.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_creates_then_mutates() {
        let store = ConversationStore::new();
        assert!(store.get("+61412345678").is_none());

        store.upsert("+61412345678", |state| {
            assert_eq!(state.step, ConversationStep::New);
            ConversationState::begin(ConversationOrigin::Voicemail)
        });
        let state = store.get("+61412345678").unwrap();
        assert_eq!(state.step, ConversationStep::AwaitingDetails);
        assert_eq!(state.origin, ConversationOrigin::Voicemail);

        store.upsert("+61412345678", |mut state| {
            state.step = ConversationStep::Scheduling;
            state
        });
        let state = store.get("+61412345678").unwrap();
        assert_eq!(state.step, ConversationStep::Scheduling);
        assert_eq!(state.origin, ConversationOrigin::Voicemail);
    }

    #[test]
    fn numbers_are_independent() {
        let store = ConversationStore::new();
        store.upsert("+61400000001", |_| {
            ConversationState::begin(ConversationOrigin::MissedCallNoVoicemail)
        });
        assert!(store.get("+61400000002").is_none());
    }

    #[test]
    fn begin_clears_previous_outcome() {
        let store = ConversationStore::new();
        store.upsert("+61400000001", |mut state| {
            state.step = ConversationStep::Done;
            state.customer_info = Some(crate::capabilities::CustomerInfo::fallback("old job"));
            state.ai_followup_sent = true;
            state
        });
        let state = store.upsert("+61400000001", |_| {
            ConversationState::begin(ConversationOrigin::MissedCallNoVoicemail)
        });
        assert_eq!(state.step, ConversationStep::AwaitingDetails);
        assert!(state.customer_info.is_none());
        assert!(!state.ai_followup_sent);
    }
}
