//! The scripted SMS conversation: collect who the caller is and what they
//! need, then pin down a callback time and persist the booking.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::capabilities::{Assist, CustomerInfo, RecordStore, SmsSink};
use crate::consts::{CALLBACK_PROMPT, RESCHEDULE_REPLY};
use crate::conversation_state::{
    ConversationOrigin, ConversationState, ConversationStep, ConversationStore,
};
use crate::db_types::{Booking, MessageKind, MessageRecord};
use crate::error::AppError;
use crate::phone;
use crate::time_parse;

pub struct ConversationEngine {
    store: Arc<ConversationStore>,
    sms: Arc<dyn SmsSink>,
    assistant: Arc<dyn Assist>,
    records: Arc<dyn RecordStore>,
    owner_number: String,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<ConversationStore>,
        sms: Arc<dyn SmsSink>,
        assistant: Arc<dyn Assist>,
        records: Arc<dyn RecordStore>,
        owner_number: String,
    ) -> Self {
        Self {
            store,
            sms,
            assistant,
            records,
            owner_number,
        }
    }

    /// Consume one inbound SMS and advance the caller's conversation.
    pub async fn handle_inbound_sms(&self, from: &str, text: &str) -> Result<(), AppError> {
        let caller = phone::normalize(from);
        let snapshot = self.store.get(&caller).unwrap_or_default();

        match snapshot.step {
            // A caller can text in without any prior call event; treat that
            // the same as a fresh missed-call conversation.
            ConversationStep::New | ConversationStep::AwaitingDetails => {
                self.collect_details(&caller, &snapshot, text).await;
            }
            ConversationStep::Scheduling => {
                self.schedule_callback(&caller, &snapshot, text).await;
            }
            ConversationStep::Done => {
                // New inquiry from a caller whose booking is already on the
                // books: restart explicitly rather than dropping the text.
                info!(caller=%caller, "inbound sms on finished conversation; restarting");
                let fresh = self.store.upsert(&caller, |_| {
                    ConversationState::begin(ConversationOrigin::MissedCallNoVoicemail)
                });
                self.collect_details(&caller, &fresh, text).await;
            }
        }

        Ok(())
    }

    /// `awaiting_details`: extract who/what, tell the owner, ask for a time.
    async fn collect_details(&self, caller: &str, snapshot: &ConversationState, text: &str) {
        // Extraction is the long-latency step; no store lock is held here.
        let info = self.assistant.extract_customer_info(text).await;

        let mut details = info.description.clone();
        if snapshot.origin == ConversationOrigin::Voicemail {
            if let Some(transcription) = &snapshot.transcription {
                details.push_str(&format!(" (voicemail: {transcription})"));
            }
        }

        self.store.upsert(caller, |mut state| {
            state.customer_info = Some(info.clone());
            state.step = ConversationStep::Scheduling;
            state
        });

        let record = MessageRecord::new(caller, MessageKind::Sms, text, Some(info.clone()));
        if let Err(e) = self.records.insert_message(&record).await {
            warn!(error=%e, "failed to persist sms record");
        }

        self.notify_owner(&format!(
            "New enquiry from {} ({caller}): {} - {details}",
            info.name, info.intent
        ))
        .await;
        self.send_to_caller(caller, &format!("Thanks {}! {CALLBACK_PROMPT}", info.name))
            .await;
    }

    /// `scheduling`: parse a callback time, falling back to the assistant
    /// for phrasing the narrow parser rejects.
    async fn schedule_callback(&self, caller: &str, snapshot: &ConversationState, text: &str) {
        // Every inbound text goes on record, whether or not it parses.
        let record = MessageRecord::new(caller, MessageKind::Sms, text, None);
        if let Err(e) = self.records.insert_message(&record).await {
            warn!(error=%e, "failed to persist sms record");
        }

        let now = OffsetDateTime::now_utc();
        let mut proposed = time_parse::parse_time_expression(text, now);
        if proposed.is_none() {
            if let Some(phrase) = self.assistant.extract_time_phrase(text).await {
                proposed = time_parse::parse_time_expression(&phrase, now);
            }
        }

        let Some(proposed_time) = proposed else {
            self.send_to_caller(caller, RESCHEDULE_REPLY).await;
            return;
        };

        let customer = snapshot
            .customer_info
            .clone()
            .unwrap_or_else(|| CustomerInfo::fallback(text));
        let details = customer.description.clone();
        let booking = Booking::new(&customer, &details, proposed_time, caller);
        if let Err(e) = self.records.insert_booking(&booking).await {
            warn!(error=%e, "failed to persist booking");
        }

        self.store.upsert(caller, |mut state| {
            state.step = ConversationStep::Done;
            state
        });

        let when = time_parse::format_callback_time(proposed_time);
        self.notify_owner(&format!(
            "Booking: {} ({caller}) - {}. Callback at {when}. Details: {details}",
            customer.name, customer.intent
        ))
        .await;
        self.send_to_caller(
            caller,
            &format!("Perfect, we'll call you at {when}. Talk soon!"),
        )
        .await;
    }

    async fn send_to_caller(&self, caller: &str, body: &str) {
        if !phone::is_valid_subscriber_number(caller) {
            warn!(caller, "skipping sms to invalid subscriber number");
            return;
        }
        if let Err(e) = self.sms.send(caller, body).await {
            warn!(error=%e, caller, "failed to send sms to caller");
        }
    }

    async fn notify_owner(&self, body: &str) {
        if let Err(e) = self.sms.send(&self.owner_number, body).await {
            warn!(error=%e, "failed to notify owner");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::fakes::{CannedAssist, MemoryRecords, RecordingSms};

    const CALLER: &str = "+61412345678";
    const OWNER: &str = "+61499999999";

    struct Harness {
        engine: ConversationEngine,
        store: Arc<ConversationStore>,
        sms: Arc<RecordingSms>,
        records: Arc<MemoryRecords>,
    }

    fn harness_with(assist: CannedAssist) -> Harness {
        let store = Arc::new(ConversationStore::new());
        let sms = Arc::new(RecordingSms::default());
        let records = Arc::new(MemoryRecords::default());
        let engine = ConversationEngine::new(
            Arc::clone(&store),
            sms.clone(),
            Arc::new(assist),
            records.clone(),
            OWNER.to_string(),
        );
        Harness {
            engine,
            store,
            sms,
            records,
        }
    }

    fn harness() -> Harness {
        harness_with(CannedAssist::new(
            "Sam",
            "plumbing",
            "hot water system is leaking",
        ))
    }

    #[tokio::test]
    async fn full_conversation_reaches_booking() {
        let h = harness();
        h.store.upsert(CALLER, |_| {
            ConversationState::begin(ConversationOrigin::MissedCallNoVoicemail)
        });

        h.engine
            .handle_inbound_sms(CALLER, "Hi it's Sam, my hot water system is leaking")
            .await
            .unwrap();
        let state = h.store.get(CALLER).unwrap();
        assert_eq!(state.step, ConversationStep::Scheduling);
        assert_eq!(state.customer_info.as_ref().unwrap().name, "Sam");
        let replies = h.sms.sent_to(CALLER);
        assert!(replies[0].contains("1pm and 3pm"));

        h.engine.handle_inbound_sms(CALLER, "2pm works").await.unwrap();
        let state = h.store.get(CALLER).unwrap();
        assert_eq!(state.step, ConversationStep::Done);

        let bookings = h.records.bookings.lock().unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].proposed_time.hour(), 14);
        assert_eq!(bookings[0].customer_name, "Sam");
        drop(bookings);

        // Both inbound texts are on record, not just the first.
        let messages = h.records.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "2pm works");
        drop(messages);

        let replies = h.sms.sent_to(CALLER);
        assert!(replies[1].contains("we'll call you at 2:00pm"));
    }

    #[tokio::test]
    async fn unknown_number_defaults_to_details_step() {
        let h = harness();
        h.engine
            .handle_inbound_sms(CALLER, "hello, my gutters are blocked")
            .await
            .unwrap();
        let state = h.store.get(CALLER).unwrap();
        assert_eq!(state.step, ConversationStep::Scheduling);
        assert_eq!(h.records.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn voicemail_transcription_lands_in_owner_details() {
        let h = harness();
        h.store.upsert(CALLER, |_| {
            let mut state = ConversationState::begin(ConversationOrigin::Voicemail);
            state.transcription = Some("call me about the leak".to_string());
            state
        });

        h.engine
            .handle_inbound_sms(CALLER, "It's Sam, about the leak")
            .await
            .unwrap();

        let owner_messages = h.sms.sent_to(OWNER);
        assert!(owner_messages[0].contains("(voicemail: call me about the leak)"));
    }

    #[tokio::test]
    async fn unparseable_time_reprompts_and_stays_scheduling() {
        let h = harness();
        h.store.upsert(CALLER, |mut state| {
            state.step = ConversationStep::Scheduling;
            state.customer_info = Some(CustomerInfo::fallback("leak"));
            state
        });

        h.engine
            .handle_inbound_sms(CALLER, "whenever really")
            .await
            .unwrap();

        let state = h.store.get(CALLER).unwrap();
        assert_eq!(state.step, ConversationStep::Scheduling);
        assert!(h.records.bookings.lock().unwrap().is_empty());
        assert!(h.sms.sent_to(CALLER)[0].contains("1pm and 3pm"));

        // The unparseable text is still persisted as a message row.
        let messages = h.records.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "whenever really");
    }

    #[tokio::test]
    async fn assistant_rescues_time_phrase() {
        let mut assist = CannedAssist::new("Sam", "plumbing", "leak");
        assist.time_phrase = Some("2:30pm".to_string());
        let h = harness_with(assist);
        h.store.upsert(CALLER, |mut state| {
            state.step = ConversationStep::Scheduling;
            state.customer_info = Some(CustomerInfo::fallback("leak"));
            state
        });

        h.engine
            .handle_inbound_sms(CALLER, "half past two would be grand")
            .await
            .unwrap();

        let state = h.store.get(CALLER).unwrap();
        assert_eq!(state.step, ConversationStep::Done);
        let bookings = h.records.bookings.lock().unwrap();
        assert_eq!(bookings[0].proposed_time.hour(), 14);
        assert_eq!(bookings[0].proposed_time.minute(), 30);
    }

    #[tokio::test]
    async fn finished_conversation_restarts_instead_of_duplicating() {
        let h = harness();
        h.store.upsert(CALLER, |mut state| {
            state.step = ConversationStep::Scheduling;
            state.customer_info = Some(CustomerInfo::fallback("leak"));
            state
        });
        h.engine.handle_inbound_sms(CALLER, "2pm").await.unwrap();
        assert_eq!(h.store.get(CALLER).unwrap().step, ConversationStep::Done);
        assert_eq!(h.records.bookings.lock().unwrap().len(), 1);

        // Identical text again: explicit reset, no silent second booking.
        h.engine.handle_inbound_sms(CALLER, "2pm").await.unwrap();
        let state = h.store.get(CALLER).unwrap();
        assert_eq!(state.step, ConversationStep::Scheduling);
        assert_eq!(h.records.bookings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_sender_gets_no_reply_but_owner_is_told() {
        let h = harness();
        h.engine
            .handle_inbound_sms("shortcode", "hello")
            .await
            .unwrap();

        let sent = h.sms.sent.lock().unwrap();
        assert!(sent.iter().all(|(to, _)| to == OWNER));
        assert_eq!(sent.len(), 1);
    }
}
