//! Call-event coordination: the state machine that turns the three webhook
//! streams (call status, voicemail recording, inbound SMS handled elsewhere)
//! into at most one missed-call follow-up per physical call.
//!
//! Platforms retry webhooks and deliver them out of order, so every path
//! here funnels through the per-call handled guard in `PendingCallTracker`
//! rather than trusting the transport.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capabilities::{Assist, RecordStore, SmsSink, Transcribe};
use crate::consts::{MISSED_CALL_REPLY, VOICEMAIL_GRACE_SECS};
use crate::conversation_state::{
    ConversationOrigin, ConversationState, ConversationStep, ConversationStore,
};
use crate::db_types::{MessageKind, MessageRecord};
use crate::error::AppError;
use crate::pending::PendingCallTracker;
use crate::phone;
use crate::twilio_types::{CallEventPayload, CallStatus, VoicemailPayload};

pub struct CallEventCoordinator {
    store: Arc<ConversationStore>,
    pending: Arc<PendingCallTracker>,
    sms: Arc<dyn SmsSink>,
    transcriber: Arc<dyn Transcribe>,
    assistant: Arc<dyn Assist>,
    records: Arc<dyn RecordStore>,
    owner_number: String,
}

impl CallEventCoordinator {
    pub fn new(
        store: Arc<ConversationStore>,
        sms: Arc<dyn SmsSink>,
        transcriber: Arc<dyn Transcribe>,
        assistant: Arc<dyn Assist>,
        records: Arc<dyn RecordStore>,
        owner_number: String,
    ) -> Self {
        Self {
            store,
            pending: Arc::new(PendingCallTracker::new(Duration::from_secs(
                VOICEMAIL_GRACE_SECS,
            ))),
            sms,
            transcriber,
            assistant,
            records,
            owner_number,
        }
    }

    /// Consume one call-status event.  Takes `Arc<Self>` because the
    /// completed-without-recording arm defers work that outlives this call.
    pub async fn handle_call_event(
        self: Arc<Self>,
        event: CallEventPayload,
    ) -> Result<(), AppError> {
        match event.call_status {
            CallStatus::Busy | CallStatus::NoAnswer => {
                self.begin_missed_call_conversation(&event.call_sid, &event.from)
                    .await;
            }
            CallStatus::Completed => {
                if event.recording_url.is_some() {
                    // A recording exists, so the voicemail callback owns the
                    // follow-up from here.
                    self.pending.confirm_voicemail(&event.call_sid);
                } else if !self.pending.is_handled(&event.call_sid) {
                    let this = Arc::clone(&self);
                    let call_sid = event.call_sid.clone();
                    let from = event.from.clone();
                    self.pending
                        .mark_potential_voicemail(&event.call_sid, async move {
                            this.begin_missed_call_conversation(&call_sid, &from).await;
                        });
                }
            }
            CallStatus::Queued
            | CallStatus::Ringing
            | CallStatus::InProgress
            | CallStatus::Canceled => {
                debug!(call_sid=%event.call_sid, status=?event.call_status, "ignoring transient call status");
            }
            CallStatus::Failed => {
                warn!(call_sid=%event.call_sid, "call failed; no follow-up");
            }
        }

        Ok(())
    }

    /// Consume one voicemail recording callback.
    pub async fn handle_voicemail(&self, event: VoicemailPayload) -> Result<(), AppError> {
        let Some(recording_url) = event.recording_url.as_deref() else {
            // Some platforms invoke the callback with no recording at all.
            info!(call_sid=%event.call_sid, "voicemail callback without a recording; ignoring");
            return Ok(());
        };

        self.pending.confirm_voicemail(&event.call_sid);
        let caller = phone::normalize(&event.from);

        // Long-latency work happens before any state commit; the store lock
        // is never held across these awaits.
        let transcription = self.transcriber.transcribe(recording_url).await;

        // First delivery for this call id wins; retries and a voicemail
        // landing after the no-voicemail timer already fired both lose.
        let newly_handled = self.pending.mark_handled(&event.call_sid);

        let state = self.store.upsert(&caller, |previous| {
            if newly_handled {
                let mut state = ConversationState::begin(ConversationOrigin::Voicemail);
                state.transcription = Some(transcription.clone());
                state.notified_owner = true;
                state
            } else {
                // Duplicate delivery: keep the conversation where it is,
                // just make sure the transcription is on record.
                let mut state = previous;
                state.transcription.get_or_insert(transcription.clone());
                state
            }
        });

        if !newly_handled {
            return Ok(());
        }

        let record = MessageRecord::new(&caller, MessageKind::Voicemail, &transcription, None);
        if let Err(e) = self.records.insert_message(&record).await {
            warn!(error=%e, "failed to persist voicemail record");
        }

        self.notify_owner(&format!("New voicemail from {caller}: \"{transcription}\""))
            .await;

        if !state.ai_followup_sent {
            let reply = self.assistant.compose_voicemail_reply(&transcription).await;
            self.send_to_caller(&caller, &reply).await;
            self.store.upsert(&caller, |mut state| {
                state.ai_followup_sent = true;
                state
            });
        }

        Ok(())
    }

    /// The missed-call path shared by busy/no-answer events and the expired
    /// no-voicemail grace window.  Sends the caller-visible follow-up at
    /// most once per call id.
    async fn begin_missed_call_conversation(&self, call_sid: &str, from: &str) {
        if !self.pending.mark_handled(call_sid) {
            return;
        }
        let caller = phone::normalize(from);
        let state = self.store.upsert(&caller, |previous| {
            let in_flight = matches!(
                previous.step,
                ConversationStep::AwaitingDetails | ConversationStep::Scheduling
            );
            let mut state = ConversationState::begin(ConversationOrigin::MissedCallNoVoicemail);
            // A repeat call mid-conversation restarts the script, but the
            // owner has already heard about this caller.
            state.notified_owner = in_flight && previous.notified_owner;
            state
        });
        self.send_to_caller(&caller, MISSED_CALL_REPLY).await;
        if !state.notified_owner {
            self.notify_owner(&format!(
                "Missed call from {caller}. We've texted them to ask what they need."
            ))
            .await;
            self.store.upsert(&caller, |mut state| {
                state.notified_owner = true;
                state
            });
        }
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
