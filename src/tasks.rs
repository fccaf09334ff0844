//! Deferred webhook work.  Handlers acknowledge the platform immediately and
//! spawn these tasks; the senders retry on slow responses, and those retries
//! are absorbed by the coordinator's idempotency guards, so nothing here may
//! hold up the HTTP response.

use std::sync::Arc;

use crate::coordinator::CallEventCoordinator;
use crate::engine::ConversationEngine;
use crate::error::handle_error;
use crate::twilio_types::{CallEventPayload, InboundSmsPayload, VoicemailPayload};

pub async fn process_call_event(coordinator: Arc<CallEventCoordinator>, payload: CallEventPayload) {
    if let Err(e) = coordinator.handle_call_event(payload).await {
        handle_error(e).await;
    }
}

pub async fn process_voicemail(coordinator: Arc<CallEventCoordinator>, payload: VoicemailPayload) {
    if let Err(e) = coordinator.handle_voicemail(payload).await {
        handle_error(e).await;
    }
}

pub async fn process_inbound_sms(engine: Arc<ConversationEngine>, payload: InboundSmsPayload) {
    if let Err(e) = engine.handle_inbound_sms(&payload.from, &payload.body).await {
        handle_error(e).await;
    }
}
