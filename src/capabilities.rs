//! Seams to the external collaborators: outbound SMS, audio transcription,
//! the assistant (free-text extraction and composition), and the record
//! store.  The coordinator and engine only ever see these traits, so tests
//! run against in-memory fakes and production wires up the vendor clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db_types::{Booking, MessageRecord};
use crate::error::AppError;

/// Structured fields the assistant pulls out of a caller's free text.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CustomerInfo {
    pub name: String,
    pub intent: String,
    pub description: String,
}

impl CustomerInfo {
    /// Contractual fallback when extraction errors or returns junk.  The
    /// conversation keeps moving with the raw text as the description.
    pub fn fallback(text: &str) -> Self {
        Self {
            name: "Customer".to_string(),
            intent: "other".to_string(),
            description: text.to_string(),
        }
    }
}

/// Outbound text-message sink.  Failures are logged by callers and otherwise
/// ignored; nothing in the conversation flow retries a send.
#[async_trait]
pub trait SmsSink: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), AppError>;
}

/// Audio transcription.  Infallible by contract: implementations substitute
/// a literal placeholder when the vendor call fails.
#[async_trait]
pub trait Transcribe: Send + Sync {
    async fn transcribe(&self, audio_url: &str) -> String;
}

/// Best-effort language assistance.  `extract_customer_info` must fall back
/// to [`CustomerInfo::fallback`] rather than error; the other two degrade to
/// `None` / a canned reply.
#[async_trait]
pub trait Assist: Send + Sync {
    async fn extract_customer_info(&self, text: &str) -> CustomerInfo;

    /// Pull a clock-like phrase out of text the narrow parser rejected, e.g.
    /// "quarter past two" -> "2:15".  `None` when nothing usable is found.
    async fn extract_time_phrase(&self, text: &str) -> Option<String>;

    /// One short follow-up SMS responding to a voicemail transcription.
    async fn compose_voicemail_reply(&self, transcription: &str) -> String;
}

/// Append-only persistence for message and booking rows.  Insert failures
/// are logged at the call site and never block the caller-visible reply.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_message(&self, record: &MessageRecord) -> Result<(), AppError>;
    async fn insert_booking(&self, booking: &Booking) -> Result<(), AppError>;
}
