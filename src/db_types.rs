use time::OffsetDateTime;
use uuid::Uuid;

use crate::capabilities::CustomerInfo;

/// What kind of inbound contact a message row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Voicemail,
    Sms,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Voicemail => "voicemail",
            MessageKind::Sms => "sms",
        }
    }
}

/// Append-only log entry for every inbound voicemail or SMS.  Read path is
/// the dashboard, which lives outside this service.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: Uuid,
    pub from_number: String,
    pub kind: MessageKind,
    pub content: String,
    pub extracted: Option<CustomerInfo>,
    pub created_at: OffsetDateTime,
}

impl MessageRecord {
    pub fn new(
        from_number: &str,
        kind: MessageKind,
        content: &str,
        extracted: Option<CustomerInfo>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_number: from_number.to_string(),
            kind,
            content: content.to_string(),
            extracted,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Immutable booking row, created exactly once per conversation that reaches
/// the terminal step.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub customer_name: String,
    pub intent: String,
    pub details: String,
    pub proposed_time: OffsetDateTime,
    pub caller_number: String,
    pub created_at: OffsetDateTime,
}

impl Booking {
    pub fn new(
        customer: &CustomerInfo,
        details: &str,
        proposed_time: OffsetDateTime,
        caller_number: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_name: customer.name.clone(),
            intent: customer.intent.clone(),
            details: details.to_string(),
            proposed_time,
            caller_number: caller_number.to_string(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
