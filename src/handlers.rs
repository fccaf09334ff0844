use crate::consts::{VOICEMAIL_MAX_SECS, VOICE_GREETING};
use crate::tasks;
use crate::twilio_types::{
    wrap_twiml, CallEventPayload, InboundSmsPayload, RecordAction, Response, ResponseAction,
    SayAction, VoicemailPayload,
};
use crate::types::AppState;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, trace};

fn twiml_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "application/xml".parse().unwrap());
    headers
}

/// An acknowledgement TwiML with no further instructions for the platform.
fn empty_twiml() -> (StatusCode, HeaderMap, String) {
    let twiml = wrap_twiml(xmlserde::xml_serialize(Response::empty()));
    (StatusCode::OK, twiml_headers(), twiml)
}

fn bad_request(reason: &'static str) -> (StatusCode, HeaderMap, String) {
    (StatusCode::BAD_REQUEST, HeaderMap::new(), reason.to_string())
}

/// Answer an incoming call: greet and record a voicemail, with the recording
/// callback pointed at `/twilio/voicemail`.
pub async fn twiml_answer(body: String) -> impl IntoResponse {
    trace!(body=%body, "voice answer request body");
    let say_action = SayAction {
        text: VOICE_GREETING.to_string(),
        ..Default::default()
    };
    let record_action = RecordAction {
        action: "/twilio/voicemail".to_string(),
        max_length: Some(VOICEMAIL_MAX_SECS),
        play_beep: Some("true".to_string()),
        ..Default::default()
    };
    let response = Response {
        actions: vec![
            ResponseAction::Say(say_action),
            ResponseAction::Record(record_action),
        ],
    };

    let twiml = wrap_twiml(xmlserde::xml_serialize(response));
    trace!("twiml: '{}'", twiml);
    (StatusCode::OK, twiml_headers(), twiml)
}

/// Call-status callback.  Validate, acknowledge, and hand the event to the
/// coordinator in the background.
pub async fn call_status_handler(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> impl IntoResponse {
    let payload = match serde_urlencoded::from_str::<CallEventPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error=%e, "failed to deserialize call status payload");
            return bad_request("Bad request");
        }
    };
    if payload.from.is_empty() {
        return bad_request("Missing caller number");
    }

    tokio::spawn(tasks::process_call_event(
        Arc::clone(&app_state.coordinator),
        payload,
    ));
    empty_twiml()
}

/// Recording callback from the voicemail `Record` verb.
pub async fn voicemail_handler(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> impl IntoResponse {
    let payload = match serde_urlencoded::from_str::<VoicemailPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error=%e, "failed to deserialize voicemail payload");
            return bad_request("Bad request");
        }
    };
    if payload.from.is_empty() {
        return bad_request("Missing caller number");
    }

    tokio::spawn(tasks::process_voicemail(
        Arc::clone(&app_state.coordinator),
        payload,
    ));
    empty_twiml()
}

/// Inbound SMS webhook.
pub async fn inbound_sms_handler(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> impl IntoResponse {
    let payload = match serde_urlencoded::from_str::<InboundSmsPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error=%e, "failed to deserialize inbound sms payload");
            return bad_request("Bad request");
        }
    };
    if payload.from.is_empty() {
        return bad_request("Missing caller number");
    }
    if payload.body.trim().is_empty() {
        return bad_request("Missing message body");
    }

    tokio::spawn(tasks::process_inbound_sms(
        Arc::clone(&app_state.engine),
        payload,
    ));
    empty_twiml()
}
