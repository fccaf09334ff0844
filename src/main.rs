mod assistant;
mod capabilities;
mod conversation_state;
mod coordinator;
mod db;
mod db_types;
mod deepgram_types;
mod engine;
mod error;
mod handlers;
mod openai_types;
mod outbound;
mod pending;
mod phone;
mod tasks;
mod time_parse;
mod transcribe;
mod twilio_types;
mod types;

use crate::types::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::env;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

pub mod consts {
    /// Single-tenant: one accepted country code, Australian numbers.
    pub const COUNTRY_CODE: &str = "61";
    /// How long to wait for a voicemail callback after a call completes
    /// without a recording reference.  Tunable, not a contract.
    pub const VOICEMAIL_GRACE_SECS: u64 = 20;
    pub const VOICEMAIL_MAX_SECS: u16 = 120;
    pub const TRANSCRIPTION_UNAVAILABLE: &str = "[Unavailable]";
    pub const VOICE_GREETING: &str =
        "Sorry we can't take your call right now. Leave a message after the beep \
         and we'll text you straight back.";
    pub const MISSED_CALL_REPLY: &str =
        "Sorry we missed your call! What do you need help with? Reply here and \
         we'll get you booked in.";
    pub const VOICEMAIL_REPLY_FALLBACK: &str =
        "Thanks for your voicemail! Could you reply with your name and what you \
         need help with?";
    pub const CALLBACK_PROMPT: &str =
        "When suits you for a callback? We can call any time between 1pm and 3pm.";
    pub const RESCHEDULE_REPLY: &str =
        "Sorry, I didn't catch a time there. What time suits you between 1pm and 3pm?";
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().unwrap();
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("frontdesk_rs", tracing_subscriber::filter::LevelFilter::DEBUG),
        ]));
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let twilio_account_sid = env::var("TWILIO_ACCOUNT_SID").expect("TWILIO_ACCOUNT_SID not set!");
    let twilio_auth_token = env::var("TWILIO_AUTH_TOKEN").expect("TWILIO_AUTH_TOKEN not set!");
    let twilio_from_number =
        env::var("TWILIO_PHONE_NUMBER").expect("TWILIO_PHONE_NUMBER not set!");
    let owner_number = phone::normalize(
        &env::var("OWNER_PHONE_NUMBER").expect("OWNER_PHONE_NUMBER not set!"),
    );
    assert!(
        phone::is_valid_subscriber_number(&owner_number),
        "OWNER_PHONE_NUMBER is not a valid subscriber number"
    );
    let openai_api_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set!");
    let deepgram_api_key = env::var("DEEPGRAM_API_KEY").expect("DEEPGRAM_API_KEY not set!");
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL not set!");

    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let http_client = reqwest::Client::new();
    let store = Arc::new(conversation_state::ConversationStore::new());
    let sms: Arc<dyn capabilities::SmsSink> = Arc::new(outbound::TwilioSms::new(
        twilio_account_sid,
        twilio_auth_token,
        twilio_from_number,
        http_client.clone(),
    ));
    let assistant: Arc<dyn capabilities::Assist> = Arc::new(assistant::OpenAiAssistant::new(
        openai_api_key,
        http_client.clone(),
    ));
    let transcriber: Arc<dyn capabilities::Transcribe> = Arc::new(
        transcribe::DeepgramTranscriber::new(deepgram_api_key, http_client),
    );
    let records: Arc<dyn capabilities::RecordStore> = Arc::new(db::PgRecordStore::new(db_pool));

    let coordinator = Arc::new(coordinator::CallEventCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&sms),
        transcriber,
        Arc::clone(&assistant),
        Arc::clone(&records),
        owner_number.clone(),
    ));
    let engine = Arc::new(engine::ConversationEngine::new(
        store,
        sms,
        assistant,
        records,
        owner_number,
    ));

    let app_state = Arc::new(AppState { coordinator, engine });

    let app = Router::new()
        .route("/twilio/voice", post(handlers::twiml_answer))
        .route("/twilio/call-status", post(handlers::call_status_handler))
        .route("/twilio/voicemail", post(handlers::voicemail_handler))
        .route("/twilio/sms", post(handlers::inbound_sms_handler))
        .route("/", get(|| async { "ok" }))
        .with_state(app_state);

    axum::Server::bind(&"0.0.0.0:3000".parse().unwrap())
        .serve(app.into_make_service())
        .await
        .unwrap();
}
