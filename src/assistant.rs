//! OpenAI-backed assistant boundary: structured extraction from free text,
//! time-phrase rescue for the scheduling step, and the one-off voicemail
//! follow-up.  Every path has a built-in fallback; nothing here is allowed
//! to fail the caller-visible flow.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::capabilities::{Assist, CustomerInfo};
use crate::consts::VOICEMAIL_REPLY_FALLBACK;
use crate::error::AppError;
use crate::openai_types::{OpenAIBatchResponse, OpenAIMessage, OpenAIPayload};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-3.5-turbo";

pub struct OpenAiAssistant {
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiAssistant {
    pub fn new(api_key: String, http_client: reqwest::Client) -> Self {
        Self {
            api_key,
            http_client,
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError> {
        let payload = OpenAIPayload {
            model: MODEL.to_string(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: Some(200),
            temperature: Some(0.2),
        };
        let key = self.api_key.as_str();
        let resp = self
            .http_client
            .post(COMPLETIONS_URL)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send request to OpenAI");
                AppError("Failed to send request to OpenAI")
            })?;
        let resp = resp.json::<OpenAIBatchResponse>().await.map_err(|e| {
            error!(error=%e, "failed to deserialize openai response");
            AppError("deserialize")
        })?;
        resp.first_content()
            .map(|c| c.trim().to_string())
            .ok_or(AppError("openai returned no choices"))
    }
}

#[async_trait]
impl Assist for OpenAiAssistant {
    async fn extract_customer_info(&self, text: &str) -> CustomerInfo {
        let system = "You extract booking details for a trade business. \
                      Respond with strict JSON only, shaped exactly as \
                      {\"name\": string, \"intent\": string, \"description\": string}. \
                      Use \"Customer\" for an unknown name and \"other\" for an \
                      unclear intent.";
        let content = match self.complete(system, text).await {
            Ok(content) => content,
            Err(_) => return CustomerInfo::fallback(text),
        };
        match serde_json::from_str::<CustomerInfo>(&content) {
            Ok(info) => info,
            Err(e) => {
                warn!(error=%e, content=%content, "unparseable extraction output; using fallback");
                CustomerInfo::fallback(text)
            }
        }
    }

    async fn extract_time_phrase(&self, text: &str) -> Option<String> {
        let system = "The customer was asked for a callback time. Extract the \
                      time they mean as a short clock expression like \"2pm\" or \
                      \"2:30\". If no time is present, respond with exactly NONE.";
        let content = self.complete(system, text).await.ok()?;
        if content.eq_ignore_ascii_case("none") || content.is_empty() {
            None
        } else {
            debug!(phrase=%content, "assistant rescued a time phrase");
            Some(content)
        }
    }

    async fn compose_voicemail_reply(&self, transcription: &str) -> String {
        let system = "You are the SMS front desk of a small trade business. A \
                      caller left the following voicemail. Write one short, \
                      friendly SMS asking for their name and what they need \
                      help with. Plain text, no sign-off.";
        match self.complete(system, transcription).await {
            Ok(reply) => reply,
            Err(_) => VOICEMAIL_REPLY_FALLBACK.to_string(),
        }
    }
}
