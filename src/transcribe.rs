//! Voicemail transcription via Deepgram's pre-recorded endpoint.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::capabilities::Transcribe;
use crate::consts::TRANSCRIPTION_UNAVAILABLE;
use crate::deepgram_types::{PrerecordedResponse, UrlSource};

pub struct DeepgramTranscriber {
    api_key: String,
    http_client: reqwest::Client,
}

impl DeepgramTranscriber {
    pub fn new(api_key: String, http_client: reqwest::Client) -> Self {
        Self {
            api_key,
            http_client,
        }
    }

    async fn request_transcript(&self, audio_url: &str) -> Result<String, reqwest::Error> {
        let url = "https://api.deepgram.com/v1/listen?model=nova-2&smart_format=true";
        let resp = self
            .http_client
            .post(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.api_key),
            )
            .json(&UrlSource { url: audio_url })
            .send()
            .await?
            .error_for_status()?
            .json::<PrerecordedResponse>()
            .await?;
        Ok(resp.transcript().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl Transcribe for DeepgramTranscriber {
    /// Transcription failure is never fatal to the voicemail flow; the
    /// caller gets a placeholder and the conversation continues.
    async fn transcribe(&self, audio_url: &str) -> String {
        match self.request_transcript(audio_url).await {
            Ok(transcript) if !transcript.is_empty() => {
                debug!(audio_url, "transcribed voicemail");
                transcript
            }
            Ok(_) => {
                debug!(audio_url, "deepgram returned an empty transcript");
                TRANSCRIPTION_UNAVAILABLE.to_string()
            }
            Err(e) => {
                error!(error=%e, audio_url, "failed to transcribe voicemail");
                TRANSCRIPTION_UNAVAILABLE.to_string()
            }
        }
    }
}
