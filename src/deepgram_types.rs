use serde::{Deserialize, Serialize};

/// Response shape of Deepgram's pre-recorded `/v1/listen` endpoint, trimmed
/// to the fields we read.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PrerecordedResponse {
    pub results: PrerecordedResults,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct PrerecordedResults {
    pub channels: Vec<Channel>,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct Channel {
    pub alternatives: Vec<Alternative>,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f32,
}

impl PrerecordedResponse {
    /// Best transcript across the first channel, if any.
    pub fn transcript(&self) -> Option<&str> {
        self.results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.as_str())
    }
}

/// Request body for transcribing hosted audio by URL.
#[derive(Serialize, Debug)]
pub struct UrlSource<'a> {
    pub url: &'a str,
}
