//! Request and response shapes of the Murf speech generation API.

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;
use crate::playback::SpeechAudio;

pub const MURF_API_URL: &str = "https://api.murf.ai/v1/speech/generate";

/// Voice parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub voice_id: String,
    pub style: String,
    pub rate: i32,
    pub pitch: i32,
    pub sample_rate: u32,
    pub format: String,
    pub model_version: String,
    pub locale: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        VoiceSettings {
            voice_id: "en-US-terrell".to_string(),
            style: "Narration".to_string(),
            rate: 0,
            pitch: 0,
            sample_rate: 48000,
            format: "MP3".to_string(),
            model_version: "GEN2".to_string(),
            locale: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub voice_id: String,
    pub style: String,
    pub text: String,
    pub rate: i32,
    pub pitch: i32,
    pub sample_rate: u32,
    pub format: String,
    pub channel_type: String,
    pub pronunciation_dictionary: serde_json::Map<String, serde_json::Value>,
    pub encode_as_base64: bool,
    pub variation: u32,
    pub audio_duration: u32,
    pub model_version: String,
    pub multi_native_locale: String,
}

/// Build the request body for `text`. Audio is always mono, returned as a
/// URL rather than inline base64.
pub fn build_speech_request(text: &str, voice: &VoiceSettings) -> SpeechRequest {
    SpeechRequest {
        voice_id: voice.voice_id.clone(),
        style: voice.style.clone(),
        text: text.to_string(),
        rate: voice.rate,
        pitch: voice.pitch,
        sample_rate: voice.sample_rate,
        format: voice.format.clone(),
        channel_type: "MONO".to_string(),
        pronunciation_dictionary: serde_json::Map::new(),
        encode_as_base64: false,
        variation: 1,
        audio_duration: 0,
        model_version: voice.model_version.clone(),
        multi_native_locale: voice.locale.clone(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    pub audio_file: Option<String>,
    pub audio_length_in_seconds: Option<f64>,
    pub consumed_character_count: Option<u64>,
    pub remaining_character_count: Option<u64>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error_message: Option<String>,
}

/// Turn a successful response body into playable audio.
///
/// Malformed JSON and a missing or empty `audioFile` are both failures.
pub fn parse_speech_response(body: &str) -> Result<SpeechAudio, ReaderError> {
    let response: SpeechResponse = serde_json::from_str(body)
        .map_err(|e| ReaderError::SpeechGeneration(format!("malformed response: {}", e)))?;

    let locator = response
        .audio_file
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            ReaderError::SpeechGeneration("response did not include an audio file".to_string())
        })?;

    Ok(SpeechAudio {
        locator,
        duration_hint: response
            .audio_length_in_seconds
            .filter(|secs| secs.is_finite() && *secs > 0.0),
    })
}

/// Describe a non-success response, using the API's `errorMessage` when the
/// body carries one.
pub fn describe_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error_message)
    {
        Some(message) => format!("HTTP {}: {}", status, message),
        None => format!("HTTP {}", status),
    }
}
