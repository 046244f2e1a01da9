use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use readaloud_core::murf::{build_speech_request, describe_failure, parse_speech_response};

use super::GeneratedSpeech;
use crate::config::MurfConfig;
use crate::prelude::*;

/// Murf speech generation client. Requests are never retried.
#[derive(Debug, Clone)]
pub struct MurfClient {
    client: Client,
    config: MurfConfig,
}

impl MurfClient {
    pub fn new(config: MurfConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(MurfClient { client, config })
    }

    pub async fn synthesize(&self, text: &str) -> Result<GeneratedSpeech, ReaderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ReaderError::SpeechGeneration("MURF_API_KEY is not set".to_string())
        })?;

        let request = build_speech_request(text, &self.config.voice);
        log::info!(
            "Requesting {} characters of speech from {}",
            text.chars().count(),
            self.config.api_url
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .header("api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReaderError::SpeechGeneration("the speech service timed out".to_string())
                } else {
                    ReaderError::SpeechGeneration(f!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReaderError::SpeechGeneration(f!("could not read response: {}", e)))?;

        if !status.is_success() {
            log::warn!("Speech request failed with {}", status);
            return Err(ReaderError::SpeechGeneration(describe_failure(
                status.as_u16(),
                &body,
            )));
        }

        let audio = parse_speech_response(&body)?;
        log::debug!("Speech ready at {}", audio.locator);
        Ok(GeneratedSpeech::remote(audio))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use readaloud_core::murf::VoiceSettings;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/speech/generate", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        body.len() >= length
    }

    fn client(url: String, api_key: Option<&str>) -> MurfClient {
        MurfClient::new(MurfConfig {
            api_url: url,
            api_key: api_key.map(str::to_string),
            voice: VoiceSettings::default(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_returns_audio_file() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"audioFile":"https://cdn.example.com/a.mp3","audioLengthInSeconds":4.5}"#,
        )
        .await;

        let speech = client(url, Some("secret"))
            .synthesize("Hello there")
            .await
            .unwrap();
        assert_eq!(speech.audio.locator, "https://cdn.example.com/a.mp3");
        assert_eq!(speech.audio.duration_hint, Some(4.5));
        assert!(speech.scratch.is_none());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/speech/generate"));
        assert!(request.to_lowercase().contains("api-key: secret"));
        assert!(request.contains(r#""text":"Hello there""#));
        assert!(request.contains(r#""voiceId":"en-US-terrell""#));
    }

    #[tokio::test]
    async fn test_synthesize_surfaces_service_message() {
        let (url, _server) =
            serve_once("401 Unauthorized", r#"{"errorMessage":"Invalid api key"}"#).await;

        let err = client(url, Some("wrong")).synthesize("Hi").await.unwrap_err();
        match err {
            ReaderError::SpeechGeneration(message) => assert!(message.contains("Invalid api key")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_audio_file_is_an_error() {
        let (url, _server) = serve_once("200 OK", r#"{"audioLengthInSeconds":1.0}"#).await;
        let err = client(url, Some("secret")).synthesize("Hi").await.unwrap_err();
        assert!(matches!(err, ReaderError::SpeechGeneration(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_a_request() {
        let err = client("http://127.0.0.1:9/unused".to_string(), None)
            .synthesize("Hi")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ReaderError::SpeechGeneration("MURF_API_KEY is not set".to_string())
        );
    }
}
