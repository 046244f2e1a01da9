//! Speech sources: turn a page of text into playable audio.

use std::future::Future;

use readaloud_core::command::SpeechBackend;
use readaloud_core::playback::SpeechAudio;
use tempfile::TempPath;

use crate::config::SpeechArgs;
use crate::prelude::*;

pub mod local;
pub mod murf;

pub use local::LocalSynth;
pub use murf::MurfClient;

/// Audio produced for one request.
#[derive(Debug)]
pub struct GeneratedSpeech {
    pub audio: SpeechAudio,
    /// Temporary file backing `audio.locator`, removed when dropped.
    pub scratch: Option<TempPath>,
}

impl GeneratedSpeech {
    pub fn remote(audio: SpeechAudio) -> Self {
        GeneratedSpeech {
            audio,
            scratch: None,
        }
    }
}

/// Something that can voice text.
///
/// The returned future owns everything it needs so the reader can run it on
/// its own task and abort it when the page changes.
pub trait SpeechSource: Send + Sync + 'static {
    fn generate(
        &self,
        text: String,
    ) -> impl Future<Output = Result<GeneratedSpeech, ReaderError>> + Send + 'static;

    /// Backend new requests go to.
    fn backend(&self) -> SpeechBackend;

    /// Send later requests to `backend`.
    fn select(&mut self, backend: SpeechBackend) -> Result<(), ReaderError>;
}

/// Both speech sources, one of them active.
#[derive(Debug, Clone)]
pub struct Speech {
    active: SpeechBackend,
    /// `None` when no synthesizer was found on this machine.
    local: Option<LocalSynth>,
    murf: MurfClient,
}

impl Speech {
    /// One-time setup of both sources. Only the one picked on the command
    /// line has to be usable right away.
    pub fn setup(args: &SpeechArgs) -> Result<Self> {
        let murf = MurfClient::new(args.into())?;
        let local = match LocalSynth::locate(&args.into()) {
            Ok(synth) => Some(synth),
            Err(e) if args.backend == SpeechBackend::Murf => {
                log::warn!("local speech unavailable: {e}");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Speech {
            active: args.backend,
            local,
            murf,
        })
    }
}

fn local_unavailable() -> ReaderError {
    ReaderError::SpeechGeneration("no local synthesizer found (install espeak-ng)".to_string())
}

impl SpeechSource for Speech {
    fn generate(
        &self,
        text: String,
    ) -> impl Future<Output = Result<GeneratedSpeech, ReaderError>> + Send + 'static {
        let active = self.active;
        let local = self.local.clone();
        let murf = self.murf.clone();
        async move {
            match active {
                SpeechBackend::Local => match local {
                    Some(synth) => synth.synthesize(&text).await,
                    None => Err(local_unavailable()),
                },
                SpeechBackend::Murf => murf.synthesize(&text).await,
            }
        }
    }

    fn backend(&self) -> SpeechBackend {
        self.active
    }

    fn select(&mut self, backend: SpeechBackend) -> Result<(), ReaderError> {
        if backend == SpeechBackend::Local && self.local.is_none() {
            return Err(local_unavailable());
        }
        self.active = backend;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use readaloud_core::murf::VoiceSettings;

    use super::*;
    use crate::config::MurfConfig;

    /// Murf without a key, and no synthesizer on this machine.
    fn murf_only() -> Speech {
        let murf = MurfClient::new(MurfConfig {
            api_url: "http://127.0.0.1:9/unused".to_string(),
            api_key: None,
            voice: VoiceSettings::default(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        Speech {
            active: SpeechBackend::Murf,
            local: None,
            murf,
        }
    }

    #[test]
    fn test_local_needs_a_synthesizer() {
        let mut speech = murf_only();
        assert!(matches!(
            speech.select(SpeechBackend::Local),
            Err(ReaderError::SpeechGeneration(_))
        ));
        assert_eq!(speech.backend(), SpeechBackend::Murf);
        assert!(speech.select(SpeechBackend::Murf).is_ok());
    }

    #[tokio::test]
    async fn test_generate_goes_to_active_backend() {
        let mut speech = murf_only();
        let err = speech.generate("Hi".to_string()).await.unwrap_err();
        assert_eq!(
            err,
            ReaderError::SpeechGeneration("MURF_API_KEY is not set".to_string())
        );

        speech.active = SpeechBackend::Local;
        let err = speech.generate("Hi".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("no local synthesizer"));
    }
}
