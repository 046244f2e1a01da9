//! Command-line and environment configuration.

use std::time::Duration;

use readaloud_core::command::SpeechBackend;
use readaloud_core::murf::{VoiceSettings, MURF_API_URL};

/// Speech source selection and its settings
#[derive(Debug, Clone, clap::Args)]
pub struct SpeechArgs {
    /// Which speech source reads the text: `local` or `murf`
    #[clap(long, env = "READALOUD_BACKEND", default_value_t = SpeechBackend::Local)]
    pub backend: SpeechBackend,

    /// Murf API key
    #[clap(long, env = "MURF_API_KEY", hide_env_values = true)]
    pub murf_api_key: Option<String>,

    /// Murf speech generation endpoint
    #[clap(long, env = "MURF_API_URL", default_value = MURF_API_URL)]
    pub murf_api_url: String,

    /// Murf voice
    #[clap(long, env = "MURF_VOICE_ID", default_value = "en-US-terrell")]
    pub voice_id: String,

    /// Murf voice style
    #[clap(long, env = "MURF_STYLE", default_value = "Narration")]
    pub style: String,

    /// Seconds to wait for the Murf API before giving up
    #[clap(long, env = "MURF_TIMEOUT", default_value_t = 60)]
    pub murf_timeout: u64,

    /// Local synthesizer binary; detected on PATH when omitted
    #[clap(long, env = "READALOUD_SYNTH")]
    pub synth: Option<String>,

    /// Local synthesizer voice
    #[clap(long, env = "READALOUD_SYNTH_VOICE", default_value = "en")]
    pub synth_voice: String,

    /// Local synthesizer speed in words per minute
    #[clap(long, env = "READALOUD_SYNTH_RATE", default_value_t = 175)]
    pub synth_rate: u32,
}

/// Audio output settings
#[derive(Debug, Clone, clap::Args)]
pub struct PlayerArgs {
    /// Audio player binary
    #[clap(long, env = "READALOUD_PLAYER", default_value = "ffplay")]
    pub player: String,

    /// Binary used to read audio durations
    #[clap(long, env = "READALOUD_FFPROBE", default_value = "ffprobe")]
    pub ffprobe: String,

    /// Milliseconds between progress samples
    #[clap(long, env = "READALOUD_SAMPLE_MS", default_value_t = 50)]
    pub sample_ms: u64,
}

impl PlayerArgs {
    pub fn sample_every(&self) -> Duration {
        Duration::from_millis(self.sample_ms.max(1))
    }
}

/// Murf client configuration
#[derive(Debug, Clone)]
pub struct MurfConfig {
    pub api_url: String,
    /// Checked when speech is requested, not at startup.
    pub api_key: Option<String>,
    pub voice: VoiceSettings,
    pub timeout: Duration,
}

impl From<&SpeechArgs> for MurfConfig {
    fn from(args: &SpeechArgs) -> Self {
        MurfConfig {
            api_url: args.murf_api_url.clone(),
            api_key: args.murf_api_key.clone().filter(|key| !key.trim().is_empty()),
            voice: VoiceSettings {
                voice_id: args.voice_id.clone(),
                style: args.style.clone(),
                ..VoiceSettings::default()
            },
            timeout: Duration::from_secs(args.murf_timeout),
        }
    }
}

/// Local synthesizer configuration
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub binary: Option<String>,
    pub voice: String,
    pub rate: u32,
}

impl From<&SpeechArgs> for LocalConfig {
    fn from(args: &SpeechArgs) -> Self {
        LocalConfig {
            binary: args.synth.clone(),
            voice: args.synth_voice.clone(),
            rate: args.synth_rate,
        }
    }
}
