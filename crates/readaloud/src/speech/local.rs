use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use readaloud_core::audio::wav_duration;
use readaloud_core::playback::SpeechAudio;

use super::GeneratedSpeech;
use crate::config::LocalConfig;
use crate::prelude::*;

const CANDIDATES: [&str; 3] = ["espeak-ng", "espeak", "say"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthKind {
    /// espeak and espeak-ng share a command line.
    Espeak,
    /// macOS `say`.
    Say,
}

impl SynthKind {
    fn of(binary: &Path) -> Self {
        match binary.file_stem().and_then(|s| s.to_str()) {
            Some("say") => SynthKind::Say,
            _ => SynthKind::Espeak,
        }
    }
}

/// On-device synthesizer writing WAV files that are played like any other
/// audio.
#[derive(Debug, Clone)]
pub struct LocalSynth {
    binary: PathBuf,
    kind: SynthKind,
    voice: String,
    rate: u32,
}

impl LocalSynth {
    /// Find the synthesizer binary, either the configured one or the first
    /// known one on PATH.
    pub fn locate(config: &LocalConfig) -> Result<Self> {
        let binary = match &config.binary {
            Some(binary) => which::which(binary)
                .map_err(|_| Error::MissingBinary(binary.clone()))?,
            None => CANDIDATES
                .iter()
                .find_map(|name| which::which(name).ok())
                .ok_or_else(|| Error::MissingBinary(CANDIDATES.join(", ")))?,
        };

        log::info!("Using local synthesizer {}", binary.display());
        Ok(LocalSynth {
            kind: SynthKind::of(&binary),
            binary,
            voice: config.voice.clone(),
            rate: config.rate,
        })
    }

    pub async fn synthesize(&self, text: &str) -> Result<GeneratedSpeech, ReaderError> {
        let scratch = tempfile::Builder::new()
            .prefix("readaloud-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| failure("could not create a temporary file", e))?
            .into_temp_path();

        let mut child = Command::new(&self.binary)
            .args(synth_args(self.kind, &self.voice, self.rate, &scratch))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failure("could not start the synthesizer", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| failure("could not send text to the synthesizer", e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failure("synthesizer did not finish", e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReaderError::SpeechGeneration(f!(
                "synthesizer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&scratch)
            .await
            .map_err(|e| failure("could not read the synthesized audio", e))?;
        if bytes.is_empty() {
            return Err(ReaderError::SpeechGeneration(
                "synthesizer produced no audio".to_string(),
            ));
        }

        let duration_hint = wav_duration(&bytes);
        log::debug!(
            "Synthesized {} bytes ({:?} s) into {}",
            bytes.len(),
            duration_hint,
            scratch.display()
        );

        Ok(GeneratedSpeech {
            audio: SpeechAudio {
                locator: scratch.to_string_lossy().into_owned(),
                duration_hint,
            },
            scratch: Some(scratch),
        })
    }
}

/// Command line writing a WAV to `output`, with the text read from stdin.
pub fn synth_args(kind: SynthKind, voice: &str, rate: u32, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    match kind {
        SynthKind::Espeak => {
            args.extend(["-v", voice, "-s"].map(OsString::from));
            args.push(rate.to_string().into());
            args.push("-w".into());
            args.push(output.into());
            args.push("--stdin".into());
        }
        SynthKind::Say => {
            args.push("-r".into());
            args.push(rate.to_string().into());
            args.extend(["--file-format=WAVE", "--data-format=LEI16@22050", "-o"].map(OsString::from));
            args.push(output.into());
            args.extend(["-f", "-"].map(OsString::from));
        }
    }
    args
}

fn failure(what: &str, error: std::io::Error) -> ReaderError {
    ReaderError::SpeechGeneration(f!("{}: {}", what, error))
}
