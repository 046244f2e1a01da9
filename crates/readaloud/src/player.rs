//! Audio output through an external player process.
//!
//! The player cannot pause in place, so pausing stops the process and
//! resuming starts a new one at the remembered offset.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tokio::sync::oneshot;

use crate::config::PlayerArgs;
use crate::prelude::*;

/// How a playback finished on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerExit {
    Ended,
    Failed(String),
}

/// A running playback. Dropping it stops the audio without reporting an
/// exit.
#[derive(Debug)]
pub struct Playback {
    started: Instant,
    offset: f64,
    cancel: Option<oneshot::Sender<()>>,
}

impl Playback {
    pub fn new(offset: f64, cancel: oneshot::Sender<()>) -> Self {
        Playback {
            started: Instant::now(),
            offset,
            cancel: Some(cancel),
        }
    }

    /// When the process started and the offset it started from.
    pub fn clock(&self) -> (Instant, f64) {
        (self.started, self.offset)
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

pub trait AudioPlayer: Send + Sync + 'static {
    /// Start playing `locator` from `offset` seconds. The receiver resolves
    /// when the audio ends or fails; it is dropped unresolved when the
    /// playback is stopped.
    fn start(
        &self,
        locator: &str,
        offset: f64,
    ) -> Result<(Playback, oneshot::Receiver<PlayerExit>), ReaderError>;

    /// Duration of the resource in seconds, when it can be determined.
    fn measure(&self, locator: String) -> impl Future<Output = Option<f64>> + Send + 'static;
}

/// `ffplay` for output and `ffprobe` for durations.
#[derive(Debug, Clone)]
pub struct Ffplay {
    player: PathBuf,
    ffprobe: Option<PathBuf>,
}

impl Ffplay {
    pub fn locate(args: &PlayerArgs) -> Result<Self> {
        let player =
            which::which(&args.player).map_err(|_| Error::MissingBinary(args.player.clone()))?;
        let ffprobe = which::which(&args.ffprobe).ok();
        if ffprobe.is_none() {
            log::warn!("{} not found, durations come from the speech source only", args.ffprobe);
        }

        Ok(Ffplay { player, ffprobe })
    }
}

impl AudioPlayer for Ffplay {
    fn start(
        &self,
        locator: &str,
        offset: f64,
    ) -> Result<(Playback, oneshot::Receiver<PlayerExit>), ReaderError> {
        log::debug!("Starting {} at {:.2}s", locator, offset);
        let mut child = Command::new(&self.player)
            .args(ffplay_args(locator, offset))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReaderError::PlaybackResource(f!("could not start player: {}", e)))?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let exit = match status {
                        Ok(status) if status.success() => PlayerExit::Ended,
                        Ok(status) => PlayerExit::Failed(f!("player exited with {}", status)),
                        Err(e) => PlayerExit::Failed(e.to_string()),
                    };
                    let _ = exit_tx.send(exit);
                }
                _ = cancel_rx => {
                    let _ = child.kill().await;
                }
            }
        });

        Ok((Playback::new(offset, cancel_tx), exit_rx))
    }

    fn measure(&self, locator: String) -> impl Future<Output = Option<f64>> + Send + 'static {
        let ffprobe = self.ffprobe.clone();
        async move {
            let output = Command::new(ffprobe?)
                .args(ffprobe_args(&locator))
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .await
                .ok()?;
            if !output.status.success() {
                log::debug!("ffprobe failed on {}", locator);
                return None;
            }
            parse_duration_output(&String::from_utf8_lossy(&output.stdout))
        }
    }
}

pub fn ffplay_args(locator: &str, offset: f64) -> Vec<String> {
    let mut args = vec![
        "-nodisp".to_string(),
        "-autoexit".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];
    if offset > 0.0 {
        args.push("-ss".to_string());
        args.push(f!("{:.3}", offset));
    }
    args.push(locator.to_string());
    args
}

pub fn ffprobe_args(locator: &str) -> Vec<String> {
    [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
        locator,
    ]
    .map(str::to_string)
    .to_vec()
}

/// Parse ffprobe's bare duration output. `N/A` and non-positive values are
/// unknown durations.
pub fn parse_duration_output(output: &str) -> Option<f64> {
    output
        .lines()
        .find_map(|line| line.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}
