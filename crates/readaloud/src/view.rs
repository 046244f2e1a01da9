//! Terminal rendering of the reader.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use readaloud_core::playback::{PlaybackState, Snapshot};
use readaloud_core::status::{controls, page_label, status_line, time_label};

use crate::prelude::{eprintln, println, *};

/// Resolution of the progress bar.
const BAR_STEPS: u64 = 1000;

/// Where the reader reports what is going on.
pub trait View {
    /// The state, page or error changed.
    fn status(&mut self, snapshot: &Snapshot);

    /// A progress sample arrived while playing.
    fn progress(&mut self, snapshot: &Snapshot);

    fn error(&mut self, error: &dyn std::fmt::Display);

    fn message(&mut self, message: &str);
}

#[derive(Default)]
pub struct TerminalView {
    bar: Option<ProgressBar>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar(&mut self) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(BAR_STEPS);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{prefix:.bold} [{bar:40.cyan/blue}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        })
    }

    fn clear_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn print(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }
}

impl View for TerminalView {
    fn status(&mut self, snapshot: &Snapshot) {
        if snapshot.state != PlaybackState::Playing {
            self.clear_bar();
        }

        let line = status_line(snapshot);
        let line = match snapshot.state {
            PlaybackState::Playing => line.green().bold(),
            PlaybackState::Paused => line.yellow(),
            PlaybackState::Error => line.red(),
            PlaybackState::Extracting => line.dimmed(),
            PlaybackState::Idle | PlaybackState::Ready => line.normal(),
        };
        self.print(f!("{}  {}", line, controls_hint(snapshot).dimmed()));

        if snapshot.state == PlaybackState::Playing {
            self.progress(snapshot);
        }
    }

    fn progress(&mut self, snapshot: &Snapshot) {
        if snapshot.state != PlaybackState::Playing {
            return;
        }

        let bar = self.bar();
        bar.set_prefix(page_label(snapshot));
        bar.set_message(time_label(snapshot));
        match snapshot.progress {
            Some(progress) => bar.set_position((progress * BAR_STEPS as f64).round() as u64),
            None => bar.tick(),
        }
    }

    fn error(&mut self, error: &dyn std::fmt::Display) {
        let line = f!("{} {}", "error:".red().bold(), error);
        match &self.bar {
            Some(bar) => bar.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }

    fn message(&mut self, message: &str) {
        self.print(message.to_string());
    }
}

/// Short list of the commands that do something right now.
pub fn controls_hint(snapshot: &Snapshot) -> String {
    let available = controls(snapshot);
    let hints = [
        (available.play, "play"),
        (available.pause, "pause"),
        (available.resume, "resume"),
        (available.stop, "stop"),
        (available.previous, "prev"),
        (available.next, "next"),
    ];

    hints
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" | ")
}
