//! Text rendering of the reader state.

use crate::playback::{PlaybackState, Snapshot};

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

pub fn page_label(snapshot: &Snapshot) -> String {
    match snapshot.page_count {
        Some(count) => format!("Page {} of {}", snapshot.page, count),
        None => format!("Page {} of ?", snapshot.page),
    }
}

/// `0:07 / 1:00 (12%)`; the duration shows as `--:--` until it is known.
pub fn time_label(snapshot: &Snapshot) -> String {
    let elapsed = format_clock(snapshot.elapsed);
    match (snapshot.duration, snapshot.progress) {
        (Some(duration), Some(progress)) => format!(
            "{} / {} ({:.0}%)",
            elapsed,
            format_clock(duration),
            progress * 100.0
        ),
        _ => format!("{} / --:--", elapsed),
    }
}

pub fn status_line(snapshot: &Snapshot) -> String {
    let mut line = format!("[{}] {}", snapshot.state, page_label(snapshot));
    match snapshot.state {
        PlaybackState::Playing | PlaybackState::Paused => {
            line.push_str("  ");
            line.push_str(&time_label(snapshot));
        }
        PlaybackState::Ready if snapshot.speech_pending => line.push_str("  generating speech..."),
        _ => {}
    }
    line
}

/// Which controls make sense right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub play: bool,
    pub pause: bool,
    pub resume: bool,
    pub stop: bool,
    pub previous: bool,
    pub next: bool,
}

pub fn controls(snapshot: &Snapshot) -> Controls {
    let loaded = snapshot.state != PlaybackState::Idle;
    let failed = snapshot.state == PlaybackState::Error;
    let speaking = matches!(
        snapshot.state,
        PlaybackState::Playing | PlaybackState::Paused
    );
    let last_page = snapshot.page_count.unwrap_or(1);

    Controls {
        play: loaded && !failed && snapshot.state != PlaybackState::Playing,
        pause: snapshot.state == PlaybackState::Playing,
        resume: snapshot.state == PlaybackState::Paused,
        stop: speaking || snapshot.speech_pending,
        previous: loaded && snapshot.page > 1,
        next: loaded && snapshot.page < last_page,
    }
}
