//! The playback coordinator.
//!
//! [`Coordinator`] is a synchronous state machine. Every operation returns an
//! [`Outcome`]: the [`Effect`]s the caller must carry out (extract a page,
//! request speech, drive the audio player) and, when something went wrong,
//! the error to show the user. Asynchronous work reports back through the
//! `*_finished` / audio event methods together with the [`Ticket`] it was
//! issued with; results whose ticket is no longer current are dropped.
//!
//! ```text
//! Idle -> Extracting -> Ready -> Playing <-> Paused
//!             |                    |           |
//!             v                    v           v
//!           Error               Ready  <-----  (stop / end / audio error)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;
use crate::words::ReadingText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Extracting,
    Ready,
    Playing,
    Paused,
    Error,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Extracting => "extracting",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Error => "in error",
        };
        write!(f, "{}", name)
    }
}

/// Generation number attached to every asynchronous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Audio produced by a speech source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAudio {
    /// URL or file path the audio player can open.
    pub locator: String,
    /// Duration reported by the speech source, in seconds.
    pub duration_hint: Option<f64>,
}

/// Result of extracting the text of the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// Known as soon as the document decoded, even if the page had no text.
    pub page_count: Option<usize>,
    pub text: Result<String, ReaderError>,
}

/// One live playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSession {
    ticket: Ticket,
    locator: String,
    elapsed: f64,
    duration: Option<f64>,
    paused: bool,
    start_word: usize,
}

impl AudioSession {
    fn new(ticket: Ticket, audio: SpeechAudio, start_word: usize) -> Self {
        let mut session = AudioSession {
            ticket,
            locator: audio.locator,
            elapsed: 0.0,
            duration: None,
            paused: false,
            start_word,
        };
        if let Some(hint) = audio.duration_hint {
            session.set_duration(hint);
        }
        session
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// `elapsed / duration` in `[0, 1]`; `None` until the duration is known.
    pub fn progress(&self) -> Option<f64> {
        let duration = self.duration?;
        Some((self.elapsed / duration).clamp(0.0, 1.0))
    }

    /// Record the duration once the audio metadata is available. Zero,
    /// negative and non-finite values are ignored.
    fn set_duration(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() || seconds <= 0.0 {
            return false;
        }
        self.duration = Some(seconds);
        self.elapsed = self.clamp(self.elapsed);
        true
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        match self.duration {
            Some(duration) => seconds.clamp(0.0, duration),
            None => seconds.max(0.0),
        }
    }

    fn seek_by(&mut self, delta: f64) -> f64 {
        self.elapsed = self.clamp(self.elapsed + delta);
        self.elapsed
    }
}

/// Work the caller must perform on the coordinator's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Decode the document and extract the text of `page`.
    ExtractPage { ticket: Ticket, page: usize },
    /// Ask the speech source for audio of `text`.
    RequestSpeech { ticket: Ticket, text: String },
    /// Open the audio resource and start playing at `offset` seconds.
    AcquireAudio {
        session: Ticket,
        locator: String,
        offset: f64,
    },
    /// Find out how long the audio resource is.
    MeasureDuration { session: Ticket, locator: String },
    PauseAudio { session: Ticket },
    ResumeAudio { session: Ticket, offset: f64 },
    SeekAudio { session: Ticket, offset: f64 },
    /// Stop the audio resource and its progress sampler.
    ReleaseAudio,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    pub effects: Vec<Effect>,
    pub error: Option<ReaderError>,
}

impl Outcome {
    fn effects(effects: Vec<Effect>) -> Self {
        Outcome {
            effects,
            error: None,
        }
    }

    fn error(error: ReaderError) -> Self {
        Outcome {
            effects: Vec::new(),
            error: Some(error),
        }
    }
}

/// What the view needs to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: PlaybackState,
    pub page: usize,
    pub page_count: Option<usize>,
    pub elapsed: f64,
    pub duration: Option<f64>,
    /// `Some(0.0)` without a session, `None` while a session's duration is
    /// still unknown.
    pub progress: Option<f64>,
    pub speech_pending: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct Coordinator {
    state: PlaybackState,
    next_ticket: u64,
    page: usize,
    page_count: Option<usize>,
    text: Option<ReadingText>,
    resume_word: usize,
    pending_extraction: Option<Ticket>,
    /// In-flight speech request and the word it starts at.
    pending_speech: Option<(Ticket, usize)>,
    play_queued: bool,
    session: Option<AudioSession>,
    last_error: Option<ReaderError>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Coordinator {
            state: PlaybackState::Idle,
            next_ticket: 0,
            page: 1,
            page_count: None,
            text: None,
            resume_word: 0,
            pending_extraction: None,
            pending_speech: None,
            play_queued: false,
            session: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> Option<usize> {
        self.page_count
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_ref().map(ReadingText::as_str)
    }

    pub fn session(&self) -> Option<&AudioSession> {
        self.session.as_ref()
    }

    pub fn last_error(&self) -> Option<&ReaderError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self) -> Snapshot {
        let (elapsed, duration, progress) = match &self.session {
            Some(session) => (session.elapsed, session.duration, session.progress()),
            None => (0.0, None, Some(0.0)),
        };

        Snapshot {
            state: self.state,
            page: self.page,
            page_count: self.page_count,
            elapsed,
            duration,
            progress,
            speech_pending: self.pending_speech.is_some(),
            error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    // -- document and page context -----------------------------------------

    /// A new document was selected: drop everything tied to the old one and
    /// extract its first page.
    pub fn load_document(&mut self) -> Outcome {
        let mut effects = self.clear_context();
        self.page = 1;
        self.page_count = None;
        self.last_error = None;
        effects.push(self.begin_extraction());
        Outcome::effects(effects)
    }

    /// Move to `page` (1-based), stopping playback and re-extracting.
    pub fn change_page(&mut self, page: usize) -> Outcome {
        if self.state == PlaybackState::Idle {
            return Outcome::error(ReaderError::invalid("change page", self.state));
        }

        if let Some(page_count) = self.page_count {
            if page == 0 || page > page_count {
                return Outcome::error(ReaderError::PageOutOfRange { page, page_count });
            }
        } else if page == 0 {
            return Outcome::error(ReaderError::PageOutOfRange {
                page,
                page_count: 0,
            });
        }

        let mut effects = self.clear_context();
        self.page = page;
        self.last_error = None;
        effects.push(self.begin_extraction());
        Outcome::effects(effects)
    }

    pub fn next_page(&mut self) -> Outcome {
        self.change_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> Outcome {
        self.change_page(self.page.saturating_sub(1))
    }

    pub fn extraction_finished(&mut self, ticket: Ticket, outcome: ExtractionOutcome) -> Outcome {
        if self.pending_extraction != Some(ticket) {
            return Outcome::default();
        }
        self.pending_extraction = None;

        if outcome.page_count.is_some() {
            self.page_count = outcome.page_count;
        }

        match outcome.text {
            Ok(text) => {
                self.text = Some(ReadingText::new(text));
                self.resume_word = 0;
                self.state = PlaybackState::Ready;
                self.last_error = None;

                if std::mem::take(&mut self.play_queued) {
                    let request = self.request_speech();
                    return Outcome::effects(vec![request]);
                }
                Outcome::default()
            }
            Err(error) => {
                self.text = None;
                self.play_queued = false;
                self.state = PlaybackState::Error;
                self.last_error = Some(error.clone());
                Outcome::error(error)
            }
        }
    }

    /// Release everything and return to `Idle`.
    pub fn reset(&mut self) -> Outcome {
        let effects = self.clear_context();
        self.state = PlaybackState::Idle;
        self.page = 1;
        self.page_count = None;
        self.last_error = None;
        Outcome::effects(effects)
    }

    // -- playback controls -------------------------------------------------

    pub fn play(&mut self) -> Outcome {
        match self.state {
            PlaybackState::Extracting => {
                self.play_queued = true;
                Outcome::default()
            }
            PlaybackState::Ready if self.pending_speech.is_some() => Outcome::default(),
            PlaybackState::Ready => {
                let request = self.request_speech();
                Outcome::effects(vec![request])
            }
            PlaybackState::Paused => self.resume(),
            state => Outcome::error(ReaderError::invalid("play", state)),
        }
    }

    pub fn pause(&mut self) -> Outcome {
        match (self.state, self.session.as_mut()) {
            (PlaybackState::Playing, Some(session)) => {
                session.paused = true;
                self.state = PlaybackState::Paused;
                Outcome::effects(vec![Effect::PauseAudio {
                    session: session.ticket,
                }])
            }
            (state, _) => Outcome::error(ReaderError::invalid("pause", state)),
        }
    }

    pub fn resume(&mut self) -> Outcome {
        match (self.state, self.session.as_mut()) {
            (PlaybackState::Paused, Some(session)) => {
                session.paused = false;
                self.state = PlaybackState::Playing;
                Outcome::effects(vec![Effect::ResumeAudio {
                    session: session.ticket,
                    offset: session.elapsed,
                }])
            }
            (state, _) => Outcome::error(ReaderError::invalid("resume", state)),
        }
    }

    /// Stop playback. Also cancels a speech request that has not answered yet.
    pub fn stop(&mut self) -> Outcome {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.session = None;
                self.resume_word = 0;
                self.state = PlaybackState::Ready;
                Outcome::effects(vec![Effect::ReleaseAudio])
            }
            PlaybackState::Ready if self.pending_speech.is_some() => {
                self.pending_speech = None;
                Outcome::default()
            }
            state => Outcome::error(ReaderError::invalid("stop", state)),
        }
    }

    /// Move the playback position by `delta` seconds, clamped to the audio.
    pub fn seek(&mut self, delta: f64) -> Outcome {
        let Some(session) = self.session.as_mut() else {
            return Outcome::error(ReaderError::invalid("seek", self.state));
        };

        let offset = session.seek_by(delta);
        if self.state == PlaybackState::Playing {
            Outcome::effects(vec![Effect::SeekAudio {
                session: session.ticket,
                offset,
            }])
        } else {
            Outcome::default()
        }
    }

    /// The speech backend changed: drop audio and requests made with the
    /// old one. The page text is kept, so reading starts over from its
    /// first word.
    pub fn speech_source_changed(&mut self) -> Outcome {
        let mut effects = Vec::new();
        if self.session.take().is_some() {
            effects.push(Effect::ReleaseAudio);
        }
        self.pending_speech = None;
        self.resume_word = 0;
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.state = PlaybackState::Ready;
        }
        Outcome::effects(effects)
    }

    // -- asynchronous completions -----------------------------------------

    pub fn speech_finished(
        &mut self,
        ticket: Ticket,
        result: Result<SpeechAudio, ReaderError>,
    ) -> Outcome {
        let start_word = match self.pending_speech {
            Some((pending, start_word)) if pending == ticket => start_word,
            _ => return Outcome::default(),
        };
        self.pending_speech = None;

        let audio = match result {
            Ok(audio) if !audio.locator.trim().is_empty() => audio,
            Ok(_) => {
                return self.speech_failed(ReaderError::SpeechGeneration(
                    "response did not include an audio file".to_string(),
                ))
            }
            Err(error) => return self.speech_failed(error),
        };

        let mut effects = Vec::new();
        if self.session.take().is_some() {
            effects.push(Effect::ReleaseAudio);
        }

        let session = AudioSession::new(ticket, audio, start_word);
        effects.push(Effect::AcquireAudio {
            session: ticket,
            locator: session.locator.clone(),
            offset: 0.0,
        });
        if session.duration.is_none() {
            effects.push(Effect::MeasureDuration {
                session: ticket,
                locator: session.locator.clone(),
            });
        }

        self.session = Some(session);
        self.state = PlaybackState::Playing;
        self.last_error = None;
        Outcome::effects(effects)
    }

    /// The audio resource reported its duration.
    pub fn metadata_loaded(&mut self, session: Ticket, duration: f64) {
        if let Some(current) = self.current_session(session) {
            current.set_duration(duration);
        }
    }

    /// Periodic position sample from the player.
    pub fn sample(&mut self, session: Ticket, position: f64) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(current) = self.current_session(session) {
            current.elapsed = current.clamp(position);
        }
    }

    /// The audio played to its end.
    pub fn audio_ended(&mut self, session: Ticket) -> Outcome {
        if self.current_session(session).is_none() {
            return Outcome::default();
        }
        self.session = None;
        self.resume_word = 0;
        self.state = PlaybackState::Ready;
        Outcome::effects(vec![Effect::ReleaseAudio])
    }

    /// The audio resource failed mid-playback. The approximate word reached
    /// is kept so the next `play` only asks for the rest of the text.
    pub fn audio_failed(&mut self, session: Ticket, reason: impl Into<String>) -> Outcome {
        let Some(current) = self.current_session(session) else {
            return Outcome::default();
        };

        let fraction = current.progress().unwrap_or(0.0);
        let start_word = current.start_word;
        self.resume_word = self
            .text
            .as_ref()
            .map_or(0, |text| text.word_at(start_word, fraction));

        self.session = None;
        self.state = PlaybackState::Ready;
        let error = ReaderError::PlaybackResource(reason.into());
        self.last_error = Some(error.clone());
        Outcome {
            effects: vec![Effect::ReleaseAudio],
            error: Some(error),
        }
    }

    // -- internals ---------------------------------------------------------

    fn issue(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn begin_extraction(&mut self) -> Effect {
        let ticket = self.issue();
        self.pending_extraction = Some(ticket);
        self.state = PlaybackState::Extracting;
        Effect::ExtractPage {
            ticket,
            page: self.page,
        }
    }

    fn request_speech(&mut self) -> Effect {
        let (text, start_word) = match &self.text {
            Some(text) if self.resume_word < text.word_count() => {
                (text.remaining_from(self.resume_word), self.resume_word)
            }
            Some(text) => (text.remaining_from(0), 0),
            None => (String::new(), 0),
        };

        let ticket = self.issue();
        self.pending_speech = Some((ticket, start_word));
        Effect::RequestSpeech { ticket, text }
    }

    fn speech_failed(&mut self, error: ReaderError) -> Outcome {
        self.last_error = Some(error.clone());
        Outcome::error(error)
    }

    fn current_session(&mut self, ticket: Ticket) -> Option<&mut AudioSession> {
        self.session.as_mut().filter(|s| s.ticket == ticket)
    }

    /// Drop the session, pending requests and cached text.
    fn clear_context(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.session.take().is_some() {
            effects.push(Effect::ReleaseAudio);
        }
        self.pending_extraction = None;
        self.pending_speech = None;
        self.play_queued = false;
        self.text = None;
        self.resume_word = 0;
        effects
    }
}
