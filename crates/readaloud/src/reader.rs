//! The interactive reader.
//!
//! [`Reader`] owns the coordinator and performs the effects it asks for:
//! file reads and speech requests and duration lookups on tasks, extraction
//! on the blocking pool, and one player process at a time. Every completion comes back as
//! an [`Event`] on a single channel so the coordinator is only ever touched
//! from the reader loop.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempPath;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use readaloud_core::command::{parse_command, Command, SpeechBackend, HELP};
use readaloud_core::playback::{
    Coordinator, Effect, ExtractionOutcome, Outcome, PlaybackState, Snapshot, Ticket,
};

use crate::document::LoadedDocument;
use crate::player::{AudioPlayer, Playback, PlayerExit};
use crate::prelude::*;
use crate::speech::{GeneratedSpeech, SpeechSource};
use crate::view::View;

/// Completion of work started on the coordinator's behalf.
#[derive(Debug)]
pub enum Event {
    Loaded {
        result: Result<LoadedDocument>,
    },
    Extracted {
        ticket: Ticket,
        outcome: ExtractionOutcome,
    },
    Speech {
        ticket: Ticket,
        result: Result<GeneratedSpeech, ReaderError>,
    },
    Duration {
        session: Ticket,
        seconds: f64,
    },
    /// `playback` identifies the player process, which changes on every
    /// pause, resume and seek of the same session.
    Sample {
        session: Ticket,
        playback: u64,
        position: f64,
    },
    AudioExit {
        session: Ticket,
        playback: u64,
        exit: PlayerExit,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The player process plus the tasks watching it.
struct ActiveAudio {
    id: u64,
    _playback: Playback,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for ActiveAudio {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// The part of the snapshot that warrants a new status line.
type StatusKey = (PlaybackState, usize, Option<usize>, bool, Option<String>);

pub struct Reader<S, P, V> {
    coordinator: Coordinator,
    speech: S,
    player: P,
    view: V,
    document: Option<Arc<LoadedDocument>>,
    audio: Option<ActiveAudio>,
    playbacks: u64,
    /// Files being read for `open`.
    opening: usize,
    /// Temporary file backing the current session's audio.
    scratch: Option<TempPath>,
    /// Speech requests and duration lookups for the current page.
    requests: Vec<JoinHandle<()>>,
    sample_every: Duration,
    shown: Option<StatusKey>,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
}

impl<S: SpeechSource, P: AudioPlayer, V: View> Reader<S, P, V> {
    pub fn new(speech: S, player: P, view: V, sample_every: Duration) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Reader {
            coordinator: Coordinator::new(),
            speech,
            player,
            view,
            document: None,
            audio: None,
            playbacks: 0,
            opening: 0,
            scratch: None,
            requests: Vec::new(),
            sample_every,
            shown: None,
            events_tx,
            events_rx,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.coordinator.snapshot()
    }

    /// Load a new document and start extracting its first page. A file that
    /// cannot be read leaves the current document in place.
    pub async fn open(&mut self, path: &Path) -> Result<()> {
        let document = LoadedDocument::read(path).await?;
        self.install(document);
        Ok(())
    }

    fn install(&mut self, document: LoadedDocument) {
        log::info!(
            "Opened {} ({} bytes)",
            document.path().display(),
            document.bytes().len()
        );
        self.view.message(&f!("Opened {}", document.path().display()));

        self.document = Some(Arc::new(document));
        let outcome = self.coordinator.load_document();
        self.apply(outcome);
    }

    pub fn handle(&mut self, command: Command) -> Flow {
        log::debug!("command {:?} in state {}", command, self.coordinator.state());
        let outcome = match command {
            Command::Play => self.coordinator.play(),
            Command::Pause => self.coordinator.pause(),
            Command::Resume => self.coordinator.resume(),
            Command::Stop => self.coordinator.stop(),
            Command::Seek(delta) => self.coordinator.seek(delta),
            Command::Next => self.coordinator.next_page(),
            Command::Previous => self.coordinator.previous_page(),
            Command::Page(page) => self.coordinator.change_page(page),
            Command::Open(path) => {
                let events = self.events_tx.clone();
                self.opening += 1;
                tokio::spawn(async move {
                    let result = LoadedDocument::read(Path::new(&path)).await;
                    let _ = events.send(Event::Loaded { result });
                });
                return Flow::Continue;
            }
            Command::Backend(backend) => {
                self.switch_speech(backend);
                return Flow::Continue;
            }
            Command::Text => {
                match self.coordinator.text() {
                    Some(text) => self.view.message(text),
                    None => self.view.message("No text has been extracted for this page."),
                }
                return Flow::Continue;
            }
            Command::Status => {
                self.view.status(&self.coordinator.snapshot());
                return Flow::Continue;
            }
            Command::Help => {
                self.view.message(HELP);
                return Flow::Continue;
            }
            Command::Quit => {
                let outcome = self.coordinator.reset();
                self.apply(outcome);
                self.cancel_requests();
                return Flow::Quit;
            }
        };

        self.apply(outcome);
        Flow::Continue
    }

    pub async fn next_event(&mut self) -> Option<Event> {
        self.events_rx.recv().await
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Loaded { result } => {
                self.opening = self.opening.saturating_sub(1);
                match result {
                    Ok(document) => self.install(document),
                    Err(e) => {
                        log::warn!("{:#}", e);
                        self.view.error(&e);
                    }
                }
            }
            Event::Extracted { ticket, outcome } => {
                let outcome = self.coordinator.extraction_finished(ticket, outcome);
                self.apply(outcome);
            }
            Event::Speech { ticket, result } => {
                let (result, scratch) = match result {
                    Ok(speech) => (Ok(speech.audio), speech.scratch),
                    Err(e) => (Err(e), None),
                };
                let outcome = self.coordinator.speech_finished(ticket, result);
                self.apply(outcome);

                // Keep the file only if it became the playing session.
                if self.is_current_session(ticket) {
                    self.scratch = scratch;
                }
            }
            Event::Duration { session, seconds } => {
                self.coordinator.metadata_loaded(session, seconds);
                self.refresh();
            }
            Event::Sample {
                session,
                playback,
                position,
            } => {
                if self.is_current_playback(playback) {
                    self.coordinator.sample(session, position);
                    self.view.progress(&self.coordinator.snapshot());
                }
            }
            Event::AudioExit {
                session,
                playback,
                exit,
            } => {
                if !self.is_current_playback(playback) {
                    return;
                }
                let outcome = match exit {
                    PlayerExit::Ended => self.coordinator.audio_ended(session),
                    PlayerExit::Failed(reason) => self.coordinator.audio_failed(session, reason),
                };
                self.apply(outcome);
            }
        }
    }

    /// Read commands from `input` until `quit`. When the input closes, the
    /// reader keeps going until nothing is playing or pending.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        let mut input_open = true;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        self.view.message("Type `help` for the list of commands.");

        loop {
            if !input_open && !self.busy() {
                break;
            }

            tokio::select! {
                line = lines.next_line(), if input_open => {
                    let Some(line) = line? else {
                        log::debug!("input closed");
                        input_open = false;
                        continue;
                    };
                    match parse_command(&line) {
                        Ok(Some(command)) => {
                            if self.handle(command) == Flow::Quit {
                                return Ok(());
                            }
                        }
                        Ok(None) => {}
                        Err(e) => self.view.error(&e),
                    }
                }
                Some(event) = self.next_event() => self.handle_event(event),
                _ = &mut ctrl_c => break,
            }
        }

        self.handle(Command::Quit);
        Ok(())
    }

    fn busy(&self) -> bool {
        let snapshot = self.snapshot();
        self.opening > 0
            || snapshot.speech_pending
            || matches!(
                snapshot.state,
                PlaybackState::Extracting | PlaybackState::Playing
            )
    }

    /// Route later speech requests to `backend`. Audio made by the old
    /// backend is released and in-flight requests are dropped.
    fn switch_speech(&mut self, backend: SpeechBackend) {
        if self.speech.backend() == backend {
            self.view.message(&f!("Already using {} speech", backend));
            return;
        }
        if let Err(e) = self.speech.select(backend) {
            log::warn!("{}", e);
            self.view.error(&e);
            return;
        }

        log::info!("Speech backend is now {}", backend);
        self.cancel_requests();
        let outcome = self.coordinator.speech_source_changed();
        self.apply(outcome);
        self.view.message(&f!("Switched to {} speech", backend));
    }

    fn apply(&mut self, outcome: Outcome) {
        let mut pending = VecDeque::from([outcome]);
        while let Some(outcome) = pending.pop_front() {
            if let Some(error) = &outcome.error {
                log::warn!("{}", error);
                self.view.error(error);
            }
            for effect in outcome.effects {
                if let Some(follow_up) = self.execute(effect) {
                    pending.push_back(follow_up);
                }
            }
        }
        self.refresh();
    }

    fn execute(&mut self, effect: Effect) -> Option<Outcome> {
        log::trace!("effect {:?}", effect);
        match effect {
            Effect::ExtractPage { ticket, page } => {
                self.cancel_requests();
                self.extract(ticket, page);
                None
            }
            Effect::RequestSpeech { ticket, text } => {
                self.request_speech(ticket, text);
                None
            }
            Effect::AcquireAudio {
                session,
                locator,
                offset,
            } => self.start_audio(session, &locator, offset),
            Effect::MeasureDuration { session, locator } => {
                self.measure_duration(session, locator);
                None
            }
            Effect::PauseAudio { .. } => {
                self.audio = None;
                None
            }
            Effect::ResumeAudio { session, offset } | Effect::SeekAudio { session, offset } => {
                let locator = self.coordinator.session()?.locator().to_string();
                self.start_audio(session, &locator, offset)
            }
            Effect::ReleaseAudio => {
                self.audio = None;
                self.scratch = None;
                None
            }
        }
    }

    fn extract(&mut self, ticket: Ticket, page: usize) {
        let events = self.events_tx.clone();
        let Some(document) = self.document.clone() else {
            let _ = events.send(Event::Extracted {
                ticket,
                outcome: ExtractionOutcome {
                    page_count: None,
                    text: Err(ReaderError::Decode("no document is open".to_string())),
                },
            });
            return;
        };

        tokio::task::spawn_blocking(move || {
            let outcome = document.extract(page);
            let _ = events.send(Event::Extracted { ticket, outcome });
        });
    }

    fn request_speech(&mut self, ticket: Ticket, text: String) {
        log::info!("Requesting speech {} ({} words)", ticket, text.split_whitespace().count());
        let events = self.events_tx.clone();
        let generation = self.speech.generate(text);
        self.track(tokio::spawn(async move {
            let result = generation.await;
            let _ = events.send(Event::Speech { ticket, result });
        }));
    }

    fn measure_duration(&mut self, session: Ticket, locator: String) {
        let events = self.events_tx.clone();
        let measure = self.player.measure(locator);
        self.track(tokio::spawn(async move {
            if let Some(seconds) = measure.await {
                let _ = events.send(Event::Duration { session, seconds });
            }
        }));
    }

    fn start_audio(&mut self, session: Ticket, locator: &str, offset: f64) -> Option<Outcome> {
        self.audio = None;

        let (playback, exit) = match self.player.start(locator, offset) {
            Ok(started) => started,
            Err(error) => {
                let reason = match error {
                    ReaderError::PlaybackResource(reason) => reason,
                    other => other.to_string(),
                };
                return Some(self.coordinator.audio_failed(session, reason));
            }
        };

        self.playbacks += 1;
        let id = self.playbacks;

        let events = self.events_tx.clone();
        let watcher = tokio::spawn(async move {
            if let Ok(exit) = exit.await {
                let _ = events.send(Event::AudioExit {
                    session,
                    playback: id,
                    exit,
                });
            }
        });

        let events = self.events_tx.clone();
        let (started, offset) = playback.clock();
        let every = self.sample_every;
        let sampler = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let position = offset + started.elapsed().as_secs_f64();
                let sample = Event::Sample {
                    session,
                    playback: id,
                    position,
                };
                if events.send(sample).is_err() {
                    break;
                }
            }
        });

        self.audio = Some(ActiveAudio {
            id,
            _playback: playback,
            tasks: vec![watcher, sampler],
        });
        None
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.requests.retain(|task| !task.is_finished());
        self.requests.push(task);
    }

    fn cancel_requests(&mut self) {
        for task in self.requests.drain(..) {
            task.abort();
        }
    }

    fn is_current_playback(&self, playback: u64) -> bool {
        self.audio.as_ref().is_some_and(|audio| audio.id == playback)
    }

    fn is_current_session(&self, ticket: Ticket) -> bool {
        self.coordinator
            .session()
            .is_some_and(|session| session.ticket() == ticket)
    }

    /// Print a status line when something other than the clock changed.
    fn refresh(&mut self) {
        let snapshot = self.snapshot();
        let key = (
            snapshot.state,
            snapshot.page,
            snapshot.page_count,
            snapshot.speech_pending,
            snapshot.error.clone(),
        );
        if self.shown.as_ref() != Some(&key) {
            self.view.status(&snapshot);
            self.shown = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::io::Write;
    use std::sync::Mutex;

    use readaloud_core::playback::SpeechAudio;
    use tokio::sync::oneshot;

    use super::*;
    use crate::document::tests::fixture_pdf;

    #[derive(Clone)]
    struct MockSpeech {
        requests: Arc<Mutex<Vec<String>>>,
        /// Backend each request went to.
        served_by: Arc<Mutex<Vec<SpeechBackend>>>,
        backend: SpeechBackend,
        murf_available: bool,
        delay: Duration,
        fail: bool,
    }

    impl Default for MockSpeech {
        fn default() -> Self {
            MockSpeech {
                requests: Arc::default(),
                served_by: Arc::default(),
                backend: SpeechBackend::Local,
                murf_available: true,
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    impl SpeechSource for MockSpeech {
        fn generate(
            &self,
            text: String,
        ) -> impl Future<Output = Result<GeneratedSpeech, ReaderError>> + Send + 'static {
            self.requests.lock().unwrap().push(text.clone());
            self.served_by.lock().unwrap().push(self.backend);
            let (delay, fail) = (self.delay, self.fail);
            async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return Err(ReaderError::SpeechGeneration("voice unavailable".to_string()));
                }
                Ok(GeneratedSpeech::remote(SpeechAudio {
                    locator: format!("mock://{}-words", text.split_whitespace().count()),
                    duration_hint: Some(10.0),
                }))
            }
        }

        fn backend(&self) -> SpeechBackend {
            self.backend
        }

        fn select(&mut self, backend: SpeechBackend) -> Result<(), ReaderError> {
            if backend == SpeechBackend::Murf && !self.murf_available {
                return Err(ReaderError::SpeechGeneration("MURF_API_KEY is not set".to_string()));
            }
            self.backend = backend;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockPlayer {
        starts: Arc<Mutex<Vec<(String, f64)>>>,
        exits: Arc<Mutex<Vec<oneshot::Sender<PlayerExit>>>>,
        ends_at_once: bool,
        broken: bool,
    }

    impl MockPlayer {
        fn finish(&self, exit: PlayerExit) {
            let sender = self.exits.lock().unwrap().pop().unwrap();
            sender.send(exit).unwrap();
        }

        fn starts(&self) -> Vec<(String, f64)> {
            self.starts.lock().unwrap().clone()
        }
    }

    impl AudioPlayer for MockPlayer {
        fn start(
            &self,
            locator: &str,
            offset: f64,
        ) -> Result<(Playback, oneshot::Receiver<PlayerExit>), ReaderError> {
            if self.broken {
                return Err(ReaderError::PlaybackResource("no audio device".to_string()));
            }
            self.starts.lock().unwrap().push((locator.to_string(), offset));

            let (cancel, _) = oneshot::channel();
            let (exit_tx, exit_rx) = oneshot::channel();
            if self.ends_at_once {
                let _ = exit_tx.send(PlayerExit::Ended);
            } else {
                self.exits.lock().unwrap().push(exit_tx);
            }
            Ok((Playback::new(offset, cancel), exit_rx))
        }

        fn measure(&self, _locator: String) -> impl Future<Output = Option<f64>> + Send + 'static {
            async { None }
        }
    }

    #[derive(Default)]
    struct RecordingView {
        statuses: Vec<PlaybackState>,
        messages: Vec<String>,
        errors: Vec<String>,
    }

    impl View for RecordingView {
        fn status(&mut self, snapshot: &Snapshot) {
            self.statuses.push(snapshot.state);
        }

        fn progress(&mut self, _snapshot: &Snapshot) {}

        fn error(&mut self, error: &dyn std::fmt::Display) {
            self.errors.push(error.to_string());
        }

        fn message(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }
    }

    type TestReader = Reader<MockSpeech, MockPlayer, RecordingView>;

    fn reader(speech: &MockSpeech, player: &MockPlayer) -> TestReader {
        Reader::new(
            speech.clone(),
            player.clone(),
            RecordingView::default(),
            Duration::from_secs(3600),
        )
    }

    fn fixture_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let bytes = fixture_pdf(&[&["Hello", "world"], &["Second", "page"], &["Third"]]);
        file.write_all(&bytes).unwrap();
        file
    }

    /// Feed events until `done` holds.
    async fn settle(reader: &mut TestReader, done: impl Fn(&Snapshot) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(&reader.snapshot()) {
                let event = reader.next_event().await.unwrap();
                reader.handle_event(event);
            }
        })
        .await
        .unwrap();
    }

    /// Feed whatever events arrive within `window`.
    async fn drain(reader: &mut TestReader, window: Duration) {
        let _ = tokio::time::timeout(window, async {
            while let Some(event) = reader.next_event().await {
                reader.handle_event(event);
            }
        })
        .await;
    }

    fn is(state: PlaybackState) -> impl Fn(&Snapshot) -> bool {
        move |snapshot| snapshot.state == state
    }

    #[tokio::test]
    async fn test_open_and_play_current_page() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        settle(&mut reader, is(PlaybackState::Ready)).await;
        assert_eq!(reader.snapshot().page_count, Some(3));

        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        assert_eq!(*speech.requests.lock().unwrap(), ["Hello world"]);
        assert_eq!(player.starts(), [("mock://2-words".to_string(), 0.0)]);
        assert_eq!(reader.snapshot().duration, Some(10.0));
        assert_eq!(reader.view.statuses.first(), Some(&PlaybackState::Extracting));
        assert_eq!(reader.view.statuses.last(), Some(&PlaybackState::Playing));
    }

    #[tokio::test]
    async fn test_play_while_extracting_starts_once_ready() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        assert_eq!(reader.snapshot().state, PlaybackState::Extracting);
        reader.handle(Command::Play);

        settle(&mut reader, is(PlaybackState::Playing)).await;
        assert_eq!(speech.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_play_sends_one_request() {
        let speech = MockSpeech {
            delay: Duration::from_millis(50),
            ..MockSpeech::default()
        };
        let player = MockPlayer::default();
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        settle(&mut reader, is(PlaybackState::Ready)).await;
        reader.handle(Command::Play);
        reader.handle(Command::Play);
        assert!(reader.snapshot().speech_pending);

        settle(&mut reader, is(PlaybackState::Playing)).await;
        assert_eq!(speech.requests.lock().unwrap().len(), 1);
        assert_eq!(player.starts().len(), 1);
    }

    #[tokio::test]
    async fn test_page_change_discards_pending_speech() {
        let speech = MockSpeech {
            delay: Duration::from_millis(100),
            ..MockSpeech::default()
        };
        let player = MockPlayer::default();
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        settle(&mut reader, is(PlaybackState::Ready)).await;
        reader.handle(Command::Play);
        reader.handle(Command::Next);
        settle(&mut reader, |s| s.state == PlaybackState::Ready && s.page == 2).await;

        drain(&mut reader, Duration::from_millis(300)).await;
        let snapshot = reader.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Ready);
        assert!(!snapshot.speech_pending);
        assert!(player.starts().is_empty());
        assert_eq!(reader.coordinator.text(), Some("Second page"));
    }

    #[tokio::test]
    async fn test_pause_and_resume_restart_at_position() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        let session = reader.coordinator.session().unwrap().ticket();
        reader.coordinator.sample(session, 4.0);

        reader.handle(Command::Pause);
        assert_eq!(reader.snapshot().state, PlaybackState::Paused);
        assert!(reader.audio.is_none());

        reader.handle(Command::Resume);
        assert_eq!(reader.snapshot().state, PlaybackState::Playing);
        assert_eq!(player.starts().last(), Some(&("mock://2-words".to_string(), 4.0)));
    }

    #[tokio::test]
    async fn test_seek_restarts_player() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        reader.handle(Command::Seek(6.0));
        assert_eq!(player.starts().last(), Some(&("mock://2-words".to_string(), 6.0)));
    }

    #[tokio::test]
    async fn test_natural_end_returns_to_ready() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        player.finish(PlayerExit::Ended);
        settle(&mut reader, is(PlaybackState::Ready)).await;
        assert!(reader.audio.is_none());
        assert!(reader.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_player_failure_reports_error() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        player.finish(PlayerExit::Failed("device lost".to_string()));
        settle(&mut reader, is(PlaybackState::Ready)).await;
        assert!(reader.view.errors.iter().any(|e| e.contains("device lost")));
    }

    #[tokio::test]
    async fn test_player_that_cannot_start() {
        let speech = MockSpeech::default();
        let player = MockPlayer {
            broken: true,
            ..MockPlayer::default()
        };
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, |s| s.error.is_some()).await;

        assert_eq!(reader.snapshot().state, PlaybackState::Ready);
        assert!(reader.view.errors.iter().any(|e| e.contains("no audio device")));
    }

    #[tokio::test]
    async fn test_speech_failure_leaves_reader_ready() {
        let speech = MockSpeech {
            fail: true,
            ..MockSpeech::default()
        };
        let player = MockPlayer::default();
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, |s| s.error.is_some()).await;

        assert_eq!(reader.snapshot().state, PlaybackState::Ready);
        assert!(reader.view.errors.iter().any(|e| e.contains("voice unavailable")));
        assert!(player.starts().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_command_is_reported() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let mut reader = reader(&speech, &player);

        assert_eq!(reader.handle(Command::Pause), Flow::Continue);
        assert_eq!(reader.view.errors, ["Cannot pause while idle"]);
    }

    #[tokio::test]
    async fn test_open_rejects_non_pdf() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"just some notes").unwrap();
        let mut reader = reader(&speech, &player);

        assert!(reader.open(file.path()).await.is_err());
        assert_eq!(reader.snapshot().state, PlaybackState::Idle);

        reader.handle(Command::Open(file.path().display().to_string()));
        assert!(reader.view.errors.is_empty());
        let event = reader.next_event().await.unwrap();
        reader.handle_event(event);

        assert_eq!(reader.view.errors.len(), 1);
        assert!(reader.view.errors[0].contains("is not a PDF file"));
        assert_eq!(reader.snapshot().state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_open_command_reads_in_the_background() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let (first, second) = (fixture_file(), fixture_file());
        let mut reader = reader(&speech, &player);

        reader.open(first.path()).await.unwrap();
        settle(&mut reader, is(PlaybackState::Ready)).await;
        reader.handle(Command::Next);
        settle(&mut reader, |s| s.state == PlaybackState::Ready && s.page == 2).await;

        reader.handle(Command::Open(second.path().display().to_string()));
        assert_eq!(reader.snapshot().page, 2);
        assert!(reader.busy());

        settle(&mut reader, |s| s.state == PlaybackState::Ready && s.page == 1).await;
        assert_eq!(reader.coordinator.text(), Some("Hello world"));
        assert!(reader.view.messages.iter().any(|m| m.starts_with("Opened")));
    }

    #[tokio::test]
    async fn test_backend_switch_stops_playback() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        assert_eq!(reader.handle(Command::Backend(SpeechBackend::Murf)), Flow::Continue);
        assert_eq!(reader.speech.backend(), SpeechBackend::Murf);
        assert_eq!(reader.snapshot().state, PlaybackState::Ready);
        assert!(reader.audio.is_none());
        assert!(reader.coordinator.session().is_none());
        assert_eq!(reader.view.messages.last().unwrap(), "Switched to murf speech");

        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;
        assert_eq!(
            *speech.served_by.lock().unwrap(),
            [SpeechBackend::Local, SpeechBackend::Murf]
        );
        assert_eq!(player.starts().len(), 2);
    }

    #[tokio::test]
    async fn test_backend_switch_drops_pending_speech() {
        let speech = MockSpeech {
            delay: Duration::from_millis(100),
            ..MockSpeech::default()
        };
        let player = MockPlayer::default();
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        settle(&mut reader, is(PlaybackState::Ready)).await;
        reader.handle(Command::Play);
        reader.handle(Command::Backend(SpeechBackend::Murf));
        assert!(!reader.snapshot().speech_pending);

        drain(&mut reader, Duration::from_millis(300)).await;
        assert_eq!(reader.snapshot().state, PlaybackState::Ready);
        assert!(player.starts().is_empty());
    }

    #[tokio::test]
    async fn test_backend_switch_refused_keeps_playing() {
        let speech = MockSpeech {
            murf_available: false,
            ..MockSpeech::default()
        };
        let player = MockPlayer::default();
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        reader.handle(Command::Backend(SpeechBackend::Murf));
        assert_eq!(reader.speech.backend(), SpeechBackend::Local);
        assert_eq!(reader.snapshot().state, PlaybackState::Playing);
        assert!(reader.view.errors.iter().any(|e| e.contains("MURF_API_KEY")));

        reader.handle(Command::Backend(SpeechBackend::Local));
        assert_eq!(reader.view.messages.last().unwrap(), "Already using local speech");
        assert!(reader.audio.is_some());
    }

    #[tokio::test]
    async fn test_quit_releases_audio() {
        let (speech, player) = (MockSpeech::default(), MockPlayer::default());
        let file = fixture_file();
        let mut reader = reader(&speech, &player);

        reader.open(file.path()).await.unwrap();
        reader.handle(Command::Play);
        settle(&mut reader, is(PlaybackState::Playing)).await;

        assert_eq!(reader.handle(Command::Quit), Flow::Quit);
        assert_eq!(reader.snapshot().state, PlaybackState::Idle);
        assert!(reader.audio.is_none());
    }

    #[tokio::test]
    async fn test_run_plays_scripted_input_to_the_end() {
        let speech = MockSpeech::default();
        let player = MockPlayer {
            ends_at_once: true,
            ..MockPlayer::default()
        };
        let file = fixture_file();
        let mut reader = reader(&speech, &player);
        reader.open(file.path()).await.unwrap();

        let input: &[u8] = b"next\nplay\n";
        tokio::time::timeout(Duration::from_secs(5), reader.run(input))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*speech.requests.lock().unwrap(), ["Second page"]);
        assert_eq!(player.starts().len(), 1);
    }
}
