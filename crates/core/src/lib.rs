//! Core library for readaloud
//!
//! This crate implements the **Functional Core** of the readaloud application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`readaloud_core`** (this crate): state machine and transformations with zero I/O
//! - **`pdf`**: text extraction from PDF documents
//! - **`readaloud`**: I/O and orchestration (the Imperative Shell): speech
//!   sources, the audio player, the terminal reader loop
//!
//! The playback [`playback::Coordinator`] never performs I/O itself. It hands
//! back [`playback::Effect`]s for the shell to execute and is told about
//! completions afterwards, so every transition can be tested with plain
//! values.
//!
//! # Module Organization
//!
//! - [`playback`]: coordinator state machine, audio sessions, tickets
//! - [`words`]: the text being read and its word positions
//! - [`command`]: interactive command parsing
//! - [`murf`]: Murf speech API payloads
//! - [`audio`]: WAV header inspection
//! - [`status`]: status line and control availability
//!
//! # Example Usage
//!
//! ```rust
//! use readaloud_core::playback::{Coordinator, Effect, ExtractionOutcome, PlaybackState};
//!
//! let mut coordinator = Coordinator::new();
//! let outcome = coordinator.load_document();
//! let Effect::ExtractPage { ticket, .. } = outcome.effects[0].clone() else {
//!     unreachable!()
//! };
//!
//! coordinator.extraction_finished(
//!     ticket,
//!     ExtractionOutcome {
//!         page_count: Some(1),
//!         text: Ok("Hello world".to_string()),
//!     },
//! );
//! assert_eq!(coordinator.state(), PlaybackState::Ready);
//! ```

pub mod audio;
pub mod command;
pub mod error;
pub mod murf;
pub mod playback;
pub mod status;
pub mod words;

pub use error::ReaderError;
