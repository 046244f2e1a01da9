use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::PlaybackState;

/// Every failure the reader can surface to the user.
///
/// None of these are fatal: the coordinator always settles in `Ready` or
/// `Error` after reporting one, and the user retries by hand.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ReaderError {
    #[error("Could not read the document: {0}")]
    Decode(String),

    #[error("No readable text found on this page")]
    NoExtractableText,

    #[error("Error generating speech: {0}")]
    SpeechGeneration(String),

    #[error("Audio playback failed: {0}")]
    PlaybackResource(String),

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: String,
        state: PlaybackState,
    },
}

impl ReaderError {
    pub fn invalid(operation: &str, state: PlaybackState) -> Self {
        ReaderError::InvalidTransition {
            operation: operation.to_string(),
            state,
        }
    }
}
