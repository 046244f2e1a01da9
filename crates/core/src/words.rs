//! Word-level bookkeeping for the text being read.

/// The text of the current reading scope and its word sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingText {
    text: String,
    words: Vec<String>,
}

impl ReadingText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let words = text.split_whitespace().map(str::to_string).collect();
        ReadingText { text, words }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Words from `index` onward, joined with single spaces.
    ///
    /// An index at or past the end yields the whole text again so a finished
    /// page can be replayed.
    pub fn remaining_from(&self, index: usize) -> String {
        if index == 0 || index >= self.words.len() {
            return self.words.join(" ");
        }
        self.words[index..].join(" ")
    }

    /// Approximate word position reached after reading `fraction` of the
    /// audio generated from the words starting at `start`.
    pub fn word_at(&self, start: usize, fraction: f64) -> usize {
        let start = start.min(self.words.len());
        let spoken = (self.words.len() - start) as f64 * fraction.clamp(0.0, 1.0);
        (start + spoken.floor() as usize).min(self.words.len())
    }
}
