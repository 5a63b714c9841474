//! Error types for Quran Search

use crate::corpus::CorpusSource;
use thiserror::Error;

/// Fatal corpus load failures. No engine exists without a valid corpus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("{present_in} source has verse {chapter}:{verse} but the other script does not")]
    KeyMismatch {
        chapter: u32,
        verse: u32,
        present_in: CorpusSource,
    },

    #[error("malformed {origin} source at line {line}: {reason}")]
    Malformed {
        origin: CorpusSource,
        line: usize,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorpusError {
    #[error("Invalid chapter number {0}. Must be between 1-114")]
    ChapterOutOfRange(u32),

    #[error("Invalid verse {verse} for chapter {chapter}")]
    VerseOutOfRange { chapter: u32, verse: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid query: nothing to search for")]
    Empty,
}

/// Validation failures raised while evaluating a query. "No results" is not one of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("Invalid chapter number {0}. Must be between 1-114")]
    ChapterOutOfRange(u32),

    #[error("Verse {first} is past the end of chapter {chapter}, which has {verse_count} verses")]
    EmptyRange {
        chapter: u32,
        first: u32,
        verse_count: u32,
    },

    #[error("Invalid query: nothing to search for")]
    Empty,
}

#[derive(Error, Debug)]
pub enum QuranSearchError {
    #[error("Corpus error: {0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Corpus(#[from] CorpusError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Exec(#[from] ExecError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuranSearchError {
    /// Recoverable errors are the user's to fix; everything else is an environment problem.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            QuranSearchError::Parse(_) | QuranSearchError::Exec(_) | QuranSearchError::Corpus(_)
        )
    }
}

impl From<rusqlite::Error> for QuranSearchError {
    fn from(err: rusqlite::Error) -> Self {
        QuranSearchError::Storage(err.to_string())
    }
}

impl serde::Serialize for QuranSearchError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
