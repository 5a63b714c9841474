//! Application state management

use crate::config::EngineSettings;
use crate::corpus::Corpus;
use crate::search::SearchEngine;
use crate::settings::HistoryStore;
use crate::stream::ResultStreamer;
use crate::session::SearchSession;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;

/// Application state holding the loaded corpus, search engine and settings paths
pub struct AppState {
    pub search_engine: Arc<SearchEngine>,
    pub settings: EngineSettings,
    pub data_dir: PathBuf,
    pub settings_db_path: PathBuf,
}

impl AppState {
    /// Load the corpus named by `settings`. Any load error is fatal.
    pub fn new(settings: EngineSettings) -> Result<Self> {
        let data_dir = settings.data_dir();
        let settings_db_path = settings.history_db();
        let corpus = Self::load_corpus(&data_dir, &settings)?;

        let search_engine = Arc::new(SearchEngine::new(
            Arc::new(corpus),
            settings.cache_capacity,
        ));

        Ok(Self {
            search_engine,
            settings,
            data_dir,
            settings_db_path,
        })
    }

    fn load_corpus(data_dir: &Path, settings: &EngineSettings) -> Result<Corpus> {
        let start = Instant::now();
        let uthmani_path = data_dir.join(&settings.uthmani_file);
        let simplified_path = data_dir.join(&settings.simplified_file);

        let uthmani = fs::read_to_string(&uthmani_path)
            .with_context(|| format!("Failed to read {}", uthmani_path.display()))?;
        let simplified = fs::read_to_string(&simplified_path)
            .with_context(|| format!("Failed to read {}", simplified_path.display()))?;

        let mut corpus = Corpus::load(&uthmani, &simplified)
            .with_context(|| format!("Failed to load corpus from {}", data_dir.display()))?;

        let chapters_path = data_dir.join(&settings.chapters_file);
        if chapters_path.exists() {
            let names = fs::read_to_string(&chapters_path)
                .with_context(|| format!("Failed to read {}", chapters_path.display()))?;
            corpus = corpus
                .with_chapter_names(&names)
                .context("Failed to load chapter names")?;
        } else {
            tracing::debug!("No chapter names at {}", chapters_path.display());
        }

        tracing::info!(
            "Loaded {} verses in {} chapters from {} in {:?}",
            corpus.len(),
            corpus.chapter_count(),
            data_dir.display(),
            start.elapsed()
        );
        Ok(corpus)
    }

    /// A fresh consumer session delivering on `runtime`.
    pub fn session(&self, runtime: Handle) -> SearchSession {
        SearchSession::new(ResultStreamer::new(
            Arc::clone(&self.search_engine),
            runtime,
            self.settings.stream_options(),
        ))
    }

    /// Open (creating if needed) the settings database
    pub fn history_store(&self) -> Result<HistoryStore> {
        HistoryStore::open(&self.settings_db_path).with_context(|| {
            format!(
                "Failed to open settings database {}",
                self.settings_db_path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::fixtures;

    fn write_corpus(dir: &Path, with_names: bool) {
        let (uthmani, simplified, names) = fixtures::sources();
        fs::write(dir.join("uthmani.txt"), uthmani).unwrap();
        fs::write(dir.join("simplified.txt"), simplified).unwrap();
        if with_names {
            fs::write(dir.join("chapters.txt"), names).unwrap();
        }
    }

    fn settings(dir: &Path) -> EngineSettings {
        EngineSettings {
            data_dir: Some(dir.to_path_buf()),
            ..EngineSettings::default()
        }
    }

    #[test]
    fn test_loads_corpus_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), true);

        let state = AppState::new(settings(dir.path())).unwrap();
        let corpus = state.search_engine.corpus();
        assert_eq!(corpus.chapter_count(), 114);
        assert_eq!(corpus.chapter_name(1), Some("سورة 1"));
        assert_eq!(state.settings_db_path, dir.path().join("settings.db"));
        assert!(state.history_store().is_ok());
    }

    #[test]
    fn test_chapter_names_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), false);

        let state = AppState::new(settings(dir.path())).unwrap();
        assert_eq!(state.search_engine.corpus().chapter_name(1), None);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppState::new(settings(dir.path())).err().unwrap();
        assert!(err.to_string().contains("uthmani.txt"));
    }

    #[test]
    fn test_invalid_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), false);
        fs::write(dir.path().join("simplified.txt"), "1|1|بسم الله\n").unwrap();
        assert!(AppState::new(settings(dir.path())).is_err());
    }
}
