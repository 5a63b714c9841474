//! Quran Search - verse lookup and text search over the Quran
//!
//! Backend library providing corpus loading, query parsing, search and
//! streamed result delivery.

pub mod normalize;
pub mod corpus;
pub mod query;
pub mod search;
pub mod highlight;
pub mod cache;
pub mod stream;
pub mod history;
pub mod session;
pub mod settings;
pub mod config;
pub mod paths;
pub mod error;
pub mod state;

pub use error::{CorpusError, ExecError, LoadError, ParseError, QuranSearchError};
pub use state::AppState;
pub use normalize::{normalize, Folding};
pub use corpus::{Corpus, CorpusSource, Script, Verse, VerseKey, CHAPTER_COUNT};
pub use query::{parse, Query};
pub use search::{execute, Match, PatternKind, ResultSet, SearchEngine, TextPattern};
pub use highlight::match_spans;
pub use cache::ResultCache;
pub use stream::{BatchSink, DeliveryOutcome, FirstBatch, ResultStreamer, StreamHandle, StreamOptions};
pub use history::{Direction, HistoryEntry, HistoryLedger, HISTORY_CAPACITY};
pub use session::{SearchSession, Submission};
pub use settings::HistoryStore;
pub use config::{ApiSettings, Config, EngineSettings};
pub use paths::{get_data_dir, get_settings_db_path};
