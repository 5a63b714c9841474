//! Query execution over the corpus

use crate::cache::ResultCache;
use crate::corpus::{Corpus, Script, Verse, VerseKey};
use crate::error::ExecError;
use crate::normalize::{normalize, Folding};
use crate::query::Query;
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

/// Score of a whole-word phrase match, and of every verse of a chapter or range.
pub const FULL_SCORE: f32 = 1.0;
/// Score of a match that only occurs inside a longer word.
pub const PARTIAL_SCORE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// `term`: anywhere in the text
    Substring,
    /// `term%`: at the start of a word
    StartsWith,
    /// `%term`: at the end of a word
    EndsWith,
    /// `%term%`: whole word(s) only
    ExactWord,
}

/// Normalized search term plus the operators written around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPattern {
    pub term: String,
    pub kind: PatternKind,
    pub folding: Folding,
}

impl TextPattern {
    /// Read the `@` (keep hamza forms) and `%` (word anchor) operators off a raw text query.
    pub fn parse(raw: &str) -> Result<Self, ExecError> {
        let folding = if raw.contains('@') {
            Folding::PreserveHamza
        } else {
            Folding::Letters
        };
        let stripped = raw.replace('@', "");
        let stripped = stripped.trim();

        let leading = stripped.starts_with('%');
        let trailing = stripped.len() > 1 && stripped.ends_with('%');
        let mut inner = stripped;
        if leading {
            inner = &inner[1..];
        }
        if trailing {
            inner = &inner[..inner.len() - 1];
        }

        let kind = match (leading, trailing) {
            (true, true) => PatternKind::ExactWord,
            (true, false) => PatternKind::EndsWith,
            (false, true) => PatternKind::StartsWith,
            (false, false) => PatternKind::Substring,
        };

        let term = normalize(inner, folding);
        if term.is_empty() {
            return Err(ExecError::Empty);
        }
        Ok(Self {
            term,
            kind,
            folding,
        })
    }

    /// Every accepted occurrence in already-normalized text, overlapping ones
    /// included, with whether it is bounded by word boundaries on both sides.
    pub(crate) fn occurrences(&self, text: &str) -> Vec<(Range<usize>, bool)> {
        let mut found = Vec::new();
        let mut from = 0;

        while let Some(pos) = text[from..].find(&self.term) {
            let start = from + pos;
            let end = start + self.term.len();
            let left = start == 0 || text[..start].ends_with(' ');
            let right = end == text.len() || text[end..].starts_with(' ');

            let accepted = match self.kind {
                PatternKind::Substring => true,
                PatternKind::StartsWith => left,
                PatternKind::EndsWith => right,
                PatternKind::ExactWord => left && right,
            };
            if accepted {
                found.push((start..end, left && right));
            }

            from = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }

        found
    }

    /// `(score, occurrences)` for one normalized text, `None` when it does not match.
    fn score(&self, text: &str) -> Option<(f32, u32)> {
        let occurrences = self.occurrences(text);
        if occurrences.is_empty() {
            return None;
        }
        let score = if occurrences.iter().any(|(_, whole)| *whole) {
            FULL_SCORE
        } else {
            PARTIAL_SCORE
        };
        Some((score, occurrences.len() as u32))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub verse: Arc<Verse>,
    pub score: f32,
    pub matched_script: Script,
    /// Accepted occurrences in `matched_script`; zero for chapter and range queries.
    pub occurrences: u32,
}

impl Match {
    pub fn key(&self) -> VerseKey {
        self.verse.key()
    }

    fn whole(verse: &Arc<Verse>) -> Self {
        Self {
            verse: Arc::clone(verse),
            score: FULL_SCORE,
            matched_script: Script::Uthmani,
            occurrences: 0,
        }
    }
}

/// Matches of one query execution: score descending, then (chapter, verse) ascending.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    query: Query,
    matches: Vec<Match>,
}

impl ResultSet {
    pub fn new(query: Query, mut matches: Vec<Match>) -> Self {
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.key().cmp(&b.key()))
        });
        Self { query, matches }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn total_occurrences(&self) -> u64 {
        self.matches.iter().map(|m| m.occurrences as u64).sum()
    }

    /// A window of the ordered matches; empty past the end.
    pub fn page(&self, offset: usize, limit: usize) -> &[Match] {
        let start = offset.min(self.matches.len());
        let end = start.saturating_add(limit).min(self.matches.len());
        &self.matches[start..end]
    }
}

/// Evaluate a query against the corpus. An empty result is not an error.
pub fn execute(query: &Query, corpus: &Corpus) -> Result<ResultSet, ExecError> {
    let start = Instant::now();

    let matches = match query {
        Query::Chapter { chapter } => corpus
            .verses_of(*chapter)
            .map_err(|_| ExecError::ChapterOutOfRange(*chapter))?
            .iter()
            .map(Match::whole)
            .collect(),
        Query::Range {
            chapter,
            first,
            last,
        } => {
            let verses = corpus
                .verses_of(*chapter)
                .map_err(|_| ExecError::ChapterOutOfRange(*chapter))?;
            let verse_count = verses.len() as u32;
            if *first > verse_count {
                return Err(ExecError::EmptyRange {
                    chapter: *chapter,
                    first: *first,
                    verse_count,
                });
            }
            let first = (*first).max(1);
            let last = last.unwrap_or(verse_count).min(verse_count);
            if last < first {
                return Err(ExecError::EmptyRange {
                    chapter: *chapter,
                    first,
                    verse_count,
                });
            }
            verses[first as usize - 1..last as usize]
                .iter()
                .map(Match::whole)
                .collect()
        }
        Query::Text { raw } => {
            let pattern = TextPattern::parse(raw)?;
            scan_text(&pattern, corpus)
        }
    };

    let results = ResultSet::new(query.clone(), matches);
    tracing::debug!(
        "Executed {} query '{}': {} matches in {:?}",
        query.kind(),
        query,
        results.len(),
        start.elapsed()
    );
    Ok(results)
}

fn scan_text(pattern: &TextPattern, corpus: &Corpus) -> Vec<Match> {
    let mut matches = Vec::new();

    for (verse, normalized) in corpus.scan() {
        let mut best: Option<(f32, u32, Script)> = None;
        for script in Script::ALL {
            let scored = match pattern.folding {
                Folding::Letters => pattern.score(normalized.get(script)),
                Folding::PreserveHamza => {
                    pattern.score(&normalize(verse.text(script), Folding::PreserveHamza))
                }
            };
            // Later scripts win ties, so simplified is preferred on equal scores.
            if let Some((score, count)) = scored {
                if best.map_or(true, |(s, _, _)| score >= s) {
                    best = Some((score, count, script));
                }
            }
        }

        if let Some((score, occurrences, matched_script)) = best {
            matches.push(Match {
                verse: Arc::clone(verse),
                score,
                matched_script,
                occurrences,
            });
        }
    }

    matches
}

/// Shared, read-only search engine: the corpus plus a cache of executed queries.
pub struct SearchEngine {
    corpus: Arc<Corpus>,
    cache: ResultCache,
}

impl SearchEngine {
    pub fn new(corpus: Arc<Corpus>, cache_capacity: usize) -> Self {
        Self {
            corpus,
            cache: ResultCache::new(cache_capacity),
        }
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// Execute a query, reusing the result set of an identical earlier query.
    pub fn execute(&self, query: &Query) -> Result<Arc<ResultSet>, ExecError> {
        if let Some(hit) = self.cache.get(query) {
            tracing::debug!("Cache hit for {} query '{}'", query.kind(), query);
            return Ok(hit);
        }
        let results = Arc::new(execute(query, &self.corpus)?);
        self.cache.put(query.clone(), Arc::clone(&results));
        Ok(results)
    }

    pub fn cache_stats(&self) -> (usize, usize) {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
