//! Corpus store: the two script variants of the verse collection, keyed by
//! (chapter, verse) and indexed by chapter. Read-only after [`Corpus::load`].

use crate::error::{CorpusError, LoadError};
use crate::normalize::{normalize, Folding};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Number of chapters in the corpus.
pub const CHAPTER_COUNT: u32 = 114;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub chapter: u32,
    pub verse: u32,
    pub text_uthmani: String,
    pub text_simplified: String,
}

impl Verse {
    pub fn key(&self) -> VerseKey {
        VerseKey::new(self.chapter, self.verse)
    }

    pub fn text(&self, script: Script) -> &str {
        match script {
            Script::Uthmani => &self.text_uthmani,
            Script::Simplified => &self.text_simplified,
        }
    }
}

/// Identity of a verse. This is all that annotation and audio collaborators receive.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseKey {
    pub chapter: u32,
    pub verse: u32,
}

impl VerseKey {
    pub fn new(chapter: u32, verse: u32) -> Self {
        Self { chapter, verse }
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Uthmani,
    Simplified,
}

impl Script {
    pub const ALL: [Script; 2] = [Script::Uthmani, Script::Simplified];
}

/// Which input a load error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusSource {
    Uthmani,
    Simplified,
    ChapterNames,
}

impl fmt::Display for CorpusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorpusSource::Uthmani => "uthmani",
            CorpusSource::Simplified => "simplified",
            CorpusSource::ChapterNames => "chapter names",
        };
        f.write_str(name)
    }
}

/// Normalized forms of one verse, computed once at load.
#[derive(Debug)]
pub(crate) struct NormalizedText {
    pub uthmani: String,
    pub simplified: String,
}

impl NormalizedText {
    pub fn get(&self, script: Script) -> &str {
        match script {
            Script::Uthmani => &self.uthmani,
            Script::Simplified => &self.simplified,
        }
    }
}

#[derive(Debug)]
pub struct Corpus {
    verses: Vec<Arc<Verse>>,
    normalized: Vec<NormalizedText>,
    /// `chapters[c - 1]` is the slice of `verses` holding chapter `c`.
    chapters: Vec<Range<usize>>,
    chapter_names: Vec<String>,
}

impl Corpus {
    /// Build the corpus from the two script sources (`chapter|verse|text` per line).
    pub fn load(uthmani_source: &str, simplified_source: &str) -> Result<Self, LoadError> {
        let uthmani = parse_source(uthmani_source, CorpusSource::Uthmani)?;
        let simplified = parse_source(simplified_source, CorpusSource::Simplified)?;

        if let Some(key) = uthmani.keys().find(|k| !simplified.contains_key(k)) {
            return Err(LoadError::KeyMismatch {
                chapter: key.chapter,
                verse: key.verse,
                present_in: CorpusSource::Uthmani,
            });
        }
        if let Some(key) = simplified.keys().find(|k| !uthmani.contains_key(k)) {
            return Err(LoadError::KeyMismatch {
                chapter: key.chapter,
                verse: key.verse,
                present_in: CorpusSource::Simplified,
            });
        }

        // Both maps share a key set, so checking one covers the numbering of both.
        let mut chapters: Vec<Range<usize>> = Vec::with_capacity(CHAPTER_COUNT as usize);
        let mut verses: Vec<Arc<Verse>> = Vec::with_capacity(uthmani.len());
        let mut normalized: Vec<NormalizedText> = Vec::with_capacity(uthmani.len());
        let mut simplified = simplified;
        let mut current_chapter = 0;
        let mut next_verse = 1;

        for (key, (line, text_uthmani)) in uthmani {
            let malformed = |reason: String| LoadError::Malformed {
                origin: CorpusSource::Uthmani,
                line,
                reason,
            };

            if key.chapter != current_chapter {
                if key.chapter != current_chapter + 1 {
                    return Err(malformed(format!("chapter {} has no verses", current_chapter + 1)));
                }
                current_chapter = key.chapter;
                next_verse = 1;
                chapters.push(verses.len()..verses.len());
            }
            if key.verse != next_verse {
                return Err(malformed(format!(
                    "verse {} breaks the numbering of chapter {}, expected verse {}",
                    key.verse, key.chapter, next_verse
                )));
            }
            next_verse += 1;

            let text_simplified = simplified
                .remove(&key)
                .map(|(_, text)| text)
                .unwrap_or_default();
            normalized.push(NormalizedText {
                uthmani: normalize(&text_uthmani, Folding::Letters),
                simplified: normalize(&text_simplified, Folding::Letters),
            });
            verses.push(Arc::new(Verse {
                chapter: key.chapter,
                verse: key.verse,
                text_uthmani,
                text_simplified,
            }));
            if let Some(range) = chapters.last_mut() {
                range.end = verses.len();
            }
        }

        if chapters.len() as u32 != CHAPTER_COUNT {
            return Err(LoadError::Malformed {
                origin: CorpusSource::Uthmani,
                line: 0,
                reason: format!("chapter {} has no verses", chapters.len() + 1),
            });
        }

        tracing::info!(
            "Loaded corpus: {} chapters, {} verses",
            chapters.len(),
            verses.len()
        );

        Ok(Self {
            verses,
            normalized,
            chapters,
            chapter_names: Vec::new(),
        })
    }

    /// Attach chapter names, one per line in chapter order.
    pub fn with_chapter_names(mut self, source: &str) -> Result<Self, LoadError> {
        let names: Vec<String> = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if names.len() as u32 != CHAPTER_COUNT {
            return Err(LoadError::Malformed {
                origin: CorpusSource::ChapterNames,
                line: names.len(),
                reason: format!("expected {} chapter names, found {}", CHAPTER_COUNT, names.len()),
            });
        }
        self.chapter_names = names;
        Ok(self)
    }

    pub fn chapter_count(&self) -> u32 {
        self.chapters.len() as u32
    }

    /// Total number of verses.
    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    fn chapter_range(&self, chapter: u32) -> Result<Range<usize>, CorpusError> {
        if !(1..=CHAPTER_COUNT).contains(&chapter) {
            return Err(CorpusError::ChapterOutOfRange(chapter));
        }
        Ok(self.chapters[chapter as usize - 1].clone())
    }

    /// All verses of a chapter, in verse order.
    pub fn verses_of(&self, chapter: u32) -> Result<&[Arc<Verse>], CorpusError> {
        let range = self.chapter_range(chapter)?;
        Ok(&self.verses[range])
    }

    pub fn verse_count(&self, chapter: u32) -> Result<u32, CorpusError> {
        Ok(self.chapter_range(chapter)?.len() as u32)
    }

    pub fn verse_at(&self, chapter: u32, verse: u32) -> Result<&Arc<Verse>, CorpusError> {
        self.verses_of(chapter)?
            .get((verse as usize).wrapping_sub(1))
            .ok_or(CorpusError::VerseOutOfRange { chapter, verse })
    }

    /// Every verse in canonical order. Call again to restart the scan.
    pub fn all_verses(&self) -> std::slice::Iter<'_, Arc<Verse>> {
        self.verses.iter()
    }

    /// Verses paired with their precomputed normalized text, in canonical order.
    pub(crate) fn scan(&self) -> impl Iterator<Item = (&Arc<Verse>, &NormalizedText)> + '_ {
        self.verses.iter().zip(self.normalized.iter())
    }

    /// A verse with up to `radius` neighbours on each side, clipped to its chapter.
    pub fn verses_around(
        &self,
        chapter: u32,
        verse: u32,
        radius: u32,
    ) -> Result<&[Arc<Verse>], CorpusError> {
        let verses = self.verses_of(chapter)?;
        if verse == 0 || verse as usize > verses.len() {
            return Err(CorpusError::VerseOutOfRange { chapter, verse });
        }
        let start = verse.saturating_sub(radius).max(1) as usize - 1;
        let end = (verse.saturating_add(radius) as usize).min(verses.len());
        Ok(&verses[start..end])
    }

    /// Chapter name, when names were loaded.
    pub fn chapter_name(&self, chapter: u32) -> Option<&str> {
        if chapter == 0 {
            return None;
        }
        self.chapter_names
            .get(chapter as usize - 1)
            .map(String::as_str)
    }

    /// Distinct normalized words of the simplified script with their frequency,
    /// most frequent first, ties in lexical order.
    pub fn vocabulary(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for text in &self.normalized {
            for word in text.simplified.split(' ').filter(|w| !w.is_empty()) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
        let mut words: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(word, count)| (word.to_string(), count))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words
    }
}

/// Parse one script source into `(chapter, verse) -> (line number, text)`.
fn parse_source(
    source: &str,
    origin: CorpusSource,
) -> Result<BTreeMap<VerseKey, (usize, String)>, LoadError> {
    let mut verses = BTreeMap::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim();
        // Distributed text files end with a commented license block.
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let malformed = |reason: String| LoadError::Malformed {
            origin,
            line,
            reason,
        };

        let mut parts = trimmed.splitn(3, '|');
        let (Some(chapter), Some(verse), Some(text)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("expected chapter|verse|text".to_string()));
        };
        let chapter: u32 = chapter
            .trim()
            .parse()
            .map_err(|_| malformed(format!("invalid chapter number '{}'", chapter)))?;
        let verse: u32 = verse
            .trim()
            .parse()
            .map_err(|_| malformed(format!("invalid verse number '{}'", verse)))?;
        if !(1..=CHAPTER_COUNT).contains(&chapter) {
            return Err(malformed(format!("chapter {} out of range", chapter)));
        }
        if verse == 0 {
            return Err(malformed("verse numbers start at 1".to_string()));
        }

        let key = VerseKey::new(chapter, verse);
        if verses.insert(key, (line, text.trim().to_string())).is_some() {
            return Err(malformed(format!("duplicate verse {}", key)));
        }
    }

    Ok(verses)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic corpus: chapter 1 is Al-Fatiha, every other chapter repeats a
    //! marker phrase so large result sets are easy to produce.

    use super::CHAPTER_COUNT;

    pub const FATIHA_UTHMANI: [&str; 7] = [
        "بِسْمِ ٱللَّهِ ٱلرَّحْمَٰنِ ٱلرَّحِيمِ",
        "ٱلْحَمْدُ لِلَّهِ رَبِّ ٱلْعَٰلَمِينَ",
        "ٱلرَّحْمَٰنِ ٱلرَّحِيمِ",
        "مَٰلِكِ يَوْمِ ٱلدِّينِ",
        "إِيَّاكَ نَعْبُدُ وَإِيَّاكَ نَسْتَعِينُ",
        "ٱهْدِنَا ٱلصِّرَٰطَ ٱلْمُسْتَقِيمَ",
        "صِرَٰطَ ٱلَّذِينَ أَنْعَمْتَ عَلَيْهِمْ غَيْرِ ٱلْمَغْضُوبِ عَلَيْهِمْ وَلَا ٱلضَّآلِّينَ",
    ];

    pub const FATIHA_SIMPLIFIED: [&str; 7] = [
        "بسم الله الرحمن الرحيم",
        "الحمد لله رب العالمين",
        "الرحمن الرحيم",
        "مالك يوم الدين",
        "إياك نعبد وإياك نستعين",
        "اهدنا الصراط المستقيم",
        "صراط الذين أنعمت عليهم غير المغضوب عليهم ولا الضالين",
    ];

    pub fn verse_count(chapter: u32) -> u32 {
        match chapter {
            1 => 7,
            2 => 286,
            c => 3 + c % 5,
        }
    }

    /// `(uthmani, simplified, chapter names)` sources.
    pub fn sources() -> (String, String, String) {
        let mut uthmani = String::new();
        let mut simplified = String::new();
        let mut names = String::new();
        for chapter in 1..=CHAPTER_COUNT {
            names.push_str(&format!("سورة {}\n", chapter));
            for verse in 1..=verse_count(chapter) {
                let (u, s) = if chapter == 1 {
                    let i = verse as usize - 1;
                    (FATIHA_UTHMANI[i].to_string(), FATIHA_SIMPLIFIED[i].to_string())
                } else {
                    (
                        format!("كِتَٰبٌ مُّبِينٌ {} {}", chapter, verse),
                        format!("كتاب مبين {} {}", chapter, verse),
                    )
                };
                uthmani.push_str(&format!("{}|{}|{}\n", chapter, verse, u));
                simplified.push_str(&format!("{}|{}|{}\n", chapter, verse, s));
            }
        }
        uthmani.push_str("\n# Tanzil Quran Text\n# License: CC BY 3.0\n");
        (uthmani, simplified, names)
    }

    pub fn corpus() -> super::Corpus {
        let (uthmani, simplified, names) = sources();
        super::Corpus::load(&uthmani, &simplified)
            .and_then(|c| c.with_chapter_names(&names))
            .expect("fixture corpus loads")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;

    #[test]
    fn test_load_fixture() {
        let corpus = fixtures::corpus();
        assert_eq!(corpus.chapter_count(), CHAPTER_COUNT);
        let expected: u32 = (1..=CHAPTER_COUNT).map(fixtures::verse_count).sum();
        assert_eq!(corpus.len(), expected as usize);
        assert_eq!(corpus.all_verses().count(), corpus.len());
        assert_eq!(corpus.chapter_name(2), Some("سورة 2"));
        assert_eq!(corpus.chapter_name(0), None);
    }

    #[test]
    fn test_verses_of_is_contiguous() {
        let corpus = fixtures::corpus();
        for chapter in 1..=CHAPTER_COUNT {
            let verses = corpus.verses_of(chapter).unwrap();
            assert_eq!(verses.len() as u32, fixtures::verse_count(chapter));
            for (i, v) in verses.iter().enumerate() {
                assert_eq!(v.chapter, chapter);
                assert_eq!(v.verse, i as u32 + 1);
            }
        }
    }

    #[test]
    fn test_out_of_range_lookups() {
        let corpus = fixtures::corpus();
        assert_eq!(corpus.verses_of(0).unwrap_err(), CorpusError::ChapterOutOfRange(0));
        assert_eq!(corpus.verses_of(115).unwrap_err(), CorpusError::ChapterOutOfRange(115));
        assert_eq!(
            corpus.verse_at(1, 8).unwrap_err(),
            CorpusError::VerseOutOfRange { chapter: 1, verse: 8 }
        );
        assert_eq!(
            corpus.verse_at(1, 0).unwrap_err(),
            CorpusError::VerseOutOfRange { chapter: 1, verse: 0 }
        );
        assert_eq!(corpus.verse_at(1, 7).unwrap().text_simplified, fixtures::FATIHA_SIMPLIFIED[6]);
    }

    #[test]
    fn test_key_mismatch() {
        let (uthmani, simplified, _) = fixtures::sources();
        let simplified: String = simplified
            .lines()
            .filter(|l| !l.starts_with("1|7|"))
            .map(|l| format!("{}\n", l))
            .collect();
        let err = Corpus::load(&uthmani, &simplified).unwrap_err();
        assert_eq!(
            err,
            LoadError::KeyMismatch {
                chapter: 1,
                verse: 7,
                present_in: CorpusSource::Uthmani
            }
        );
    }

    #[test]
    fn test_malformed_lines() {
        let (uthmani, simplified, _) = fixtures::sources();

        let broken = format!("{}not a verse line\n", simplified);
        assert!(matches!(
            Corpus::load(&uthmani, &broken),
            Err(LoadError::Malformed { origin: CorpusSource::Simplified, .. })
        ));

        let broken = format!("115|1|text\n{}", uthmani);
        assert!(matches!(
            Corpus::load(&broken, &simplified),
            Err(LoadError::Malformed { origin: CorpusSource::Uthmani, line: 1, .. })
        ));

        let duplicated = format!("{}1|1|again\n", uthmani);
        assert!(matches!(
            Corpus::load(&duplicated, &simplified),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_gap_in_numbering_is_rejected() {
        let (uthmani, simplified, _) = fixtures::sources();
        let drop_verse = |src: &str| -> String {
            src.lines()
                .filter(|l| !l.starts_with("1|4|"))
                .map(|l| format!("{}\n", l))
                .collect()
        };
        let err = Corpus::load(&drop_verse(&uthmani), &drop_verse(&simplified)).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }), "{err}");
    }

    #[test]
    fn test_missing_chapter_is_rejected() {
        let (uthmani, simplified, _) = fixtures::sources();
        let drop_chapter = |src: &str| -> String {
            src.lines()
                .filter(|l| !l.starts_with("114|"))
                .map(|l| format!("{}\n", l))
                .collect()
        };
        let err = Corpus::load(&drop_chapter(&uthmani), &drop_chapter(&simplified)).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }), "{err}");
    }

    #[test]
    fn test_pipe_inside_text_is_kept() {
        let (uthmani, simplified, _) = fixtures::sources();
        let uthmani = uthmani.replacen("2|1|", "2|1|a|b ", 1);
        let corpus = Corpus::load(&uthmani, &simplified).unwrap();
        assert!(corpus.verse_at(2, 1).unwrap().text_uthmani.starts_with("a|b "));
    }

    #[test]
    fn test_chapter_names_count() {
        let corpus = {
            let (uthmani, simplified, _) = fixtures::sources();
            Corpus::load(&uthmani, &simplified).unwrap()
        };
        assert!(matches!(
            corpus.with_chapter_names("الفاتحة\nالبقرة\n"),
            Err(LoadError::Malformed { origin: CorpusSource::ChapterNames, .. })
        ));
    }

    #[test]
    fn test_verses_around() {
        let corpus = fixtures::corpus();
        let around = corpus.verses_around(2, 5, 12).unwrap();
        assert_eq!(around.first().unwrap().verse, 1);
        assert_eq!(around.last().unwrap().verse, 17);

        let around = corpus.verses_around(1, 4, 1).unwrap();
        let numbers: Vec<u32> = around.iter().map(|v| v.verse).collect();
        assert_eq!(numbers, vec![3, 4, 5]);

        let around = corpus.verses_around(1, 7, 12).unwrap();
        assert_eq!(around.len(), 7);

        assert!(corpus.verses_around(1, 8, 2).is_err());
    }

    #[test]
    fn test_vocabulary_order() {
        let corpus = fixtures::corpus();
        let vocabulary = corpus.vocabulary();
        // Every synthetic verse carries "كتاب مبين".
        assert_eq!(vocabulary[0].1, vocabulary[1].1);
        let top: Vec<&str> = vocabulary[..2].iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(top, vec!["كتاب", "مبين"]);
        let rahman = vocabulary.iter().find(|(w, _)| w == "الرحمن").unwrap();
        assert_eq!(rahman.1, 2);
        let alayhim = vocabulary.iter().find(|(w, _)| w == "عليهم").unwrap();
        assert_eq!(alayhim.1, 2);
    }
}
