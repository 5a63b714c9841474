//! Match spans in the original (unnormalized) verse text.
//!
//! Matching happens on normalized text, which drops marks and folds letters,
//! so offsets are mapped back through [`normalize_indexed`] and widened to the
//! surrounding words. Rendering the spans is up to the consumer.

use crate::normalize::normalize_indexed;
use crate::search::TextPattern;
use std::ops::Range;

/// Byte ranges of `text` covering every occurrence of `pattern`, widened to
/// whole words, sorted and merged.
pub fn match_spans(text: &str, pattern: &TextPattern) -> Vec<Range<usize>> {
    let indexed = normalize_indexed(text, pattern.folding);
    if indexed.is_empty() {
        return Vec::new();
    }

    let normalized: String = indexed.iter().map(|(c, _)| *c).collect();
    // Byte offset in `normalized` of each entry of `indexed`.
    let starts: Vec<usize> = normalized.char_indices().map(|(i, _)| i).collect();
    let words = word_spans(text);

    let mut spans: Vec<Range<usize>> = Vec::new();
    for (range, _) in pattern.occurrences(&normalized) {
        let (Ok(first), last) = (
            starts.binary_search(&range.start),
            starts.partition_point(|&s| s < range.end),
        ) else {
            continue;
        };
        if last == 0 || last <= first {
            continue;
        }

        let source_start = indexed[first].1;
        let last_source = indexed[last - 1].1;
        let source_end = last_source
            + text[last_source..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);

        let widened = words
            .iter()
            .filter(|w| w.start < source_end && w.end > source_start)
            .fold(source_start..source_end, |acc, w| {
                acc.start.min(w.start)..acc.end.max(w.end)
            });
        spans.push(widened);
    }

    merge(spans)
}

fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push(s..i);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

fn merge(mut spans: Vec<Range<usize>>) -> Vec<Range<usize>> {
    spans.sort_by_key(|r| r.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}
