//! Arabic text normalization used for matching.
//!
//! The Uthmani script carries full diacritics and Quranic annotation marks
//! while the simplified script carries none, so both the corpus and the
//! query are reduced to the same skeleton before comparison.

use unicode_normalization::char::{decompose_compatible, is_combining_mark};

const DAGGER_ALIF: char = '\u{0670}';
const TATWEEL: char = '\u{0640}';
const NUN: char = 'ن';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Folding {
    /// Strip marks and fold hamza/alif and regional letter variants.
    #[default]
    Letters,
    /// Strip marks only; `أ` and `ا` stay distinct.
    PreserveHamza,
}

/// Normalize text for matching: removes diacritics, normalizes letter variants,
/// lowercases and collapses whitespace.
pub fn normalize(text: &str, folding: Folding) -> String {
    normalize_indexed(text, folding)
        .into_iter()
        .map(|(c, _)| c)
        .collect()
}

/// Same as [`normalize`], but every output char carries the byte offset of the
/// source char it was produced from.
pub fn normalize_indexed(text: &str, folding: Folding) -> Vec<(char, usize)> {
    let mut out: Vec<(char, usize)> = Vec::with_capacity(text.len());
    let mut pending_space: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c.is_whitespace() {
            if !out.is_empty() && pending_space.is_none() {
                pending_space = Some(idx);
            }
            continue;
        }

        if c == DAGGER_ALIF {
            // ٱلرَّحْمَٰنِ is written الرحمن; elsewhere the dagger is a full alif.
            let before_nun = matches!(chars.peek(), Some(&(_, NUN)));
            if !before_nun {
                push(&mut out, &mut pending_space, 'ا', idx);
            }
            continue;
        }

        match folding {
            Folding::Letters => decompose_compatible(c, |d| {
                if is_combining_mark(d) || is_quranic_mark(d) || d == TATWEEL {
                    return;
                }
                for l in fold_letter(d).to_lowercase() {
                    push(&mut out, &mut pending_space, l, idx);
                }
            }),
            Folding::PreserveHamza => {
                if is_tashkeel(c) || is_quranic_mark(c) || c == TATWEEL {
                    continue;
                }
                for l in c.to_lowercase() {
                    push(&mut out, &mut pending_space, l, idx);
                }
            }
        }
    }

    out
}

fn push(out: &mut Vec<(char, usize)>, pending_space: &mut Option<usize>, c: char, idx: usize) {
    if let Some(space_idx) = pending_space.take() {
        out.push((' ', space_idx));
    }
    out.push((c, idx));
}

fn fold_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ؤ' => 'و',
        'ئ' | 'ى' => 'ي',
        'ة' | 'ۃ' => 'ه',
        'ک' | 'گ' | 'ڭ' => 'ك',
        'ی' | 'ے' => 'ي',
        'ۀ' | 'ە' => 'ه',
        'ٹ' => 'ت',
        'پ' => 'ب',
        'چ' => 'ج',
        'ژ' => 'ز',
        'ڤ' => 'ف',
        'ڨ' => 'ق',
        _ => c,
    }
}

fn is_tashkeel(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}')
}

/// Small high letters, pause marks and sajdah signs of the Uthmani script.
fn is_quranic_mark(c: char) -> bool {
    matches!(c, '\u{06D6}'..='\u{06ED}')
}
