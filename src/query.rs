//! Query classification.
//!
//! The parser only looks at the shape of the input. Whether a chapter or verse
//! number actually exists is decided by the executor.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Query {
    /// Free-form phrase or word match against both scripts.
    Text { raw: String },
    /// A whole chapter.
    Chapter { chapter: u32 },
    /// An inclusive verse range; `last = None` runs to the end of the chapter.
    Range {
        chapter: u32,
        first: u32,
        last: Option<u32>,
    },
}

impl Query {
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Text { .. } => "text",
            Query::Chapter { .. } => "chapter",
            Query::Range { .. } => "range",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Text { raw } => f.write_str(raw),
            Query::Chapter { chapter } => write!(f, "{}", chapter),
            Query::Range {
                chapter,
                first,
                last: None,
            } => write!(f, "{} {}", chapter, first),
            Query::Range {
                chapter,
                first,
                last: Some(last),
            } => write!(f, "{} {} {}", chapter, first, last),
        }
    }
}

/// Classify raw input into a [`Query`].
///
/// One to three integer tokens select a chapter or a verse range; anything
/// else is a text search on the trimmed input.
pub fn parse(raw: &str) -> Result<Query, ParseError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let numbers: Option<Vec<u32>> = tokens.iter().map(|t| parse_number(t)).collect();
    match numbers.as_deref() {
        Some(&[chapter]) => return Ok(Query::Chapter { chapter }),
        Some(&[chapter, first]) => {
            return Ok(Query::Range {
                chapter,
                first,
                last: None,
            })
        }
        Some(&[chapter, first, last]) => {
            return Ok(Query::Range {
                chapter,
                first,
                last: Some(last),
            })
        }
        _ => {}
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(Query::Text {
        raw: trimmed.to_string(),
    })
}

/// Digits may be ASCII, Arabic-Indic or Extended Arabic-Indic. Values too large
/// for `u32` saturate so they fail validation later instead of turning into text.
fn parse_number(token: &str) -> Option<u32> {
    let mut value: u32 = 0;
    for c in token.chars() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
            '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
            _ => return None,
        };
        value = value.saturating_mul(10).saturating_add(digit);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_shapes() {
        assert_eq!(parse("2"), Ok(Query::Chapter { chapter: 2 }));
        assert_eq!(
            parse("2 255"),
            Ok(Query::Range {
                chapter: 2,
                first: 255,
                last: None
            })
        );
        assert_eq!(
            parse("  2   255 256 "),
            Ok(Query::Range {
                chapter: 2,
                first: 255,
                last: Some(256)
            })
        );
    }

    #[test]
    fn test_text_shapes() {
        assert_eq!(
            parse("الرحمن"),
            Ok(Query::Text {
                raw: "الرحمن".to_string()
            })
        );
        assert_eq!(
            parse("  رب العالمين  "),
            Ok(Query::Text {
                raw: "رب العالمين".to_string()
            })
        );
        // Mixed or too many tokens fall back to text.
        assert_eq!(
            parse("2 ب"),
            Ok(Query::Text {
                raw: "2 ب".to_string()
            })
        );
        assert_eq!(
            parse("1 2 3 4"),
            Ok(Query::Text {
                raw: "1 2 3 4".to_string()
            })
        );
        assert_eq!(
            parse("-1"),
            Ok(Query::Text {
                raw: "-1".to_string()
            })
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse(" \t\n "), Err(ParseError::Empty));
    }

    #[test]
    fn test_out_of_range_numbers_are_not_validated() {
        assert_eq!(parse("0"), Ok(Query::Chapter { chapter: 0 }));
        assert_eq!(parse("115"), Ok(Query::Chapter { chapter: 115 }));
        assert_eq!(
            parse("99999999999999999999"),
            Ok(Query::Chapter { chapter: u32::MAX })
        );
    }

    #[test]
    fn test_arabic_indic_digits() {
        assert_eq!(
            parse("٢ ٢٥٥"),
            Ok(Query::Range {
                chapter: 2,
                first: 255,
                last: None
            })
        );
        assert_eq!(parse("۱۱۴"), Ok(Query::Chapter { chapter: 114 }));
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_value(parse("2 255").unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "range", "chapter": 2, "first": 255, "last": null})
        );
        let json = serde_json::to_value(parse("الرحمن").unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "text", "raw": "الرحمن"}));
    }

    #[test]
    fn test_display_round_trips_shape() {
        for raw in ["2", "2 255", "2 255 256", "الرحمن"] {
            assert_eq!(parse(&parse(raw).unwrap().to_string()), parse(raw));
        }
    }
}
