//! Chapter title parser.
//!
//! The only place chapter-number semantics are decided. Both the merge
//! engine and the document listing sort go through [`parse_title`], so a
//! title orders the same way everywhere.
//!
//! A title is recognized when it contains a chapter marker (`Chapter`,
//! `Chương`, `Hồi`, case-insensitive) followed by a number with an optional
//! fractional part, optionally followed by a separator and free text:
//!
//! | Title | sort key | group key | subtitle |
//! |-------|----------|-----------|----------|
//! | `Chapter 12` | 12.0 | 12 | - |
//! | `Chương 12.1: Trở về` | 12.1 | 12 | `Trở về` |
//! | `Prologue` | sentinel | - | - |

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

/// Sort key given to titles without a chapter marker, so they order last.
pub const UNPARSED_SORT_KEY: f64 = 999_999.0;

static CHAPTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:chương|chapter|hồi)\s*(\d+)(?:\.(\d+))?(?:(?:\s*[-:.–—]\s*|\s+)(.*))?")
        .expect("chapter title regex is valid")
});

/// Result of parsing a chapter title.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTitle {
    /// A chapter marker and number were found.
    Chapter {
        sort_key: f64,
        group_key: u64,
        subtitle: Option<String>,
    },
    /// No chapter marker; callers decide how to fall back.
    Unparsed,
}

impl ParsedTitle {
    /// Ordering key; [`UNPARSED_SORT_KEY`] for unparsed titles.
    pub fn sort_key(&self) -> f64 {
        match self {
            ParsedTitle::Chapter { sort_key, .. } => *sort_key,
            ParsedTitle::Unparsed => UNPARSED_SORT_KEY,
        }
    }

    pub fn group_key(&self) -> Option<u64> {
        match self {
            ParsedTitle::Chapter { group_key, .. } => Some(*group_key),
            ParsedTitle::Unparsed => None,
        }
    }

    pub fn subtitle(&self) -> Option<&str> {
        match self {
            ParsedTitle::Chapter { subtitle, .. } => subtitle.as_deref(),
            ParsedTitle::Unparsed => None,
        }
    }
}

/// Parse a raw chapter title. Total and side-effect free.
pub fn parse_title(title: &str) -> ParsedTitle {
    let Some(caps) = CHAPTER_RE.captures(title) else {
        return ParsedTitle::Unparsed;
    };

    let whole = &caps[1];
    let Ok(group_key) = whole.parse::<u64>() else {
        return ParsedTitle::Unparsed;
    };

    let number = match caps.get(2) {
        Some(frac) => format!("{}.{}", whole, frac.as_str()),
        None => whole.to_string(),
    };
    let Ok(sort_key) = number.parse::<f64>() else {
        return ParsedTitle::Unparsed;
    };

    let subtitle = caps
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    ParsedTitle::Chapter {
        sort_key,
        group_key,
        subtitle,
    }
}

/// Compare two titles by their parsed chapter keys.
pub fn chapter_order(a: &str, b: &str) -> Ordering {
    parse_title(a).sort_key().total_cmp(&parse_title(b).sort_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_chapter() {
        let parsed = parse_title("Chapter 12");
        assert_eq!(parsed.sort_key(), 12.0);
        assert_eq!(parsed.group_key(), Some(12));
        assert_eq!(parsed.subtitle(), None);
    }

    #[test]
    fn test_fractional_sub_chapter() {
        let parsed = parse_title("Chapter 12.1");
        assert_eq!(parsed.sort_key(), 12.1);
        assert_eq!(parsed.group_key(), Some(12));
        assert!(parse_title("Chapter 12").sort_key() < parsed.sort_key());
        assert!(parsed.sort_key() < parse_title("Chapter 13").sort_key());
    }

    #[test]
    fn test_trailing_zero_fraction_matches_integer() {
        assert_eq!(
            parse_title("Chapter 12.0").sort_key(),
            parse_title("Chapter 12").sort_key()
        );
    }

    #[test]
    fn test_localized_markers_case_insensitive() {
        assert_eq!(parse_title("Chương 5").sort_key(), 5.0);
        assert_eq!(parse_title("CHƯƠNG 6").sort_key(), 6.0);
        assert_eq!(parse_title("hồi 7").sort_key(), 7.0);
        assert_eq!(parse_title("chapter8").sort_key(), 8.0);
    }

    #[test]
    fn test_subtitle_after_separator() {
        let parsed = parse_title("Chương 3.2: Trở về");
        assert_eq!(parsed.sort_key(), 3.2);
        assert_eq!(parsed.subtitle(), Some("Trở về"));

        let parsed = parse_title("Chapter 3. The Road");
        assert_eq!(parsed.sort_key(), 3.0);
        assert_eq!(parsed.subtitle(), Some("The Road"));

        let parsed = parse_title("Chapter 4 - ");
        assert_eq!(parsed.subtitle(), None);
    }

    #[test]
    fn test_marker_inside_longer_title() {
        let parsed = parse_title("Book One, Chapter 9: Dawn");
        assert_eq!(parsed.sort_key(), 9.0);
        assert_eq!(parsed.subtitle(), Some("Dawn"));
    }

    #[test]
    fn test_unparsed_title_sorts_last() {
        let parsed = parse_title("Prologue");
        assert_eq!(parsed, ParsedTitle::Unparsed);
        assert_eq!(parsed.sort_key(), UNPARSED_SORT_KEY);
        assert_eq!(parsed.group_key(), None);
        assert_eq!(chapter_order("Prologue", "Chapter 500"), Ordering::Greater);
    }

    #[test]
    fn test_chapter_order_on_file_names() {
        let mut names = vec!["Chapter 10.docx", "Chapter 2.docx", "Notes.docx", "Chapter 1.docx"];
        names.sort_by(|a, b| chapter_order(a, b));
        assert_eq!(
            names,
            vec!["Chapter 1.docx", "Chapter 2.docx", "Chapter 10.docx", "Notes.docx"]
        );
    }
}
