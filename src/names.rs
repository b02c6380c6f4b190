//! Author string parsing.
//!
//! Records carry their authors as one display string. Citation styles need structured
//! names, and the presentation layer needs to know which names to emphasise.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::normalize::clean_text;

static CJK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]").unwrap());
static LIST_SEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i);|\s+and\s+|&").unwrap());
static CONJUNCTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+and\s+|&").unwrap());
/// Commas, optionally followed by a closing `and`/`&` ("A, B, and C"), or a bare conjunction.
static COMMA_SEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:[,，、]\s*(?:and|&)\s+|[,，、]|\s+and\s+|&)\s*").unwrap()
});

/// Markers for corresponding or co-first authors, never part of the name itself.
const AUTHOR_MARKS: &[char] = &['*', '†', '‡'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub family: String,
    /// Empty for CJK names and single-token names.
    pub given: String,
    pub cjk: bool,
}

impl PersonName {
    /// Parse one author.
    ///
    /// CJK names are kept whole as the family name. Latin names are read as
    /// `Family, Given` when they contain a comma, otherwise the last whitespace-separated
    /// token is the family name.
    pub fn parse(raw: &str) -> Option<Self> {
        let name = clean_text(raw.trim_matches(|c: char| AUTHOR_MARKS.contains(&c) || c.is_whitespace()));
        if name.is_empty() {
            return None;
        }

        if CJK_RE.is_match(&name) {
            return Some(PersonName {
                family: name.replace(' ', ""),
                given: String::new(),
                cjk: true,
            });
        }

        if let Some((family, given)) = name.split_once(',') {
            let family = clean_text(family);
            let given = clean_text(given);
            if !family.is_empty() {
                return Some(PersonName {
                    family,
                    given,
                    cjk: false,
                });
            }
            return PersonName::parse(&given);
        }

        let (given, family) = match name.rsplit_once(' ') {
            Some((given, family)) => (given.to_string(), family.to_string()),
            None => (String::new(), name),
        };
        Some(PersonName {
            family,
            given,
            cjk: false,
        })
    }

    /// Upper-cased initials of the given names; hyphenated names keep the hyphen
    /// (`Jean-Paul` gives `J-P`).
    pub fn initials(&self) -> Vec<String> {
        self.given
            .split(|c: char| c.is_whitespace() || c == '.')
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.split('-')
                    .filter_map(|piece| piece.chars().find(|c| c.is_alphabetic()))
                    .map(|c| c.to_uppercase().collect::<String>())
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .filter(|initial| !initial.is_empty())
            .collect()
    }

    /// `Family, Given`, or just the family name when there is no given name.
    pub fn family_given(&self) -> String {
        if self.given.is_empty() {
            self.family.clone()
        } else {
            format!("{}, {}", self.family, self.given)
        }
    }
}

/// Split a display string into individual author names.
///
/// `Family, Given` pairs survive when the list is joined with `;`, or with `and`/`&`
/// where every piece holds exactly one comma (`Doe, Jane and Smith, John`). Otherwise
/// commas (ASCII, full-width, or ideographic) separate authors, and a closing `and` or
/// `&` is a separator too.
pub fn split_authors(authors: &str) -> Vec<String> {
    let cleaned = clean_text(authors);
    if cleaned.is_empty() {
        return Vec::new();
    }
    let pieces = |sep: &Regex| -> Vec<String> {
        sep.split(&cleaned)
            .map(clean_text)
            .filter(|part| !part.is_empty())
            .collect()
    };

    if cleaned.contains(';') {
        return pieces(&LIST_SEP_RE);
    }
    if CONJUNCTION_RE.is_match(&cleaned) {
        let pairs = pieces(&CONJUNCTION_RE);
        let family_given = |part: &String| part.matches(',').count() == 1 && !part.ends_with(',');
        if pairs.len() > 1 && pairs.iter().all(family_given) {
            return pairs;
        }
    }
    pieces(&COMMA_SEP_RE)
}

/// Structured names for every author in the display string.
pub fn parse_authors(authors: &str) -> Vec<PersonName> {
    split_authors(authors)
        .iter()
        .filter_map(|name| PersonName::parse(name))
        .collect()
}

/// One author in display order, flagged when it matches a highlight keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSpan {
    pub name: String,
    pub highlighted: bool,
}

/// Comparison form: lower-cased, author marks and dots removed, whitespace removed.
pub fn keyword_form(s: &str) -> String {
    clean_text(s)
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && !AUTHOR_MARKS.contains(c))
        .collect()
}

pub fn should_highlight(author: &str, keywords: &[String]) -> bool {
    let name = keyword_form(author);
    if name.is_empty() {
        return false;
    }
    keywords.iter().any(|keyword| {
        let keyword = keyword_form(keyword);
        !keyword.is_empty() && name.contains(&keyword)
    })
}

/// Split the author string for display, marking the names that match `keywords`.
pub fn highlight_authors(authors: &str, keywords: &[String]) -> Vec<AuthorSpan> {
    split_authors(authors)
        .into_iter()
        .map(|name| AuthorSpan {
            highlighted: should_highlight(&name, keywords),
            name,
        })
        .collect()
}
