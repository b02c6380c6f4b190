//! Citation strings for a canonical record.
//!
//! Every formatter is a pure function of the record. The styles are close
//! approximations of GB/T 7714-2015, MLA 9, APA 7 and plain BibTeX, not validated
//! implementations.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::record::PublicationRecord;

pub mod apa;
pub mod bibtex;
pub mod gbt;
pub mod mla;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    Gbt,
    Mla,
    Apa,
    Bibtex,
}

impl CitationStyle {
    pub const ALL: [CitationStyle; 4] = [
        CitationStyle::Gbt,
        CitationStyle::Mla,
        CitationStyle::Apa,
        CitationStyle::Bibtex,
    ];

    pub fn format(&self, record: &PublicationRecord) -> String {
        match self {
            CitationStyle::Gbt => gbt::format(record),
            CitationStyle::Mla => mla::format(record),
            CitationStyle::Apa => apa::format(record),
            CitationStyle::Bibtex => bibtex::format(record),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CitationStyle::Gbt => "GB/T 7714",
            CitationStyle::Mla => "MLA",
            CitationStyle::Apa => "APA",
            CitationStyle::Bibtex => "BibTeX",
        }
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CitationStyle::Gbt => "gbt",
            CitationStyle::Mla => "mla",
            CitationStyle::Apa => "apa",
            CitationStyle::Bibtex => "bibtex",
        };
        f.write_str(name)
    }
}

impl FromStr for CitationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gbt" | "gb/t" | "gbt7714" | "gb/t 7714" => Ok(CitationStyle::Gbt),
            "mla" => Ok(CitationStyle::Mla),
            "apa" => Ok(CitationStyle::Apa),
            "bibtex" | "bib" => Ok(CitationStyle::Bibtex),
            other => Err(format!("unknown citation style: {other}")),
        }
    }
}

/// All four citations of one record, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citations {
    pub gbt: String,
    pub mla: String,
    pub apa: String,
    pub bibtex: String,
}

pub fn format_all(record: &PublicationRecord) -> Citations {
    Citations {
        gbt: gbt::format(record),
        mla: mla::format(record),
        apa: apa::format(record),
        bibtex: bibtex::format(record),
    }
}

/// Append `.` unless the text already ends in terminal punctuation.
pub(crate) fn terminate(text: &str) -> String {
    let text = text.trim_end();
    if text.ends_with(['.', '?', '!', '。', '？', '！']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// `Proceedings of X`, unless the venue already reads like a proceedings title.
pub(crate) fn proceedings_title(venue: &str) -> String {
    if venue.to_ascii_lowercase().starts_with("proc") {
        venue.to_string()
    } else {
        format!("Proceedings of {venue}")
    }
}

/// Page ranges use an en dash in the prose styles.
pub(crate) fn page_range(page: &str) -> String {
    page.replace("--", "–").replace('-', "–")
}

pub(crate) fn is_page_range(page: &str) -> bool {
    page.contains(['-', '–', ','])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PublicationType;

    fn sample() -> PublicationRecord {
        let mut rec = PublicationRecord::new("doe2021", "10.1000/xyz", "Deterministic Things")
            .with_authors("Jane Doe, John Q. Smith")
            .with_year("2021")
            .with_venue("Journal of Tests");
        rec.volume = "5".into();
        rec.issue = "2".into();
        rec.page = "1-9".into();
        rec
    }

    #[test]
    fn style_names_round_trip() {
        for style in CitationStyle::ALL {
            assert_eq!(style.to_string().parse::<CitationStyle>(), Ok(style));
        }
        assert_eq!("GB/T".parse::<CitationStyle>(), Ok(CitationStyle::Gbt));
        assert!("chicago".parse::<CitationStyle>().is_err());
    }

    #[test]
    fn formatting_is_deterministic() {
        let rec = sample();
        assert_eq!(format_all(&rec), format_all(&rec.clone()));
        for style in CitationStyle::ALL {
            assert_eq!(style.format(&rec), style.format(&rec));
        }
    }

    #[test]
    fn conference_records_switch_templates() {
        let journal = sample();
        let conf = sample().with_kind(PublicationType::Inproceedings);
        assert!(gbt::format(&journal).contains("[J]"));
        assert!(gbt::format(&conf).contains("[C]"));
        assert!(mla::format(&conf).contains("Proceedings of Journal of Tests"));
        assert!(bibtex::format(&journal).starts_with("@article{"));
        assert!(bibtex::format(&conf).starts_with("@inproceedings{"));
    }

    #[test]
    fn terminate_does_not_double_punctuation() {
        assert_eq!(terminate("A"), "A.");
        assert_eq!(terminate("A."), "A.");
        assert_eq!(terminate("Why? "), "Why?");
        assert_eq!(terminate("研究。"), "研究。");
    }

    #[test]
    fn proceedings_title_is_not_doubled() {
        assert_eq!(proceedings_title("ICML"), "Proceedings of ICML");
        assert_eq!(proceedings_title("Proceedings of the VLDB Endowment"), "Proceedings of the VLDB Endowment");
    }
}
