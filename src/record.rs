use serde::Serialize;

use crate::identifier::doi;

/// A publication after normalization (and, possibly, registry merge).
///
/// `doi` and `doi_link` are private so the link can only ever be derived from the DOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationRecord {
    pub ref_key: String,
    doi: String,
    pub title: String,
    /// Flattened display string, e.g. "Jane Doe, John Q. Smith".
    pub authors: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
    pub venue: String,
    pub volume: String,
    pub issue: String,
    pub page: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub graphic: String,
    #[serde(rename = "type")]
    pub kind: PublicationType,
    doi_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationType {
    #[default]
    Article,
    Inproceedings,
}

impl PublicationType {
    /// `inproceedings` only on an exact, case-insensitive match.
    pub fn classify(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("inproceedings") {
            PublicationType::Inproceedings
        } else {
            PublicationType::Article
        }
    }
}

impl PublicationRecord {
    pub fn new(ref_key: impl Into<String>, doi: &str, title: impl Into<String>) -> Self {
        let mut record = PublicationRecord {
            ref_key: ref_key.into(),
            doi: String::new(),
            title: title.into(),
            authors: String::new(),
            year: String::new(),
            month: None,
            day: None,
            venue: String::new(),
            volume: String::new(),
            issue: String::new(),
            page: String::new(),
            abstract_text: String::new(),
            graphic: String::new(),
            kind: PublicationType::Article,
            doi_link: String::new(),
        };
        record.set_doi(doi);
        record
    }

    pub fn doi(&self) -> &str {
        &self.doi
    }

    pub fn doi_link(&self) -> &str {
        &self.doi_link
    }

    /// Replace the DOI (normalizing it) and re-derive the resolver link.
    pub fn set_doi(&mut self, raw: &str) {
        self.doi = doi::normalize(raw);
        self.doi_link = doi::resolver_link(&self.doi);
    }

    /// Builder-style setter used mostly by tests and the normalizer.
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }

    pub fn with_authors(mut self, authors: impl Into<String>) -> Self {
        self.authors = authors.into();
        self
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = venue.into();
        self
    }

    pub fn with_kind(mut self, kind: PublicationType) -> Self {
        self.kind = kind;
        self
    }

    /// Nothing to show or cite without either of these.
    pub fn is_displayable(&self) -> bool {
        !self.doi.is_empty() || !self.title.is_empty()
    }

    /// `journal | Vol. 5 | pp. 1-9`, empty when none of the parts is known.
    pub fn venue_line(&self) -> String {
        let mut parts = Vec::new();
        if !self.venue.is_empty() {
            parts.push(self.venue.clone());
        }
        if !self.volume.is_empty() {
            parts.push(format!("Vol. {}", self.volume));
        }
        if !self.page.is_empty() {
            parts.push(format!("pp. {}", self.page));
        }
        parts.join(" | ")
    }
}
