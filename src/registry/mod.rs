//! The bibliographic registry seam.
//!
//! The resolution engine only sees the [`Registry`] trait; the Crossref client is the
//! production implementation, tests script their own.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::record::PublicationRecord;

pub mod crossref;

/// Look up registry metadata for one DOI.
///
/// Implementations never fail: every problem is reported as a [`ResolutionStatus`].
pub trait Registry {
    fn lookup(&self, doi: &str) -> ResolutionOutcome;
}

impl<R: Registry + ?Sized> Registry for &R {
    fn lookup(&self, doi: &str) -> ResolutionOutcome {
        (**self).lookup(doi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    Ok,
    /// The registry does not know the DOI. Not a pipeline failure.
    NotFound,
    RateLimited,
    Timeout,
    Network,
    Http(u16),
    InvalidPayload,
    /// No DOI to look up.
    Empty,
}

impl ResolutionStatus {
    /// Statuses that count toward the consecutive-failure breaker.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            ResolutionStatus::Ok | ResolutionStatus::NotFound | ResolutionStatus::Empty
        )
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStatus::Ok => f.write_str("ok"),
            ResolutionStatus::NotFound => f.write_str("not_found"),
            ResolutionStatus::RateLimited => f.write_str("rate_limited"),
            ResolutionStatus::Timeout => f.write_str("timeout"),
            ResolutionStatus::Network => f.write_str("network"),
            ResolutionStatus::Http(code) => write!(f, "http_{code}"),
            ResolutionStatus::InvalidPayload => f.write_str("invalid_payload"),
            ResolutionStatus::Empty => f.write_str("empty"),
        }
    }
}

impl Serialize for ResolutionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Metadata parsed from a registry response. Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryRecord {
    pub doi: String,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub venue: String,
    pub volume: String,
    pub issue: String,
    pub page: String,
    pub abstract_text: String,
}

impl RegistryRecord {
    /// Registry values win field by field when present; the local record fills the
    /// rest. The date moves as a unit so a registry year never pairs with a local month,
    /// and the abstract is only taken when the catalog has none.
    pub fn merge_into(&self, local: &PublicationRecord) -> PublicationRecord {
        fn pick(remote: &str, local: &str) -> String {
            if remote.is_empty() {
                local.to_string()
            } else {
                remote.to_string()
            }
        }

        let mut merged = local.clone();
        if !self.doi.is_empty() {
            merged.set_doi(&self.doi);
        }
        merged.title = pick(&self.title, &local.title);
        merged.authors = pick(&self.authors, &local.authors);
        if !self.year.is_empty() {
            merged.year = self.year.clone();
            merged.month = self.month;
            merged.day = self.day;
        }
        merged.venue = pick(&self.venue, &local.venue);
        merged.volume = pick(&self.volume, &local.volume);
        merged.issue = pick(&self.issue, &local.issue);
        merged.page = pick(&self.page, &local.page);
        if local.abstract_text.is_empty() {
            merged.abstract_text = self.abstract_text.clone();
        }
        merged
    }
}

/// Result of one lookup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub status: ResolutionStatus,
    pub data: Option<RegistryRecord>,
}

impl ResolutionOutcome {
    pub fn ok(data: RegistryRecord) -> Self {
        ResolutionOutcome {
            status: ResolutionStatus::Ok,
            data: Some(data),
        }
    }

    pub fn failed(status: ResolutionStatus) -> Self {
        ResolutionOutcome { status, data: None }
    }
}
