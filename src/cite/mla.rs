//! MLA (9th edition) works-cited entry.

use chrono::Month;

use super::{is_page_range, proceedings_title, terminate};
use crate::names::parse_authors;
use crate::record::{PublicationRecord, PublicationType};

pub fn format(record: &PublicationRecord) -> String {
    let names = parse_authors(&record.authors);
    let mut out = String::new();

    if let Some(first) = names.first() {
        let lead = if first.cjk {
            first.family.clone()
        } else {
            first.family_given()
        };
        if names.len() > 1 {
            out.push_str(&format!("{lead}, et al. "));
        } else {
            out.push_str(&terminate(&lead));
            out.push(' ');
        }
    }

    if !record.title.is_empty() {
        out.push_str(&format!("\u{201c}{}\u{201d}", terminate(&record.title)));
    }

    let mut container = Vec::new();
    match record.kind {
        PublicationType::Article => {
            if !record.venue.is_empty() {
                container.push(record.venue.clone());
            }
            if !record.volume.is_empty() {
                container.push(format!("vol. {}", record.volume));
            }
            if !record.issue.is_empty() {
                container.push(format!("no. {}", record.issue));
            }
        }
        PublicationType::Inproceedings => {
            if !record.venue.is_empty() {
                container.push(proceedings_title(&record.venue));
            }
        }
    }
    if let Some(date) = date(record) {
        container.push(date);
    }
    if !record.page.is_empty() {
        let label = if is_page_range(&record.page) { "pp." } else { "p." };
        container.push(format!("{label} {}", super::page_range(&record.page)));
    }
    if !record.doi_link().is_empty() {
        container.push(record.doi_link().to_string());
    }

    if !container.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&container.join(", "));
        out.push('.');
    }
    out.trim_end().to_string()
}

/// `5 Mar. 2021`, `Mar. 2021`, or `2021`.
fn date(record: &PublicationRecord) -> Option<String> {
    if record.year.is_empty() {
        return None;
    }
    let Some(month) = record.month.and_then(|m| Month::try_from(m).ok()) else {
        return Some(record.year.clone());
    };
    let month = month_abbrev(month);
    Some(match record.day {
        Some(day) => format!("{day} {month} {}", record.year),
        None => format!("{month} {}", record.year),
    })
}

/// MLA abbreviates months longer than four letters; September becomes `Sept.`.
fn month_abbrev(month: Month) -> String {
    let name = month.name();
    match month {
        Month::May | Month::June | Month::July => name.to_string(),
        Month::September => "Sept.".to_string(),
        _ => format!("{}.", &name[..3]),
    }
}
