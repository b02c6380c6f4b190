//! APA (7th edition) reference entry.

use super::{page_range, proceedings_title, terminate};
use crate::names::{PersonName, parse_authors};
use crate::record::{PublicationRecord, PublicationType};

pub fn format(record: &PublicationRecord) -> String {
    let names = parse_authors(&record.authors);
    let year = if record.year.is_empty() {
        "n.d."
    } else {
        record.year.as_str()
    };

    let mut out = String::new();
    let authors = authors(&names);
    if authors.is_empty() {
        if !record.title.is_empty() {
            out.push_str(&terminate(&record.title));
            out.push(' ');
        }
        out.push_str(&format!("({year})."));
    } else {
        out.push_str(&format!("{authors} ({year})."));
        if !record.title.is_empty() {
            out.push(' ');
            out.push_str(&terminate(&record.title));
        }
    }

    match record.kind {
        PublicationType::Article => {
            let mut source = record.venue.clone();
            if !record.volume.is_empty() {
                if !source.is_empty() {
                    source.push_str(", ");
                }
                source.push_str(&record.volume);
            }
            if !record.issue.is_empty() {
                source.push_str(&format!("({})", record.issue));
            }
            if !record.page.is_empty() {
                if !source.is_empty() {
                    source.push_str(", ");
                }
                source.push_str(&page_range(&record.page));
            }
            if !source.is_empty() {
                out.push(' ');
                out.push_str(&source);
                out.push('.');
            }
        }
        PublicationType::Inproceedings => {
            if !record.venue.is_empty() {
                out.push_str(&format!(" In {}", proceedings_title(&record.venue)));
                if !record.page.is_empty() {
                    out.push_str(&format!(" (pp. {})", page_range(&record.page)));
                }
                out.push('.');
            }
        }
    }

    if !record.doi_link().is_empty() {
        out.push(' ');
        out.push_str(record.doi_link());
    }
    out
}

/// `Doe, J., Smith, J. Q., & Lee, A.`
fn authors(names: &[PersonName]) -> String {
    let parts: Vec<String> = names.iter().map(author).collect();
    match parts.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{}, & {}", init.join(", "), last),
    }
}

fn author(name: &PersonName) -> String {
    let initials = name.initials();
    if name.cjk || initials.is_empty() {
        return name.family.clone();
    }
    let initials: Vec<String> = initials
        .iter()
        .map(|i| format!("{}.", i.replace('-', ".-")))
        .collect();
    format!("{}, {}", name.family, initials.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> PublicationRecord {
        let mut rec = PublicationRecord::new("p", "10.1/x", "Deterministic things")
            .with_authors("Jane Doe, John Q. Smith, Amy Lee, Bob Young")
            .with_venue("Journal of Tests")
            .with_year("2021");
        rec.volume = "5".into();
        rec.issue = "2".into();
        rec.page = "1-9".into();
        rec
    }

    #[test]
    fn all_authors_with_ampersand_before_last() {
        assert_eq!(
            format(&article()),
            "Doe, J., Smith, J. Q., Lee, A., & Young, B. (2021). Deterministic things. Journal of Tests, 5(2), 1–9. https://doi.org/10.1/x"
        );
    }

    #[test]
    fn two_and_one_authors() {
        let rec = article().with_authors("Jane Doe, Jean-Paul Sartre");
        assert!(format(&rec).starts_with("Doe, J., & Sartre, J.-P. (2021)."));
        let rec = article().with_authors("Jane Doe");
        assert!(format(&rec).starts_with("Doe, J. (2021)."));
    }

    #[test]
    fn missing_year_and_authors() {
        let rec = PublicationRecord::new("p", "", "Untimed");
        assert_eq!(format(&rec), "Untimed. (n.d.).");
    }

    #[test]
    fn conference_template() {
        let rec = article()
            .with_authors("Jane Doe")
            .with_venue("NeurIPS")
            .with_kind(PublicationType::Inproceedings);
        assert_eq!(
            format(&rec),
            "Doe, J. (2021). Deterministic things. In Proceedings of NeurIPS (pp. 1–9). https://doi.org/10.1/x"
        );
    }
}
