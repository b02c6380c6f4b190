//! GB/T 7714-2015 (sequential-numbering style, without the number).

use crate::names::{PersonName, parse_authors};
use crate::record::{PublicationRecord, PublicationType};

const MAX_AUTHORS: usize = 3;

pub fn format(record: &PublicationRecord) -> String {
    let names = parse_authors(&record.authors);
    let mut out = String::new();

    let authors = authors(&names);
    if !authors.is_empty() {
        out.push_str(&authors);
        out.push_str(". ");
    }
    out.push_str(&record.title);

    match record.kind {
        PublicationType::Article => {
            out.push_str("[J].");
            let mut source = String::new();
            push_part(&mut source, ", ", &record.venue);
            push_part(&mut source, ", ", &record.year);
            push_part(&mut source, ", ", &record.volume);
            if !record.issue.is_empty() {
                source.push_str(&format!("({})", record.issue));
            }
            push_part(&mut source, ": ", &record.page);
            if !source.is_empty() {
                out.push(' ');
                out.push_str(&source);
                out.push('.');
            }
        }
        PublicationType::Inproceedings => {
            out.push_str("[C]");
            if !record.venue.is_empty() {
                out.push_str("//");
                out.push_str(&record.venue);
            }
            out.push('.');
            let mut source = String::new();
            push_part(&mut source, ", ", &record.year);
            push_part(&mut source, ": ", &record.page);
            if !source.is_empty() {
                out.push(' ');
                out.push_str(&source);
                out.push('.');
            }
        }
    }

    if !record.doi().is_empty() {
        out.push_str(" DOI: ");
        out.push_str(record.doi());
        out.push('.');
    }
    out
}

/// `Doe J, Smith J Q, Lee A, et al`; Chinese-led lists end in `等` instead.
fn authors(names: &[PersonName]) -> String {
    let mut parts: Vec<String> = names.iter().take(MAX_AUTHORS).map(author).collect();
    if names.len() > MAX_AUTHORS {
        let more = if names[0].cjk { "等" } else { "et al" };
        parts.push(more.to_string());
    }
    parts.join(", ")
}

fn author(name: &PersonName) -> String {
    let initials = name.initials();
    if name.cjk || initials.is_empty() {
        name.family.clone()
    } else {
        format!("{} {}", name.family, initials.join(" "))
    }
}

fn push_part(buf: &mut String, sep: &str, part: &str) {
    if part.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push_str(sep);
    }
    buf.push_str(part);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> PublicationRecord {
        let mut rec = PublicationRecord::new("p", "", "T")
            .with_authors("Jane Doe, John Q. Smith, Amy Lee, Bob Young")
            .with_venue("J")
            .with_year("2021");
        rec.volume = "5".into();
        rec.page = "1-9".into();
        rec
    }

    #[test]
    fn more_than_three_authors_collapse_to_et_al() {
        let out = format(&article());
        assert!(out.starts_with("Doe J, Smith J Q, Lee A, et al. T[J]."), "{out}");
        assert_eq!(out, "Doe J, Smith J Q, Lee A, et al. T[J]. J, 2021, 5: 1-9.");
    }

    #[test]
    fn three_authors_are_all_listed() {
        let rec = article().with_authors("Jane Doe, John Q. Smith, Amy Lee");
        assert!(format(&rec).starts_with("Doe J, Smith J Q, Lee A. T[J]."));
    }

    #[test]
    fn chinese_authors_use_deng() {
        let rec = article().with_authors("张三, 李四, 王五, 赵六");
        assert!(format(&rec).starts_with("张三, 李四, 王五, 等. T[J]."));
    }

    #[test]
    fn issue_and_doi_are_included() {
        let mut rec = article();
        rec.issue = "2".into();
        rec.set_doi("10.1/x");
        assert_eq!(
            format(&rec),
            "Doe J, Smith J Q, Lee A, et al. T[J]. J, 2021, 5(2): 1-9. DOI: 10.1/x."
        );
    }

    #[test]
    fn conference_template() {
        let rec = article()
            .with_authors("Jane Doe")
            .with_venue("Proceedings of ICML")
            .with_kind(PublicationType::Inproceedings);
        assert_eq!(format(&rec), "Doe J. T[C]//Proceedings of ICML. 2021: 1-9.");
    }

    #[test]
    fn sparse_record_still_formats() {
        let rec = PublicationRecord::new("p", "", "Only Title");
        assert_eq!(format(&rec), "Only Title[J].");
    }
}
