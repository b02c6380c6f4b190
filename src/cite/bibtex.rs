//! BibTeX entry with a deterministic citation key.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::names::{PersonName, split_authors};
use crate::record::{PublicationRecord, PublicationType};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

pub fn format(record: &PublicationRecord) -> String {
    let (entry_type, venue_field) = match record.kind {
        PublicationType::Article => ("article", "journal"),
        PublicationType::Inproceedings => ("inproceedings", "booktitle"),
    };

    let authors = split_authors(&record.authors).join(" and ");
    let month = record.month.map(|m| m.to_string()).unwrap_or_default();
    let pages = record.page.replace("--", "-").replace(['-', '–'], "--");

    let fields: [(&str, String); 9] = [
        ("author", escape(&authors)),
        ("title", escape(&record.title)),
        (venue_field, escape(&record.venue)),
        ("year", record.year.clone()),
        ("month", month),
        ("volume", escape(&record.volume)),
        ("number", escape(&record.issue)),
        ("pages", pages),
        ("doi", record.doi().to_string()),
    ];

    let mut out = format!("@{entry_type}{{{},\n", citation_key(record));
    let body: Vec<String> = fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("  {name} = {{{value}}}"))
        .collect();
    out.push_str(&body.join(",\n"));
    if !body.is_empty() {
        out.push('\n');
    }
    out.push('}');
    out
}

/// The catalog key when it is a usable identifier, else first-author family name plus
/// year (`doe2021`).
pub fn citation_key(record: &PublicationRecord) -> String {
    let from_ref: String = record
        .ref_key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
        .collect();
    if from_ref.chars().any(|c| c.is_ascii_alphabetic()) {
        return from_ref;
    }

    let family: String = split_authors(&record.authors)
        .first()
        .and_then(|name| PersonName::parse(name))
        .map(|name| {
            name.family
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|family| !family.is_empty())
        .unwrap_or_else(|| "ref".to_string());
    let year = YEAR_RE
        .find(&record.year)
        .map(|m| m.as_str())
        .unwrap_or_default();
    format!("{family}{year}")
}

/// Escape the characters that break LaTeX inside a braced field.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' | '%' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(ref_key: &str) -> PublicationRecord {
        let mut rec = PublicationRecord::new(ref_key, "10.1/x_y", "Tests & Proofs")
            .with_authors("Jane Doe, John Q. Smith")
            .with_venue("J")
            .with_year("2021");
        rec.volume = "5".into();
        rec.page = "1-9".into();
        rec
    }

    #[test]
    fn article_entry_layout() {
        assert_eq!(
            format(&article("doe2021tests")),
            "@article{doe2021tests,\n  author = {Jane Doe and John Q. Smith},\n  title = {Tests \\& Proofs},\n  journal = {J},\n  year = {2021},\n  volume = {5},\n  pages = {1--9},\n  doi = {10.1/x_y}\n}"
        );
    }

    #[test]
    fn conference_uses_booktitle() {
        let rec = article("k").with_kind(PublicationType::Inproceedings);
        let out = format(&rec);
        assert!(out.starts_with("@inproceedings{k,\n"));
        assert!(out.contains("  booktitle = {J},\n"));
        assert!(!out.contains("journal"));
    }

    #[test]
    fn key_falls_back_to_family_and_year() {
        assert_eq!(citation_key(&article("3")), "doe2021");
        assert_eq!(citation_key(&article("  ")), "doe2021");
        assert_eq!(citation_key(&article("my key!")), "mykey");

        let cjk = article("0").with_authors("张三").with_year("c. 2019");
        assert_eq!(citation_key(&cjk), "ref2019");
    }

    #[test]
    fn key_is_stable_for_any_ref_key() {
        proptest::proptest!(|(key in "[ -~]{0,16}")| {
            let rec = article(&key);
            let a = citation_key(&rec);
            proptest::prop_assert_eq!(a.clone(), citation_key(&rec.clone()));
            proptest::prop_assert!(!a.is_empty());
            proptest::prop_assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || "_-:.".contains(c)));
        })
    }

    #[test]
    fn empty_record_is_still_well_formed() {
        let rec = PublicationRecord::new("0", "10.1/z", "");
        assert_eq!(format(&rec), "@article{ref,\n  doi = {10.1/z}\n}");
    }
}
