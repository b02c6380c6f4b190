//! Catalog loading and record normalization.
//!
//! A catalog is either `{"publications": {key: entry, ...}}`, `{"publications": [entry, ...]}`
//! or a bare `[entry, ...]` (the shape `pubmeta resolve` writes). Entries are loosely typed:
//! numbers where strings are expected, author lists as arrays of strings or objects, and
//! a few field aliases are all accepted. Catalog order is preserved.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{CatalogError, json_kind};
use crate::record::{PublicationRecord, PublicationType};

/// Collapse whitespace runs into single spaces and trim.
pub fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Read and normalize a catalog file. A leading UTF-8 BOM is ignored.
pub fn load_catalog(path: &Path) -> Result<Vec<PublicationRecord>, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&text)
}

pub fn parse_catalog(text: &str) -> Result<Vec<PublicationRecord>, CatalogError> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
    normalize_catalog(&value)
}

/// Pretty-print a catalog document with two-space indentation. Key order and non-ASCII
/// text are kept as written; a BOM is dropped.
pub fn format_catalog(text: &str) -> Result<String, CatalogError> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    Ok(out)
}

/// Turn a catalog document into canonical records.
pub fn normalize_catalog(catalog: &Value) -> Result<Vec<PublicationRecord>, CatalogError> {
    let publications = match catalog {
        Value::Object(obj) => match obj.get("publications") {
            Some(p) => p,
            None => {
                tracing::warn!("catalog has no `publications` entry; treating it as empty");
                return Ok(Vec::new());
            }
        },
        Value::Array(_) => catalog,
        other => return Err(CatalogError::InvalidShape(json_kind(other))),
    };

    let records: Vec<PublicationRecord> = match publications {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, entry)| normalize_entry(entry, key))
            .collect(),
        Value::Array(list) => list
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                let key = entry
                    .get("ref_key")
                    .map(|v| value_text(Some(v)))
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| idx.to_string());
                normalize_entry(entry, &key)
            })
            .collect(),
        Value::Null => Vec::new(),
        other => return Err(CatalogError::InvalidPublications(json_kind(other))),
    };

    tracing::debug!(count = records.len(), "normalized catalog");
    Ok(records)
}

/// Normalize one raw entry; `None` when it is not an object or has neither DOI nor title.
pub fn normalize_entry(entry: &Value, ref_key: &str) -> Option<PublicationRecord> {
    let Value::Object(obj) = entry else {
        tracing::debug!(ref_key, "skipping non-object catalog entry");
        return None;
    };

    let doi = value_text(field(obj, &["doi"]));
    let title = value_text(field(obj, &["title"]));
    if doi.is_empty() && title.is_empty() {
        tracing::debug!(ref_key, "discarding entry with neither DOI nor title");
        return None;
    }

    let mut record = PublicationRecord::new(clean_text(ref_key), &doi, title);
    record.authors = flatten_authors(field(obj, &["authors", "author"]));
    record.year = value_text(field(obj, &["year"]));
    record.month = bounded_int(field(obj, &["month"]), 1, 12);
    record.day = bounded_int(field(obj, &["day"]), 1, 31);
    record.venue = value_text(field(obj, &["journal", "venue"]));
    record.volume = value_text(field(obj, &["volume"]));
    record.issue = value_text(field(obj, &["issue", "number"]));
    record.page = value_text(field(obj, &["page", "pages"]));
    record.abstract_text = value_text(field(obj, &["abs", "abstract"]));
    record.graphic = value_text(field(obj, &["graph_abs", "graphic"]));
    record.kind = PublicationType::classify(&value_text(field(obj, &["type"])));
    Some(record)
}

/// Re-apply normalization to records that are already canonical. A no-op on its own
/// output.
pub fn normalize_records<I>(records: I) -> Vec<PublicationRecord>
where
    I: IntoIterator<Item = PublicationRecord>,
{
    records
        .into_iter()
        .filter_map(|mut rec| {
            let doi = rec.doi().to_string();
            rec.set_doi(&doi);
            rec.ref_key = clean_text(&rec.ref_key);
            for text in [
                &mut rec.title,
                &mut rec.authors,
                &mut rec.year,
                &mut rec.venue,
                &mut rec.volume,
                &mut rec.issue,
                &mut rec.page,
                &mut rec.abstract_text,
                &mut rec.graphic,
            ] {
                *text = clean_text(text);
            }
            rec.month = rec.month.filter(|m| (1..=12).contains(m));
            rec.day = rec.day.filter(|d| (1..=31).contains(d));
            rec.is_displayable().then_some(rec)
        })
        .collect()
}

/// Flatten an author field into `"Given Family, Given Family"`.
///
/// Accepts a plain string, or an array of strings and `{given, family}` / `{name}`
/// objects (the registry's shape).
pub fn flatten_authors(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => {
                    let given = value_text(obj.get("given"));
                    let family = value_text(obj.get("family"));
                    let joined = clean_text(&format!("{given} {family}"));
                    if joined.is_empty() {
                        value_text(obj.get("name").or_else(|| obj.get("literal")))
                    } else {
                        joined
                    }
                }
                other => value_text(Some(other)),
            })
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => value_text(other),
    }
}

/// Textual form of a loosely-typed JSON scalar.
pub(crate) fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => clean_text(s),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

fn bounded_int(value: Option<&Value>, min: u8, max: u8) -> Option<u8> {
    let n = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u8::try_from(n).ok().filter(|n| (min..=max).contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a \n\t b  "), "a b");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn map_catalog_keeps_order_and_keys() {
        let catalog = json!({"publications": {
            "zeta": {"title": "Z"},
            "alpha": {"doi": "doi:10.1/a"},
            "mid": {"title": "  M  "}
        }});
        let recs = normalize_catalog(&catalog).unwrap();
        let keys: Vec<_> = recs.iter().map(|r| r.ref_key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(recs[1].doi(), "10.1/a");
        assert_eq!(recs[2].title, "M");
    }

    #[test]
    fn list_catalog_gets_positional_keys() {
        let catalog = json!({"publications": [
            {"title": "A"},
            {"title": "B", "ref_key": "named"},
            {"nothing": true},
            {"title": "D"}
        ]});
        let recs = normalize_catalog(&catalog).unwrap();
        let keys: Vec<_> = recs.iter().map(|r| r.ref_key.as_str()).collect();
        assert_eq!(keys, vec!["0", "named", "3"]);
    }

    #[test]
    fn records_without_doi_and_title_are_discarded() {
        let catalog = json!({"publications": {
            "a": {"doi": " ", "title": "", "year": "2020"},
            "b": {"authors": "X"},
            "c": "not an entry",
            "d": {"title": "kept"}
        }});
        let recs = normalize_catalog(&catalog).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].ref_key, "d");
    }

    #[test]
    fn invalid_month_and_day_are_dropped_not_the_record() {
        let catalog = json!({"publications": {
            "a": {"title": "A", "month": 13, "day": "0"},
            "b": {"title": "B", "month": "4", "day": 31},
            "c": {"title": "C", "month": "April", "day": -1}
        }});
        let recs = normalize_catalog(&catalog).unwrap();
        assert_eq!((recs[0].month, recs[0].day), (None, None));
        assert_eq!((recs[1].month, recs[1].day), (Some(4), Some(31)));
        assert_eq!((recs[2].month, recs[2].day), (None, None));
    }

    #[test]
    fn loose_scalars_and_aliases_are_accepted() {
        let catalog = json!({"publications": {"a": {
            "title": "A", "year": 2021, "volume": 5, "issue": "2",
            "journal": "J", "abs": "text", "graph_abs": "img/a.png", "type": "INPROCEEDINGS",
            "authors": ["Jane  Doe", {"given": "John", "family": "Smith"}, {"name": "ACME Lab"}, ""]
        }}});
        let rec = &normalize_catalog(&catalog).unwrap()[0];
        assert_eq!(rec.year, "2021");
        assert_eq!(rec.volume, "5");
        assert_eq!(rec.venue, "J");
        assert_eq!(rec.abstract_text, "text");
        assert_eq!(rec.graphic, "img/a.png");
        assert_eq!(rec.kind, PublicationType::Inproceedings);
        assert_eq!(rec.authors, "Jane Doe, John Smith, ACME Lab");
    }

    #[test]
    fn bare_array_and_missing_publications() {
        assert_eq!(normalize_catalog(&json!([{"title": "A"}])).unwrap().len(), 1);
        assert!(normalize_catalog(&json!({"profile": {}})).unwrap().is_empty());
        assert!(matches!(
            normalize_catalog(&json!("x")),
            Err(CatalogError::InvalidShape("a string"))
        ));
        assert!(matches!(
            normalize_catalog(&json!({"publications": 3})),
            Err(CatalogError::InvalidPublications("a number"))
        ));
    }

    #[test]
    fn parse_catalog_ignores_bom() {
        let recs = parse_catalog("\u{feff}{\"publications\": {\"a\": {\"title\": \"A\"}}}").unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn format_keeps_key_order_and_unicode() {
        let text = "\u{feff}{\"publications\":{\"z\":{\"title\":\"数据\"},\"a\":{\"year\":2020}}}";
        let pretty = format_catalog(text).unwrap();
        assert_eq!(
            pretty,
            "{\n  \"publications\": {\n    \"z\": {\n      \"title\": \"数据\"\n    },\n    \"a\": {\n      \"year\": 2020\n    }\n  }\n}\n"
        );
        assert_eq!(format_catalog(&pretty).unwrap(), pretty);
        assert!(matches!(format_catalog("{"), Err(CatalogError::Json(_))));
    }

    #[test]
    fn resolved_output_normalizes_back_to_itself() {
        let catalog = json!({"publications": {
            "p1": {"doi": "https://doi.org/10.1/A", "title": " A ", "month": 3, "authors": "Jane Doe"},
            "p2": {"title": "B", "year": "2020", "type": "inproceedings"}
        }});
        let first = normalize_catalog(&catalog).unwrap();
        let reparsed = normalize_catalog(&serde_json::to_value(&first).unwrap()).unwrap();
        assert_eq!(reparsed, first);
    }

    #[test]
    fn normalize_records_is_idempotent() {
        let text_field = "[ -~]{0,12}";
        proptest::proptest!(|(
            key in text_field,
            doi in "(doi: ?|https://doi.org/)?[ -~]{0,16}",
            title in text_field,
            year in text_field,
            month in proptest::option::of(0u8..20),
            day in proptest::option::of(0u8..40),
        )| {
            let mut rec = PublicationRecord::new(key, &doi, title).with_year(year);
            rec.month = month;
            rec.day = day;
            let once = normalize_records(vec![rec]);
            let twice = normalize_records(once.clone());
            proptest::prop_assert_eq!(twice, once);
        })
    }
}
