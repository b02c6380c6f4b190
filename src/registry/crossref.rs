use std::time::Duration;

use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use serde_json::{Map, Value};

use super::{Registry, RegistryRecord, ResolutionOutcome, ResolutionStatus};
use crate::identifier::doi;
use crate::normalize::{clean_text, flatten_authors, value_text};

const USER_AGENT: &str = concat!("pubmeta/", env!("CARGO_PKG_VERSION"));

/// Crossref `works` client. One blocking request per lookup, bounded by `timeout`.
pub struct CrossrefClient {
    agent: ureq::Agent,
    proxy_prefix: Option<String>,
}

impl CrossrefClient {
    pub fn new(timeout: Duration, proxy_prefix: Option<String>) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        CrossrefClient {
            agent: ureq::Agent::new_with_config(cfg),
            proxy_prefix: proxy_prefix
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        }
    }
}

impl Registry for CrossrefClient {
    fn lookup(&self, doi: &str) -> ResolutionOutcome {
        let doi = doi::normalize(doi);
        if doi.is_empty() {
            return ResolutionOutcome::failed(ResolutionStatus::Empty);
        }

        let target = match doi::request_target(&doi, self.proxy_prefix.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%doi, "cannot build registry URL: {e}");
                return ResolutionOutcome::failed(ResolutionStatus::Network);
            }
        };

        let mut res = match self
            .agent
            .get(target.as_str())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call()
        {
            Ok(res) => res,
            Err(e) => {
                tracing::debug!(%doi, "registry request failed: {e}");
                return ResolutionOutcome::failed(transport_status(&e));
            }
        };

        let status = res.status().as_u16();
        if !(200..300).contains(&status) {
            return classify_response(status, "");
        }
        match res.body_mut().read_to_string() {
            Ok(body) => classify_response(status, &body),
            Err(e) => {
                tracing::debug!(%doi, "failed to read registry body: {e}");
                ResolutionOutcome::failed(transport_status(&e))
            }
        }
    }
}

fn transport_status(err: &ureq::Error) -> ResolutionStatus {
    match err {
        ureq::Error::Timeout(_) => ResolutionStatus::Timeout,
        ureq::Error::StatusCode(code) => status_for_code(*code),
        _ => ResolutionStatus::Network,
    }
}

fn status_for_code(code: u16) -> ResolutionStatus {
    match code {
        404 => ResolutionStatus::NotFound,
        429 => ResolutionStatus::RateLimited,
        _ => ResolutionStatus::Http(code),
    }
}

/// Classify an HTTP response from the registry (or the proxy in front of it).
pub fn classify_response(status: u16, body: &str) -> ResolutionOutcome {
    if !(200..300).contains(&status) {
        return ResolutionOutcome::failed(status_for_code(status));
    }
    match parse_message(body) {
        Some(record) => ResolutionOutcome::ok(record),
        None => ResolutionOutcome::failed(ResolutionStatus::InvalidPayload),
    }
}

/// Parse a `works/{doi}` body. `None` when it is not JSON or has no message object.
///
/// Some proxies unwrap the envelope, so a bare message (an object carrying `DOI`) is
/// accepted too.
pub fn parse_message(body: &str) -> Option<RegistryRecord> {
    let payload: Value = serde_json::from_str(body).ok()?;
    let message = match payload.get("message") {
        Some(Value::Object(message)) => message,
        Some(_) => return None,
        None => match &payload {
            Value::Object(obj) if obj.contains_key("DOI") => obj,
            _ => return None,
        },
    };

    let (year, month, day) = issued(message);
    Some(RegistryRecord {
        doi: doi::normalize(&value_text(message.get("DOI"))),
        title: first_text(message.get("title")),
        authors: flatten_authors(message.get("author")),
        year,
        month,
        day,
        venue: first_text(message.get("container-title")),
        volume: value_text(message.get("volume")),
        issue: value_text(message.get("issue")),
        page: value_text(message.get("page")),
        abstract_text: message
            .get("abstract")
            .and_then(Value::as_str)
            .map(strip_jats)
            .unwrap_or_default(),
    })
}

/// First element of a Crossref string array (or the value itself when it is a scalar).
fn first_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| value_text(Some(v)))
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        other => value_text(other),
    }
}

/// `issued.date-parts[0]`, falling back to the print and online dates.
fn issued(message: &Map<String, Value>) -> (String, Option<u8>, Option<u8>) {
    for key in ["issued", "published-print", "published-online"] {
        let Some(parts) = message
            .get(key)
            .and_then(|d| d.get("date-parts"))
            .and_then(|p| p.get(0))
            .and_then(Value::as_array)
        else {
            continue;
        };
        let part = |idx: usize| -> Option<i64> {
            match parts.get(idx)? {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
        };
        let Some(year) = part(0).filter(|y| *y > 0) else {
            continue;
        };
        let month = part(1)
            .and_then(|m| u8::try_from(m).ok())
            .filter(|m| (1..=12).contains(m));
        let day = part(2)
            .and_then(|d| u8::try_from(d).ok())
            .filter(|d| (1..=31).contains(d));
        return (year.to_string(), month, day);
    }
    (String::new(), None, None)
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Reduce a JATS abstract (`<jats:p>…</jats:p>`) to plain text, dropping section titles.
pub fn strip_jats(xml: &str) -> String {
    fn is_local(name: &[u8], target: &str) -> bool {
        match name.iter().rposition(|&b| b == b':') {
            Some(pos) => &name[pos + 1..] == target.as_bytes(),
            None => name == target.as_bytes(),
        }
    }

    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_title = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                if is_local(e.name().as_ref(), "title") {
                    in_title += 1;
                }
            }
            Ok(Event::End(e)) => {
                if is_local(e.name().as_ref(), "title") {
                    in_title = in_title.saturating_sub(1);
                }
                text.push(' ');
            }
            Ok(Event::Text(t)) if in_title == 0 => {
                text.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Ok(Event::CData(t)) if in_title == 0 => {
                text.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Ok(Event::GeneralRef(r)) if in_title == 0 => {
                match &*r {
                    b"amp" => text.push('&'),
                    b"lt" => text.push('<'),
                    b"gt" => text.push('>'),
                    b"quot" => text.push('"'),
                    b"apos" => text.push('\''),
                    _ => {}
                }
            }
            Err(_) => return clean_text(&TAG_RE.replace_all(xml, " ")),
            _ => {}
        }
        buf.clear();
    }
    clean_text(&text)
}
