use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use url::Url;

/// Registry endpoint a DOI is appended to.
pub const REGISTRY_WORKS_URL: &str = "https://api.crossref.org/works/";

const RESOLVER_URL: &str = "https://doi.org/";

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped, so a whole URL can be
/// carried inside a single query parameter.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Resolver links keep the prefix/suffix separator readable.
const LINK_ENCODE_SET: &AsciiSet = &COMPONENT_ENCODE_SET.remove(b'/');

static URL_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://(?:dx\.)?doi\.org/").unwrap());
static TEXT_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:urn:)?doi:\s*").unwrap());

/// Strip resolver URLs and `doi:` labels from a DOI and collapse whitespace.
///
/// The DOI itself keeps its case; DOIs compare case-insensitively at the registry.
pub fn normalize(raw: &str) -> String {
    let mut s = crate::normalize::clean_text(raw);
    loop {
        let stripped = URL_PREFIX_RE.replace(&s, "");
        let stripped = TEXT_PREFIX_RE.replace(&stripped, "").trim().to_string();
        if stripped == s {
            return s;
        }
        s = stripped;
    }
}

/// `https://doi.org/<doi>`, or empty when there is no DOI.
pub fn resolver_link(doi: &str) -> String {
    let doi = normalize(doi);
    if doi.is_empty() {
        return String::new();
    }
    format!("{RESOLVER_URL}{}", utf8_percent_encode(&doi, LINK_ENCODE_SET))
}

/// Direct registry URL for a DOI.
pub fn registry_url(doi: &str) -> Result<Url, url::ParseError> {
    let enc = utf8_percent_encode(doi, COMPONENT_ENCODE_SET).to_string();
    Url::parse(&format!("{REGISTRY_WORKS_URL}{enc}"))
}

/// The URL actually requested: the direct registry URL, or the proxy prefix followed by
/// the encoded direct URL.
pub fn request_target(doi: &str, proxy_prefix: Option<&str>) -> Result<Url, url::ParseError> {
    let direct = registry_url(doi)?;
    match proxy_prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => {
            let wrapped = utf8_percent_encode(direct.as_str(), COMPONENT_ENCODE_SET);
            Url::parse(&format!("{prefix}{wrapped}"))
        }
        None => Ok(direct),
    }
}
