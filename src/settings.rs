//! The `publications` block of the site settings document.
//!
//! Values are read leniently: a wrong type or an out-of-range number falls back to the
//! default (or is capped) instead of failing. Only an unreadable file or malformed JSON
//! is an error.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::SettingsError;
use crate::normalize::clean_text;
use crate::resolver::ResolverConfig;
use crate::view::ViewMode;

const GRID_SIDE_MAX: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationSettings {
    pub resolve_doi_enabled: bool,
    pub doi_timeout_ms: u64,
    pub doi_request_interval_ms: u64,
    pub doi_stop_after_failures: u32,
    /// Empty when requests go straight to the registry.
    pub doi_proxy_url_prefix: String,
    pub author_highlight_keywords: Vec<String>,
    pub home: HomeSettings,
    pub page: PageSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeSettings {
    pub page_size: usize,
    pub show_graphic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub list_page_size: usize,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub grid_page_size: usize,
    pub default_view: ViewMode,
    pub default_view_mobile: ViewMode,
    pub list_show_graphic: bool,
    pub grid_show_graphic: bool,
}

impl Default for PublicationSettings {
    fn default() -> Self {
        PublicationSettings {
            resolve_doi_enabled: true,
            doi_timeout_ms: 12_000,
            doi_request_interval_ms: 300,
            doi_stop_after_failures: 5,
            doi_proxy_url_prefix: String::new(),
            author_highlight_keywords: Vec::new(),
            home: HomeSettings {
                page_size: 5,
                show_graphic: true,
            },
            page: PageSettings {
                list_page_size: 10,
                grid_rows: 3,
                grid_cols: 3,
                grid_page_size: 9,
                default_view: ViewMode::List,
                default_view_mobile: ViewMode::List,
                list_show_graphic: true,
                grid_show_graphic: false,
            },
        }
    }
}

impl PublicationSettings {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            enabled: self.resolve_doi_enabled,
            timeout: Duration::from_millis(self.doi_timeout_ms),
            request_interval: Duration::from_millis(self.doi_request_interval_ms),
            stop_after_failures: self.doi_stop_after_failures,
            proxy_prefix: (!self.doi_proxy_url_prefix.is_empty())
                .then(|| self.doi_proxy_url_prefix.clone()),
        }
    }

    pub fn initial_view(&self, mobile: bool) -> ViewMode {
        if mobile {
            self.page.default_view_mobile
        } else {
            self.page.default_view
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default, deserialize_with = "lenient")]
    publications: RawPublications,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPublications {
    resolve_doi_enabled: Option<Value>,
    doi_timeout_ms: Option<Value>,
    doi_request_interval_ms: Option<Value>,
    doi_stop_after_failures: Option<Value>,
    doi_proxy_url_prefix: Option<Value>,
    author_highlight_keywords: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    home: RawHome,
    #[serde(deserialize_with = "lenient")]
    page: RawPage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHome {
    page_size: Option<Value>,
    show_graph_abs: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPage {
    list_page_size: Option<Value>,
    grid_shape: Option<Value>,
    grid_page_size: Option<Value>,
    default_view: Option<Value>,
    default_view_mobile: Option<Value>,
    list_show_graph_abs: Option<Value>,
    grid_show_graph_abs: Option<Value>,
}

/// A block of the wrong shape reads as an empty block.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Read the settings file, or use the defaults when there is none.
pub fn load_settings(path: Option<&Path>) -> Result<PublicationSettings, SettingsError> {
    let Some(path) = path else {
        return Ok(PublicationSettings::default());
    };
    let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&text)
}

pub fn parse_settings(text: &str) -> Result<PublicationSettings, SettingsError> {
    let raw: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
    let doc: RawDocument = serde_json::from_value(raw).unwrap_or_default();
    Ok(doc.publications.into_settings())
}

impl RawPublications {
    fn into_settings(self) -> PublicationSettings {
        let defaults = PublicationSettings::default();
        let page = &self.page;

        let (grid_rows, grid_cols, grid_page_size) = match grid_shape(page.grid_shape.as_ref()) {
            Some((rows, cols)) => (rows, cols, rows * cols),
            None => (
                defaults.page.grid_rows,
                defaults.page.grid_cols,
                positive(page.grid_page_size.as_ref(), defaults.page.grid_page_size as u64, 120)
                    as usize,
            ),
        };
        let default_view = page
            .default_view
            .as_ref()
            .and_then(Value::as_str)
            .map(ViewMode::from_setting)
            .unwrap_or(defaults.page.default_view);
        let default_view_mobile = page
            .default_view_mobile
            .as_ref()
            .and_then(Value::as_str)
            .map(ViewMode::from_setting)
            .unwrap_or(default_view);

        PublicationSettings {
            // Only an explicit `false` turns lookups off.
            resolve_doi_enabled: !matches!(self.resolve_doi_enabled, Some(Value::Bool(false))),
            doi_timeout_ms: positive(self.doi_timeout_ms.as_ref(), defaults.doi_timeout_ms, 60_000),
            doi_request_interval_ms: non_negative(
                self.doi_request_interval_ms.as_ref(),
                defaults.doi_request_interval_ms,
                60_000,
            ),
            doi_stop_after_failures: positive(
                self.doi_stop_after_failures.as_ref(),
                defaults.doi_stop_after_failures.into(),
                100,
            ) as u32,
            doi_proxy_url_prefix: self
                .doi_proxy_url_prefix
                .as_ref()
                .and_then(Value::as_str)
                .map(clean_text)
                .unwrap_or_default(),
            author_highlight_keywords: match &self.author_highlight_keywords {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(clean_text(s)),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .filter(|s| !s.is_empty())
                    .collect(),
                _ => defaults.author_highlight_keywords,
            },
            home: HomeSettings {
                page_size: positive(self.home.page_size.as_ref(), defaults.home.page_size as u64, 60)
                    as usize,
                show_graphic: flag(self.home.show_graph_abs.as_ref(), defaults.home.show_graphic),
            },
            page: PageSettings {
                list_page_size: positive(
                    page.list_page_size.as_ref(),
                    defaults.page.list_page_size as u64,
                    120,
                ) as usize,
                grid_rows,
                grid_cols,
                grid_page_size,
                default_view,
                default_view_mobile,
                list_show_graphic: flag(
                    page.list_show_graph_abs.as_ref(),
                    defaults.page.list_show_graphic,
                ),
                grid_show_graphic: flag(
                    page.grid_show_graph_abs.as_ref(),
                    defaults.page.grid_show_graphic,
                ),
            },
        }
    }
}

/// Integer from a number or a numeric string; fractions are truncated.
fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn positive(value: Option<&Value>, fallback: u64, max: u64) -> u64 {
    match integer(value) {
        Some(n) if n > 0 => (n as u64).min(max),
        _ => fallback,
    }
}

fn non_negative(value: Option<&Value>, fallback: u64, max: u64) -> u64 {
    match integer(value) {
        Some(n) if n >= 0 => (n as u64).min(max),
        _ => fallback,
    }
}

/// `[rows, cols]`, each positive and capped. Anything else means "no shape".
fn grid_shape(value: Option<&Value>) -> Option<(usize, usize)> {
    let Some(Value::Array(items)) = value else {
        return None;
    };
    let side = |v: Option<&Value>| match integer(v) {
        Some(n) if n > 0 => Some((n as usize).min(GRID_SIDE_MAX)),
        _ => None,
    };
    Some((side(items.first())?, side(items.get(1))?))
}

/// Missing or null keeps the default; other values use their truthiness.
fn flag(value: Option<&Value>, fallback: bool) -> bool {
    match value {
        None | Some(Value::Null) => fallback,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
