//! Filter, sort and paginate a record list for one presentation surface.
//!
//! Everything here is a pure derivation from `(records, ViewState)`; records are only
//! ever borrowed.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::record::PublicationRecord;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Catalog order.
    #[default]
    Default,
    TimeAsc,
    TimeDesc,
}

impl SortMode {
    /// The sort button cycles default, newest first, oldest first.
    pub fn next(self) -> Self {
        match self {
            SortMode::Default => SortMode::TimeDesc,
            SortMode::TimeDesc => SortMode::TimeAsc,
            SortMode::TimeAsc => SortMode::Default,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMode::Default => "default",
            SortMode::TimeAsc => "time_asc",
            SortMode::TimeDesc => "time_desc",
        })
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "default" => Ok(SortMode::Default),
            "time_asc" => Ok(SortMode::TimeAsc),
            "time_desc" => Ok(SortMode::TimeDesc),
            _ => Err(format!("unknown sort mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

impl ViewMode {
    /// `grid` selects the grid; anything else is a list.
    pub fn from_setting(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("grid") {
            ViewMode::Grid
        } else {
            ViewMode::List
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(ViewMode::List),
            "grid" => Ok(ViewMode::Grid),
            _ => Err(format!("unknown view mode: {s}")),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::List => "list",
            ViewMode::Grid => "grid",
        })
    }
}

/// Per-surface view state. Year bounds are kept private so they are always positive and
/// ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub sort_mode: SortMode,
    min_year: Option<u32>,
    max_year: Option<u32>,
    /// 1-based; clamped when a page is derived.
    pub page: usize,
    pub page_size: usize,
    pub mode: ViewMode,
    pub show_graphic: bool,
}

impl ViewState {
    pub fn new(page_size: usize, mode: ViewMode, show_graphic: bool) -> Self {
        ViewState {
            sort_mode: SortMode::Default,
            min_year: None,
            max_year: None,
            page: 1,
            page_size: page_size.max(1),
            mode,
            show_graphic,
        }
    }

    pub fn year_bounds(&self) -> (Option<u32>, Option<u32>) {
        (self.min_year, self.max_year)
    }

    /// Zero bounds are ignored; inverted bounds are swapped.
    pub fn set_year_bounds(&mut self, min: Option<u32>, max: Option<u32>) {
        let min = min.filter(|y| *y > 0);
        let max = max.filter(|y| *y > 0);
        (self.min_year, self.max_year) = match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
            bounds => bounds,
        };
    }

    pub fn clear_year_bounds(&mut self) {
        self.min_year = None;
        self.max_year = None;
    }

    pub fn filter_active(&self) -> bool {
        self.min_year.is_some() || self.max_year.is_some()
    }

    /// Filter, sort and cut out the requested page.
    pub fn derive<'a>(&self, records: &'a [PublicationRecord]) -> PageSlice<'a> {
        let filtered = filter_records(records, self.min_year, self.max_year);
        let ordered = order(filtered, self.sort_mode);
        let size = self.page_size.max(1);
        let (page, total_pages) = clamp_page(ordered.len(), self.page, size);
        let items = ordered
            .iter()
            .skip((page - 1) * size)
            .take(size)
            .copied()
            .collect();
        PageSlice {
            items,
            page,
            total_pages,
            total_items: ordered.len(),
            buttons: page_buttons(page, total_pages),
        }
    }
}

/// One derived page of a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSlice<'a> {
    pub items: Vec<&'a PublicationRecord>,
    pub page: usize,
    pub total_pages: usize,
    /// Records left after filtering, across all pages.
    pub total_items: usize,
    pub buttons: Vec<PageButton>,
}

/// First four-digit run in the year field.
pub fn parse_year(year: &str) -> Option<u32> {
    YEAR_RE
        .find(year)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|y| *y > 0)
}

/// `year * 10000 + month * 100 + day`, with missing month and day counted as zero.
pub fn sort_stamp(record: &PublicationRecord) -> Option<u32> {
    let year = parse_year(&record.year)?;
    let month = u32::from(record.month.unwrap_or(0));
    let day = u32::from(record.day.unwrap_or(0));
    Some(year * 10_000 + month * 100 + day)
}

/// Keep records whose year satisfies every bound that is set. Undated records survive
/// only when no bound is set.
pub fn filter_records(
    records: &[PublicationRecord],
    min_year: Option<u32>,
    max_year: Option<u32>,
) -> Vec<&PublicationRecord> {
    if min_year.is_none() && max_year.is_none() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|rec| match parse_year(&rec.year) {
            Some(year) => {
                min_year.is_none_or(|min| year >= min) && max_year.is_none_or(|max| year <= max)
            }
            None => false,
        })
        .collect()
}

pub fn sort_records(records: &[PublicationRecord], mode: SortMode) -> Vec<&PublicationRecord> {
    order(records.iter().collect(), mode)
}

/// Dated records first in the requested direction, undated ones after them; ties keep
/// their incoming order.
fn order(records: Vec<&PublicationRecord>, mode: SortMode) -> Vec<&PublicationRecord> {
    let descending = match mode {
        SortMode::Default => return records,
        SortMode::TimeAsc => false,
        SortMode::TimeDesc => true,
    };

    let mut keyed: Vec<(usize, Option<u32>, &PublicationRecord)> = records
        .into_iter()
        .enumerate()
        .map(|(idx, rec)| (idx, sort_stamp(rec), rec))
        .collect();
    keyed.sort_by(|a, b| {
        let by_stamp = match (a.1, b.1) {
            (Some(x), Some(y)) if descending => y.cmp(&x),
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_stamp.then(a.0.cmp(&b.0))
    });
    keyed.into_iter().map(|(_, _, rec)| rec).collect()
}

/// Clamp `page` into `[1, total_pages]`; an empty list still has one page.
pub fn clamp_page(count: usize, page: usize, page_size: usize) -> (usize, usize) {
    let total_pages = count.div_ceil(page_size.max(1)).max(1);
    (page.clamp(1, total_pages), total_pages)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageButton {
    First { target: usize, disabled: bool },
    Prev { target: usize, disabled: bool },
    Page { number: usize, current: bool },
    Ellipsis,
    Next { target: usize, disabled: bool },
    Last { target: usize, disabled: bool },
}

impl PageButton {
    pub fn label(&self) -> String {
        match self {
            PageButton::First { .. } => "«".to_string(),
            PageButton::Prev { .. } => "‹".to_string(),
            PageButton::Page { number, .. } => number.to_string(),
            PageButton::Ellipsis => "...".to_string(),
            PageButton::Next { .. } => "›".to_string(),
            PageButton::Last { .. } => "»".to_string(),
        }
    }
}

/// Button row: first/prev, page 1, the neighbours of the current page, the last page,
/// then next/last. Gaps become a single ellipsis. Empty when there is only one page.
pub fn page_buttons(page: usize, total_pages: usize) -> Vec<PageButton> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let page = page.clamp(1, total_pages);

    let mut numbers = vec![1];
    numbers.extend(page.saturating_sub(1).max(2)..=(page + 1).min(total_pages - 1));
    numbers.push(total_pages);

    let mut row = vec![
        PageButton::First {
            target: 1,
            disabled: page <= 1,
        },
        PageButton::Prev {
            target: (page - 1).max(1),
            disabled: page <= 1,
        },
    ];
    let mut last = 0;
    for number in numbers {
        if number - last > 1 {
            row.push(PageButton::Ellipsis);
        }
        row.push(PageButton::Page {
            number,
            current: number == page,
        });
        last = number;
    }
    row.push(PageButton::Next {
        target: (page + 1).min(total_pages),
        disabled: page >= total_pages,
    });
    row.push(PageButton::Last {
        target: total_pages,
        disabled: page >= total_pages,
    });
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::Strategy;

    fn rec(key: &str, year: &str) -> PublicationRecord {
        PublicationRecord::new(key, "", format!("T {key}")).with_year(year)
    }

    fn keys<'a>(records: &[&'a PublicationRecord]) -> Vec<&'a str> {
        records.iter().map(|r| r.ref_key.as_str()).collect()
    }

    fn labels(buttons: &[PageButton]) -> String {
        buttons.iter().map(PageButton::label).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn year_is_first_four_digit_run() {
        assert_eq!(parse_year("2021"), Some(2021));
        assert_eq!(parse_year("Spring 2019/2020"), Some(2019));
        assert_eq!(parse_year("in press"), None);
        assert_eq!(parse_year("0000"), None);
        assert_eq!(parse_year("21"), None);
    }

    #[test]
    fn bounds_swap_and_drop_zero() {
        let mut state = ViewState::new(10, ViewMode::List, true);
        state.set_year_bounds(Some(2022), Some(2018));
        assert_eq!(state.year_bounds(), (Some(2018), Some(2022)));
        state.set_year_bounds(Some(0), Some(2020));
        assert_eq!(state.year_bounds(), (None, Some(2020)));
        assert!(state.filter_active());
        state.clear_year_bounds();
        assert!(!state.filter_active());
    }

    #[test]
    fn filter_drops_undated_only_when_bounded() {
        let records = [rec("a", "2018"), rec("b", ""), rec("c", "2021"), rec("d", "2019")];
        assert_eq!(keys(&filter_records(&records, None, None)), ["a", "b", "c", "d"]);
        assert_eq!(keys(&filter_records(&records, Some(2019), None)), ["c", "d"]);
        assert_eq!(keys(&filter_records(&records, None, Some(2019))), ["a", "d"]);
        assert_eq!(keys(&filter_records(&records, Some(2019), Some(2019))), ["d"]);
    }

    #[test]
    fn time_sort_uses_month_and_day_and_puts_undated_last() {
        let mut march = rec("march", "2020");
        march.month = Some(3);
        let mut march_9 = rec("march_9", "2020");
        march_9.month = Some(3);
        march_9.day = Some(9);
        let records = [
            rec("undated", "n/a"),
            march,
            rec("plain", "2020"),
            march_9,
            rec("old", "2019"),
            rec("undated2", ""),
        ];
        assert_eq!(
            keys(&sort_records(&records, SortMode::TimeDesc)),
            ["march_9", "march", "plain", "old", "undated", "undated2"]
        );
        assert_eq!(
            keys(&sort_records(&records, SortMode::TimeAsc)),
            ["old", "plain", "march", "march_9", "undated", "undated2"]
        );
        assert_eq!(
            keys(&sort_records(&records, SortMode::Default)),
            ["undated", "march", "plain", "march_9", "old", "undated2"]
        );
    }

    #[test]
    fn resorting_is_a_no_op() {
        let record = (proptest::option::of(1990u32..2030), proptest::option::of(1u8..=12))
            .prop_map(|(year, month)| (year.map(|y| y.to_string()).unwrap_or_default(), month));
        proptest::proptest!(|(raw in proptest::collection::vec(record, 0..40), asc in proptest::bool::ANY)| {
            let mode = if asc { SortMode::TimeAsc } else { SortMode::TimeDesc };
            let records: Vec<PublicationRecord> = raw
                .iter()
                .enumerate()
                .map(|(idx, (year, month))| {
                    let mut r = rec(&idx.to_string(), year);
                    r.month = *month;
                    r
                })
                .collect();
            let once: Vec<PublicationRecord> =
                sort_records(&records, mode).into_iter().cloned().collect();
            let twice: Vec<PublicationRecord> =
                sort_records(&once, mode).into_iter().cloned().collect();
            proptest::prop_assert_eq!(once, twice);
        })
    }

    #[test]
    fn out_of_range_pages_are_clamped() {
        proptest::proptest!(|(count in 0usize..200, size in 1usize..30, page in 0usize..100)| {
            let (clamped, total) = clamp_page(count, page, size);
            proptest::prop_assert!(total >= 1);
            proptest::prop_assert!((1..=total).contains(&clamped));
            if count > 0 {
                proptest::prop_assert!((clamped - 1) * size < count);
            }
        })
    }

    #[test]
    fn derive_returns_the_clamped_page() {
        let records: Vec<PublicationRecord> =
            (0..7).map(|i| rec(&format!("r{i}"), "2020")).collect();
        let mut state = ViewState::new(3, ViewMode::List, false);
        state.page = 9;
        let slice = state.derive(&records);
        assert_eq!((slice.page, slice.total_pages, slice.total_items), (3, 3, 7));
        assert_eq!(keys(&slice.items), ["r6"]);

        state.page = 0;
        let slice = state.derive(&records);
        assert_eq!(slice.page, 1);
        assert_eq!(keys(&slice.items), ["r0", "r1", "r2"]);

        state.set_year_bounds(Some(2030), None);
        let slice = state.derive(&records);
        assert_eq!((slice.page, slice.total_pages), (1, 1));
        assert!(slice.items.is_empty());
        assert!(slice.buttons.is_empty());
    }

    #[test]
    fn button_window_shows_neighbours_and_gaps() {
        assert_eq!(labels(&page_buttons(1, 1)), "");
        assert_eq!(labels(&page_buttons(1, 2)), "« ‹ 1 2 › »");
        assert_eq!(labels(&page_buttons(1, 10)), "« ‹ 1 2 ... 10 › »");
        assert_eq!(labels(&page_buttons(5, 10)), "« ‹ 1 ... 4 5 6 ... 10 › »");
        assert_eq!(labels(&page_buttons(3, 5)), "« ‹ 1 2 3 4 5 › »");
        assert_eq!(labels(&page_buttons(10, 10)), "« ‹ 1 ... 9 10 › »");
    }

    #[test]
    fn edge_buttons_are_disabled_at_the_ends() {
        let row = page_buttons(1, 4);
        assert_eq!(row[0], PageButton::First { target: 1, disabled: true });
        assert_eq!(row[1], PageButton::Prev { target: 1, disabled: true });
        assert_eq!(row[2], PageButton::Page { number: 1, current: true });
        assert_eq!(row[row.len() - 2], PageButton::Next { target: 2, disabled: false });

        let row = page_buttons(4, 4);
        assert_eq!(row[row.len() - 1], PageButton::Last { target: 4, disabled: true });
        assert_eq!(row[1], PageButton::Prev { target: 3, disabled: false });
    }

    #[test]
    fn sort_modes_cycle_and_parse() {
        assert_eq!(SortMode::Default.next(), SortMode::TimeDesc);
        assert_eq!(SortMode::TimeDesc.next().next(), SortMode::Default);
        assert_eq!("time-desc".parse::<SortMode>(), Ok(SortMode::TimeDesc));
        assert_eq!("TIME_ASC".parse::<SortMode>(), Ok(SortMode::TimeAsc));
        assert!("year".parse::<SortMode>().is_err());
        assert_eq!(ViewMode::from_setting(" Grid"), ViewMode::Grid);
        assert_eq!(ViewMode::from_setting("cards"), ViewMode::List);
        assert!("cards".parse::<ViewMode>().is_err());
        assert_eq!("grid".parse::<ViewMode>(), Ok(ViewMode::Grid));
    }
}
