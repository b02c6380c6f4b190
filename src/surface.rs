//! Presentation surfaces: the home widget and the full publications page.
//!
//! Each surface owns its [`ViewState`]; both read the same record list but never share
//! filter, sort or page.

use std::fmt;
use std::str::FromStr;

use crate::record::PublicationRecord;
use crate::settings::PublicationSettings;
use crate::view::{PageSlice, SortMode, ViewMode, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Home,
    Page,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SurfaceKind::Home => "home",
            SurfaceKind::Page => "page",
        })
    }
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(SurfaceKind::Home),
            "page" => Ok(SurfaceKind::Page),
            _ => Err(format!("unknown surface: {s}")),
        }
    }
}

/// Page size and graphic toggle remembered per view mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModePrefs {
    page_size: usize,
    show_graphic: bool,
}

#[derive(Debug, Clone)]
pub struct Surface {
    kind: SurfaceKind,
    state: ViewState,
    list: ModePrefs,
    /// `None` on list-only surfaces.
    grid: Option<ModePrefs>,
}

impl Surface {
    pub fn home(settings: &PublicationSettings) -> Self {
        let list = ModePrefs {
            page_size: settings.home.page_size,
            show_graphic: settings.home.show_graphic,
        };
        Surface {
            kind: SurfaceKind::Home,
            state: ViewState::new(list.page_size, ViewMode::List, list.show_graphic),
            list,
            grid: None,
        }
    }

    pub fn page(settings: &PublicationSettings, mobile: bool) -> Self {
        let list = ModePrefs {
            page_size: settings.page.list_page_size,
            show_graphic: settings.page.list_show_graphic,
        };
        let grid = ModePrefs {
            page_size: settings.page.grid_page_size,
            show_graphic: settings.page.grid_show_graphic,
        };
        let mode = settings.initial_view(mobile);
        let prefs = match mode {
            ViewMode::List => list,
            ViewMode::Grid => grid,
        };
        Surface {
            kind: SurfaceKind::Page,
            state: ViewState::new(prefs.page_size, mode, prefs.show_graphic),
            list,
            grid: Some(grid),
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn toggle_sort(&mut self) -> SortMode {
        self.state.sort_mode = self.state.sort_mode.next();
        self.state.page = 1;
        self.state.sort_mode
    }

    pub fn set_sort(&mut self, mode: SortMode) {
        if self.state.sort_mode != mode {
            self.state.sort_mode = mode;
            self.state.page = 1;
        }
    }

    pub fn apply_filter(&mut self, min_year: Option<u32>, max_year: Option<u32>) {
        self.state.set_year_bounds(min_year, max_year);
        self.state.page = 1;
    }

    pub fn reset_filter(&mut self) {
        self.state.clear_year_bounds();
        self.state.page = 1;
    }

    pub fn filter_active(&self) -> bool {
        self.state.filter_active()
    }

    /// Out-of-range pages are clamped on the next [`Surface::render`].
    pub fn go_to(&mut self, page: usize) {
        self.state.page = page;
    }

    /// Switch between list and grid. Returns `false` when nothing changed (same mode, or
    /// a list-only surface).
    pub fn set_mode(&mut self, mode: ViewMode) -> bool {
        let Some(grid) = self.grid else {
            return false;
        };
        if self.state.mode == mode {
            return false;
        }
        let prefs = match mode {
            ViewMode::List => self.list,
            ViewMode::Grid => grid,
        };
        self.state.mode = mode;
        self.state.page = 1;
        self.state.page_size = prefs.page_size.max(1);
        self.state.show_graphic = prefs.show_graphic;
        true
    }

    /// Flip graphical abstracts for the current mode only.
    pub fn toggle_graphic(&mut self) -> bool {
        let shown = !self.state.show_graphic;
        self.state.show_graphic = shown;
        match (self.state.mode, self.grid.as_mut()) {
            (ViewMode::Grid, Some(grid)) => grid.show_graphic = shown,
            _ => self.list.show_graphic = shown,
        }
        shown
    }

    /// Derive the current page and remember the clamped page number.
    pub fn render<'a>(&mut self, records: &'a [PublicationRecord]) -> PageSlice<'a> {
        let slice = self.state.derive(records);
        self.state.page = slice.page;
        slice
    }
}

/// Both surfaces of one page load.
#[derive(Debug, Clone)]
pub struct Surfaces {
    pub home: Surface,
    pub page: Surface,
}

impl Surfaces {
    pub fn from_settings(settings: &PublicationSettings, mobile: bool) -> Self {
        Surfaces {
            home: Surface::home(settings),
            page: Surface::page(settings, mobile),
        }
    }

    pub fn get_mut(&mut self, kind: SurfaceKind) -> &mut Surface {
        match kind {
            SurfaceKind::Home => &mut self.home,
            SurfaceKind::Page => &mut self.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::parse_settings;

    fn records(n: usize) -> Vec<PublicationRecord> {
        (0..n)
            .map(|i| {
                PublicationRecord::new(format!("r{i}"), "", format!("T{i}"))
                    .with_year((2000 + i).to_string())
            })
            .collect()
    }

    #[test]
    fn surfaces_take_their_sizes_from_settings() {
        let settings = parse_settings(
            r#"{"publications": {"home": {"page_size": 2}, "page": {"list_page_size": 4, "grid_shape": [2, 3], "default_view_mobile": "grid"}}}"#,
        )
        .unwrap();
        let desktop = Surfaces::from_settings(&settings, false);
        assert_eq!(desktop.home.state().page_size, 2);
        assert_eq!(desktop.page.state().mode, ViewMode::List);
        assert_eq!(desktop.page.state().page_size, 4);

        let mobile = Surfaces::from_settings(&settings, true);
        assert_eq!(mobile.page.state().mode, ViewMode::Grid);
        assert_eq!(mobile.page.state().page_size, 6);
        assert!(!mobile.page.state().show_graphic);
    }

    #[test]
    fn surfaces_do_not_share_state() {
        let items = records(12);
        let mut surfaces = Surfaces::from_settings(&PublicationSettings::default(), false);
        surfaces.page.toggle_sort();
        surfaces.page.apply_filter(Some(2005), None);
        surfaces.page.go_to(2);

        let home = surfaces.home.render(&items);
        assert_eq!(home.items[0].ref_key, "r0");
        assert_eq!(home.total_items, 12);
        assert!(!surfaces.home.filter_active());

        let page = surfaces.page.render(&items);
        assert_eq!(page.total_items, 7);
        assert_eq!((page.page, page.total_pages), (1, 1));
        assert_eq!(page.items[0].ref_key, "r11");
        assert_eq!(surfaces.page.state().page, 1);
    }

    #[test]
    fn render_writes_back_the_clamped_page() {
        let items = records(12);
        let mut surface = Surface::home(&PublicationSettings::default());
        surface.go_to(40);
        let slice = surface.render(&items);
        assert_eq!((slice.page, slice.total_pages), (3, 3));
        assert_eq!(surface.state().page, 3);
    }

    #[test]
    fn filter_and_sort_reset_to_first_page() {
        let mut surface = Surface::home(&PublicationSettings::default());
        surface.go_to(3);
        surface.apply_filter(Some(2010), Some(2001));
        assert_eq!(surface.state().page, 1);
        assert_eq!(surface.state().year_bounds(), (Some(2001), Some(2010)));
        assert!(surface.filter_active());

        surface.go_to(2);
        assert_eq!(surface.toggle_sort(), SortMode::TimeDesc);
        assert_eq!(surface.state().page, 1);

        surface.go_to(2);
        surface.reset_filter();
        assert_eq!(surface.state().page, 1);
        assert!(!surface.filter_active());
    }

    #[test]
    fn mode_switch_swaps_size_and_graphic() {
        let mut surface = Surface::page(&PublicationSettings::default(), false);
        assert!(surface.state().show_graphic);
        surface.go_to(2);

        assert!(surface.set_mode(ViewMode::Grid));
        assert_eq!(surface.state().page, 1);
        assert_eq!(surface.state().page_size, 9);
        assert!(!surface.state().show_graphic);
        assert!(!surface.set_mode(ViewMode::Grid));

        assert!(surface.toggle_graphic());
        assert!(surface.set_mode(ViewMode::List));
        assert_eq!(surface.state().page_size, 10);
        assert!(surface.state().show_graphic);
        assert!(surface.set_mode(ViewMode::Grid));
        assert!(surface.state().show_graphic);
    }

    #[test]
    fn home_is_list_only() {
        let mut surface = Surface::home(&PublicationSettings::default());
        assert!(!surface.set_mode(ViewMode::Grid));
        assert_eq!(surface.state().mode, ViewMode::List);
        assert!(!surface.toggle_graphic());
        assert_eq!(surface.kind(), SurfaceKind::Home);
        assert_eq!("PAGE".parse::<SurfaceKind>(), Ok(SurfaceKind::Page));
    }
}
