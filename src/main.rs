use std::{
    fs,
    io::IsTerminal,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use pubmeta::{
    names::{AuthorSpan, highlight_authors},
    normalize::{format_catalog, load_catalog},
    record::PublicationRecord,
    resolver::{RecordOutcome, ResolutionSession, Snapshot, SnapshotObserver},
    settings::{PublicationSettings, load_settings},
    surface::{SurfaceKind, Surfaces},
    view::{PageButton, PageSlice, SortMode, ViewMode},
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, StyleChoice};

mod cli;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Cli::parse();
    match args.command {
        Command::Resolve {
            catalog,
            settings,
            offline,
            output,
        } => resolve(&catalog, settings.as_deref(), offline, output.as_deref()),
        Command::List {
            catalog,
            settings,
            surface,
            view,
            sort,
            min_year,
            max_year,
            page,
            mobile,
            json,
        } => list(ListArgs {
            catalog,
            settings,
            surface,
            view,
            sort,
            min_year,
            max_year,
            page,
            mobile,
            json,
        }),
        Command::Cite {
            catalog,
            ref_key,
            style,
        } => cite(&catalog, &ref_key, style),
        Command::Fmt { catalog, check } => fmt(&catalog, check),
    }
}

/// Logs go to stderr so stdout stays machine-readable. `PUBMETA_LOG_FORMAT=json` switches
/// to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pubmeta=warn".into());
    let json = std::env::var("PUBMETA_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
}

fn read_inputs(
    catalog: &Path,
    settings: Option<&Path>,
) -> anyhow::Result<(Vec<PublicationRecord>, PublicationSettings)> {
    let settings = load_settings(settings).context("failed to load settings")?;
    let records = load_catalog(catalog)
        .with_context(|| format!("failed to load catalog {}", catalog.display()))?;
    Ok((records, settings))
}

/// Progress bar advanced once per registry lookup.
struct Progress {
    bar: ProgressBar,
}

impl Progress {
    fn new(len: usize) -> Self {
        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Progress { bar }
    }
}

impl SnapshotObserver for Progress {
    fn on_update(&mut self, snapshot: &Snapshot) {
        tracing::trace!(resolved = snapshot.resolved, "snapshot published");
    }

    fn on_outcome(&mut self, outcome: &RecordOutcome) {
        self.bar
            .set_message(format!("{} {}", outcome.ref_key, outcome.status));
        self.bar.inc(1);
    }
}

fn resolve(
    catalog: &Path,
    settings: Option<&Path>,
    offline: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (records, settings) = read_inputs(catalog, settings)?;
    let mut config = settings.resolver_config();
    if offline {
        config.enabled = false;
    }
    let pending = if config.enabled {
        records.iter().filter(|r| !r.doi().is_empty()).count()
    } else {
        0
    };

    let session = ResolutionSession::crossref(config);
    let mut progress = Progress::new(pending);
    let report = session.resolve(records, &mut progress);
    progress.bar.finish_and_clear();

    let mut json = serde_json::to_string_pretty(&*report.records)?;
    json.push('\n');
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{json}"),
    }

    let resolved = format!("✓ {}", report.resolved);
    let fallback = format!("✗ {}", report.fallback_count());
    if color_enabled() {
        eprintln!("{} {}", resolved.green(), fallback.red());
    } else {
        eprintln!("{resolved} {fallback}");
    }
    Ok(())
}

struct ListArgs {
    catalog: PathBuf,
    settings: Option<PathBuf>,
    surface: SurfaceKind,
    view: Option<ViewMode>,
    sort: SortMode,
    min_year: Option<u32>,
    max_year: Option<u32>,
    page: usize,
    mobile: bool,
    json: bool,
}

#[derive(Serialize)]
struct ListItem<'a> {
    #[serde(flatten)]
    record: &'a PublicationRecord,
    author_spans: Vec<AuthorSpan>,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    surface: String,
    mode: ViewMode,
    sort: SortMode,
    show_graphic: bool,
    filter_active: bool,
    page: usize,
    total_pages: usize,
    total_items: usize,
    items: Vec<ListItem<'a>>,
    buttons: &'a [PageButton],
}

fn list(args: ListArgs) -> anyhow::Result<()> {
    let (records, settings) = read_inputs(&args.catalog, args.settings.as_deref())?;
    let keywords = &settings.author_highlight_keywords;

    let mut surfaces = Surfaces::from_settings(&settings, args.mobile);
    let surface = surfaces.get_mut(args.surface);
    if let Some(mode) = args.view
        && !surface.set_mode(mode)
        && surface.state().mode != mode
    {
        bail!("the {} surface has no {mode} view", args.surface);
    }
    surface.set_sort(args.sort);
    surface.apply_filter(args.min_year, args.max_year);
    surface.go_to(args.page);
    let slice = surface.render(&records);
    let state = surface.state();

    if args.json {
        let output = ListOutput {
            surface: args.surface.to_string(),
            mode: state.mode,
            sort: state.sort_mode,
            show_graphic: state.show_graphic,
            filter_active: state.filter_active(),
            page: slice.page,
            total_pages: slice.total_pages,
            total_items: slice.total_items,
            items: slice
                .items
                .iter()
                .map(|&record| ListItem {
                    record,
                    author_spans: highlight_authors(&record.authors, keywords),
                })
                .collect(),
            buttons: &slice.buttons,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} | {} | sort {} | page {}/{} | {} publications",
        args.surface, state.mode, state.sort_mode, slice.page, slice.total_pages, slice.total_items
    );
    print_page(&slice, keywords, state.show_graphic);
    Ok(())
}

fn print_page(slice: &PageSlice<'_>, keywords: &[String], show_graphic: bool) {
    if slice.items.is_empty() {
        println!("No publications match current filter.");
        return;
    }
    let color = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
    for record in &slice.items {
        let title = if record.title.is_empty() {
            "Untitled"
        } else {
            record.title.as_str()
        };
        if record.year.is_empty() {
            println!("\n{title}");
        } else {
            println!("\n[{}] {title}", record.year);
        }

        let authors: Vec<String> = highlight_authors(&record.authors, keywords)
            .into_iter()
            .map(|span| match (span.highlighted, color) {
                (true, true) => span.name.bold().to_string(),
                (true, false) => format!("*{}*", span.name),
                (false, _) => span.name,
            })
            .collect();
        if !authors.is_empty() {
            println!("    {}", authors.join(", "));
        }
        let venue = record.venue_line();
        if !venue.is_empty() {
            println!("    {venue}");
        }
        if show_graphic && !record.graphic.is_empty() {
            println!("    graphic: {}", record.graphic);
        }
        if !record.doi().is_empty() {
            println!("    DOI: {}", record.doi_link());
        }
    }

    if !slice.buttons.is_empty() {
        let row: Vec<String> = slice
            .buttons
            .iter()
            .map(|button| match button {
                PageButton::Page { current: true, .. } => format!("[{}]", button.label()),
                _ => button.label(),
            })
            .collect();
        println!("\n{}", row.join(" "));
    }
}

fn cite(catalog: &Path, ref_key: &str, choice: StyleChoice) -> anyhow::Result<()> {
    let records = load_catalog(catalog)
        .with_context(|| format!("failed to load catalog {}", catalog.display()))?;
    let Some(record) = records.iter().find(|r| r.ref_key == ref_key) else {
        bail!("no publication with key {ref_key:?} in {}", catalog.display());
    };

    match choice {
        StyleChoice::One(style) => println!("{}", style.format(record)),
        StyleChoice::All => {
            let blocks: Vec<String> = choice
                .styles()
                .iter()
                .map(|style| format!("{}:\n{}", style.label(), style.format(record)))
                .collect();
            println!("{}", blocks.join("\n\n"));
        }
    }
    Ok(())
}

fn fmt(catalog: &Path, check: bool) -> anyhow::Result<()> {
    let text = fs::read_to_string(catalog)
        .with_context(|| format!("failed to read {}", catalog.display()))?;
    let formatted = format_catalog(&text)
        .with_context(|| format!("failed to parse {}", catalog.display()))?;

    if text == formatted {
        eprintln!("{} is already formatted", catalog.display());
        return Ok(());
    }
    if check {
        bail!("{} is not formatted", catalog.display());
    }
    fs::write(catalog, formatted)
        .with_context(|| format!("failed to write {}", catalog.display()))?;
    eprintln!("formatted {}", catalog.display());
    Ok(())
}
