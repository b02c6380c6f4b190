use std::{path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand};
use pubmeta::{
    cite::CitationStyle,
    surface::SurfaceKind,
    view::{SortMode, ViewMode},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Normalize a catalog and enrich its entries from the DOI registry
    Resolve {
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
        /// Site settings document with a `publications` block
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
        /// Skip registry lookups and only normalize
        #[arg(long)]
        offline: bool,
        /// Write the record list here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print one page of a presentation surface
    List {
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
        /// `home` (list only) or `page`
        #[arg(long, default_value = "page")]
        surface: SurfaceKind,
        /// `list` or `grid`; defaults to the configured view
        #[arg(long)]
        view: Option<ViewMode>,
        /// `default`, `time-asc` or `time-desc`
        #[arg(long, default_value = "default")]
        sort: SortMode,
        #[arg(long, value_name = "YEAR")]
        min_year: Option<u32>,
        #[arg(long, value_name = "YEAR")]
        max_year: Option<u32>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Use the mobile default view
        #[arg(long)]
        mobile: bool,
        #[arg(long)]
        json: bool,
    },
    /// Format one catalog entry as a citation
    Cite {
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(value_name = "REF_KEY")]
        ref_key: String,
        /// `gbt`, `mla`, `apa`, `bibtex` or `all`
        #[arg(long, default_value = "all")]
        style: StyleChoice,
    },
    /// Pretty-print a catalog file in place
    Fmt {
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
        /// Only report whether the file is already formatted
        #[arg(long)]
        check: bool,
    },
}

/// Which citations `cite` prints: one style, or every style with its label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleChoice {
    All,
    One(CitationStyle),
}

impl StyleChoice {
    pub fn styles(&self) -> Vec<CitationStyle> {
        match self {
            StyleChoice::All => CitationStyle::ALL.to_vec(),
            StyleChoice::One(style) => vec![*style],
        }
    }
}

impl FromStr for StyleChoice {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StyleChoice::All)
        } else {
            CitationStyle::from_str(s).map(StyleChoice::One)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn style_choice_accepts_all_and_each_style() {
        assert_eq!(StyleChoice::from_str("ALL"), Ok(StyleChoice::All));
        assert_eq!(StyleChoice::All.styles().len(), 4);
        for style in CitationStyle::ALL {
            let parsed = StyleChoice::from_str(&style.to_string()).expect("parse");
            assert_eq!(parsed, StyleChoice::One(style));
            assert_eq!(parsed.styles(), vec![style]);
        }
    }

    #[test]
    fn style_choice_rejects_unknown_names() {
        let known = ["all", "gbt", "mla", "apa", "bibtex", "bib"];
        proptest::proptest!(|(s in "[a-z]{1,12}")| {
            proptest::prop_assume!(!known.contains(&s.as_str()));
            proptest::prop_assert!(StyleChoice::from_str(&s).is_err());
        })
    }

    #[test]
    fn list_arguments_parse() {
        let cli = Cli::try_parse_from([
            "pubmeta", "list", "pubs.json", "--surface", "home", "--sort", "time-desc",
            "--min-year", "2019", "--page", "2", "--json",
        ])
        .expect("parse");
        match cli.command {
            Command::List {
                surface,
                sort,
                min_year,
                max_year,
                page,
                json,
                view,
                ..
            } => {
                assert_eq!(surface, SurfaceKind::Home);
                assert_eq!(sort, SortMode::TimeDesc);
                assert_eq!((min_year, max_year), (Some(2019), None));
                assert_eq!(page, 2);
                assert!(json);
                assert_eq!(view, None);
            }
            other => panic!("expected list, got {other:?}"),
        }

        assert!(Cli::try_parse_from(["pubmeta", "list", "p.json", "--view", "cards"]).is_err());
    }
}
