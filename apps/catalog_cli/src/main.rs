use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog::{load_patch_file, load_seed_file, CatalogQuery, InMemoryCatalog, PatchReport};
use clap::{Args, Parser, Subcommand};
use filter_core::FilterEngine;
use serde::Serialize;
use shared::{
    domain::{CourseSummary, FilterCategory},
    protocol::{CriterionInput, QueryDescriptor},
};
use tracing::{info, warn};

mod config;
mod logging;
mod panel;

use config::{load_settings, Settings};
use panel::{ButtonStyle, FilterButton};

#[derive(Parser, Debug)]
#[command(about = "Search a seeded course catalog with composable filters")]
struct Cli {
    /// Path to a TOML config file (defaults to ./catalog.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured seed file.
    #[arg(long)]
    seed: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Search(SearchArgs),
    SeedCheck,
}

#[derive(Args, Debug, Default)]
struct SearchArgs {
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    rating_min: Option<String>,
    #[arg(long)]
    price_max: Option<String>,
    /// A single year level (`2`) or an inclusive range (`1-3`).
    #[arg(long)]
    level: Option<String>,
    #[arg(long)]
    term: Option<String>,
    /// Render the button as if the filter panel were open.
    #[arg(long)]
    open: bool,
}

impl SearchArgs {
    fn criteria(&self) -> Vec<CriterionInput> {
        [
            (FilterCategory::Subject, &self.subject),
            (FilterCategory::RatingMin, &self.rating_min),
            (FilterCategory::PriceMax, &self.price_max),
            (FilterCategory::Level, &self.level),
            (FilterCategory::Availability, &self.term),
        ]
        .into_iter()
        .filter_map(|(category, value)| {
            value
                .as_deref()
                .map(|value| CriterionInput::new(category, value))
        })
        .collect()
    }
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    button: String,
    style: ButtonStyle,
    query: Vec<(&'static str, String)>,
    descriptor: QueryDescriptor,
    results: Vec<CourseSummary>,
}

#[derive(Debug, Serialize)]
struct SeedCheckOutput {
    courses: usize,
    reviews: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    patch: Option<PatchReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        settings.seed_path = seed;
    }
    logging::init(&settings.log_filter);
    for ignored in &settings.ignored_overrides {
        warn!(setting = %ignored, "ignoring malformed environment override");
    }

    let (catalog, patch) = open_catalog(&settings)?;
    match cli.command {
        Command::Search(args) => {
            let output = run_search(&catalog, &args)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::SeedCheck => {
            let output = SeedCheckOutput {
                courses: catalog.course_count(),
                reviews: catalog.review_count(),
                patch,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn open_catalog(settings: &Settings) -> Result<(InMemoryCatalog, Option<PatchReport>)> {
    let seed = load_seed_file(&settings.seed_path)?;
    let mut catalog = InMemoryCatalog::from_seed(seed)
        .with_context(|| format!("failed to seed from '{}'", settings.seed_path.display()))?;

    let patch = match &settings.patch_path {
        Some(path) => {
            let document = load_patch_file(path)?;
            let report = catalog
                .apply_patch(&document)
                .with_context(|| format!("failed to apply patch '{}'", path.display()))?;
            Some(report)
        }
        None => None,
    };

    if let Some(limit) = settings.max_results {
        catalog = catalog.with_result_limit(limit);
    }
    Ok((catalog, patch))
}

fn run_search(catalog: &impl CatalogQuery, args: &SearchArgs) -> Result<SearchOutput> {
    let mut engine = FilterEngine::with_span(tracing::info_span!("filter_engine", session = "cli"));
    let mut button = FilterButton::attach(&engine);
    if args.open {
        button.toggle_panel();
    }

    for input in args.criteria() {
        let category = input.category;
        engine
            .set_criterion(input)
            .with_context(|| format!("rejected --{} filter", flag_name(category)))?;
    }

    let descriptor = engine.build_query_descriptor();
    let results = catalog.query(&descriptor)?;
    info!(
        filters = engine.active_count(),
        results = results.len(),
        "search completed"
    );

    Ok(SearchOutput {
        button: button.label(),
        style: button.style(),
        query: descriptor.to_query_pairs(),
        descriptor,
        results,
    })
}

fn flag_name(category: FilterCategory) -> &'static str {
    match category {
        FilterCategory::Subject => "subject",
        FilterCategory::RatingMin => "rating-min",
        FilterCategory::PriceMax => "price-max",
        FilterCategory::Level => "level",
        FilterCategory::Availability => "term",
    }
}
