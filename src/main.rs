use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::EnvFilter;

mod assembler;
mod boundary;
mod bundle;
mod config;
mod error;
mod import;
mod models;
mod page;
mod panels;
mod permissions;
mod questions;
mod report;
mod rows;
mod tables;
mod tracker;
mod view;

use crate::bundle::ResultsBundle;
use crate::config::RenderConfig;
use crate::models::{FeedbackSession, ResultsData};
use crate::page::{ResultsRequest, SectionFilter};
use crate::permissions::InstructorPrivileges;
use crate::view::ViewMode;

#[derive(Parser)]
#[command(name = "feedback-results-view")]
#[command(about = "Instructor feedback results views grouped by question, giver or recipient", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a results bundle into a results page
    Render {
        /// Results bundle as JSON
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long, value_enum, default_value_t = ViewMode::Question)]
        view: ViewMode,
        /// Section to show; all sections when absent or "All"
        #[arg(long)]
        section: Option<String>,
        /// Sections offered by the filter, comma separated
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,
        #[arg(long)]
        no_stats: bool,
        #[arg(long)]
        no_group_by_team: bool,
        /// Viewer privileges as JSON; a course co-owner when absent
        #[arg(long)]
        privileges: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        start_index: usize,
        #[arg(long)]
        collapse_threshold: Option<usize>,
        #[arg(long)]
        advisory_limit: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        /// Output file; stdout when absent
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Pack roster, question and response CSV exports into a bundle
    Import {
        #[arg(long)]
        roster: PathBuf,
        #[arg(long)]
        questions: PathBuf,
        #[arg(long)]
        responses: PathBuf,
        #[arg(long)]
        course: String,
        #[arg(long)]
        session: String,
        #[arg(long)]
        creator: String,
        /// Session start, e.g. 2026-03-01T09:00:00
        #[arg(long)]
        start: NaiveDateTime,
        #[arg(long)]
        end: NaiveDateTime,
        #[arg(long)]
        published: bool,
        #[arg(long, default_value = "bundle.json")]
        out: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            bundle,
            view,
            section,
            sections,
            no_stats,
            no_group_by_team,
            privileges,
            start_index,
            collapse_threshold,
            advisory_limit,
            format,
            out,
        } => {
            let raw = std::fs::read_to_string(&bundle)
                .with_context(|| format!("failed to read bundle {}", bundle.display()))?;
            let data: ResultsData = serde_json::from_str(&raw)
                .with_context(|| format!("invalid bundle {}", bundle.display()))?;
            let results = ResultsBundle::new(data)?;

            let privileges = match privileges {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read privileges {}", path.display()))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("invalid privileges {}", path.display()))?
                }
                None => InstructorPrivileges::co_owner(),
            };

            let mut config = RenderConfig::from_env()?;
            if let Some(threshold) = collapse_threshold {
                config.collapse_threshold = threshold;
            }
            if let Some(limit) = advisory_limit {
                config.advisory_entry_limit = limit;
            }

            let request = ResultsRequest {
                section: SectionFilter::from_arg(section),
                show_stats: !no_stats,
                group_by_team: !no_group_by_team,
                sections,
                start_index,
                ..ResultsRequest::new(view)
            };
            let page = page::build_page(&results, &request, &config, &privileges)?;

            let rendered = match format {
                OutputFormat::Markdown => report::build_report(&page),
                OutputFormat::Json => {
                    report::build_json(&page).context("failed to serialize results page")?
                }
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Results written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Import {
            roster,
            questions,
            responses,
            course,
            session,
            creator,
            start,
            end,
            published,
            out,
        } => {
            let session = FeedbackSession {
                course_id: course,
                name: session,
                creator_email: creator,
                start_time: start,
                end_time: end,
                published,
            };
            let data = import::import_csv(session, &roster, &questions, &responses)?;
            let json = serde_json::to_string_pretty(&data).context("failed to serialize bundle")?;
            std::fs::write(&out, json)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Packed {} responses to {} questions into {}.",
                data.responses.len(),
                data.questions.len(),
                out.display()
            );
        }
    }

    Ok(())
}
