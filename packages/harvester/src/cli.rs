//! Command-line interface for the harvester.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{
    parse_since, since_days_ago, HarvesterConfig, DEFAULT_DOWNLOAD_DIR, DEFAULT_FETCH_DIR,
};
use crate::error::{HarvesterError, Result};
use crate::harvester::{download_documents, fetch_updated, Progress, RunOptions};
use crate::source::{RiksdagenClient, RkrattsbaserClient, Source};
use crate::summary::RunSummary;
use crate::writer::MarkdownWriter;

/// SFS Harvester - Download Swedish statutes (SFS) and convert them to Markdown.
#[derive(Parser)]
#[command(name = "sfs-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download enactments by ID (or all of them) and convert to Markdown.
    Download {
        /// Comma-separated SFS IDs (2009:907 or sfs-2009-907), or "all"
        #[arg(long, default_value = "all", value_delimiter = ',')]
        ids: Vec<String>,

        /// Output directory
        #[arg(long, default_value = DEFAULT_DOWNLOAD_DIR)]
        out: PathBuf,

        /// Service to download from
        #[arg(long, value_enum, default_value_t = Source::Riksdagen)]
        source: Source,

        /// Only enactments from this year (with --ids all)
        #[arg(long)]
        year: Option<u16>,

        /// Write files into one subdirectory per year
        #[arg(long)]
        year_folder: bool,
    },

    /// Fetch enactments updated since a point in time from rkrattsbaser.
    #[command(group(ArgGroup::new("window").required(true).args(["days", "date"])))]
    FetchUpdated {
        /// Look back this many days from now
        #[arg(long)]
        days: Option<u32>,

        /// Cutoff as YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        date: Option<String>,

        /// Output directory
        #[arg(long, default_value = DEFAULT_FETCH_DIR)]
        output: PathBuf,

        /// Write files into one subdirectory per year
        #[arg(long)]
        year_folder: bool,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = HarvesterConfig::from_env()?;

    match cli.command {
        Commands::Download {
            ids,
            out,
            source,
            year,
            year_folder,
        } => {
            let writer = MarkdownWriter::new(out).with_year_folders(year_folder);
            download_command(&config, &ids, source, year, &writer)
        }
        Commands::FetchUpdated {
            days,
            date,
            output,
            year_folder,
        } => {
            let writer = MarkdownWriter::new(output).with_year_folders(year_folder);
            fetch_updated_command(&config, days, date.as_deref(), &writer)
        }
    }
}

/// Whether `--ids` asks for the whole collection.
fn wants_all(ids: &[String]) -> bool {
    matches!(ids, [only] if only.trim().eq_ignore_ascii_case("all"))
}

/// Execute the download command.
fn download_command(
    config: &HarvesterConfig,
    ids: &[String],
    source: Source,
    year: Option<u16>,
    writer: &MarkdownWriter,
) -> Result<()> {
    writer.ensure_output_dir()?;

    let ids: Vec<String> = if wants_all(ids) {
        let listing = RiksdagenClient::new(config)?;
        let pb = spinner("Listing SFS documents...");
        let listed = listing.list_document_ids(year);
        pb.finish_and_clear();
        listed?
    } else {
        if let Some(year) = year {
            tracing::warn!(year, "--year only applies to --ids all; ignoring it");
            println!(
                "{} --year {} only applies to --ids all",
                style("Ignoring").yellow().bold(),
                year
            );
        }
        ids.iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    };

    println!(
        "{} {} documents from {} into {}",
        style("Downloading").bold(),
        style(ids.len()).cyan(),
        style(source).cyan(),
        style(writer.output_dir().display()).green()
    );
    println!();

    let adapter = source.connect(config)?;
    let pb = progress_bar();
    let summary = download_documents(
        adapter.as_ref(),
        &ids,
        writer,
        RunOptions::from(config),
        &pb,
    )?;

    print_summary(&summary, writer);
    Ok(())
}

/// Execute the fetch-updated command.
fn fetch_updated_command(
    config: &HarvesterConfig,
    days: Option<u32>,
    date: Option<&str>,
    writer: &MarkdownWriter,
) -> Result<()> {
    let since = match (days, date) {
        (_, Some(date)) => parse_since(date)?,
        (Some(days), None) => since_days_ago(chrono::Local::now().naive_local(), days),
        (None, None) => return Err(HarvesterError::InvalidDate(String::new())),
    };

    println!(
        "{} enactments updated after {}",
        style("Fetching").bold(),
        style(since.format("%Y-%m-%d %H:%M:%S")).green()
    );
    println!();

    let client = RkrattsbaserClient::new(config)?;
    let pb = progress_bar();
    pb.set_message("Searching rkrattsbaser...");
    let summary = fetch_updated(&client, since, writer, &pb)?;

    print_summary(&summary, writer);
    Ok(())
}

impl Progress for ProgressBar {
    fn start(&self, total: usize) {
        self.set_length(total as u64);
    }

    fn advance(&self, id: &str) {
        self.set_message(id.to_string());
        self.inc(1);
    }

    fn finish(&self) {
        self.finish_and_clear();
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("valid template")
            .progress_chars("=> "),
    );
    pb
}

fn print_summary(summary: &RunSummary, writer: &MarkdownWriter) {
    println!("{} {}", style("Done:").green().bold(), summary);
    println!(
        "{} {}",
        style("Output:").green().bold(),
        writer.output_dir().display()
    );

    if !summary.skipped.is_empty() {
        println!();
        println!("{}", style("Skipped:").yellow().bold());
        for skipped in &summary.skipped {
            println!("  {} {}", style(&skipped.id).cyan(), skipped.reason);
        }
    }
}
