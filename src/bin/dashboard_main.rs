use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use review_sentiment::config::Settings;
use review_sentiment::dashboard::Dataset;
use review_sentiment::dashboard_html::{render_page, Section};
use review_sentiment::env_loader;
use review_sentiment::excel_writer;
use review_sentiment::filters::FilterSelection;
use review_sentiment::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "dashboard",
    about = "Review sentiment dashboard: serve it, or write a page or report once"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the dashboard on DASHBOARD_HOST:DASHBOARD_PORT (default)
    Serve,

    /// Write one static HTML page
    Render {
        /// Output HTML file
        output: PathBuf,

        /// products, reviews or testimonials
        #[arg(long)]
        section: Option<String>,

        /// Month filter (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Product category filter
        #[arg(long)]
        category: Option<String>,
    },

    /// Write the Excel report for a selection
    Export {
        /// Output .xlsx file
        output: PathBuf,

        /// Month filter (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Product category filter
        #[arg(long)]
        category: Option<String>,
    },
}

/// A validated command line.
#[derive(Debug, PartialEq)]
enum Command {
    Serve,
    Render {
        output: PathBuf,
        section: Section,
        selection: FilterSelection,
    },
    Export {
        output: PathBuf,
        selection: FilterSelection,
    },
}

impl Cli {
    fn into_command(self) -> Result<Command> {
        match self.command.unwrap_or(Commands::Serve) {
            Commands::Serve => Ok(Command::Serve),
            Commands::Render {
                output,
                section,
                month,
                category,
            } => Ok(Command::Render {
                output,
                section: section.as_deref().unwrap_or("").parse()?,
                selection: FilterSelection::parse(month.as_deref(), category.as_deref())?,
            }),
            Commands::Export {
                output,
                month,
                category,
            } => Ok(Command::Export {
                output,
                selection: FilterSelection::parse(month.as_deref(), category.as_deref())?,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_loader::load_env();
    env_logger::init();

    let command = Cli::parse().into_command()?;

    let settings = Settings::from_env();
    info!("Loading dashboard data from {:?}...", settings.data_dir);
    let dataset = Dataset::load(&settings)?;

    match command {
        Command::Serve => {
            let addr = settings.bind_addr()?;
            println!("\n🚀 Dashboard running at http://{}", addr);
            server::serve(AppState::new(dataset, settings.top_words), addr).await?;
        }
        Command::Render {
            output,
            section,
            selection,
        } => {
            let html = render_page(&dataset, section, &selection, settings.top_words);
            tokio::fs::write(&output, html).await?;
            info!("Dashboard page written to {:?}", output);
            println!("\n🎉 Dashboard generated successfully!");
            println!("📊 Open {:?} in your web browser to view the {} page", output, section.title());
        }
        Command::Export { output, selection } => {
            let aggregate = dataset.aggregate(&selection, settings.top_words);
            let bytes = excel_writer::excel_bytes(&dataset, &aggregate)?;
            tokio::fs::write(&output, bytes).await?;
            info!("Report for {} written to {:?}", selection.describe(), output);
            println!("\n📁 Report saved to {:?} ({} reviews)", output, aggregate.reviews.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> Result<Command> {
        let cli = Cli::try_parse_from(std::iter::once("dashboard").chain(args.iter().copied()))?;
        cli.into_command()
    }

    #[test]
    fn no_arguments_serves() {
        assert_eq!(command(&[]).unwrap(), Command::Serve);
        assert_eq!(command(&["serve"]).unwrap(), Command::Serve);
    }

    #[test]
    fn render_reads_section_and_filters() {
        let cmd = command(&["render", "out.html", "--section", "reviews", "--month", "2024-02"]).unwrap();
        match cmd {
            Command::Render { output, section, selection } => {
                assert_eq!(output, PathBuf::from("out.html"));
                assert_eq!(section, Section::Reviews);
                assert_eq!(selection.month.map(|m| m.to_string()).as_deref(), Some("2024-02"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn export_defaults_to_everything() {
        let cmd = command(&["export", "r.xlsx", "--category", "  "]).unwrap();
        assert_eq!(
            cmd,
            Command::Export {
                output: PathBuf::from("r.xlsx"),
                selection: FilterSelection::all(),
            }
        );
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(command(&["export"]).is_err());
        assert!(command(&["export", "r.xlsx", "--section", "reviews"]).is_err());
        assert!(command(&["render", "o.html", "--month"]).is_err());
        assert!(command(&["render", "o.html", "--month", "Feb"]).is_err());
        assert!(command(&["render", "o.html", "--section", "admin"]).is_err());
        assert!(command(&["launch"]).is_err());
    }
}
