use clap::{Parser, Subcommand};
use std::path::PathBuf;

use traffic_study_uploader::commands::{self, UploadRequest};
use traffic_study_uploader::config::{self, Config};
use traffic_study_uploader::uploader::endpoint::ScenarioRef;
use traffic_study_uploader::uploader::RunStatus;

#[derive(Parser)]
#[command(name = "traffic-uploader")]
#[command(version)]
#[command(
    about = "Upload AM/PM count CSVs and ATTOUT files to a traffic study scenario",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TRAFFIC_UPLOADER_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files to a scenario, one at a time
    Upload {
        /// Study server URL
        #[arg(long, env = "TRAFFIC_UPLOADER_BASE_URL")]
        base_url: Option<String>,

        /// Scenario page path, e.g. /study/3/scenario/7
        #[arg(long, conflicts_with_all = ["study", "scenario"])]
        page_path: Option<String>,

        #[arg(long, requires = "scenario")]
        study: Option<u64>,

        #[arg(long, requires = "study")]
        scenario: Option<u64>,

        /// Explicit upload URL, used instead of the one derived from the page path
        #[arg(long)]
        action_url: Option<String>,

        /// Element id selector receiving the server fragment
        #[arg(long)]
        target: Option<String>,

        /// Write the latest server fragment to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Trigger scenario processing once every file uploaded
        #[arg(long)]
        process: bool,

        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Show how file names would be classified
    Classify {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Trigger processing for a scenario
    Process {
        #[arg(long, env = "TRAFFIC_UPLOADER_BASE_URL")]
        base_url: Option<String>,

        #[arg(long)]
        study: u64,

        #[arg(long)]
        scenario: u64,
    },

    /// Show or reset the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Reset,
}

fn init_logging(level: &str) {
    let filter = level.parse().unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::get_config_path()?,
    };
    let config = config::load_config_from(&config_path).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid configuration: {}", e);
        Config::default()
    });

    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));
    log::debug!("Using configuration at {}", config_path.display());

    match cli.command {
        Commands::Upload {
            base_url,
            page_path,
            study,
            scenario,
            action_url,
            target,
            output,
            process,
            files,
        } => {
            let page_path = match (page_path, study, scenario) {
                (Some(path), _, _) => path,
                (None, Some(study), Some(scenario)) => {
                    ScenarioRef::new(study, scenario).page_path()
                }
                _ => String::new(),
            };

            let summary = commands::upload(
                &config,
                UploadRequest {
                    base_url,
                    page_path,
                    action_url,
                    update_target: target,
                    output,
                    process_after: process,
                    file_paths: files,
                },
            )
            .await?;

            if let Some(run) = &summary.outcome.run {
                println!(
                    "Run {}: {}/{} uploaded, {} failed",
                    run.run_id,
                    run.successful_uploads.len(),
                    run.total,
                    run.failed_uploads.len()
                );
                if run.status == RunStatus::Aborted {
                    println!(
                        "Aborted: {}",
                        run.abort_reason.as_deref().unwrap_or("unknown reason")
                    );
                }
            }
            if summary.processing.is_some() {
                println!("Processing requested");
            }

            if !summary.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Classify { names } => {
            let mut rejected = false;
            for (name, result) in commands::classify_names(&names) {
                match result {
                    Ok(file_type) => println!("{}\t{}", name, file_type),
                    Err(e) => {
                        rejected = true;
                        println!("{}\trejected ({})", name, e);
                    }
                }
            }
            if rejected {
                std::process::exit(1);
            }
        }
        Commands::Process {
            base_url,
            study,
            scenario,
        } => {
            let markup = commands::process(
                &config,
                base_url.as_deref(),
                ScenarioRef::new(study, scenario),
            )
            .await?;
            println!("{}", markup);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => println!("{}", serde_json::to_string_pretty(&config)?),
            ConfigAction::Reset => {
                let config = config::reset_config_at(&config_path)?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        },
    }

    Ok(())
}
