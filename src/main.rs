use anyhow::Result;
use clap::Parser;
use legacy_scribe::{config, llm, tui, Analyzer, Session};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "legacy-scribe")]
#[command(about = "Extract business logic and test scripts from legacy COBOL/IDMS programs")]
#[command(version)]
struct Args {
    /// Source file to upload on start
    file: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

fn log_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "legacy-scribe")
        .map(|dirs| dirs.data_dir().join("legacy-scribe.log"))
}

fn open_log_file() -> Option<std::fs::File> {
    let path = log_file_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .ok()
}

/// The TUI owns the terminal, so logs go to a file when one can be opened
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "legacy_scribe=info".into());

    match open_log_file() {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };

    if args.show_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let client = llm::create_client(&config)?;
    tracing::info!(provider = %config.llm.provider, model = %client.model(), "Starting session");

    let analyzer = Analyzer::from_config(client, &config);
    let session = Session::new(analyzer, &config);

    tui::run_app(&config, session, args.file).await?;

    tracing::info!("Session ended");
    Ok(())
}
