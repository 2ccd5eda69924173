//! PDF Unlocker CLI - Command line front end for unlocking PDF documents.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_unlocker_core::{AppConfig, Controller, DecryptEvent, FolderOpener, NoReveal, Reveal};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pdf-unlock")]
#[command(author, version, about = "Save an unencrypted copy of a PDF", long_about = None)]
struct Args {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Text inserted before ".pdf" in the output name
    #[arg(short, long, env = "PDF_UNLOCKER_MARKER")]
    marker: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not open the output folder afterwards
    #[arg(long)]
    no_reveal: bool,

    /// Write output streams uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Print the outcome as JSON instead of a status line
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(100);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    if let Some(marker) = args.marker {
        config.marker = marker;
    }
    if args.no_reveal {
        config.reveal_output = false;
    }
    if args.no_compress {
        config.compress = false;
    }
    config.validate().context("Invalid configuration")?;

    let revealer: Box<dyn Reveal> = if config.reveal_output {
        Box::new(FolderOpener)
    } else {
        Box::new(NoReveal)
    };

    let mut controller = Controller::with_revealer(config, revealer);
    controller.select_file(&args.input);

    info!("Unlocking {}", args.input.display());
    let run = controller
        .start()
        .context(controller.status().to_string())?;

    let pb = progress_bar(args.json);
    let outcome = controller
        .drive(run, |event| match event {
            DecryptEvent::Progress(percent) => pb.set_position(u64::from(*percent)),
            DecryptEvent::Finished(_) => pb.finish_and_clear(),
        })
        .await;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if args.json {
            println!(
                "{}",
                serde_json::to_string(&outcome).context("Failed to encode outcome")?
            );
        } else {
            println!("{}", controller.status());
        }
    }

    // The failure was already reported above; only the exit status is left
    if outcome.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
