//! # fill-light: Selfie & Photo Fill Light
//!
//! Turns the terminal into a colored light source, with pulse and strobe
//! patterns, saved templates, and lighting suggestions from a photo.
//!
//! ## Usage
//!   fill-light                       # Launch TUI
//!   fill-light templates             # List presets and saved templates
//!   fill-light suggest photo.jpg     # Ask the analysis service, print the result
//!   fill-light delete <id>           # Delete a saved template
//!   fill-light init-config           # Write the effective config file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fill_light::clock::SystemClock;
use fill_light::config::{AppConfig, config_path};
use fill_light::logging::{self, LOG_FILE, LogTarget};
use fill_light::notify::{LogNotifier, Notifier, RecordingNotifier};
use fill_light::session::SessionController;
use fill_light::storage::FileStore;
use fill_light::suggestion::{HttpSuggestionService, ImageUpload};
use fill_light::templates::TemplateStore;
use fill_light::ui::App;
use shared::{PRESETS, TemplateId};
use tokio::runtime::Runtime;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fill-light", version, about = "Selfie & photo fill light")]
struct Cli {
    /// Config file (default: ~/.config/fill-light/config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Analysis service endpoint
    #[arg(long)]
    endpoint: Option<String>,
    /// Vision model name passed to the service
    #[arg(long)]
    model: Option<String>,
    /// Directory for saved templates and the log
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List presets and saved templates
    Templates,
    /// Request a suggestion for an image and print the resulting configuration
    Suggest { image: PathBuf },
    /// Delete a saved template by id
    Delete { id: TemplateId },
    /// Write the effective configuration (file, env and flags merged) to the config file
    InitConfig,
}

/// The effective config, plus the reason the file was ignored, if it was.
/// Reported by the caller once logging is installed.
fn load_config(cli: &Cli, path: &Path) -> (AppConfig, Option<anyhow::Error>) {
    let (mut config, ignored) = match AppConfig::try_load_from(path) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    config.apply_env();
    if let Some(endpoint) = &cli.endpoint {
        config.service.endpoint = endpoint.clone();
    }
    if let Some(model) = &cli.model {
        config.service.model = model.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    (config, ignored)
}

fn controller(config: &AppConfig, notifier: Box<dyn Notifier>) -> SessionController {
    let clock = Arc::new(SystemClock);
    let store = TemplateStore::new(Box::new(FileStore::new(config.data_dir())), clock.clone());
    SessionController::new(store, notifier, clock).with_auto_save(config.auto_save_suggestions)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_file = cli.config.clone().unwrap_or_else(config_path);
    let (config, ignored) = load_config(&cli, &config_file);

    let target = match cli.command {
        None => LogTarget::File(config.data_dir().join(LOG_FILE)),
        Some(_) => LogTarget::Stderr,
    };
    logging::init(target)?;
    if let Some(err) = ignored {
        warn!(error = format!("{err:#}"), "ignoring unreadable config, using defaults");
    }

    match cli.command {
        None => run_tui(&config, &config_file),
        Some(Cmd::Templates) => list_templates(&config),
        Some(Cmd::Suggest { image }) => suggest(&config, &image),
        Some(Cmd::Delete { id }) => delete_template(&config, id),
        Some(Cmd::InitConfig) => {
            config.save_to(&config_file)?;
            eprintln!("fill-light: wrote {}", config_file.display());
            Ok(())
        }
    }
}

fn run_tui(config: &AppConfig, config_file: &Path) -> Result<()> {
    info!(
        config = %config_file.display(),
        data_dir = %config.data_dir().display(),
        "starting"
    );

    let runtime = Runtime::new().context("failed to start the async runtime")?;
    let service = HttpSuggestionService::new(config.service.endpoint.clone(), config.timeout())?;
    let notes = RecordingNotifier::new();
    let app = App::new(
        controller(config, Box::new(notes.clone())),
        notes,
        Arc::new(service),
        config.suggestion_params(),
        runtime.handle().clone(),
    );

    let terminal = ratatui::init();
    let result = app.run(terminal);
    ratatui::restore();
    result
}

/// Headless: print presets and saved templates.
fn list_templates(config: &AppConfig) -> Result<()> {
    let mut controller = controller(config, Box::new(LogNotifier));

    println!("Presets:");
    for preset in PRESETS {
        let cfg = preset.config();
        println!(
            "  {:<16} {:>3}%  {}  {}",
            preset.name,
            cfg.brightness(),
            cfg.color(),
            cfg.pattern()
        );
    }

    let templates = controller.templates();
    println!("\nSaved templates ({}):", templates.len());
    for t in templates {
        let cfg = t.config();
        println!(
            "  {:<16} {:>3}%  {}  {}  (id {})",
            t.name(),
            cfg.brightness(),
            cfg.color(),
            cfg.pattern(),
            t.id()
        );
    }
    Ok(())
}

/// Headless: run one suggestion round trip and print the applied configuration.
fn suggest(config: &AppConfig, image: &Path) -> Result<()> {
    let upload = ImageUpload::from_path(image)?;
    let service = HttpSuggestionService::new(config.service.endpoint.clone(), config.timeout())?;
    let params = config.suggestion_params();
    let mut controller = controller(config, Box::new(LogNotifier));

    let runtime = Runtime::new().context("failed to start the async runtime")?;
    let applied = runtime.block_on(controller.request_suggestion(&service, &upload, &params))?;

    println!("{}", serde_json::to_string_pretty(&applied)?);
    Ok(())
}

fn delete_template(config: &AppConfig, id: TemplateId) -> Result<()> {
    let mut controller = controller(config, Box::new(LogNotifier));
    let name = controller
        .templates()
        .iter()
        .find(|t| t.id() == id)
        .map(|t| t.name().to_string());

    match name {
        Some(name) => {
            controller.delete_template(id)?;
            eprintln!("fill-light: deleted '{name}' ({id})");
        }
        None => eprintln!("fill-light: no saved template with id {id}"),
    }
    Ok(())
}
