use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{info, warn};
use storegate::logging::init_logging;
use storegate::{AppSettings, Bridge, CheckOptions, TerminalSurface};
use storegate_core::{UiThread, UpdateDecisionService};
use storegate_platform::{AppPaths, SystemStoreOpener};

#[derive(Debug, Parser)]
#[command(
    name = "storegate",
    version,
    about = "Check the store for a newer app version and block until it is installed"
)]
struct Cli {
    /// Store-assigned app identifier; falls back to the `app_store_id` setting.
    #[arg(long)]
    app_store_id: Option<String>,

    /// Compare against this version instead of the installed one.
    #[arg(long)]
    fake_version: Option<String>,

    /// Prompt text; `{version}` is replaced with the latest version.
    #[arg(long)]
    message: Option<String>,

    #[arg(long)]
    button_text: Option<String>,

    /// Version of the installed app.
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    current_version: String,

    /// Store region used for the catalog lookup.
    #[arg(long)]
    country: Option<String>,

    /// Read settings from this file instead of the platform default.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Open the store listing when the prompt is shown.
    #[arg(long)]
    open_store: bool,

    /// Store `--app-store-id` and `--country` in the settings file.
    #[arg(long)]
    save_settings: bool,

    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = AppPaths::new().ok();
    let settings_path = cli
        .settings
        .clone()
        .or_else(|| paths.as_ref().map(AppPaths::settings_file));

    let (mut settings, settings_error) = match settings_path.as_deref() {
        Some(path) => match AppSettings::read_from(path) {
            Ok(settings) => (settings, None),
            Err(error) => (AppSettings::default(), Some(error)),
        },
        None => (AppSettings::default(), None),
    };

    if let Some(paths) = &paths {
        init_logging(
            paths,
            settings.debug_logging || cli.debug,
            settings.max_log_size_bytes,
        );
    }
    if let Some(error) = settings_error {
        warn!("Using default settings: {error}");
    }

    if let Some(country) = cli.country.clone() {
        settings.country = country;
    }

    if cli.save_settings {
        if let Some(app_store_id) = cli.app_store_id.clone() {
            settings.app_store_id = Some(app_store_id);
        }
        let saved = match (&cli.settings, &paths) {
            (Some(path), _) => settings.save_to(path),
            (None, Some(paths)) => settings.save_in(paths),
            (None, None) => settings.save(),
        };
        match saved {
            Ok(()) => info!("Settings saved"),
            Err(error) => {
                eprintln!("failed to save settings: {error}");
                return ExitCode::FAILURE;
            }
        }
    }

    let client = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(error) => {
            eprintln!("failed to build HTTP client: {error}");
            return ExitCode::FAILURE;
        }
    };

    let surface = TerminalSurface::new(std::io::stdout(), SystemStoreOpener, cli.open_store);
    let ui = match UiThread::spawn(surface) {
        Ok(ui) => ui,
        Err(error) => {
            eprintln!("failed to start UI thread: {error}");
            return ExitCode::FAILURE;
        }
    };

    let service = UpdateDecisionService::new(
        settings.catalog(client),
        ui,
        settings.decision_config(cli.current_version),
    );
    let bridge = Bridge::new(service, settings.app_store_id.clone())
        .with_default_text(settings.message.clone(), settings.button_text.clone());

    let options = CheckOptions {
        app_store_id: cli.app_store_id,
        fake_version: cli.fake_version,
        message: cli.message,
        button_text: cli.button_text,
    };

    let mut exit = ExitCode::SUCCESS;
    bridge
        .check_and_update(
            |status| println!("{status}"),
            |error| {
                eprintln!("{error}");
                exit = ExitCode::FAILURE;
            },
            &options,
        )
        .await;
    exit
}
