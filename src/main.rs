use anyhow::{Context, Result};
use clap::Parser;
use service_composer::Registry;
use service_composer::app::services::Application;
use service_composer::app::types::APPLICATION;
use service_composer::app::{self, Composition};
use service_composer::config::{BootConfig, ConfigLoader};
use service_composer::i18n::{self, Bundles};
use service_composer::logging::{self, LogSettings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Compose the server's services and run until interrupted.
#[derive(Debug, Parser)]
#[command(name = "service-composer", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Boot, run lifecycle hooks, then shut down immediately
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }

    let config = match loader.load() {
        Ok(config) => config,
        Err(err) => {
            logging::init(&LogSettings::default());
            error!(target: "service_composer", error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.log);

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: "service_composer", error = %format!("{err:#}"), "Fatal boot error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: &BootConfig) -> Result<()> {
    let Composition { registry, report } =
        app::bootstrap(config).context("failed to compose services")?;

    info!(
        target: "service_composer",
        bindings = registry.len(),
        eager = report.eager.len(),
        disposable = report.disposable.len(),
        packaged = config.is_packaged(),
        "Services composed"
    );

    registry
        .run_then_shutdown(serve(cli, config, &registry))
        .await
}

async fn serve(cli: &Cli, config: &BootConfig, registry: &Registry) -> Result<()> {
    let bundles = match &config.translations_dir {
        Some(dir) => i18n::load_bundles(dir).context("failed to load translations")?,
        None => Bundles::new(),
    };
    i18n::initialize_translations(registry, bundles, &config.locale)
        .context("failed to initialise translations")?;

    let application = registry
        .get::<Application>(APPLICATION)
        .context("failed to construct application")?;
    application.start().await.context("failed to start")?;

    if !cli.check {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        info!(target: "service_composer", "Shutdown signal received");
    }

    application.stop().await;
    Ok(())
}
