use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pingpace::app;
use pingpace::config::{Command, Config, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    match cli.command() {
        Command::Run => app::run(settings).await,
        Command::Status { json } => app::status(&settings, json),
        Command::History { limit } => {
            app::history(&settings, limit);
            Ok(())
        }
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("pingpace=debug,pingpace_core=debug")
    } else {
        EnvFilter::new("pingpace=info,pingpace_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
