use error_stack::ResultExt;
use thiserror::Error;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use snowflake_to_sheets::{
    application::sync_routine::SnowflakeToSheetsRoutine,
    config::app_config::{config_path, AppConfig},
    prettyprint::PrettyFormatter,
};

const DEBUG_ENV: &str = "SNOWSHEETS_DEBUG";

#[derive(Error, Debug)]
enum AppError {
    #[error("Configuration error")]
    Config,
    #[error("Routine failed")]
    Routine,
}

fn setup_tracing() {
    let level = if std::env::var_os(DEBUG_ENV).is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .event_format(PrettyFormatter::new(true))
        .with_writer(std::io::stdout);

    Registry::default()
        .with(tracing_subscriber::filter::Targets::new().with_target("snowflake_to_sheets", level))
        .with(stdout_layer)
        .init();

    tracing::trace!("Setting panic hook");
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {info}");
    }));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> error_stack::Result<(), AppError> {
    setup_tracing();

    let config = AppConfig::load(&config_path()).change_context(AppError::Config)?;
    let run_date = chrono::Local::now().date_naive();

    let routine = SnowflakeToSheetsRoutine::new(config, run_date);
    let span = tracing::info_span!("routine", routine = routine.name());
    let written = routine
        .run()
        .instrument(span)
        .await
        .change_context(AppError::Routine)?;

    if written {
        tracing::info!("Data successfully pushed to Google Sheets.");
    } else {
        tracing::warn!("Data push to Google Sheets failed.");
    }

    Ok(())
}
