use std::{path::Path, process};

use clap::Parser;
use edgepurge::{
    application::{commands, error::AppError},
    config::{self, CliArgs, Command},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, kind = error.kind(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, kind = error.kind(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli_args = CliArgs::parse();
    let root = Path::new(".");

    let settings = match config::load(&cli_args) {
        Ok(settings) => settings,
        // A broken settings document must not block its own reset.
        Err(_) if matches!(cli_args.command, Command::FactoryReset) => {
            let message = commands::factory_reset(root, cli_args.site_id.as_deref()).await?;
            println!("{message}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    telemetry::init(&settings.logging)?;

    commands::execute(
        cli_args.command,
        &settings,
        cli_args.site_id.as_deref(),
        root,
    )
    .await
}
