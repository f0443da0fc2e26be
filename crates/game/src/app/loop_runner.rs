use std::process::ExitCode;

use tile_engine::{run_app, AppError};
use tracing::error;

use super::bootstrap::{AppWiring, BootstrapError};

pub(crate) fn run(app: Result<AppWiring, BootstrapError>) -> ExitCode {
    let app = match app {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    match run_app(app.config, app.game) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Fatal(err)) => {
            error!(error = %err, "fatal");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "runtime_failed");
            ExitCode::FAILURE
        }
    }
}
