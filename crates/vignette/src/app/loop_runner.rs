use std::process::ExitCode;

use choreo::run_headless;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_headless(app.config, app.scene) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                ticks = summary.ticks,
                "vignette_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
