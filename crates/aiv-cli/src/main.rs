use aiv_core::logging;

mod cli;

use crate::cli::{CliCommand, Outcome};

/// Exit code when verification did not pass and the app requires it.
const EXIT_VERIFICATION_FAILED: i32 = 2;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; fall back to stderr if the state dir is unusable.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    match CliCommand::run_from_args().await {
        Ok(Outcome::Success) => {}
        Ok(Outcome::VerificationFailed) => std::process::exit(EXIT_VERIFICATION_FAILED),
        Err(err) => {
            eprintln!("aiv error: {:#}", err);
            std::process::exit(1);
        }
    }
}
