//! Binary entrypoint for the `magic-backend` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // .env may supply MAGIC_BACKEND_MODE and MAGIC_BACKEND_API_KEY
    let _ = dotenvy::dotenv();
    magic_backend::logging::init();

    match magic_backend::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
