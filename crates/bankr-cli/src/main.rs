mod cli;

use bankr_core::api::ApiError;

/// Exit code when the command needs a signed-in session.
const SIGN_IN_EXIT_CODE: i32 = 2;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{e:#}"); // pretty anyhow chain
        let needs_sign_in = e.downcast_ref::<cli::session::SignInRequired>().is_some()
            || e
                .downcast_ref::<ApiError>()
                .is_some_and(ApiError::is_unauthorized);
        std::process::exit(if needs_sign_in { SIGN_IN_EXIT_CODE } else { 1 });
    }
}
