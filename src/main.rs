use onsite_timekeeper::commands::Cli;
use onsite_timekeeper::libs::error::TimekeeperError;
use onsite_timekeeper::libs::messages::{macros::is_debug_mode, Message};
use onsite_timekeeper::msg_error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    if is_debug_mode() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    match Cli::menu() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TimekeeperError>() {
                Some(TimekeeperError::NotAuthenticated) => msg_error!(Message::NoIdentityConfigured),
                _ => msg_error!(Message::CommandFailed(format!("{:#}", e).trim_start_matches("❌ ").to_string())),
            }
            ExitCode::FAILURE
        }
    }
}
