use std::process::ExitCode;

use colored::Colorize;

fn main() -> ExitCode {
    match counsel::app::run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_unauthorized() => {
            eprintln!(
                "{} your session has expired or was rejected, sign in again with `counsel login`",
                "::".yellow().bold()
            );
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
