mod cli;
mod logging;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
