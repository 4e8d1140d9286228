use std::io;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

use rusbit_meta::engine::{report_error, use_command, Cli};
use rusbit_meta::Config;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str())).init();

    let stdout = io::stdout();
    match use_command(&cli, &config, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = report_error(&e, &mut io::stderr().lock());
            ExitCode::FAILURE
        }
    }
}
