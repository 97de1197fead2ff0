//! Init and Config commands.

use std::path::Path;

use crate::config::{CONFIG_DIR, Settings};
use crate::io::ExitCode;

/// Run init command - create configuration file.
pub fn run_init(dir: &Path, force: bool) -> ExitCode {
    match Settings::init_config_file(dir, force) {
        Ok(path) => {
            if force {
                println!("Wrote configuration file at: {}", path.display());
            } else {
                println!("Created configuration file at: {}", path.display());
            }
            println!("Edit this file to choose extraction, retrieval and validation strategies.");
            println!(
                "Rule caches are stored under {}/ next to the settings file.",
                CONFIG_DIR
            );
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::GeneralError
        }
    }
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> ExitCode {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(config) {
        Ok(toml_str) => {
            println!("{toml_str}");
            if let Err(e) = config.validate() {
                eprintln!("Warning: {e}");
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error displaying config: {e}");
            ExitCode::GeneralError
        }
    }
}
