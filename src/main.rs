//! Command-line entry point for clausewise.

use clap::Parser;

use clausewise::Settings;
use clausewise::cli::commands::{chat, check, init, rules};
use clausewise::cli::{Cli, Commands, RulesAction};
use clausewise::io::{ExitCode, OutputFormat};
use clausewise::logging;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Init must work before any configuration exists.
    if let Commands::Init { force } = &cli.command {
        logging::init();
        let dir = match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Error: cannot determine current directory: {e}");
                return ExitCode::GeneralError.into();
            }
        };
        return init::run_init(&dir, *force).into();
    }

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let mut settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::GeneralError.into();
        }
    };
    logging::init_with_config(&settings.logging, cli.info);

    let result = match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Config => Ok(init::run_config(&settings)),
        Commands::Check {
            document,
            overrides,
            json,
            details,
        } => {
            overrides.apply(&mut settings);
            check::run_check(
                &settings,
                document.as_deref(),
                OutputFormat::from_json_flag(json),
                details,
            )
            .await
        }
        Commands::Rules { action } => match action {
            RulesAction::Build { source, force } => {
                if let Some(source) = source {
                    settings.rules.source = source;
                }
                rules::run_build(&settings, force).await
            }
            RulesAction::Status => Ok(rules::run_status(&settings)),
        },
        Commands::Chat {
            document,
            no_check,
            overrides,
        } => {
            overrides.apply(&mut settings);
            chat::run_chat(&settings, document.as_deref(), no_check).await
        }
    };

    match result {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::GeneralError.into()
        }
    }
}
