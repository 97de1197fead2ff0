//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and all subcommand enums.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::{ExtractionMode, RetrievalMode, SearchBackend, Settings, ValidationMode};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const QUICK_START: &str = "Quick Start:
  $ clausewise init                          # Create .clausewise/settings.toml
  $ clausewise rules build                   # Embed the rule corpus into the cache
  $ clausewise check                         # Check proper_mou_document.txt
  $ clausewise check mou.txt --json          # Machine-readable report
  $ clausewise check mou.txt --retrieval embedding --validation threshold
  $ clausewise chat                          # Check, then open the command loop";

/// MOU clause compliance checker
#[derive(Parser)]
#[command(
    name = "clausewise",
    version = env!("CARGO_PKG_VERSION"),
    about = "Check an MOU's clauses against reference rules",
    long_about = "Extract the clauses of a Memorandum of Understanding, retrieve the matching reference rules and decide a compliance verdict per clause.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = QUICK_START
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show detailed loading information
    #[arg(long, global = true)]
    pub info: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .clausewise directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    #[command(about = "Display active settings")]
    Config,

    /// Check a document and print the compliance report
    #[command(
        about = "Check an MOU document for compliance",
        after_help = "Exit status: 0 compliant, 2 non-compliant, 1 error.\n\nExamples:\n  clausewise check\n  clausewise check contracts/acme_mou.txt --json\n  clausewise check mou.txt --extraction marker --retrieval embedding --validation threshold --threshold 0.8"
    )]
    Check {
        /// Document name (defaults to documents.default_document)
        #[arg(value_name = "DOCUMENT")]
        document: Option<String>,

        #[command(flatten)]
        overrides: PipelineOverrides,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Include per-clause text and verdicts in JSON output
        #[arg(long, requires = "json")]
        details: bool,
    },

    /// Manage the rule corpus
    #[command(about = "Build the rule embedding cache")]
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Check a document, then answer commands line by line
    #[command(
        about = "Interactive command loop",
        after_help = "Commands inside the loop:\n  check <path>   check another document\n  report         print the last report again\n  help           list commands\n  exit | quit    leave"
    )]
    Chat {
        /// Document checked before the loop starts
        #[arg(value_name = "DOCUMENT")]
        document: Option<String>,

        /// Start the loop without an initial check
        #[arg(long)]
        no_check: bool,

        #[command(flatten)]
        overrides: PipelineOverrides,
    },
}

/// Rule corpus actions
#[derive(Subcommand)]
pub enum RulesAction {
    /// Segment and embed the corpus, reusing the cache when nothing changed
    #[command(
        about = "Build or refresh the rule embedding cache",
        after_help = "Examples:\n  clausewise rules build\n  clausewise rules build --source policies/mou_rules.txt --force"
    )]
    Build {
        /// Rule corpus (overrides rules.source)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Rebuild even when the cache is up to date
        #[arg(short, long)]
        force: bool,
    },

    /// Show what the cache was built from
    #[command(about = "Show the rule cache fingerprint")]
    Status,
}

/// Strategy overrides shared by `check` and `chat`.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineOverrides {
    /// Rule retrieval strategy (overrides pipeline.retrieval)
    #[arg(long, value_enum)]
    pub retrieval: Option<RetrievalMode>,

    /// Clause extraction strategy (overrides pipeline.extraction)
    #[arg(long, value_enum)]
    pub extraction: Option<ExtractionMode>,

    /// Verdict strategy (overrides pipeline.validation)
    #[arg(long, value_enum)]
    pub validation: Option<ValidationMode>,

    /// Keyword search backend (overrides search.backend)
    #[arg(long, value_enum)]
    pub search: Option<SearchBackend>,

    /// Similarity threshold for threshold validation
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Abort on the first provider failure
    #[arg(long)]
    pub fail_fast: bool,
}

impl PipelineOverrides {
    /// Apply the flags that were given on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(retrieval) = self.retrieval {
            settings.pipeline.retrieval = retrieval;
        }
        if let Some(extraction) = self.extraction {
            settings.pipeline.extraction = extraction;
        }
        if let Some(validation) = self.validation {
            settings.pipeline.validation = validation;
        }
        if let Some(search) = self.search {
            settings.search.backend = search;
        }
        if let Some(threshold) = self.threshold {
            settings.pipeline.threshold = threshold;
        }
        if self.fail_fast {
            settings.pipeline.fail_fast = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_overrides_are_applied() {
        let cli = Cli::try_parse_from([
            "clausewise",
            "check",
            "mou.txt",
            "--retrieval",
            "embedding",
            "--validation",
            "threshold",
            "--threshold",
            "0.8",
            "--fail-fast",
        ])
        .unwrap();

        let Commands::Check {
            document,
            overrides,
            json,
            ..
        } = cli.command
        else {
            panic!("expected check");
        };
        assert_eq!(document.as_deref(), Some("mou.txt"));
        assert!(!json);

        let mut settings = Settings::default();
        overrides.apply(&mut settings);
        assert_eq!(settings.pipeline.retrieval, RetrievalMode::Embedding);
        assert_eq!(settings.pipeline.validation, ValidationMode::Threshold);
        assert_eq!(settings.pipeline.threshold, 0.8);
        assert!(settings.pipeline.fail_fast);
        assert_eq!(settings.pipeline.extraction, ExtractionMode::Model);
    }

    #[test]
    fn test_details_requires_json() {
        assert!(Cli::try_parse_from(["clausewise", "check", "--details"]).is_err());
    }
}
