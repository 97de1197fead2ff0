pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod extract;
pub mod io;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod rules;
pub mod semantic;
pub mod types;
pub mod utils;
pub mod validate;

pub use config::Settings;
pub use documents::{Chunk, Document, DocumentSource};
pub use error::{ParseError, ProviderError, ProviderResult};
pub use pipeline::{CompliancePipeline, PipelineError, PipelineResult, RunOutcome};
pub use report::{ComplianceReport, ComplianceResult, ComplianceStatus, Finding, aggregate};
pub use rules::{Rule, RuleContext, RuleMatch, RuleStore};
pub use types::{ClauseKind, ClauseMap, NO_RULE_FOUND, NOT_FOUND, PARSING_FAILED};
pub use utils::calculate_hash;
