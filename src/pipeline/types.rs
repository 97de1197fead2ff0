//! Pipeline errors and run results.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::documents::SegmentError;
use crate::error::ProviderError;
use crate::report::{ComplianceReport, ComplianceResult};
use crate::rules::RuleError;
use crate::types::{ClauseKind, ClauseMap};

/// Errors that stop a pipeline from being built or from finishing a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {0}")]
    Config(String),

    #[error("No rule corpus at {source_path} and no rule cache at {cache_path}")]
    NoRules {
        source_path: PathBuf,
        cache_path: PathBuf,
    },

    #[error("Rule cache was built with '{cached}' but '{configured}' is configured; run 'clausewise rules build'")]
    ModelMismatch { cached: String, configured: String },

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// What happened to one clause during a run.
#[derive(Debug, Clone, Serialize)]
pub struct ClauseOutcome {
    pub clause: ClauseKind,
    pub text: String,
    pub result: ComplianceResult,
}

/// Everything a run produced, for callers that want more than the report.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub clauses: ClauseMap,
    pub outcomes: Vec<ClauseOutcome>,
    pub report: ComplianceReport,
}

impl RunOutcome {
    pub fn results(&self) -> BTreeMap<ClauseKind, ComplianceResult> {
        self.outcomes
            .iter()
            .map(|o| (o.clause, o.result.clone()))
            .collect()
    }
}
