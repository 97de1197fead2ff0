//! Check command - run the pipeline over one document.

use anyhow::Context;
use serde::Serialize;

use crate::config::Settings;
use crate::documents::{DocumentSource, source_from_config};
use crate::io::{ExitCode, OutputFormat};
use crate::pipeline::{ClauseOutcome, CompliancePipeline, RunOutcome};
use crate::report::ComplianceReport;

/// Document source with the root resolved against the workspace.
pub fn document_source(settings: &Settings) -> anyhow::Result<Box<dyn DocumentSource>> {
    let mut config = settings.documents.clone();
    config.root = settings.resolve_path(&config.root);
    source_from_config(&config, settings.llm.timeout()).context("cannot open document store")
}

/// Load `name` (or the default document) and run the pipeline over it.
pub async fn check_document(
    pipeline: &CompliancePipeline,
    source: &dyn DocumentSource,
    name: &str,
) -> anyhow::Result<RunOutcome> {
    let document = source
        .load(name)
        .await
        .with_context(|| format!("cannot read document '{name}'"))?;
    Ok(pipeline.run_detailed(&document).await?)
}

#[derive(Serialize)]
struct DetailedReport<'a> {
    document: &'a str,
    #[serde(flatten)]
    report: &'a ComplianceReport,
    clauses: &'a [ClauseOutcome],
}

/// The report plus per-clause text and verdicts (`--json --details`).
pub fn detailed_json(outcome: &RunOutcome, document: &str) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&DetailedReport {
        document,
        report: &outcome.report,
        clauses: &outcome.outcomes,
    })
}

/// Print a report in the requested format.
pub fn print_report(outcome: &RunOutcome, document: &str, format: OutputFormat, details: bool) {
    match format {
        OutputFormat::Json if details => match detailed_json(outcome, document) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing report: {e}"),
        },
        OutputFormat::Json => println!("{}", outcome.report.to_json_pretty()),
        OutputFormat::Text => {
            println!("Final Compliance Report: {document}");
            print!("{}", outcome.report.render_text());
        }
    }
}

/// Run check command.
pub async fn run_check(
    settings: &Settings,
    document: Option<&str>,
    format: OutputFormat,
    details: bool,
) -> anyhow::Result<ExitCode> {
    let name = document.unwrap_or(&settings.documents.default_document);

    let pipeline = CompliancePipeline::from_settings(settings)
        .await
        .context("cannot build compliance pipeline")?;
    let source = document_source(settings)?;

    let outcome = check_document(&pipeline, source.as_ref(), name).await?;
    print_report(&outcome, name, format, details);

    Ok(ExitCode::from_report(&outcome.report))
}
