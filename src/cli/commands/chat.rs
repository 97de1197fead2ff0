//! Chat command - line-oriented command loop.
//!
//! Reads one command per line until `exit`/`quit` or end of input. The loop
//! is generic over its reader and writer so it can be driven from tests.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use anyhow::Context;

use super::check::{check_document, document_source, print_report};
use crate::config::Settings;
use crate::documents::DocumentSource;
use crate::io::{ExitCode, OutputFormat};
use crate::pipeline::CompliancePipeline;
use crate::report::ComplianceReport;

const PROMPT: &str = "[User] ";

const CANNED_REPLY: &str = "Bot: I am a multi-agent system. Currently, I processed ingestion, clause extraction, RAG retrieval, and compliance check.";

const HELP: &str = "Commands:
  check <path>   check another document
  report         print the last report again
  help           list commands
  exit | quit    leave";

/// One line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Exit,
    Help,
    Report,
    Check(String),
    Empty,
    Other(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map(|(head, rest)| (head, rest.trim()))
            .unwrap_or((line, ""));

        match head.to_lowercase().as_str() {
            "" => Self::Empty,
            "exit" | "quit" if rest.is_empty() => Self::Exit,
            "help" if rest.is_empty() => Self::Help,
            "report" if rest.is_empty() => Self::Report,
            "check" if !rest.is_empty() => Self::Check(rest.to_string()),
            _ => Self::Other(line.to_string()),
        }
    }
}

/// State carried between commands.
pub struct ChatSession<'a> {
    pipeline: &'a CompliancePipeline,
    source: &'a dyn DocumentSource,
    last_report: Option<ComplianceReport>,
}

impl<'a> ChatSession<'a> {
    pub fn new(pipeline: &'a CompliancePipeline, source: &'a dyn DocumentSource) -> Self {
        Self {
            pipeline,
            source,
            last_report: None,
        }
    }

    pub fn last_report(&self) -> Option<&ComplianceReport> {
        self.last_report.as_ref()
    }

    /// Check a document and remember its report; returns the JSON text.
    pub async fn check(&mut self, name: &str) -> anyhow::Result<String> {
        let outcome = check_document(self.pipeline, self.source, name).await?;
        let json = outcome.report.to_json_pretty();
        self.last_report = Some(outcome.report);
        Ok(json)
    }

    /// Answer one command. `None` ends the loop.
    pub async fn respond(&mut self, command: ChatCommand) -> Option<String> {
        let reply = match command {
            ChatCommand::Exit => return None,
            ChatCommand::Empty => String::new(),
            ChatCommand::Help => HELP.to_string(),
            ChatCommand::Report => match &self.last_report {
                Some(report) => report.to_json_pretty(),
                None => "Bot: No report yet. Use 'check <path>' first.".to_string(),
            },
            ChatCommand::Check(name) => match self.check(&name).await {
                Ok(json) => format!("Final Compliance Report\n{json}"),
                Err(e) => format!("Bot: Check failed: {e:#}"),
            },
            ChatCommand::Other(_) => CANNED_REPLY.to_string(),
        };
        Some(reply)
    }

    /// Run until exit or end of input.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            writer.write_all(PROMPT.as_bytes()).await?;
            writer.flush().await?;

            let Some(line) = lines.next_line().await? else {
                writer.write_all(b"\n").await?;
                break;
            };

            match self.respond(ChatCommand::parse(&line)).await {
                Some(reply) if reply.is_empty() => {}
                Some(reply) => {
                    writer.write_all(reply.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                }
                None => {
                    writer.write_all(b"Exiting bot.\n").await?;
                    break;
                }
            }
        }
        writer.flush().await
    }
}

/// Run chat command.
///
/// Checks the document first unless `no_check` is set, then reads commands
/// from stdin. The exit code reflects the last report.
pub async fn run_chat(
    settings: &Settings,
    document: Option<&str>,
    no_check: bool,
) -> anyhow::Result<ExitCode> {
    let pipeline = CompliancePipeline::from_settings(settings)
        .await
        .context("cannot build compliance pipeline")?;
    let source = document_source(settings)?;
    let mut session = ChatSession::new(&pipeline, source.as_ref());

    if !no_check {
        let name = document.unwrap_or(&settings.documents.default_document);
        let outcome = check_document(&pipeline, source.as_ref(), name).await?;
        print_report(&outcome, name, OutputFormat::Text, false);
        session.last_report = Some(outcome.report);
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session
        .run(stdin, tokio::io::stdout())
        .await
        .context("chat input failed")?;

    Ok(session
        .last_report()
        .map(ExitCode::from_report)
        .unwrap_or(ExitCode::Success))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::FsDocumentSource;
    use crate::extract::MarkerClauseExtractor;
    use crate::rules::{EmbeddingRuleStore, Rule, RuleStore};
    use crate::semantic::HashingEmbeddingProvider;
    use crate::validate::ThresholdValidator;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn pipeline() -> CompliancePipeline {
        let embedder = Arc::new(HashingEmbeddingProvider::new(32));
        let store = EmbeddingRuleStore::new(vec![Rule::new("rule-0", "purpose")], embedder)
            .await
            .unwrap();
        CompliancePipeline::new(
            Box::new(MarkerClauseExtractor::default()),
            RuleStore::Embedding(store),
            Box::new(ThresholdValidator::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_session_checks_and_exits() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mou.txt"), "purpose").unwrap();
        let source = FsDocumentSource::new(dir.path().to_path_buf());
        let pipeline = pipeline().await;
        let mut session = ChatSession::new(&pipeline, &source);

        let input = b"hello\nreport\ncheck mou.txt\nmissing.txt\nQUIT\nhelp\n";
        let mut output = Vec::new();
        session.run(&input[..], &mut output).await.unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains(CANNED_REPLY));
        assert!(output.contains("No report yet"));
        assert!(output.contains("Final Compliance Report"));
        assert!(output.ends_with("Exiting bot.\n"));
        assert!(!output.contains("Commands:"));
        assert!(session.last_report().is_some());
    }

    #[tokio::test]
    async fn test_failed_check_keeps_loop_running() {
        let dir = TempDir::new().unwrap();
        let source = FsDocumentSource::new(dir.path().to_path_buf());
        let pipeline = pipeline().await;
        let mut session = ChatSession::new(&pipeline, &source);

        let reply = session
            .respond(ChatCommand::Check("absent.txt".to_string()))
            .await
            .unwrap();
        assert!(reply.starts_with("Bot: Check failed"));
        assert!(session.last_report().is_none());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatCommand::parse("EXIT"), ChatCommand::Exit);
        assert_eq!(ChatCommand::parse("  Quit "), ChatCommand::Exit);
        assert_eq!(ChatCommand::parse("help"), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("report"), ChatCommand::Report);
        assert_eq!(
            ChatCommand::parse("check  docs/mou.txt"),
            ChatCommand::Check("docs/mou.txt".to_string())
        );
        assert_eq!(ChatCommand::parse(""), ChatCommand::Empty);
        assert_eq!(
            ChatCommand::parse("exit now"),
            ChatCommand::Other("exit now".to_string())
        );
        assert_eq!(
            ChatCommand::parse("check"),
            ChatCommand::Other("check".to_string())
        );
    }
}
