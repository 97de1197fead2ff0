//! Per-clause verdicts and the document-level compliance report.

use std::collections::BTreeMap;
use std::fmt;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::{Deserialize, Serialize};

use crate::types::{ClauseKind, PARSING_FAILED};

/// Compliance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Compliant,
    #[serde(rename = "Non-compliant")]
    NonCompliant,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::NonCompliant => "Non-compliant",
        }
    }

    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant)
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub status: ComplianceStatus,

    /// Absent when a model omitted the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,

    /// Id of the best-matching rule, when retrieval ranked rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
}

impl ComplianceResult {
    pub fn compliant() -> Self {
        Self {
            status: ComplianceStatus::Compliant,
            issues: Some(Vec::new()),
            matched_rule: None,
        }
    }

    pub fn non_compliant(issues: Vec<String>) -> Self {
        Self {
            status: ComplianceStatus::NonCompliant,
            issues: Some(issues),
            matched_rule: None,
        }
    }

    /// Verdict used whenever a model answer could not be decoded.
    pub fn parsing_failed() -> Self {
        Self::non_compliant(vec![PARSING_FAILED.to_string()])
    }

    pub fn with_matched_rule(mut self, rule_id: Option<String>) -> Self {
        self.matched_rule = rule_id;
        self
    }
}

/// One non-compliant clause in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub clause: String,
    pub issues: Vec<String>,
}

/// Document-level verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub compliance_status: ComplianceStatus,
    pub findings: Vec<Finding>,
}

impl ComplianceReport {
    pub fn is_compliant(&self) -> bool {
        self.compliance_status.is_compliant()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Human-readable rendering with a findings table.
    pub fn render_text(&self) -> String {
        let status = match self.compliance_status {
            ComplianceStatus::Compliant => console::style(self.compliance_status.as_str()).green(),
            ComplianceStatus::NonCompliant => console::style(self.compliance_status.as_str()).red(),
        }
        .bold();

        let mut out = format!("Compliance status: {status}\n");
        if self.findings.is_empty() {
            out.push_str("No findings.\n");
            return out;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Clause", "Issues"]);
        for finding in &self.findings {
            table.add_row(vec![
                Cell::new(&finding.clause).fg(Color::Yellow),
                Cell::new(finding.issues.join("\n")),
            ]);
        }
        out.push_str(&table.to_string());
        out.push('\n');
        out
    }
}

/// Combine per-clause verdicts into one report.
///
/// Clauses are walked in canonical order. A clause without a result counts
/// as non-compliant, and a result without issues reports [`PARSING_FAILED`].
pub fn aggregate(results: &BTreeMap<ClauseKind, ComplianceResult>) -> ComplianceReport {
    let mut compliance_status = ComplianceStatus::Compliant;
    let mut findings = Vec::new();

    for kind in ClauseKind::ALL {
        let issues = match results.get(&kind) {
            Some(result) if result.status.is_compliant() => continue,
            Some(result) => result.issues.clone(),
            None => {
                tracing::warn!(target: "report", "no verdict for clause '{kind}'");
                None
            }
        };

        compliance_status = ComplianceStatus::NonCompliant;
        findings.push(Finding {
            clause: kind.as_str().to_string(),
            issues: issues.unwrap_or_else(|| vec![PARSING_FAILED.to_string()]),
        });
    }

    ComplianceReport {
        compliance_status,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(result: ComplianceResult) -> BTreeMap<ClauseKind, ComplianceResult> {
        ClauseKind::ALL.iter().map(|k| (*k, result.clone())).collect()
    }

    #[test]
    fn test_all_compliant() {
        let report = aggregate(&all(ComplianceResult::compliant()));
        assert!(report.is_compliant());
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_single_violation_appears_once() {
        let mut results = all(ComplianceResult::compliant());
        results.insert(
            ClauseKind::Confidentiality,
            ComplianceResult::non_compliant(vec!["No duration given".to_string()]),
        );

        let report = aggregate(&results);
        assert_eq!(report.compliance_status, ComplianceStatus::NonCompliant);
        assert_eq!(
            report.findings,
            vec![Finding {
                clause: "confidentiality".to_string(),
                issues: vec!["No duration given".to_string()],
            }]
        );
    }

    #[test]
    fn test_missing_issues_and_missing_results() {
        let mut results = all(ComplianceResult::compliant());
        results.insert(
            ClauseKind::Purpose,
            ComplianceResult {
                status: ComplianceStatus::NonCompliant,
                issues: None,
                matched_rule: None,
            },
        );
        results.remove(&ClauseKind::TermTermination);

        let report = aggregate(&results);
        let clauses: Vec<&str> = report.findings.iter().map(|f| f.clause.as_str()).collect();
        assert_eq!(clauses, vec!["purpose", "term_termination"]);
        assert!(report.findings.iter().all(|f| f.issues == vec![PARSING_FAILED]));
    }

    #[test]
    fn test_findings_follow_canonical_order() {
        let report = aggregate(&all(ComplianceResult::parsing_failed()));
        let clauses: Vec<&str> = report.findings.iter().map(|f| f.clause.as_str()).collect();
        assert_eq!(
            clauses,
            vec!["purpose", "parties_responsibilities", "confidentiality", "term_termination"]
        );
    }

    #[test]
    fn test_report_wire_format() {
        let report = ComplianceReport {
            compliance_status: ComplianceStatus::NonCompliant,
            findings: vec![Finding {
                clause: "purpose".to_string(),
                issues: vec!["Parsing failed".to_string()],
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "compliance_status": "Non-compliant",
                "findings": [{"clause": "purpose", "issues": ["Parsing failed"]}]
            })
        );
    }

    #[test]
    fn test_result_deserializes_without_issues() {
        let result: ComplianceResult = serde_json::from_str(r#"{"status": "Compliant"}"#).unwrap();
        assert_eq!(result.status, ComplianceStatus::Compliant);
        assert!(result.issues.is_none());
    }

    #[test]
    fn test_render_text_lists_findings() {
        let report = aggregate(&all(ComplianceResult::parsing_failed()));
        let text = report.render_text();
        assert!(text.contains("Non-compliant"));
        assert!(text.contains("parties_responsibilities"));
    }
}
