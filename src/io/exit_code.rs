//! Process exit codes.

use crate::report::ComplianceReport;

/// Exit status of a CLI invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Command succeeded; for `check`, the document is compliant
    Success = 0,
    /// Configuration, I/O or provider failure
    GeneralError = 1,
    /// The document has at least one non-compliant clause
    NonCompliant = 2,
}

impl ExitCode {
    pub fn from_report(report: &ComplianceReport) -> Self {
        if report.is_compliant() {
            Self::Success
        } else {
            Self::NonCompliant
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}
