use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::Step;
use crate::pipeline::{PipelineOutcome, RunReport, State};

/// Output format for the run report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Log lines only
    #[default]
    Text,
    /// JSON report on stdout - machine-parseable
    Json,
}

/// Serializable view of a [`RunReport`].
#[derive(Debug, Serialize)]
pub struct ReportView<'a> {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub branch: Option<&'a str>,
    pub workspace: Option<&'a Path>,
    pub trace: &'a [State],
}

impl<'a> From<&'a RunReport> for ReportView<'a> {
    fn from(report: &'a RunReport) -> Self {
        let (outcome, failed_step, reason) = match &report.outcome {
            PipelineOutcome::Deployed => ("deployed", None, None),
            PipelineOutcome::SkippedBranchNotAllowed { .. } => {
                ("skipped-branch-not-allowed", None, Some(report.outcome.to_string()))
            }
            PipelineOutcome::SkippedNoChanges => {
                ("skipped-no-changes", None, Some(report.outcome.to_string()))
            }
            PipelineOutcome::Failed(e) => ("failed", Some(e.step()), Some(e.to_string())),
        };
        Self {
            outcome,
            failed_step,
            reason,
            branch: report.branch.as_deref(),
            workspace: report.workspace.as_deref(),
            trace: &report.trace,
        }
    }
}

impl OutputFormat {
    /// Render the report, or `None` when this format prints nothing.
    ///
    /// # Errors
    /// Returns the serializer error for the JSON format.
    pub fn render(self, report: &RunReport) -> Result<Option<String>, serde_json::Error> {
        match self {
            Self::Text => Ok(None),
            Self::Json => serde_json::to_string_pretty(&ReportView::from(report)).map(Some),
        }
    }
}
