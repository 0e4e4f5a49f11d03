mod json;
mod model;
mod terminal;

pub use json::{render as render_json, JsonReporter};
pub use model::{AnalysisStatus, AnalysisWarning, AssetEntry, ClassificationReport};
pub use terminal::{format_size, TerminalReporter};

use crate::plan::CleanupPlan;
use miette::Result;
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Default)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

/// Reporter for outputting classification results and plans
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
    show_used: bool,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            output_path,
            show_used: false,
        }
    }

    pub fn with_used(mut self, show: bool) -> Self {
        self.show_used = show;
        self
    }

    /// Report the classification, and the plan when one was computed
    pub fn report(&self, report: &ClassificationReport, plan: Option<&CleanupPlan>) -> Result<()> {
        match &self.format {
            ReportFormat::Terminal => {
                let reporter = TerminalReporter::new().with_used(self.show_used);
                reporter.report(report, plan)
            }
            ReportFormat::Json => {
                let reporter = JsonReporter::new(self.output_path.clone());
                reporter.report(report, plan)
            }
        }
    }
}
