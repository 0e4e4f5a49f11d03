use crate::plan::CleanupPlan;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use super::ClassificationReport;

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, report: &ClassificationReport, plan: Option<&CleanupPlan>) -> Result<()> {
        let json = render(report, plan)?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    report: &'a ClassificationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a CleanupPlan>,
}

/// Render a report (and plan) as pretty JSON
pub fn render(report: &ClassificationReport, plan: Option<&CleanupPlan>) -> Result<String> {
    let doc = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        report,
        plan,
    };
    serde_json::to_string_pretty(&doc).into_diagnostic()
}
