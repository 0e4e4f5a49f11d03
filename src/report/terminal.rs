use crate::analysis::Classification;
use crate::plan::{CleanupCandidate, CleanupPlan};
use colored::Colorize;
use miette::Result;
use std::collections::BTreeMap;

use super::{AssetEntry, ClassificationReport};

/// Terminal reporter with colored output
pub struct TerminalReporter {
    /// Also list every used asset
    show_used: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { show_used: false }
    }

    pub fn with_used(mut self, show: bool) -> Self {
        self.show_used = show;
        self
    }

    pub fn report(&self, report: &ClassificationReport, plan: Option<&CleanupPlan>) -> Result<()> {
        println!();
        if !report.is_complete() {
            println!(
                "{}",
                "Analysis was cancelled: results are partial and no deletions are planned."
                    .red()
                    .bold()
            );
            println!();
        }

        for class in [
            Classification::Unused,
            Classification::Circular,
            Classification::IndirectlyUsed,
            Classification::Excluded,
            Classification::Used,
        ] {
            if class == Classification::Used && !self.show_used {
                continue;
            }
            self.print_group(report, class);
        }

        if !report.cycles.is_empty() {
            println!("{}", "Reference cycles no root reaches:".magenta().bold());
            for cycle in &report.cycles {
                let members: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                println!("  {} {}", "↻".magenta(), members.join(" → "));
            }
            println!();
        }

        if !report.non_engine_files.is_empty() {
            println!(
                "{}",
                format!("{} non-engine files in content:", report.non_engine_files.len())
                    .yellow()
                    .bold()
            );
            for path in &report.non_engine_files {
                println!("  {}", path.display().to_string().dimmed());
            }
            println!();
        }

        if !report.warnings.is_empty() {
            println!("{}", format!("{} warnings:", report.warnings.len()).yellow().bold());
            for warning in &report.warnings {
                println!("  {} {}", "!".yellow(), warning);
            }
            println!();
        }

        if let Some(plan) = plan {
            self.print_plan(plan);
        }

        self.print_summary(report);
        Ok(())
    }

    fn print_group(&self, report: &ClassificationReport, class: Classification) {
        let assets: Vec<&AssetEntry> = report.with_class(class).collect();
        if assets.is_empty() {
            return;
        }

        let title = format!("{} {} assets", assets.len(), class.label());
        let title = match class {
            Classification::Unused => title.red().bold(),
            Classification::Circular => title.magenta().bold(),
            Classification::IndirectlyUsed => title.yellow().bold(),
            Classification::Excluded => title.blue().bold(),
            Classification::Used => title.green().bold(),
        };
        println!("{}", title);

        // Group by folder
        let mut by_folder: BTreeMap<&str, Vec<&AssetEntry>> = BTreeMap::new();
        for asset in assets {
            by_folder.entry(asset.folder.as_str()).or_default().push(asset);
        }

        for (folder, items) in by_folder {
            println!("  {}", folder.cyan());
            for item in items {
                let via = item
                    .reached_via
                    .as_ref()
                    .map(|v| format!(" ← {}", v).dimmed().to_string())
                    .unwrap_or_default();
                println!(
                    "    {} {} {}{}",
                    item.id.name().white(),
                    format!("[{}]", item.class_type).dimmed(),
                    format_size(item.size_bytes).dimmed(),
                    via
                );
            }
        }
        println!();
    }

    fn print_plan(&self, plan: &CleanupPlan) {
        println!("{}", "─".repeat(60).dimmed());
        if plan.steps.is_empty() {
            println!("{}", "Nothing is safe to delete.".green().bold());
        } else {
            println!(
                "{}",
                format!(
                    "Cleanup plan: {} assets, {}",
                    plan.steps.len(),
                    format_size(plan.total_bytes)
                )
                .yellow()
                .bold()
            );
            for (idx, step) in plan.steps.iter().enumerate() {
                println!(
                    "  {:>4}. {} {}",
                    idx + 1,
                    step.id,
                    format!("({})", step.reason).dimmed()
                );
            }
        }

        self.print_candidates("Blocked", &plan.blocked, true);
        self.print_candidates("Needs confirmation", &plan.needs_confirmation, false);

        if !plan.folders_to_remove.is_empty() {
            println!("{}", "Folders to remove:".bold());
            for folder in &plan.folders_to_remove {
                println!("  {}", folder.display().to_string().dimmed());
            }
        }
        println!();
    }

    fn print_candidates(&self, title: &str, candidates: &[CleanupCandidate], show_blockers: bool) {
        if candidates.is_empty() {
            return;
        }
        println!("{}", format!("{} ({}):", title, candidates.len()).bold());
        for candidate in candidates {
            println!("  {} {}", candidate.id, format!("({})", candidate.reason).dimmed());
            if show_blockers {
                for holder in &candidate.blocked_by {
                    println!("    {} {}", "held by".dimmed(), holder);
                }
            }
        }
    }

    fn print_summary(&self, report: &ClassificationReport) {
        let counts = &report.counts;
        println!("{}", "─".repeat(60).dimmed());
        println!(
            "Summary: {} assets: {}, {}, {}, {}, {}",
            counts.total,
            format!("{} used", counts.used).green(),
            format!("{} indirectly used", counts.indirectly_used).yellow(),
            format!("{} unused", counts.unused).red(),
            format!("{} circular", counts.circular).magenta(),
            format!("{} excluded", counts.excluded).blue(),
        );

        let unused_bytes: u64 = report
            .with_class(Classification::Unused)
            .map(|a| a.size_bytes)
            .sum();
        if unused_bytes > 0 {
            println!("Unused content: {}", format_size(unused_bytes).bold());
        }
        if !report.empty_folders.is_empty() {
            println!("Empty folders: {}", report.empty_folders.len());
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Human readable byte size
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
