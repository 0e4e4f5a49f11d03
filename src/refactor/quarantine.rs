use crate::graph::{AssetId, Direction, Graph, ReferenceKind};
use crate::plan::{CleanupCandidate, CleanupPlan};
use crate::refactor::undo::UndoScript;
use crate::report::format_size;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("{path} is outside the content root")]
    OutsideContent { path: PathBuf },

    #[error("{path} already exists in quarantine")]
    AlreadyQuarantined { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> QuarantineError + '_ {
    move |source| QuarantineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// What a quarantine run did
#[derive(Debug, Default)]
pub struct QuarantineOutcome {
    /// Assets moved, in plan order
    pub moved: Vec<AssetId>,
    /// Assets skipped by the user, or dropped because a skipped asset needs them
    pub skipped: Vec<AssetId>,
    pub failed: Vec<(AssetId, String)>,
    pub folders_removed: Vec<PathBuf>,
}

/// Executes a cleanup plan by moving asset files into a quarantine folder
///
/// Files are never unlinked. Items that need confirmation are never touched.
pub struct Quarantine {
    content_root: PathBuf,
    quarantine_dir: PathBuf,
    sidecar_suffix: String,
    interactive: bool,
    confirm: bool,
    dry_run: bool,
    undo_script_path: Option<PathBuf>,
}

impl Quarantine {
    pub fn new(content_root: PathBuf, quarantine_dir: PathBuf) -> Self {
        Self {
            content_root,
            quarantine_dir,
            sidecar_suffix: ".deps.json".to_string(),
            interactive: false,
            confirm: true,
            dry_run: false,
            undo_script_path: None,
        }
    }

    pub fn with_sidecar_suffix(mut self, suffix: &str) -> Self {
        self.sidecar_suffix = suffix.to_string();
        self
    }

    /// Ask about each asset before moving it
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Ask once before moving anything (on by default)
    pub fn with_confirmation(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_undo_script(mut self, path: Option<PathBuf>) -> Self {
        self.undo_script_path = path;
        self
    }

    /// Run the plan's steps in order, then remove the folders it empties
    pub fn execute(&self, plan: &CleanupPlan, graph: &Graph) -> Result<QuarantineOutcome, QuarantineError> {
        let mut outcome = QuarantineOutcome::default();
        if plan.steps.is_empty() {
            println!("{}", "Nothing to quarantine.".green());
            return Ok(outcome);
        }

        if self.dry_run {
            self.print_dry_run(plan);
            return Ok(outcome);
        }

        let selected = if self.interactive {
            self.interactive_select(&plan.steps)?
        } else {
            plan.steps.iter().collect()
        };
        let (selected, dropped) = close_selection(graph, &plan.steps, selected);
        outcome.skipped = plan
            .steps
            .iter()
            .filter(|s| !selected.iter().any(|c| c.id == s.id))
            .map(|s| s.id.clone())
            .collect();
        for id in &dropped {
            println!(
                "  {} Keeping {}: a skipped asset still needs it",
                "→".dimmed(),
                id
            );
        }

        if selected.is_empty() {
            println!("{}", "No assets selected.".yellow());
            return Ok(outcome);
        }

        if self.confirm && !self.interactive {
            let bytes: u64 = selected.iter().map(|c| c.size_bytes).sum();
            let proceed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!(
                    "Move {} assets ({}) to {}?",
                    selected.len(),
                    format_size(bytes),
                    self.quarantine_dir.display()
                ))
                .default(false)
                .interact()?;
            if !proceed {
                outcome.skipped = plan.steps.iter().map(|s| s.id.clone()).collect();
                return Ok(outcome);
            }
        }

        let mut undo = UndoScript::new();

        println!();
        println!("{}", "Quarantining assets...".cyan().bold());
        for candidate in &selected {
            match self.quarantine_candidate(candidate, &mut undo) {
                Ok(()) => {
                    println!("  {} {}", "✓".green(), candidate.id);
                    outcome.moved.push(candidate.id.clone());
                }
                Err(e) => {
                    warn!("Failed to quarantine {}: {}", candidate.id, e);
                    println!("  {} {}: {}", "✗".red(), candidate.id, e);
                    outcome.failed.push((candidate.id.clone(), e.to_string()));
                }
            }
        }

        // Only folders that really are empty now; failed moves keep theirs
        for folder in &plan.folders_to_remove {
            match std::fs::remove_dir(folder) {
                Ok(()) => {
                    debug!("Removed folder {}", folder.display());
                    undo.record_folder(folder);
                    outcome.folders_removed.push(folder.clone());
                }
                Err(e) => debug!("Keeping folder {}: {}", folder.display(), e),
            }
        }

        if let Some(path) = &self.undo_script_path {
            undo.write(path).map_err(io_error(path))?;
            println!();
            println!("{} Undo script saved to: {}", "→".dimmed(), path.display());
        }

        info!(
            "Quarantined {} assets, removed {} folders",
            outcome.moved.len(),
            outcome.folders_removed.len()
        );
        Ok(outcome)
    }

    fn quarantine_candidate(
        &self,
        candidate: &CleanupCandidate,
        undo: &mut UndoScript,
    ) -> Result<(), QuarantineError> {
        let Some(file) = &candidate.file else {
            return Ok(());
        };

        let mut files = vec![file.clone()];
        let mut sidecar = file.clone().into_os_string();
        sidecar.push(&self.sidecar_suffix);
        let sidecar = PathBuf::from(sidecar);
        if sidecar.is_file() {
            files.push(sidecar);
        }

        for original in files {
            let target = self.target_for(&original)?;
            move_file(&original, &target)?;
            undo.record_move(&original, &target);
        }
        Ok(())
    }

    /// Location inside the quarantine folder, mirroring the content layout
    fn target_for(&self, original: &Path) -> Result<PathBuf, QuarantineError> {
        let rel = original
            .strip_prefix(&self.content_root)
            .map_err(|_| QuarantineError::OutsideContent {
                path: original.to_path_buf(),
            })?;
        let target = self.quarantine_dir.join(rel);
        if target.exists() {
            return Err(QuarantineError::AlreadyQuarantined { path: target });
        }
        Ok(target)
    }

    fn print_dry_run(&self, plan: &CleanupPlan) {
        println!();
        println!("{}", "Dry run - would quarantine:".yellow().bold());
        for step in &plan.steps {
            let file = step
                .file
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_default();
            println!("  {} {}", step.id.to_string().white(), file.dimmed());
        }
        for folder in &plan.folders_to_remove {
            println!("  {} {}", "rmdir".dimmed(), folder.display());
        }
        println!();
        println!(
            "{}",
            format!(
                "Total: {} assets ({}) would be moved to {}",
                plan.steps.len(),
                format_size(plan.total_bytes),
                self.quarantine_dir.display()
            )
            .dimmed()
        );
    }

    /// Interactive selection mode - confirm each asset
    fn interactive_select<'a>(
        &self,
        steps: &'a [CleanupCandidate],
    ) -> Result<Vec<&'a CleanupCandidate>, QuarantineError> {
        let mut selected = Vec::new();

        println!();
        println!("{}", "Interactive mode - confirm each asset:".cyan().bold());
        println!();

        for step in steps {
            let prompt = format!("Quarantine {} ({})?", step.id, step.reason);
            if Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(&prompt)
                .default(false)
                .interact()?
            {
                selected.push(step);
            }
        }

        Ok(selected)
    }
}

/// Drop selected steps that an unselected step hard references, until stable
///
/// Returns the kept selection (plan order) and the ids dropped by closure.
pub fn close_selection<'a>(
    graph: &Graph,
    steps: &'a [CleanupCandidate],
    selected: Vec<&'a CleanupCandidate>,
) -> (Vec<&'a CleanupCandidate>, Vec<AssetId>) {
    let mut chosen: HashSet<&AssetId> = selected.iter().map(|c| &c.id).collect();
    let mut dropped = Vec::new();

    loop {
        let skipped: HashSet<&AssetId> = steps
            .iter()
            .map(|s| &s.id)
            .filter(|id| !chosen.contains(id))
            .collect();

        let newly: Vec<&AssetId> = chosen
            .iter()
            .copied()
            .filter(|id| {
                graph
                    .neighbors_of_kind(id, Direction::Incoming, ReferenceKind::Hard)
                    .into_iter()
                    .any(|holder| holder != *id && skipped.contains(holder))
            })
            .collect();

        if newly.is_empty() {
            break;
        }
        for id in newly {
            chosen.remove(id);
            dropped.push(id.clone());
        }
    }
    dropped.sort();

    let kept = steps.iter().filter(|s| chosen.contains(&s.id)).collect();
    (kept, dropped)
}

/// Rename, falling back to copy and remove across file systems
fn move_file(from: &Path, to: &Path) -> Result<(), QuarantineError> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(io_error(from))?;
    std::fs::remove_file(from).map_err(io_error(from))?;
    Ok(())
}
