//! Watch mode for assetsweep
//!
//! Monitors the content tree and hands debounced batches of changed asset
//! and sidecar paths to a callback, which typically feeds `Engine::refresh`.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;
use colored::Colorize;
use tracing::warn;

/// Watch mode errors
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create file watcher: {0}")]
    WatcherError(#[from] notify::Error),
    #[error("Failed to receive events: {0}")]
    RecvError(#[from] std::sync::mpsc::RecvError),
}

/// Content watcher for continuous analysis
pub struct FileWatcher {
    /// Debounce duration in milliseconds
    debounce_ms: u64,
    /// Asset file extensions to watch
    extensions: Vec<String>,
    /// Dependency sidecar suffix
    sidecar_suffix: String,
}

impl FileWatcher {
    /// Create a new file watcher with default settings
    pub fn new() -> Self {
        Self {
            debounce_ms: 500,
            extensions: vec!["uasset".to_string(), "umap".to_string()],
            sidecar_suffix: ".deps.json".to_string(),
        }
    }

    /// Set debounce duration
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set asset extensions to watch
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_sidecar_suffix(mut self, suffix: &str) -> Self {
        self.sidecar_suffix = suffix.to_string();
        self
    }

    /// Check if a path should trigger a refresh
    ///
    /// Asset files, sidecars and removed folders do; hidden paths never do.
    fn should_trigger(&self, path: &Path) -> bool {
        let hidden = path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        if hidden {
            return false;
        }

        if path.to_string_lossy().ends_with(&self.sidecar_suffix) {
            return true;
        }
        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|e| e == &ext)
            }
            // Removed folder
            None => !path.exists(),
        }
    }

    /// Start watching a directory and call the callback with each batch of
    /// changed paths
    pub fn watch<F>(&self, path: &Path, mut on_change: F) -> Result<(), WatchError>
    where
        F: FnMut(&[PathBuf]) -> bool, // Returns false to stop watching
    {
        let (tx, rx) = channel();

        // Create debounced watcher
        let mut debouncer = new_debouncer(Duration::from_millis(self.debounce_ms), tx)?;
        debouncer.watcher().watch(path, RecursiveMode::Recursive)?;

        println!();
        println!("{}", "👁  Watch mode active. Press Ctrl+C to stop.".cyan().bold());
        println!("{}", format!("   Watching: {}", path.display()).dimmed());
        println!();

        loop {
            match rx.recv()? {
                Ok(events) => {
                    let relevant: BTreeSet<PathBuf> = events
                        .into_iter()
                        .filter(|e| {
                            matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous)
                                && self.should_trigger(&e.path)
                        })
                        .map(|e| e.path)
                        .collect();

                    if relevant.is_empty() {
                        continue;
                    }

                    println!();
                    println!(
                        "{}",
                        format!("🔄 {} changed path(s), refreshing...", relevant.len()).yellow()
                    );
                    for changed in relevant.iter().take(5) {
                        if let Some(name) = changed.file_name() {
                            println!("   • {}", name.to_string_lossy().dimmed());
                        }
                    }
                    if relevant.len() > 5 {
                        println!("   • ... and {} more", relevant.len() - 5);
                    }
                    println!();

                    let changed: Vec<PathBuf> = relevant.into_iter().collect();
                    if !on_change(&changed) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Watch error: {:?}", e);
                }
            }
        }

        Ok(())
    }
}

impl Default for FileWatcher {
    fn default() -> Self {
        Self::new()
    }
}
