use std::path::{Path, PathBuf};

/// Generates a bash script that puts quarantined files back
pub struct UndoScript {
    /// (original location, quarantine location), in move order
    moves: Vec<(PathBuf, PathBuf)>,
    /// Folders removed after the moves
    folders: Vec<PathBuf>,
}

impl UndoScript {
    pub fn new() -> Self {
        Self {
            moves: Vec::new(),
            folders: Vec::new(),
        }
    }

    /// Record a file moved from `original` to `quarantined`
    pub fn record_move(&mut self, original: &Path, quarantined: &Path) {
        self.moves
            .push((original.to_path_buf(), quarantined.to_path_buf()));
    }

    /// Record a folder removed after the plan ran
    pub fn record_folder(&mut self, folder: &Path) {
        self.folders.push(folder.to_path_buf());
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Script text; files are restored in reverse move order
    pub fn render(&self) -> String {
        let mut script = String::new();

        script.push_str("#!/bin/bash\n");
        script.push_str("# assetsweep undo script\n");
        script.push_str("# Run to move quarantined assets back into the content tree\n");
        script.push('\n');
        script.push_str("set -e\n");
        script.push('\n');

        if !self.folders.is_empty() {
            script.push_str("# Recreate removed folders\n");
            for folder in self.folders.iter().rev() {
                script.push_str(&format!("mkdir -p {}\n", quote(folder)));
            }
            script.push('\n');
        }

        for (original, quarantined) in self.moves.iter().rev() {
            script.push_str(&format!("# Restore {}\n", original.display()));
            if let Some(parent) = original.parent() {
                script.push_str(&format!("mkdir -p {}\n", quote(parent)));
            }
            script.push_str(&format!("mv -n {} {}\n", quote(quarantined), quote(original)));
        }

        script.push('\n');
        script.push_str(&format!("echo 'Restored {} files.'\n", self.moves.len()));
        script
    }

    /// Write the undo script to a file
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())?;

        // Make executable on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }
}

impl Default for UndoScript {
    fn default() -> Self {
        Self::new()
    }
}

fn quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "'\\''"))
}
