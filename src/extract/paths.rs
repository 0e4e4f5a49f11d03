use regex::Regex;

/// Finds mount-point asset paths (`/Game/...`) inside free text
#[derive(Debug, Clone)]
pub struct MountPathMatcher {
    regex: Regex,
}

/// One path found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// 1-based line number
    pub line: usize,
    pub path: String,
}

impl MountPathMatcher {
    pub fn new(mount_point: &str) -> Result<Self, regex::Error> {
        let mount = regex::escape(mount_point.trim_end_matches('/'));
        let regex = Regex::new(&format!(r"(?i:{})/[A-Za-z0-9_./]+\b", mount))?;
        Ok(Self { regex })
    }

    /// All matches with their line numbers
    pub fn find_all(&self, text: &str) -> Vec<PathMatch> {
        text.lines()
            .enumerate()
            .flat_map(|(idx, line)| {
                self.regex.find_iter(line).map(move |m| PathMatch {
                    line: idx + 1,
                    path: m.as_str().to_string(),
                })
            })
            .collect()
    }

    /// Quick check before doing line-by-line work
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Blueprint generated classes are referenced as `/Game/BP/BP_Door_C`
pub fn strip_class_suffix(path: &str) -> Option<&str> {
    path.strip_suffix("_C").filter(|p| !p.ends_with('/'))
}
