//! Working tree status.

/// One changed path from `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the repository root.
    pub path: String,

    /// Whether git is not tracking the path yet.
    pub untracked: bool,
}

/// Result of a status query on a working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    pub entries: Vec<StatusEntry>,
}

impl WorktreeStatus {
    /// Parses `git status --porcelain=v1 -z` output.
    ///
    /// Records are NUL-terminated and paths are verbatim. A rename or copy
    /// record is followed by one extra field holding the source path.
    pub fn parse_porcelain(output: &str) -> Self {
        let mut entries = Vec::new();
        let mut fields = output.split('\0');
        while let Some(record) = fields.next() {
            if record.len() < 4 {
                continue;
            }
            let (code, path) = record.split_at(3);
            let code = code.trim_end();
            if code.contains(['R', 'C']) {
                fields.next();
            }
            entries.push(StatusEntry {
                path: path.to_string(),
                untracked: code == "??",
            });
        }
        Self { entries }
    }

    /// Returns true when nothing changed.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over paths git is not tracking yet.
    pub fn untracked(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.untracked)
            .map(|entry| entry.path.as_str())
    }
}
