// batchreplace - core/path_filter.rs
//
// Pure decision function: given a path and a FilterConfig, decide whether a
// directory should be descended into and whether a file should be included.
//
// No I/O here beyond what the caller already has (size is passed in, not
// stat'd) — this module only does pattern matching, so it can be unit
// tested without touching a real filesystem.

use crate::core::model::FilterConfig;
use crate::util::constants;
use std::path::Path;

/// Whether the Walker should descend into a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryDecision {
    Descend,
    Skip,
}

/// Whether a file should be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDecision {
    Include,
    ExcludedByPattern,
    ExcludedByExtension,
    ExcludedByHidden,
    TooLarge,
}

impl FileDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, Self::Include)
    }
}

/// Compiled view of a `FilterConfig`, built once per Job and reused for
/// every path classified during that Job's discovery phase.
pub struct PathFilter {
    extensions: Vec<String>,
    exclude_patterns: Vec<glob::Pattern>,
    exclude_dir_literals: Vec<String>,
    max_file_size: u64,
    include_hidden: bool,
}

impl PathFilter {
    /// Build a `PathFilter` from a `FilterConfig`. Patterns that fail to
    /// compile as globs are dropped with a `tracing::warn!` — discovery
    /// continues with the patterns that did compile, matching the
    /// non-fatal-by-default posture of this module.
    pub fn new(config: &FilterConfig) -> Self {
        let extensions: Vec<String> = if config.extensions.is_empty() {
            constants::DEFAULT_TEXT_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            config.extensions.iter().map(|s| s.to_lowercase()).collect()
        };

        let mut exclude_patterns = Vec::new();
        for pattern in config
            .exclude_patterns
            .iter()
            .map(String::as_str)
            .chain(constants::DEFAULT_EXCLUDE_PATTERNS.iter().copied())
        {
            match glob::Pattern::new(pattern) {
                Ok(compiled) => exclude_patterns.push(compiled),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "Invalid exclude glob, skipping");
                }
            }
        }

        let exclude_dir_literals = constants::DEFAULT_EXCLUDE_DIRS
            .iter()
            .map(|s| (*s).to_string())
            .collect();

        Self {
            extensions,
            exclude_patterns,
            exclude_dir_literals,
            max_file_size: config.max_file_size,
            include_hidden: config.include_hidden,
        }
    }

    /// Decide whether to descend into `dir_name`, the bare name of a
    /// directory (not its full path). Root is always descended by the
    /// caller before this is ever consulted.
    pub fn classify_directory(&self, dir_name: &str) -> DirectoryDecision {
        if !self.include_hidden && is_hidden(dir_name) {
            return DirectoryDecision::Skip;
        }
        if self.exclude_dir_literals.iter().any(|d| d == dir_name) {
            return DirectoryDecision::Skip;
        }
        if self.exclude_patterns.iter().any(|p| p.matches(dir_name)) {
            return DirectoryDecision::Skip;
        }
        DirectoryDecision::Descend
    }

    /// Decide whether to include a file, given its root-relative path
    /// (forward-slash separated, as produced by the Walker) and its size.
    pub fn classify_file(&self, relative_path: &Path, size: u64) -> FileDecision {
        let file_name = relative_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");

        if !self.include_hidden && is_hidden(file_name) {
            return FileDecision::ExcludedByHidden;
        }

        let rel_str = relative_path.to_string_lossy().replace('\\', "/");
        if self
            .exclude_patterns
            .iter()
            .any(|p| p.matches(file_name) || p.matches(&rel_str))
        {
            return FileDecision::ExcludedByPattern;
        }

        if !self.has_allowed_extension(file_name) {
            return FileDecision::ExcludedByExtension;
        }

        if size > self.max_file_size {
            return FileDecision::TooLarge;
        }

        FileDecision::Include
    }

    fn has_allowed_extension(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}
