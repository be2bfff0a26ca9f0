// batchreplace - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// =============================================================================
// Rule / Ruleset
// =============================================================================

/// A single literal find/replace rule.
///
/// `find` is matched as a literal Unicode scalar sequence — never a regex.
/// Disabled rules keep their ordinal position in a `Ruleset` but produce no
/// effect when the ruleset is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub find: String,
    #[serde(default)]
    pub replace: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
}

fn default_true() -> bool {
    true
}

/// An ordered sequence of rules. Rule `k` sees rule `k-1`'s output when a
/// `Ruleset` is applied to a file — this is the ordered-cascade invariant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ruleset {
    pub rules: Vec<Rule>,
}

impl Ruleset {
    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.enabled)
    }
}

// =============================================================================
// Filter configuration
// =============================================================================

/// Controls which files the Walker/PathFilter accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Lowercase dotted extensions (e.g. ".rs"). Empty means "use the
    /// default text-extension allow-list".
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against the file's root-relative path and
    /// against directory component names. Matching files are skipped;
    /// matching directories are not descended into.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// File size (bytes) above which a file is classified `TooLarge`.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum directory recursion depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Whether dotfiles/dot-directories are considered at all.
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_max_file_size() -> u64 {
    crate::util::constants::DEFAULT_MAX_FILE_SIZE
}

fn default_max_depth() -> usize {
    crate::util::constants::DEFAULT_MAX_DEPTH
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            exclude_patterns: Vec::new(),
            max_file_size: default_max_file_size(),
            max_depth: default_max_depth(),
            include_hidden: false,
        }
    }
}

// =============================================================================
// Job configuration
// =============================================================================

/// Per-job knobs that do not affect which files are selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    /// Compute results without writing any file.
    #[serde(default)]
    pub dry_run: bool,

    /// Write a `<file>.<timestamp>.bak` copy before rewriting a file.
    #[serde(default)]
    pub create_backup: bool,

    /// Worker-pool width. 0 means "auto" (resolved by the Scheduler).
    #[serde(default)]
    pub concurrency: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            create_backup: false,
            concurrency: 0,
        }
    }
}

/// The complete, immutable description of one batch-replace job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub root_directory: PathBuf,
    #[serde(default)]
    pub filter: FilterConfig,
    pub ruleset: Ruleset,
    #[serde(default)]
    pub options: JobOptions,
}

// =============================================================================
// Discovery
// =============================================================================

/// One candidate file emitted by the Walker.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub absolute_path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

// =============================================================================
// Rule matching
// =============================================================================

/// One match of one rule against one file, as located by `RuleEngine` in
/// preview mode.
#[derive(Debug, Clone, Serialize)]
pub struct RuleHit {
    pub rule_id: String,
    pub byte_offset: usize,
    pub line: usize,
    pub column: usize,
    pub matched_text: String,
    pub replacement: String,
}

// =============================================================================
// File results
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Modified,
    Unchanged,
    Skipped,
    Error,
}

/// The outcome of running the ruleset against one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub per_rule_counts: BTreeMap<String, usize>,
    pub total_replacements: usize,
    pub duration_ms: u64,
    pub error_kind: Option<crate::util::error::FileErrorKind>,
    pub error_message: Option<String>,
}

impl FileResult {
    /// A result with zero matches and zero counts, e.g. a file skipped
    /// because the job was cancelled before it started.
    pub fn unchanged_with_status(path: PathBuf, status: FileStatus, duration_ms: u64) -> Self {
        Self {
            path,
            status,
            per_rule_counts: BTreeMap::new(),
            total_replacements: 0,
            duration_ms,
            error_kind: None,
            error_message: None,
        }
    }
}

// =============================================================================
// Job statistics / progress
// =============================================================================

/// Monotonically updated statistics for a running or completed Job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub total_files: usize,
    pub processed_files: usize,
    pub modified_files: usize,
    pub total_replacements: usize,
    pub errors: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Discovering,
    Processing,
    Finalizing,
}

/// A throttled progress snapshot emitted at most once per
/// `DEFAULT_PROGRESS_INTERVAL_MS`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub processed_files: usize,
    pub total_files: usize,
    pub modified_files: usize,
    pub total_replacements: usize,
    pub current_path: Option<PathBuf>,
    pub phase: Phase,
}

// =============================================================================
// Job lifecycle
// =============================================================================

/// The job's externally-observable state machine.
///
/// `Paused` is orthogonal to this enum — a paused job remains in whichever
/// of `Discovering`/`Processing`/`Finalizing` it was in when paused; pause
/// is tracked as a separate flag on `JobHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Discovering,
    Processing,
    Finalizing,
    Complete,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

/// Messages sent from the scheduler's background thread to whoever is
/// polling the job (a CLI loop, in this crate).
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    Progress(ProgressEvent),
    FileDone(FileResult),
    Warning(String),
    StateChanged(JobState),
}
