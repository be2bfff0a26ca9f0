// batchreplace - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "batchreplace";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "batchreplace";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Discovery limits
// =============================================================================

/// Maximum directory recursion depth during discovery.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Hard upper bound on max depth (prevents runaway/cyclic traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 100;

/// Maximum file size (bytes) that PathFilter will accept by default.
/// Files larger than this are classified `TooLarge` and skipped.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 256 * 1024 * 1024; // 256 MB

/// Minimum user-configurable max file size.
pub const MIN_MAX_FILE_SIZE: u64 = 1;

/// Default text-file extension allow-list (dotted, lowercase). An empty
/// FilterConfig::extensions set falls back to this list.
pub const DEFAULT_TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".rst", ".json", ".yaml", ".yml", ".toml", ".ini", ".cfg",
    ".xml", ".html", ".htm", ".css", ".js", ".ts", ".jsx", ".tsx", ".rs",
    ".py", ".go", ".java", ".c", ".h", ".cpp", ".hpp", ".cs", ".rb", ".php",
    ".sh", ".bash", ".sql", ".csv", ".properties", ".env", ".gradle",
];

/// Default directory-name exclusions (matched against a path component with
/// no wildcard expansion, i.e. exact component name).
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git", ".hg", ".svn", "node_modules", "target", "dist", "build",
    ".venv", "venv", "__pycache__", ".idea", ".vscode", "vendor",
];

/// Default filename-glob exclusions (wildcard patterns, matched against the
/// file's root-relative path).
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "*.min.js", "*.min.css", "*.lock", "*.log", "*.bak", "*.tmp", "*.swp",
];

// =============================================================================
// File processing
// =============================================================================

/// File size (bytes) at or above which FileWorker uses the memory-mapped
/// streaming read path instead of reading the whole file into a `String`.
pub const DEFAULT_STREAMING_THRESHOLD_BYTES: u64 = 8 * 1024 * 1024; // 8 MB

/// Timestamp format (strftime-compatible, via chrono) used to name backup
/// files: `<original>.<timestamp>.bak`.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

// =============================================================================
// Scheduler / concurrency
// =============================================================================

/// Default worker-pool width when `JobOptions::concurrency` is 0 (auto).
/// Matches `min(available_parallelism, this)` so a Job never over-subscribes
/// a large machine by default.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Minimum user-configurable concurrency (must be non-zero once resolved).
pub const MIN_CONCURRENCY: usize = 1;

/// Depth of the bounded channel between the discovery producer thread and
/// the worker pool, expressed as a multiple of the resolved concurrency.
/// Bounds memory use from a fast walker outrunning a slow worker pool while
/// still keeping enough in flight to avoid pool starvation.
pub const QUEUE_DEPTH_MULTIPLIER: usize = 2;

/// Minimum interval between emitted `ProgressEvent`s, in milliseconds.
/// Throttles progress reporting so a fast job does not flood the observer.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// How often the scheduler's aggregation loop checks the cancel/pause flags
/// while otherwise idle waiting on the result channel, in milliseconds.
pub const SCHEDULER_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// Preview
// =============================================================================

/// Default maximum number of files sampled into a `PreviewReport`.
pub const DEFAULT_PREVIEW_MAX_FILES: usize = 50;

/// Default maximum number of per-file change records kept per file.
pub const DEFAULT_PREVIEW_MAX_MATCHES_PER_FILE: usize = 10;

/// Number of characters of surrounding context kept on each side of a match
/// in a preview `ChangeRecord`.
pub const PREVIEW_CONTEXT_CHARS: usize = 40;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// CLI-defaults configuration file name, resolved via platform config dirs.
pub const CONFIG_FILE_NAME: &str = "replace.toml";
