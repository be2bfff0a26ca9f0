// batchreplace - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; all errors preserve the causal chain
// for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all batchreplace operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// File discovery failed.
    Discovery(DiscoveryError),

    /// A rule definition could not be compiled into a usable matcher.
    Rule(RuleError),

    /// Processing a single file failed.
    File(FileError),

    /// The job as a whole could not run or was aborted.
    Job(JobError),

    /// I/O error with path context, not otherwise categorised.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Rule(e) => write!(f, "Rule error: {e}"),
            Self::File(e) => write!(f, "File error: {e}"),
            Self::Job(e) => write!(f, "Job error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Rule(e) => Some(e),
            Self::File(e) => Some(e),
            Self::Job(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors related to loading and validating a `JobConfig`.
#[derive(Debug)]
pub enum ConfigError {
    /// JSON job-config file could not be parsed.
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// TOML CLI-defaults file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// A rule's `find` string is empty.
    EmptyFind { rule_id: String },

    /// Two rules share the same id.
    DuplicateRuleId { id: String },

    /// An exclude pattern failed to compile as a glob.
    InvalidGlob { pattern: String, source: glob::PatternError },

    /// I/O error reading a config file.
    Io { path: PathBuf, source: io::Error },

    /// The job's root directory does not exist, is not a directory, or
    /// could not be read (permission denied).
    RootDirectoryUnreadable { path: PathBuf, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JsonParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::EmptyFind { rule_id } => {
                write!(f, "Rule '{rule_id}' has an empty 'find' string")
            }
            Self::DuplicateRuleId { id } => {
                write!(f, "Duplicate rule id '{id}'")
            }
            Self::InvalidGlob { pattern, source } => {
                write!(f, "Invalid exclude pattern '{pattern}': {source}")
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
            Self::RootDirectoryUnreadable { path, reason } => write!(
                f,
                "Root directory '{}' is unreadable: {reason}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::JsonParse { source, .. } => Some(source),
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidGlob { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to file discovery (the Walker).
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root scan path does not exist.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the root path itself (not a per-entry
    /// warning — this is fatal because nothing can be discovered at all).
    PermissionDenied { path: PathBuf, source: io::Error },

    /// Walkdir traversal error wrapping an individual entry access failure.
    /// Non-fatal occurrences of this are collected as warnings by the
    /// Walker rather than returned as `Err`; this variant exists for the
    /// rare case the root entry itself cannot be read.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Root path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Root path '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => write!(
                f,
                "Permission denied accessing '{}': {source}",
                path.display()
            ),
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            Self::Traversal { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for EngineError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

/// Errors related to rule compilation (RuleEngine).
#[derive(Debug)]
pub enum RuleError {
    /// A rule's `find` string is empty; it cannot be compiled into a matcher.
    EmptyFind { rule_id: String },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFind { rule_id } => {
                write!(f, "Rule '{rule_id}': 'find' must not be empty")
            }
        }
    }
}

impl std::error::Error for RuleError {}

impl From<RuleError> for EngineError {
    fn from(e: RuleError) -> Self {
        Self::Rule(e)
    }
}

// ---------------------------------------------------------------------------
// File errors
// ---------------------------------------------------------------------------

/// Why a single file was skipped or failed during processing.
///
/// Mirrors `FileResult::status == Skipped | Error`; this is the detail
/// carried alongside that status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    /// File content is not valid UTF-8.
    InvalidUtf8,
    /// File is larger than `FilterConfig::maxFileSize`.
    TooLarge,
    /// File could not be opened or read.
    ReadFailed,
    /// The atomic rewrite (temp file write, permission copy, or rename)
    /// failed partway through.
    WriteFailed,
    /// File permissions could not be read or re-applied.
    PermissionDenied,
}

impl FileErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidUtf8 => "invalid_utf8",
            Self::TooLarge => "too_large",
            Self::ReadFailed => "read_failed",
            Self::WriteFailed => "write_failed",
            Self::PermissionDenied => "permission_denied",
        }
    }
}

impl fmt::Display for FileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors related to processing a single file (FileWorker).
#[derive(Debug)]
pub enum FileError {
    /// File content is not valid UTF-8; the file was skipped, not rewritten.
    InvalidUtf8 { path: PathBuf },

    /// File exceeds the configured maximum size.
    TooLarge { path: PathBuf, size: u64, max: u64 },

    /// The file could not be read.
    ReadFailed { path: PathBuf, source: io::Error },

    /// The atomic rewrite failed.
    WriteFailed { path: PathBuf, source: io::Error },

    /// File permissions could not be read or re-applied.
    PermissionDenied { path: PathBuf, source: io::Error },
}

impl FileError {
    pub fn kind(&self) -> FileErrorKind {
        match self {
            Self::InvalidUtf8 { .. } => FileErrorKind::InvalidUtf8,
            Self::TooLarge { .. } => FileErrorKind::TooLarge,
            Self::ReadFailed { .. } => FileErrorKind::ReadFailed,
            Self::WriteFailed { .. } => FileErrorKind::WriteFailed,
            Self::PermissionDenied { .. } => FileErrorKind::PermissionDenied,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            Self::InvalidUtf8 { path }
            | Self::TooLarge { path, .. }
            | Self::ReadFailed { path, .. }
            | Self::WriteFailed { path, .. }
            | Self::PermissionDenied { path, .. } => path,
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 { path } => {
                write!(f, "'{}': not valid UTF-8, skipped", path.display())
            }
            Self::TooLarge { path, size, max } => write!(
                f,
                "'{}' is {size} bytes, exceeds maximum of {max} bytes",
                path.display()
            ),
            Self::ReadFailed { path, source } => {
                write!(f, "'{}': read failed: {source}", path.display())
            }
            Self::WriteFailed { path, source } => {
                write!(f, "'{}': write failed: {source}", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(f, "'{}': permission error: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            Self::PermissionDenied { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<FileError> for EngineError {
    fn from(e: FileError) -> Self {
        Self::File(e)
    }
}

// ---------------------------------------------------------------------------
// Job errors
// ---------------------------------------------------------------------------

/// Errors related to running a Job end to end (Scheduler).
#[derive(Debug)]
pub enum JobError {
    /// Discovery failed before any file could be processed.
    DiscoveryFailed(DiscoveryError),

    /// The job configuration failed validation.
    InvalidConfig(Vec<String>),

    /// The worker pool could not be built (e.g. invalid thread count).
    PoolBuildFailed { reason: String },
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscoveryFailed(e) => write!(f, "Discovery failed: {e}"),
            Self::InvalidConfig(errors) => {
                write!(f, "Invalid job configuration: {}", errors.join("; "))
            }
            Self::PoolBuildFailed { reason } => {
                write!(f, "Failed to build worker pool: {reason}")
            }
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DiscoveryFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<JobError> for EngineError {
    fn from(e: JobError) -> Self {
        Self::Job(e)
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
