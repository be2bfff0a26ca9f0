// batchreplace - config/mod.rs
//
// Two stages: a JSON file is deserialized into a "raw" shape that mirrors
// exactly what the outside world (a desktop shell's settings persistence)
// writes to disk, then translated into this crate's own
// `JobConfig` and run through `validate` for the checks serde cannot
// express — duplicate rule ids, empty `find` strings, glob patterns that
// fail to compile, and out-of-range limits. Callers get a `ConfigError`
// naming exactly which field was wrong, not a generic deserialization
// failure.
//
// The on-disk shape carries several top-level sections this crate has no
// use for (`app_info`, `replacement_settings`, `ui_settings`,
// `advanced_settings`) — they're accepted and ignored rather than rejected,
// since a config file produced by the outer application will always have
// them. Only `replacements` and `target_settings` drive anything here.
//
// A second, independent file format — a small TOML "CLI defaults" file
// resolved via platform config directories — supplies fallback values for
// flags the user didn't pass on the command line. It never drives a Job on
// its own; it only pre-fills option defaults at the CLI layer.

use crate::core::model::{FilterConfig, JobConfig, JobOptions, Rule, Ruleset};
use crate::util::constants;
use crate::util::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The on-disk ruleset/job file, exactly as the outer application writes it.
/// Unknown/unused top-level sections are captured as opaque JSON values so a
/// real file round-trips through `serde_json::Value` without our struct
/// needing to understand their shape.
#[derive(Debug, Deserialize)]
struct RawJobFile {
    #[serde(default)]
    #[allow(dead_code)]
    app_info: Option<serde_json::Value>,
    replacements: Vec<RawReplacement>,
    #[serde(default)]
    target_settings: RawTargetSettings,
    #[serde(default)]
    #[allow(dead_code)]
    replacement_settings: Option<serde_json::Value>,
    #[serde(default)]
    #[allow(dead_code)]
    ui_settings: Option<serde_json::Value>,
    #[serde(default)]
    #[allow(dead_code)]
    advanced_settings: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawReplacement {
    id: String,
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_true", rename = "caseSensitive")]
    case_sensitive: bool,
    #[serde(default, rename = "wholeWord")]
    whole_word: bool,
    /// Free-text note the outer application lets the user attach to a rule;
    /// this crate has nowhere to show it, so it's parsed and discarded.
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawTargetSettings {
    #[serde(default)]
    file_extensions: Vec<String>,
    #[serde(default)]
    exclude_patterns: Vec<String>,
    #[serde(default = "default_true")]
    include_subdirectories: bool,
    #[serde(default = "default_max_file_size")]
    max_file_size: u64,
    /// Only `"utf-8"` is meaningful here (see spec Non-goals); any other
    /// value is accepted and ignored rather than rejected, since this is a
    /// structural-parsing layer, not full schema validation.
    #[serde(default)]
    #[allow(dead_code)]
    encoding: Option<String>,
}

fn default_max_file_size() -> u64 {
    constants::DEFAULT_MAX_FILE_SIZE
}

impl Default for RawTargetSettings {
    fn default() -> Self {
        Self {
            file_extensions: Vec::new(),
            exclude_patterns: Vec::new(),
            include_subdirectories: true,
            max_file_size: default_max_file_size(),
            encoding: None,
        }
    }
}

/// Read, parse, and translate a job-configuration file (JSON, the shape
/// described above) from `path` into a `JobConfig` rooted at
/// `root_directory` with `options` applied.
///
/// The file itself never names a root directory or a dry-run/backup/
/// concurrency choice — those are CLI-supplied, matching the outer
/// application's split between a persisted ruleset and per-run flags.
///
/// Does not validate; call `validate` separately so the CLI can choose
/// whether a validation failure is fatal or just a set of warnings (e.g.
/// `batchreplace validate` reports every problem instead of stopping at
/// the first one).
pub fn load_job_config(
    path: &Path,
    root_directory: PathBuf,
    options: JobOptions,
) -> Result<JobConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: RawJobFile = serde_json::from_str(&content).map_err(|source| ConfigError::JsonParse {
        path: path.to_path_buf(),
        source,
    })?;

    let rules = raw
        .replacements
        .into_iter()
        .map(|r| Rule {
            id: r.id,
            find: r.from,
            replace: r.to,
            enabled: r.enabled,
            case_sensitive: r.case_sensitive,
            whole_word: r.whole_word,
        })
        .collect();

    let max_depth = if raw.target_settings.include_subdirectories {
        constants::DEFAULT_MAX_DEPTH
    } else {
        0
    };

    Ok(JobConfig {
        root_directory,
        filter: FilterConfig {
            extensions: raw.target_settings.file_extensions,
            exclude_patterns: raw.target_settings.exclude_patterns,
            max_file_size: raw.target_settings.max_file_size,
            max_depth,
            include_hidden: false,
        },
        ruleset: Ruleset { rules },
        options,
    })
}

/// Validate a `JobConfig`'s internal consistency: rule ids are unique and
/// non-empty `find` strings, exclude patterns compile as globs, and numeric
/// limits are within the allowed range.
///
/// Returns every problem found, not just the first, so a config file with
/// several mistakes can be fixed in one pass.
pub fn validate(config: &JobConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    match std::fs::metadata(&config.root_directory) {
        Ok(meta) if !meta.is_dir() => {
            errors.push(ConfigError::RootDirectoryUnreadable {
                path: config.root_directory.clone(),
                reason: "not a directory".to_string(),
            });
        }
        Err(source) => {
            errors.push(ConfigError::RootDirectoryUnreadable {
                path: config.root_directory.clone(),
                reason: source.to_string(),
            });
        }
        Ok(_) => {}
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for rule in &config.ruleset.rules {
        if rule.find.is_empty() {
            errors.push(ConfigError::EmptyFind {
                rule_id: rule.id.clone(),
            });
        }
        if !seen_ids.insert(rule.id.as_str()) {
            errors.push(ConfigError::DuplicateRuleId { id: rule.id.clone() });
        }
    }

    for pattern in &config.filter.exclude_patterns {
        if let Err(source) = glob::Pattern::new(pattern) {
            errors.push(ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            });
        }
    }

    if config.filter.max_file_size < constants::MIN_MAX_FILE_SIZE {
        errors.push(ConfigError::ValueOutOfRange {
            field: "filter.max_file_size".to_string(),
            value: config.filter.max_file_size.to_string(),
            expected: format!(">= {}", constants::MIN_MAX_FILE_SIZE),
        });
    }

    if config.filter.max_depth > constants::ABSOLUTE_MAX_DEPTH {
        errors.push(ConfigError::ValueOutOfRange {
            field: "filter.max_depth".to_string(),
            value: config.filter.max_depth.to_string(),
            expected: format!("<= {}", constants::ABSOLUTE_MAX_DEPTH),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// =============================================================================
// CLI defaults (TOML, resolved via platform config directories)
// =============================================================================

/// Raw CLI-defaults file as deserialized from TOML. Every field is optional;
/// a missing file or missing field simply leaves the CLI's own built-in
/// defaults (from `util::constants`) in effect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliDefaults {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub max_file_size: Option<u64>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Load CLI defaults from `<config_dir>/replace.toml`, if present.
///
/// A missing file is not an error — it means "use built-in defaults" — but
/// a present-and-malformed file is, since the user clearly meant to
/// configure something.
pub fn load_cli_defaults(config_dir: &Path) -> Result<Option<CliDefaults>, ConfigError> {
    let path = config_dir.join(constants::CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::TomlParse { path, source })
}

/// Convenience: resolve the platform config directory and load CLI defaults
/// from it in one call, used by `main.rs` at startup.
pub fn load_cli_defaults_from_platform() -> Option<CliDefaults> {
    let paths = crate::platform::config::PlatformPaths::resolve();
    match load_cli_defaults(&paths.config_dir) {
        Ok(defaults) => defaults,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load CLI defaults, using built-in defaults");
            None
        }
    }
}
