// batchreplace - preview/preview_builder.rs
//
// Builds a `PreviewReport` without writing anything: discovers files the
// same way a real job would, samples a bounded, importance-ranked subset of
// them, and replays the ruleset against each sampled file's content using
// `RuleEngine::find_matches` rather than `apply` — no output is written to
// disk or to the original buffer.

use crate::core::model::{FileDescriptor, FilterConfig, RuleHit, Ruleset};
use crate::core::{rule_engine, walker};
use crate::util::constants;
use crate::util::error::DiscoveryError;
use crate::worker::file_worker;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One located match, with surrounding context, inside a previewed file.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub rule_id: String,
    pub line: usize,
    pub column: usize,
    pub matched_text: String,
    pub replacement: String,
    /// Up to `PREVIEW_CONTEXT_CHARS` characters of surrounding text on each
    /// side of the match, for display purposes.
    pub context: String,
}

/// Preview of what would happen to a single file.
#[derive(Debug, Clone)]
pub struct FilePreview {
    pub path: PathBuf,
    pub would_modify: bool,
    pub changes: Vec<ChangeRecord>,
    /// `true` if this file had more matches than
    /// `DEFAULT_PREVIEW_MAX_MATCHES_PER_FILE` and `changes` was truncated.
    pub truncated: bool,
}

/// A coarse, heuristic read on how disruptive running the job for real would
/// be, based only on what the sampled subset showed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    /// No sampled file would change, or changes are a small fraction of files.
    Low,
    /// A large fraction of sampled files would change, or a rule fired on
    /// nearly every file (often a sign the pattern is too broad).
    Medium,
    /// Every sampled file changed, or a rule never matched at all (a dead
    /// rule is as likely to indicate a typo as an already-applied change).
    High,
}

/// The full, non-mutating report.
#[derive(Debug, Clone)]
pub struct PreviewReport {
    pub root: PathBuf,
    pub total_files_discovered: usize,
    pub files_sampled: usize,
    pub files: Vec<FilePreview>,
    /// Per-rule count of matches observed across the sampled files.
    pub rule_effectiveness: BTreeMap<String, usize>,
    pub risk: RiskLevel,
    pub warnings: Vec<String>,
}

/// Build a preview report for `ruleset` applied under `filter`, rooted at
/// `root`. Never writes to disk.
pub fn build_preview(
    root: &Path,
    filter: &FilterConfig,
    ruleset: &Ruleset,
) -> Result<PreviewReport, DiscoveryError> {
    let mut warnings = Vec::new();
    let all_files = walker::walk(root, filter, |w| warnings.push(w))?;

    let total_files_discovered = all_files.len();
    let mut ranked = all_files;
    ranked.sort_by(|a, b| importance_score(b).cmp(&importance_score(a)));

    let sample_size = constants::DEFAULT_PREVIEW_MAX_FILES.min(ranked.len());
    if ranked.len() > sample_size {
        warnings.push(format!(
            "Preview sampled {sample_size} of {} discovered files; the rest were not scanned.",
            ranked.len()
        ));
    }
    let sampled = &ranked[..sample_size];

    let mut files = Vec::with_capacity(sampled.len());
    let mut rule_effectiveness: BTreeMap<String, usize> = ruleset
        .enabled_rules()
        .map(|r| (r.id.clone(), 0usize))
        .collect();

    for descriptor in sampled {
        match preview_one_file(descriptor, ruleset) {
            Ok(preview) => {
                for change in &preview.changes {
                    *rule_effectiveness.entry(change.rule_id.clone()).or_insert(0) += 1;
                }
                files.push(preview);
            }
            Err(message) => warnings.push(message),
        }
    }

    let risk = assess_risk(&files, &rule_effectiveness);

    Ok(PreviewReport {
        root: root.to_path_buf(),
        total_files_discovered,
        files_sampled: files.len(),
        files,
        rule_effectiveness,
        risk,
        warnings,
    })
}

fn preview_one_file(descriptor: &FileDescriptor, ruleset: &Ruleset) -> Result<FilePreview, String> {
    let text = file_worker::read_text_whole(&descriptor.absolute_path)
        .map_err(|e| e.to_string())?;

    let hits = rule_engine::find_matches(
        &text,
        ruleset,
        constants::DEFAULT_PREVIEW_MAX_MATCHES_PER_FILE,
    );

    let truncated = hits.len() >= constants::DEFAULT_PREVIEW_MAX_MATCHES_PER_FILE;
    let changes = hits.iter().map(|hit| to_change_record(&text, hit)).collect();

    Ok(FilePreview {
        path: descriptor.absolute_path.clone(),
        would_modify: !hits.is_empty(),
        changes,
        truncated,
    })
}

fn to_change_record(text: &str, hit: &RuleHit) -> ChangeRecord {
    let context = surrounding_context(text, hit.byte_offset, hit.matched_text.len());
    ChangeRecord {
        rule_id: hit.rule_id.clone(),
        line: hit.line,
        column: hit.column,
        matched_text: hit.matched_text.clone(),
        replacement: hit.replacement.clone(),
        context,
    }
}

/// Return up to `PREVIEW_CONTEXT_CHARS` characters of text on each side of
/// the match at `byte_offset`..`byte_offset + match_len`, clamped to char
/// boundaries.
fn surrounding_context(text: &str, byte_offset: usize, match_len: usize) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let match_start_idx = chars
        .iter()
        .position(|&(b, _)| b == byte_offset)
        .unwrap_or(0);
    let match_end_byte = byte_offset + match_len;
    let match_end_idx = chars
        .iter()
        .position(|&(b, _)| b >= match_end_byte)
        .unwrap_or(chars.len());

    let start_idx = match_start_idx.saturating_sub(constants::PREVIEW_CONTEXT_CHARS);
    let end_idx = (match_end_idx + constants::PREVIEW_CONTEXT_CHARS).min(chars.len());

    chars[start_idx..end_idx].iter().map(|&(_, c)| c).collect()
}

/// Rank files so the sample favours source-like files over incidental ones,
/// and smaller files over huge ones that would dominate the sample budget.
fn importance_score(descriptor: &FileDescriptor) -> i64 {
    let name = descriptor
        .absolute_path
        .to_string_lossy()
        .to_lowercase();

    let extension_weight: i64 = if name.ends_with(".rs")
        || name.ends_with(".py")
        || name.ends_with(".js")
        || name.ends_with(".ts")
        || name.ends_with(".go")
        || name.ends_with(".java")
        || name.ends_with(".c")
        || name.ends_with(".cpp")
    {
        3
    } else if name.ends_with(".json")
        || name.ends_with(".yaml")
        || name.ends_with(".yml")
        || name.ends_with(".toml")
    {
        2
    } else {
        1
    };

    // Smaller files get a small bonus so the sample isn't dominated by a
    // handful of very large files; weighted well below extension_weight.
    let size_penalty = (descriptor.size / 4096).min(1000) as i64;

    extension_weight * 10_000 - size_penalty
}

fn assess_risk(files: &[FilePreview], rule_effectiveness: &BTreeMap<String, usize>) -> RiskLevel {
    if files.is_empty() {
        return RiskLevel::Low;
    }

    let modified = files.iter().filter(|f| f.would_modify).count();
    let fraction = modified as f64 / files.len() as f64;

    let has_dead_rule = rule_effectiveness.values().any(|&count| count == 0);

    if fraction >= 0.95 || has_dead_rule {
        RiskLevel::High
    } else if fraction >= 0.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
