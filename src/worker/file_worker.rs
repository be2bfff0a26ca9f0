// batchreplace - worker/file_worker.rs
//
// Per-file execution unit. Small files are read whole, transformed in
// memory, and rewritten in one pass. Files at or above
// `DEFAULT_STREAMING_THRESHOLD_BYTES` are read and rewritten line by line so
// the process never holds more than one line of the file in memory at a
// time, checking the cancellation flag between lines rather than only
// between files.
//
// Atomic rewrite: write to a same-directory temp file, copy the original's
// permission bits onto it, `persist()` (rename) it over the original. If
// `persist` fails because the temp file and target are on different
// filesystems (rename is not atomic across devices), fall back to a copy +
// remove. Either way the original is never observed in a partially-written
// state: a reader either sees the old content or the new content.

use crate::core::model::{FileDescriptor, FileResult, FileStatus, Ruleset};
use crate::core::rule_engine;
use crate::util::constants;
use crate::util::error::{FileError, FileErrorKind};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Options affecting how a file is processed once read, independent of
/// discovery/filtering.
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    pub dry_run: bool,
    pub create_backup: bool,
}

/// Process one file: read, transform, and (unless `dry_run`) rewrite.
///
/// Returns a `FileResult` in all non-cancelled cases, including read/write
/// failures — those are reported as `FileStatus::Error`, never propagated
/// as an `Err`, so the scheduler can keep a single-writer result stream
/// without special-casing per-file failures.
pub fn process(
    descriptor: &FileDescriptor,
    ruleset: &Ruleset,
    options: ProcessOptions,
    cancel: &Arc<AtomicBool>,
) -> FileResult {
    let started = Instant::now();
    let path = &descriptor.absolute_path;

    if cancel.load(Ordering::SeqCst) {
        return FileResult::unchanged_with_status(path.clone(), FileStatus::Skipped, 0);
    }

    if descriptor.size >= constants::DEFAULT_STREAMING_THRESHOLD_BYTES {
        process_streaming(path, ruleset, options, cancel, started)
    } else {
        process_buffered(path, ruleset, options, started)
    }
}

/// Small-file path: read the whole file into a `String`, run it through the
/// whole-text rule cascade once, and rewrite it in one pass if changed.
fn process_buffered(
    path: &Path,
    ruleset: &Ruleset,
    options: ProcessOptions,
    started: Instant,
) -> FileResult {
    let text = match read_text_whole(path) {
        Ok(t) => t,
        Err(e) => return error_result(path, e, elapsed_ms(started)),
    };

    let (new_text, counts) = rule_engine::apply(&text, ruleset);
    let total_replacements: usize = counts.values().sum();

    // A file is only "modified" if the cascade's output differs from its
    // input byte-for-byte. A rule with `find == replace`, or a cascade that
    // nets out to the identity (e.g. a two-rule A<->B swap applied to text
    // containing neither token), can produce a positive match count while
    // leaving the content untouched — that file is `unchanged`, not
    // `modified`, and must not be rewritten.
    if new_text == text {
        return FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Unchanged,
            per_rule_counts: counts,
            total_replacements,
            duration_ms: elapsed_ms(started),
            error_kind: None,
            error_message: None,
        };
    }

    if options.dry_run {
        return FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Modified,
            per_rule_counts: counts,
            total_replacements,
            duration_ms: elapsed_ms(started),
            error_kind: None,
            error_message: None,
        };
    }

    if let Err(e) = rewrite_atomically(path, &new_text, options.create_backup) {
        return error_result(path, e, elapsed_ms(started));
    }

    FileResult {
        path: path.to_path_buf(),
        status: FileStatus::Modified,
        per_rule_counts: counts,
        total_replacements,
        duration_ms: elapsed_ms(started),
        error_kind: None,
        error_message: None,
    }
}

/// Large-file path: read one line at a time, apply the ruleset to each
/// complete line in isolation, and stream the transformed lines straight
/// into a temp sibling file. The final line of a file with no trailing
/// newline has no terminator to preserve and is handled the same way as any
/// other line — `read_until` already hands it back without one.
///
/// A rule's `find` string can therefore never match across a line boundary
/// in streaming mode; this is the trade-off streaming makes to avoid
/// holding the whole file in memory.
fn process_streaming(
    path: &Path,
    ruleset: &Ruleset,
    options: ProcessOptions,
    cancel: &Arc<AtomicBool>,
    started: Instant,
) -> FileResult {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(source) => {
            return error_result(
                path,
                FileError::ReadFailed { path: path.to_path_buf(), source },
                elapsed_ms(started),
            )
        }
    };
    let mut reader = std::io::BufReader::new(file);

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = match tempfile::NamedTempFile::new_in(parent) {
        Ok(t) => t,
        Err(source) => {
            return error_result(
                path,
                FileError::WriteFailed { path: path.to_path_buf(), source },
                elapsed_ms(started),
            )
        }
    };

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut modified = false;
    let mut raw_line: Vec<u8> = Vec::new();

    loop {
        if cancel.load(Ordering::SeqCst) {
            return FileResult::unchanged_with_status(path.to_path_buf(), FileStatus::Skipped, 0);
        }

        raw_line.clear();
        let bytes_read = match reader.read_until(b'\n', &mut raw_line) {
            Ok(n) => n,
            Err(source) => {
                return error_result(
                    path,
                    FileError::ReadFailed { path: path.to_path_buf(), source },
                    elapsed_ms(started),
                )
            }
        };
        if bytes_read == 0 {
            break;
        }

        // `\n` is 0x0A, a byte value that never appears inside a multi-byte
        // UTF-8 sequence, so splitting on it here is always a valid
        // character boundary for well-formed UTF-8 input.
        let (content, terminator): (&[u8], &[u8]) = if let Some(without_lf) = raw_line.strip_suffix(b"\n") {
            if let Some(without_crlf) = without_lf.strip_suffix(b"\r") {
                (without_crlf, b"\r\n")
            } else {
                (without_lf, b"\n")
            }
        } else {
            (&raw_line[..], b"")
        };

        let line = match std::str::from_utf8(content) {
            Ok(s) => s,
            Err(_) => {
                return error_result(
                    path,
                    FileError::InvalidUtf8 { path: path.to_path_buf() },
                    elapsed_ms(started),
                )
            }
        };

        let (new_line, line_counts) = rule_engine::apply(line, ruleset);
        for (id, count) in line_counts {
            *counts.entry(id).or_insert(0) += count;
        }
        if new_line != line {
            modified = true;
        }

        let write_result = temp
            .write_all(new_line.as_bytes())
            .and_then(|_| temp.write_all(terminator));
        if let Err(source) = write_result {
            return error_result(
                path,
                FileError::WriteFailed { path: path.to_path_buf(), source },
                elapsed_ms(started),
            );
        }
    }

    let total_replacements: usize = counts.values().sum();

    if !modified {
        // The temp file is dropped (and removed) here without ever being
        // persisted — an unchanged file is never rewritten, streaming or not.
        return FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Unchanged,
            per_rule_counts: counts,
            total_replacements,
            duration_ms: elapsed_ms(started),
            error_kind: None,
            error_message: None,
        };
    }

    if options.dry_run {
        return FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Modified,
            per_rule_counts: counts,
            total_replacements,
            duration_ms: elapsed_ms(started),
            error_kind: None,
            error_message: None,
        };
    }

    if options.create_backup {
        let backup_path = backup_path_for(path);
        if let Err(source) = fs::copy(path, &backup_path) {
            return error_result(
                path,
                FileError::WriteFailed { path: path.to_path_buf(), source },
                elapsed_ms(started),
            );
        }
    }

    if let Err(e) = persist_with_permissions(temp, path) {
        return error_result(path, e, elapsed_ms(started));
    }

    FileResult {
        path: path.to_path_buf(),
        status: FileStatus::Modified,
        per_rule_counts: counts,
        total_replacements,
        duration_ms: elapsed_ms(started),
        error_kind: None,
        error_message: None,
    }
}

/// Read a file's full text content in one pass. Used by the small-file
/// execution path and by the preview builder, which only ever samples a
/// small, bounded set of files and has no need for the streaming path the
/// real job uses for large files.
///
/// Invalid UTF-8 is a hard skip condition — unlike a lossy log viewer, a
/// batch rewrite tool must never silently mangle bytes it cannot decode.
pub(crate) fn read_text_whole(path: &Path) -> Result<String, FileError> {
    let bytes = fs::read(path).map_err(|source| FileError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| FileError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn error_result(path: &Path, e: FileError, duration_ms: u64) -> FileResult {
    let kind = e.kind();
    tracing::warn!(path = %path.display(), kind = %kind, error = %e, "File processing error");
    FileResult {
        path: path.to_path_buf(),
        status: if kind == FileErrorKind::InvalidUtf8 || kind == FileErrorKind::TooLarge {
            FileStatus::Skipped
        } else {
            FileStatus::Error
        },
        per_rule_counts: Default::default(),
        total_replacements: 0,
        duration_ms,
        error_kind: Some(kind),
        error_message: Some(e.to_string()),
    }
}

/// Write `content` to `path` atomically, optionally leaving a timestamped
/// backup copy of the original alongside it first.
fn rewrite_atomically(path: &Path, content: &str, create_backup: bool) -> Result<(), FileError> {
    if create_backup {
        let backup_path = backup_path_for(path);
        fs::copy(path, &backup_path).map_err(|source| FileError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|source| FileError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    temp.write_all(content.as_bytes()).map_err(|source| FileError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    persist_with_permissions(temp, path)
}

/// Shared tail of both write paths: fsync the temp file, copy the original's
/// permission bits onto it, and persist it over `path`, falling back to
/// copy + remove if the temp file and target live on different filesystems.
fn persist_with_permissions(temp: tempfile::NamedTempFile, path: &Path) -> Result<(), FileError> {
    temp.as_file().sync_all().map_err(|source| FileError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let perms = fs::metadata(path)
        .map_err(|source| FileError::PermissionDenied {
            path: path.to_path_buf(),
            source,
        })?
        .permissions();
    fs::set_permissions(temp.path(), perms).map_err(|source| FileError::PermissionDenied {
        path: path.to_path_buf(),
        source,
    })?;

    match temp.persist(path) {
        Ok(_) => Ok(()),
        Err(persist_err) => {
            // Cross-device rename: fall back to copy + remove. The temp
            // file still exists at this point, so the original is only
            // ever replaced once the copy has fully landed.
            let temp_path = persist_err.file.path().to_path_buf();
            fs::copy(&temp_path, path)
                .and_then(|_| fs::remove_file(&temp_path))
                .map_err(|source| FileError::WriteFailed {
                    path: path.to_path_buf(),
                    source,
                })
        }
    }
}

fn backup_path_for(path: &Path) -> std::path::PathBuf {
    let stamp = chrono::Utc::now().format(constants::BACKUP_TIMESTAMP_FORMAT);
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
    path.with_file_name(format!("{file_name}.{stamp}.bak"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FileDescriptor, Rule, Ruleset};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

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

    fn descriptor_for(path: &Path) -> FileDescriptor {
        let size = fs::metadata(path).unwrap().len();
        FileDescriptor {
            absolute_path: path.to_path_buf(),
            size,
            modified: None,
        }
    }

    #[test]
    fn rewrites_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "hello world").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "world", "there")] };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Modified);
        assert_eq!(result.total_replacements, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello there");
    }

    #[test]
    fn find_equals_replace_is_unchanged_with_accurate_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "noop noop").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "noop", "noop")] };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Unchanged);
        assert_eq!(result.per_rule_counts["r1"], 2);
        assert_eq!(result.total_replacements, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "noop noop");
    }

    #[test]
    fn net_zero_cascade_is_unchanged_despite_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "A").unwrap();

        let ruleset = Ruleset {
            rules: vec![rule("r1", "A", "B"), rule("r2", "B", "A")],
        };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Unchanged);
        assert_eq!(result.total_replacements, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "A");
    }

    #[test]
    fn dry_run_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "hello world").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "world", "there")] };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: true, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Modified);
        assert_eq!(result.total_replacements, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
    }

    #[test]
    fn unchanged_file_reports_no_replacements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "nothing to see").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "absent", "x")] };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Unchanged);
    }

    #[test]
    fn invalid_utf8_is_skipped_not_errored_as_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        fs::write(&path, [0xFF, 0xFE, 0x00, 0xFF]).unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "x", "y")] };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Skipped);
        assert_eq!(result.error_kind, Some(FileErrorKind::InvalidUtf8));
    }

    #[test]
    fn backup_file_created_alongside_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "hello world").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "world", "there")] };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: true },
            &cancel,
        );

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("bak"))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn cancelled_before_start_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "hello world").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "world", "there")] };
        let descriptor = descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(true));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Skipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
    }

    /// Forces the streaming path by claiming a size at the threshold in the
    /// descriptor regardless of the temp file's actual on-disk size — the
    /// dispatch in `process` only looks at `descriptor.size`.
    fn streaming_descriptor_for(path: &Path) -> FileDescriptor {
        FileDescriptor {
            absolute_path: path.to_path_buf(),
            size: constants::DEFAULT_STREAMING_THRESHOLD_BYTES,
            modified: None,
        }
    }

    #[test]
    fn streaming_path_rewrites_multiline_file_line_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "foo one\nfoo two\nfoo three\n").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "foo", "bar")] };
        let descriptor = streaming_descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Modified);
        assert_eq!(result.total_replacements, 3);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "bar one\nbar two\nbar three\n"
        );
    }

    #[test]
    fn streaming_path_preserves_final_line_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "foo one\nfoo two").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "foo", "bar")] };
        let descriptor = streaming_descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Modified);
        assert_eq!(fs::read_to_string(&path).unwrap(), "bar one\nbar two");
    }

    #[test]
    fn streaming_path_leaves_unchanged_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "nothing\nmatches\nhere\n").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "absent", "x")] };
        let descriptor = streaming_descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: false, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), "nothing\nmatches\nhere\n");
    }

    #[test]
    fn streaming_path_dry_run_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "foo\nfoo\n").unwrap();

        let ruleset = Ruleset { rules: vec![rule("r1", "foo", "bar")] };
        let descriptor = streaming_descriptor_for(&path);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = process(
            &descriptor,
            &ruleset,
            ProcessOptions { dry_run: true, create_backup: false },
            &cancel,
        );

        assert_eq!(result.status, FileStatus::Modified);
        assert_eq!(fs::read_to_string(&path).unwrap(), "foo\nfoo\n");
    }
}
