// batchreplace - core/walker.rs
//
// Recursive directory traversal and file discovery.
//
// A `walkdir`-based walk with `filter_entry` short-circuiting descent into
// excluded directories, reading only file *metadata*, and collecting
// per-entry errors as non-fatal warnings rather than aborting the walk.
//
// Ordering: `.sort_by_file_name()` gives the lexicographic-by-basename
// ordering within each directory that the discovery invariant requires.

use crate::core::model::FileDescriptor;
use crate::core::path_filter::{DirectoryDecision, FileDecision, PathFilter};
use crate::core::model::FilterConfig;
use crate::util::constants;
use crate::util::error::DiscoveryError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Walk `root`, applying `config`'s filters, and return every accepted file
/// in depth-first, lexicographic-by-basename order.
///
/// Convenience wrapper around `walk_streaming` for callers (the preview
/// builder, tests) that want the whole result set materialized rather than
/// delivered incrementally.
///
/// # Non-fatal errors
/// Per-entry I/O errors (permission denied on a subdirectory, a broken
/// symlink, a file that disappears between listing and stat) are reported
/// through `on_warning` and do not stop the walk.
///
/// # Fatal errors
/// Returned only when the root itself is invalid.
pub fn walk<F>(
    root: &Path,
    config: &FilterConfig,
    mut on_warning: F,
) -> Result<Vec<FileDescriptor>, DiscoveryError>
where
    F: FnMut(String),
{
    let mut files = Vec::new();
    walk_streaming(
        root,
        config,
        |descriptor| {
            files.push(descriptor);
            true
        },
        &mut on_warning,
    )?;
    Ok(files)
}

/// Walk `root`, applying `config`'s filters, and deliver each accepted file
/// to `on_file` as soon as it is discovered, in depth-first,
/// lexicographic-by-basename order — rather than materializing the whole
/// tree into memory before returning.
///
/// This is what lets the Scheduler run the walk as a true producer: it can
/// feed a bounded channel and apply backpressure to discovery while a
/// worker pool drains it concurrently, instead of blocking every worker
/// until the entire tree has been enumerated.
///
/// `on_file` returns `true` to keep walking or `false` to stop early (used
/// by the Scheduler to abandon discovery once a job is cancelled).
///
/// # Non-fatal errors
/// Per-entry I/O errors (permission denied on a subdirectory, a broken
/// symlink, a file that disappears between listing and stat) are reported
/// through `on_warning` and do not stop the walk.
///
/// # Fatal errors
/// Returned only when the root itself is invalid.
pub fn walk_streaming<F, W>(
    root: &Path,
    config: &FilterConfig,
    mut on_file: F,
    mut on_warning: W,
) -> Result<(), DiscoveryError>
where
    F: FnMut(FileDescriptor) -> bool,
    W: FnMut(String),
{
    if !root.exists() {
        return Err(DiscoveryError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let max_depth = config.max_depth.min(constants::ABSOLUTE_MAX_DEPTH);
    let filter = PathFilter::new(config);

    tracing::debug!(root = %root.display(), max_depth, "Walk starting");

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.file_type().is_dir() {
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_str().unwrap_or("");
                return filter.classify_directory(name) == DirectoryDecision::Descend;
            }
            true
        });

    let mut files_found = 0usize;

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                on_warning(format!("Cannot access '{path_str}': {e}"));
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }
        // Walker only reports files; other kinds (fifo, device) are skipped.
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                on_warning(format!("Cannot read metadata for '{}': {e}", path.display()));
                continue;
            }
        };

        let size = metadata.len();

        match filter.classify_file(relative, size) {
            FileDecision::Include => {}
            FileDecision::ExcludedByPattern
            | FileDecision::ExcludedByExtension
            | FileDecision::ExcludedByHidden
            | FileDecision::TooLarge => continue,
        }

        let modified: Option<DateTime<Utc>> = metadata.modified().ok().map(DateTime::<Utc>::from);

        files_found += 1;
        let keep_going = on_file(FileDescriptor {
            absolute_path: path.to_path_buf(),
            size,
            modified,
        });
        if !keep_going {
            tracing::debug!(files_found, "Walk stopped early");
            return Ok(());
        }
    }

    tracing::debug!(files_found, "Walk complete");

    Ok(())
}
