// batchreplace - preview/mod.rs
//
// Non-mutating "what would happen" report: runs the ruleset against a bounded
// sample of discovered files without writing anything, for display before a
// real job is committed to.

pub mod preview_builder;

pub use preview_builder::{build_preview, ChangeRecord, FilePreview, PreviewReport};
