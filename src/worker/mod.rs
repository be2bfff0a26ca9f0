// batchreplace - worker/mod.rs
//
// Per-file execution layer: reads a file, runs it through the rule engine,
// and (unless dry-run) rewrites it atomically. Depends on core + platform.

pub mod file_worker;
