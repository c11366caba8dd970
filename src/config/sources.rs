//! File layers of the configuration: the per-user global file and the workspace files.

pub mod global_file;
pub mod workspace_file;
