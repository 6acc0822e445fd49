pub mod commands;
pub mod graph;
pub mod link;
pub mod package;
pub mod plan;
pub mod runtime;
pub mod snapshot;
pub mod sync;
pub mod watcher;
