//! Runtime abstraction for system operations.
//!
//! Every filesystem and process side effect of the planner and the sync
//! executor goes through the [`Runtime`] trait so the logic can be tested
//! against `MockRuntime`.
//!
//! # Structure
//!
//! - `path` - Path helpers (manifest folders, install dirs, containment checks)
//! - `env` - Process environment (current directory)
//! - `fs` - File system operations (read, write, copy, directory)
//! - `process` - Running external commands

mod env;
mod fs;
pub mod path;
mod process;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use path::{
    INSTALL_DIR, has_component, installed_dependency_dir, is_path_under, manifest_folder,
    relative_path_from_dir,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runtime: Send + Sync {
    // Environment
    fn current_dir(&self) -> Result<PathBuf>;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Copy the bytes of `from` over `to`, returning the number of bytes copied.
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Create a directory and all its parents. Succeeds if it already exists.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_symlink(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    // Process
    /// Run `program` with `args` inside `cwd` and return its stdout.
    /// A non-zero exit status is an error carrying the command's stderr.
    fn run_command(&self, program: &str, args: &[String], cwd: &Path) -> Result<String>;
}

pub struct RealRuntime;

#[async_trait]
impl Runtime for RealRuntime {
    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.copy_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.is_symlink_impl(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.canonicalize_impl(path)
    }

    fn run_command(&self, program: &str, args: &[String], cwd: &Path) -> Result<String> {
        self.run_command_impl(program, args, cwd)
    }
}
