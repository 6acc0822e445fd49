//! Running external commands (package-manager link invocations).

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Command;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn run_command_impl(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("Failed to spawn `{}` in {:?}", program, cwd))?;

        if !output.status.success() {
            bail!(
                "`{} {}` in {:?} exited with {}: {}",
                program,
                args.join(" "),
                cwd,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
