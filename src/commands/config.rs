use anyhow::{Result, bail};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    link::LinkCli,
    plan::OverwritePolicy,
    runtime::Runtime,
    snapshot::PlanOptions,
};

/// Everything the run command needs, resolved from the command line.
pub struct Config<R: Runtime> {
    pub runtime: Arc<R>,
    pub plan: PlanOptions,
    pub link_cli: LinkCli,
    /// Run the link commands of the link plan at startup.
    pub run_links: bool,
}

impl<R: Runtime> Config<R> {
    /// Resolve the root folder: the given folder (relative to the current
    /// directory) or the current directory itself.
    pub fn new(runtime: R, folder: Option<PathBuf>) -> Result<Self> {
        let current_dir = runtime.current_dir()?;
        let folder = match folder {
            Some(folder) if folder.is_absolute() => folder,
            Some(folder) => current_dir.join(folder),
            None => current_dir,
        };

        if !runtime.is_dir(&folder) {
            bail!("Directory not found: {}", folder.display());
        }
        let root = runtime.canonicalize(&folder)?;
        debug!("Root folder: {:?}", root);

        Ok(Self {
            runtime: Arc::new(runtime),
            plan: PlanOptions::new(root),
            link_cli: LinkCli::default(),
            run_links: true,
        })
    }

    pub fn with_link_cli(mut self, link_cli: LinkCli) -> Self {
        self.link_cli = link_cli;
        self
    }

    pub fn with_links(mut self, run_links: bool) -> Self {
        self.run_links = run_links;
        self
    }

    pub fn with_overwrite_policy(mut self, policy: OverwritePolicy) -> Self {
        self.plan.overwrite_policy = policy;
        self
    }

    pub fn root(&self) -> &std::path::Path {
        &self.plan.root
    }
}
