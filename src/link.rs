//! Package-manager links for the link plan.
//!
//! Every source folder is registered as linkable, then each destination links
//! it in by dependency name.

use log::{debug, error, info};
use std::fmt;
use std::path::PathBuf;

use crate::plan::LinkEntry;
use crate::runtime::Runtime;

/// Package manager used to create links.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkCli {
    #[default]
    Yarn,
    Npm,
}

impl LinkCli {
    pub fn program(self) -> &'static str {
        match self {
            LinkCli::Yarn => "yarn",
            LinkCli::Npm => "npm",
        }
    }
}

impl fmt::Display for LinkCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// One command to run inside `cwd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl fmt::Display for LinkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cd {} && {} {}",
            self.cwd.display(),
            self.program,
            self.args.join(" ")
        )
    }
}

/// Commands for the whole link plan, in execution order.
pub fn link_commands(link_plan: &[LinkEntry], cli: LinkCli) -> Vec<LinkCommand> {
    let mut commands = Vec::new();

    for entry in link_plan {
        commands.push(LinkCommand {
            program: cli.program().to_string(),
            args: vec!["link".to_string()],
            cwd: entry.source_folder.clone(),
        });
        for destination in &entry.destinations {
            commands.push(LinkCommand {
                program: cli.program().to_string(),
                args: vec!["link".to_string(), destination.dependency_name.clone()],
                cwd: destination.destination_folder.clone(),
            });
        }
    }

    commands
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkReport {
    pub succeeded: Vec<LinkCommand>,
    pub failed: Vec<(LinkCommand, String)>,
}

/// Run every link command. A failed command is logged and the rest still run.
#[tracing::instrument(skip(runtime, link_plan))]
pub fn run_link_plan<R: Runtime>(runtime: &R, link_plan: &[LinkEntry], cli: LinkCli) -> LinkReport {
    let mut report = LinkReport::default();

    for command in link_commands(link_plan, cli) {
        debug!("Running {}", command);
        match runtime.run_command(&command.program, &command.args, &command.cwd) {
            Ok(output) => {
                info!("{}", command);
                if !output.trim().is_empty() {
                    debug!("{}", output.trim());
                }
                report.succeeded.push(command);
            }
            Err(e) => {
                error!("Link command failed: {}: {:#}", command, e);
                report.failed.push((command, format!("{:#}", e)));
            }
        }
    }

    report
}
