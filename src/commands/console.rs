//! Single-key console shown while watching.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::error;
use std::io::Write;

use crate::{
    package::Catalog,
    plan::{SyncEntry, SyncPlan},
    runtime::Runtime,
    snapshot::{PlanOptions, Snapshot},
};

pub const HELP: &str = "Press l to list the sync plans, f to list files and packages, q to quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    ShowPlan,
    ShowCatalog,
    Quit,
    Unknown,
}

impl ConsoleCommand {
    pub fn from_key(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Self::Quit,
            KeyCode::Char('q') | KeyCode::Esc => Self::Quit,
            KeyCode::Char('l') => Self::ShowPlan,
            KeyCode::Char('f') => Self::ShowCatalog,
            _ => Self::Unknown,
        }
    }
}

pub fn format_plan(plan: &SyncPlan) -> String {
    let mut out = String::new();
    format_entries(&mut out, "Watch plan (copy)", &plan.watch_plan);
    format_entries(&mut out, "Link plan", &plan.link_plan);
    out
}

fn format_entries(out: &mut String, title: &str, entries: &[SyncEntry]) {
    out.push_str(title);
    out.push_str(":\n");
    if entries.is_empty() {
        out.push_str("  (none)\n");
    }
    for entry in entries {
        out.push_str(&format!("  {}\n", entry.source_folder.display()));
        for destination in &entry.destinations {
            out.push_str(&format!(
                "    -> {} ({})\n",
                destination.destination_folder.display(),
                destination.dependency_name
            ));
        }
    }
}

pub fn format_catalog(catalog: &Catalog) -> String {
    let mut out = format!("Files ({}):\n", catalog.files.len());
    for file in &catalog.files {
        out.push_str(&format!("  {}\n", file.display()));
    }

    out.push_str(&format!("Packages ({}):\n", catalog.packages.len()));
    for package in &catalog.packages {
        out.push_str(&format!("  {} [{}]", package, package.project_type));
        if package.private == Some(true) {
            out.push_str(" private");
        }
        out.push('\n');
    }
    out
}

/// Write `text` with raw-mode line endings.
fn print_lines(text: &str) {
    let mut stdout = std::io::stdout();
    for line in text.lines() {
        let _ = write!(stdout, "{}\r\n", line);
    }
    let _ = stdout.flush();
}

/// Keeps the terminal in raw mode while alive.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read keys until the user quits. Every listing is computed from a fresh snapshot.
pub fn run_interactive<R: Runtime>(runtime: &R, options: &PlanOptions) -> Result<()> {
    let _raw_mode = RawModeGuard::enable()?;
    print_lines(HELP);

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match ConsoleCommand::from_key(key) {
            ConsoleCommand::Quit => break,
            ConsoleCommand::ShowPlan => match Snapshot::build(runtime, options) {
                Ok(snapshot) => print_lines(&format_plan(&snapshot.plan)),
                Err(e) => error!("Failed to compute plans: {:#}", e),
            },
            ConsoleCommand::ShowCatalog => match Snapshot::build(runtime, options) {
                Ok(snapshot) => print_lines(&format_catalog(&snapshot.catalog)),
                Err(e) => error!("Failed to scan {:?}: {:#}", options.root, e),
            },
            ConsoleCommand::Unknown => {
                print_lines(&format!("Nothing will happen on {:?}. {}", key.code, HELP))
            }
        }
    }

    Ok(())
}
