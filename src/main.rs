use anyhow::Result;
use clap::Parser;
use papapackage::{
    commands::{Config, run},
    link::LinkCli,
    plan::OverwritePolicy,
    runtime::RealRuntime,
};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

/// papapackage - keep local monorepo packages in sync
///
/// Scans FOLDER for package.json files, links packages whose consumers are
/// Next.js or React projects, and copies every change of the other internal
/// packages into their consumers' node_modules.
///
/// Examples:
///   papapackage               # Sync the packages under the current directory
///   papapackage ../monorepo   # Sync the packages under ../monorepo
#[derive(Parser, Debug)]
#[command(author, about, version = env!("PAPAPACKAGE_VERSION"))]
struct Cli {
    /// Root folder to scan (defaults to the current directory; also via PAPAPACKAGE_ROOT)
    #[arg(value_name = "FOLDER", env = "PAPAPACKAGE_ROOT")]
    folder: Option<PathBuf>,

    /// Log discovered files, internal packages and dependency edges
    #[arg(long, short = 'd')]
    debug: bool,

    /// Package manager used for linking
    #[arg(long, value_enum, default_value_t = LinkCli::Yarn, env = "PAPAPACKAGE_LINK_CLI")]
    link_cli: LinkCli,

    /// Do not run link commands for the link plan
    #[arg(long)]
    no_link: bool,

    /// Do not copy into consumers whose installed version is already up to date
    #[arg(long)]
    skip_up_to_date: bool,
}

impl Cli {
    fn overwrite_policy(&self) -> OverwritePolicy {
        if self.skip_up_to_date {
            OverwritePolicy::SkipUpToDate
        } else {
            OverwritePolicy::Always
        }
    }
}

fn init_logger(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    // The console puts the terminal in raw mode, where a bare newline does not return the cursor
    if std::io::stdin().is_terminal() {
        builder.format(|buf, record| {
            write!(buf, "[{} {}] {}\r\n", record.level(), record.target(), record.args())
        });
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.debug);

    let config = Config::new(RealRuntime, cli.folder.clone())?
        .with_link_cli(cli.link_cli)
        .with_links(!cli.no_link)
        .with_overwrite_policy(cli.overwrite_policy());

    run(config).await
}
