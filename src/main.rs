use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

mod asana;
mod cache;
mod config;
mod console;
mod datetime;
mod duplicate;
mod grouping;
mod ledger;
mod logger;
mod remote;
mod resolver;
mod sync_command;
mod task;
#[cfg(test)]
mod test_support;
mod time_entry;
mod toggl;

use asana::AsanaClient;
use config::Config;
use console::{ConsoleMarkdownList, ConsolePresenter};
use sync_command::{SyncArgs, SyncCommand};
use toggl::TogglClient;

/// TogglのタイムエントリーをリンクされたAsanaのタスクに同期するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- --start 2026-02-01 --end 2026-02-07
/// $ cargo run -- --all-users --dry-run
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(flatten)]
    sync: SyncArgs,

    #[clap(short = 'v', long = "verbose", help = "Show debug logs")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::setup_logger(args.verbose)?;

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(ledger) = &args.sync.ledger {
        config.ledger_path = ledger.clone();
    }
    let options = args.sync.to_options(datetime::today())?;

    let toggl_client = TogglClient::new(&config);
    let asana_client = AsanaClient::new(&config);
    let command = SyncCommand::new(&toggl_client, &asana_client);
    let summary = command.run(&options, &config.ledger_path).await?;
    info!("Sync finished.");

    let mut stdout = io::stdout();
    ConsoleMarkdownList::new(&mut stdout).show_summary(&summary)?;

    Ok(())
}
