//! Tally CLI - track income and expenses from the terminal
//!
//! Every change lands in the local ledger first and is pushed to the records
//! API when one is configured and reachable.

mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{open_context, GlobalOptions};
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, EditFields};
use crate::commands::list::run_list;
use crate::commands::pending::run_pending;
use crate::commands::pull::run_pull;
use crate::commands::reset::run_reset;
use crate::commands::sync::{run_sync, run_sync_watch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    "tally=info"
                        .parse()
                        .map_err(|error| CliError::Config(format!("{error}")))?,
                ),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        offline: cli.offline,
        data_dir: cli.data_dir,
        user: cli.user,
    };

    let command = match cli.command {
        Commands::Config { command } => return run_config(command),
        command => command,
    };

    let ctx = open_context(&options)?;
    match command {
        Commands::Add {
            amount,
            description,
            date,
            category,
        } => {
            run_add(
                &ctx,
                &amount,
                &description,
                date.as_deref(),
                category.as_deref(),
            )
            .await?;
        }
        Commands::List { limit, json } => run_list(&ctx, limit, json).await?,
        Commands::Edit {
            id,
            date,
            description,
            amount,
            category,
        } => {
            let fields = EditFields {
                date,
                description,
                amount,
                category,
            };
            run_edit(&ctx, &id, fields).await?;
        }
        Commands::Delete { id } => run_delete(&ctx, &id).await?,
        Commands::Pending { json } => run_pending(&ctx, json).await?,
        Commands::Sync { watch: false } => run_sync(&ctx).await?,
        Commands::Sync { watch: true } => run_sync_watch(&ctx).await?,
        Commands::Pull => run_pull(&ctx).await?,
        Commands::Reset { yes } => run_reset(&ctx, yes).await?,
        // Handled above, before a ledger is opened.
        Commands::Config { .. } => {}
    }

    Ok(())
}
