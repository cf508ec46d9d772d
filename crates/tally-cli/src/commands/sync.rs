use std::time::Duration;

use tally_core::sync::{SyncReport, SyncWorker};

use crate::commands::common::Context;
use crate::error::CliError;

const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_sync(ctx: &Context) -> Result<(), CliError> {
    let report = ctx.ledger.sync(&ctx.user_id).await?;
    println!("{}", format_sync_report(&report, ctx.ledger.is_online()));
    Ok(())
}

/// Keep draining in the background until Ctrl-C.
pub async fn run_sync_watch(ctx: &Context) -> Result<(), CliError> {
    let interval = ctx
        .config
        .sync
        .sync_interval()
        .unwrap_or(DEFAULT_WATCH_INTERVAL);
    let worker = SyncWorker::spawn(ctx.ledger.processor(), ctx.user_id.clone(), Some(interval));
    let mut status = worker.subscribe();

    println!("Watching outbox for {} every {}s (Ctrl-C to stop)", ctx.user_id, interval.as_secs());
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                match current.last_report {
                    Some(report) => println!("{}: {}", current.state, format_report_counts(&report)),
                    None => println!("{}", current.state),
                }
            }
        }
    }

    worker.shutdown().await;
    Ok(())
}

pub fn format_sync_report(report: &SyncReport, online: bool) -> String {
    if !online {
        return format!("Offline; {} changes waiting", report.remaining);
    }
    if report.processed == 0 && report.failed == 0 && report.remaining == 0 {
        return "Nothing to sync".to_string();
    }
    format_report_counts(report)
}

fn format_report_counts(report: &SyncReport) -> String {
    format!(
        "{} synced, {} failed, {} remaining",
        report.processed, report.failed, report.remaining
    )
}
