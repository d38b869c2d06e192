//! Commands that talk to the API: `sync`, `retry`, plus `clear-errors`.

use super::CommandResult;
use std::fmt::Write as _;
use tapserve_offline::OfflineStore;
use tapserve_sync_engine::{SyncEngine, SyncReport};

/// Runs the sync command.
pub async fn sync(engine: &SyncEngine, format: &str) -> CommandResult {
    let report = engine.sync_all().await;
    println!("{}", render_report(&report, format)?);
    match report.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Runs the retry command.
pub async fn retry(engine: &SyncEngine, id: &str) -> CommandResult {
    if engine.force_sync_expense(id).await {
        println!("Pushed {id}");
        return Ok(());
    }
    let reason = match engine.store().get(id).await? {
        Some(record) => record
            .sync_error
            .unwrap_or_else(|| "nothing to push".to_string()),
        None => "no such expense".to_string(),
    };
    Err(format!("Could not push {id}: {reason}").into())
}

/// Runs the clear-errors command.
pub async fn clear_errors(store: &OfflineStore) -> CommandResult {
    let cleared = store.clear_queue_errors().await?;
    println!("Cleared errors on {cleared} mutation(s)");
    Ok(())
}

pub(crate) fn render_report(report: &SyncReport, format: &str) -> CommandResult<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(report)?),
        _ => {
            let mut out = String::new();
            if let Some(error) = &report.error {
                write!(out, "Sync aborted: {error}")?;
                return Ok(out);
            }
            write!(
                out,
                "Pulled {}, pushed {}, failed {}",
                report.pulled, report.synced, report.failed
            )?;
            for failure in &report.errors {
                write!(out, "\n  {}: {}", failure.id, failure.error)?;
            }
            Ok(out)
        }
    }
}
