//! Read-only commands: `stats`, `list`, `queue`.

use super::CommandResult;
use std::fmt::Write as _;
use tapserve_offline::{OfflineExpense, OfflineStore, StorageStats, SyncQueueItem};

/// Runs the stats command.
pub async fn stats(store: &OfflineStore, format: &str) -> CommandResult {
    let stats = store.storage_stats().await?;
    println!("{}", render_stats(&stats, format)?);
    Ok(())
}

/// Runs the list command.
pub async fn list(
    store: &OfflineStore,
    tenant: Option<&str>,
    outlet: Option<&str>,
    unsynced_only: bool,
    format: &str,
) -> CommandResult {
    let mut records = store.list_all(tenant, outlet).await?;
    if unsynced_only {
        records.retain(|record| !record.synced);
    }
    records.sort_by(|a, b| a.expense.created_at.cmp(&b.expense.created_at));
    println!("{}", render_expenses(&records, format)?);
    Ok(())
}

/// Runs the queue command.
pub async fn queue(store: &OfflineStore, failed: bool, format: &str) -> CommandResult {
    let items = if failed {
        store.list_failed().await?
    } else {
        store.list_queue().await?
    };
    println!("{}", render_queue(&items, format)?);
    Ok(())
}

pub(crate) fn render_stats(stats: &StorageStats, format: &str) -> CommandResult<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(stats)?),
        _ => {
            let mut out = String::new();
            writeln!(out, "Offline store")?;
            writeln!(out, "  Expenses:   {}", stats.total_expenses)?;
            writeln!(out, "  Unsynced:   {}", stats.unsynced_expenses)?;
            writeln!(out, "  Queued:     {}", stats.queued_items)?;
            writeln!(out, "  Errored:    {}", stats.errored_items)?;
            writeln!(out, "  Evicted:    {}", stats.failed_items)?;
            write!(
                out,
                "  Last sync:  {}",
                stats.last_sync.as_deref().unwrap_or("never")
            )?;
            Ok(out)
        }
    }
}

pub(crate) fn render_expenses(records: &[OfflineExpense], format: &str) -> CommandResult<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(records)?),
        _ => {
            if records.is_empty() {
                return Ok("No expenses".into());
            }
            let mut out = String::new();
            writeln!(
                out,
                "{:<32} {:>12} {:<9} {:<6} {:<20} ERROR",
                "ID", "AMOUNT", "STATUS", "SYNCED", "VENDOR"
            )?;
            for record in records {
                let expense = &record.expense;
                writeln!(
                    out,
                    "{:<32} {:>12.2} {:<9} {:<6} {:<20} {}",
                    expense.id,
                    expense.amount,
                    expense.status.as_str(),
                    if record.synced { "yes" } else { "no" },
                    expense.vendor_name,
                    record.sync_error.as_deref().unwrap_or("")
                )?;
            }
            Ok(out.trim_end().to_string())
        }
    }
}

pub(crate) fn render_queue(items: &[SyncQueueItem], format: &str) -> CommandResult<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(items)?),
        _ => {
            if items.is_empty() {
                return Ok("Queue is empty".into());
            }
            let mut out = String::new();
            writeln!(
                out,
                "{:>5} {:<32} {:<7} {:>8} ERROR",
                "SEQ", "ID", "TYPE", "ATTEMPTS"
            )?;
            for item in items {
                writeln!(
                    out,
                    "{:>5} {:<32} {:<7} {:>8} {}",
                    item.seq,
                    item.id,
                    item.kind.as_str(),
                    item.attempts,
                    item.error.as_deref().unwrap_or("")
                )?;
            }
            Ok(out.trim_end().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapserve_testkit::prelude::*;

    #[tokio::test]
    async fn stats_text_shows_counts() {
        let store = TestStore::memory();
        store.save_offline(new_expense(10.0)).await.unwrap();

        let stats = store.storage_stats().await.unwrap();
        let text = render_stats(&stats, "text").unwrap();
        assert!(text.contains("Unsynced:   1"));
        assert!(text.contains("Last sync:  never"));
    }

    #[tokio::test]
    async fn stats_json_is_camel_case() {
        let store = TestStore::memory();
        let stats = store.storage_stats().await.unwrap();
        let json = render_stats(&stats, "json").unwrap();
        assert!(json.contains("\"totalExpenses\": 0"));
    }

    #[tokio::test]
    async fn queue_lists_pending_mutations() {
        let store = TestStore::memory();
        let saved = store.save_offline(new_expense(10.0)).await.unwrap();

        let items = store.list_queue().await.unwrap();
        let text = render_queue(&items, "text").unwrap();
        assert!(text.contains(saved.id()));
        assert!(text.contains("create"));
        assert_eq!(render_queue(&[], "text").unwrap(), "Queue is empty");
    }

    #[tokio::test]
    async fn expenses_table_marks_unsynced() {
        let store = TestStore::memory();
        store.save_offline(new_expense(12.5)).await.unwrap();

        let records = store.list_all(None, None).await.unwrap();
        let text = render_expenses(&records, "text").unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.contains("12.50"));
        assert!(row.contains("Fresh Farms"));
        assert!(row.contains(" no "));
    }
}
