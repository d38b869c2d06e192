//! Journal maintenance: `compact` and `reset`.

use super::CommandResult;
use tapserve_offline::OfflineStore;

/// Runs the compact command.
pub async fn compact(store: &OfflineStore) -> CommandResult {
    let stats = store.compact().await?;
    let saved = stats.bytes_before.saturating_sub(stats.bytes_after);
    println!(
        "Compacted journal: {} -> {} bytes ({} reclaimed)",
        stats.bytes_before, stats.bytes_after, saved
    );
    Ok(())
}

/// Runs the reset command.
pub async fn reset(store: &OfflineStore, yes: bool) -> CommandResult {
    if !yes {
        return Err("Refusing to reset without --yes; this drops unsynced changes".into());
    }
    let stats = store.storage_stats().await?;
    if stats.unsynced_expenses > 0 {
        tracing::warn!(
            unsynced = stats.unsynced_expenses,
            "resetting store with unsynced changes"
        );
    }
    store.clear_all().await?;
    println!("Store cleared");
    Ok(())
}
