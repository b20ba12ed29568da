//! Shell subcommands.

use std::sync::Arc;

use nook_store::{ChangeEvent, Store, Table, Topic};
use serde_json::json;
use tracing::info;

/// Subcommand parsed from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print row counts per table.
    Stats,
    /// Print the current snapshot string.
    Export,
    /// Print change events until Ctrl-C.
    Watch,
}

impl Command {
    pub fn parse(arg: Option<&str>) -> anyhow::Result<Self> {
        match arg.unwrap_or("stats") {
            "stats" => Ok(Command::Stats),
            "export" => Ok(Command::Export),
            "watch" => Ok(Command::Watch),
            other => anyhow::bail!("unknown command '{other}' (expected stats, export or watch)"),
        }
    }
}

/// Row counts for every table, in schema order.
pub fn stats(store: &Store) -> serde_json::Value {
    let counts: serde_json::Map<String, serde_json::Value> = Table::ALL
        .iter()
        .map(|table| (table.name().to_string(), json!(store.count(*table))))
        .collect();
    json!({
        "window": store.window_id().to_string(),
        "status": format!("{:?}", store.status()),
        "tables": counts,
    })
}

pub fn export(store: &Store) -> anyhow::Result<String> {
    store
        .export_snapshot()
        .ok_or_else(|| anyhow::anyhow!("store is not loaded"))
}

/// JSON line describing a change event.
pub fn event_line(event: &ChangeEvent) -> String {
    json!({
        "table": event.table.map(|t| t.name()),
        "kind": format!("{:?}", event.kind).to_lowercase(),
    })
    .to_string()
}

/// Print every change until Ctrl-C.
pub async fn watch(store: Arc<Store>) -> anyhow::Result<()> {
    let reconciler = store.spawn_reconciler();
    let _sub = store.subscribe(Topic::All, |event| println!("{}", event_line(event)));

    info!(window = %store.window_id(), "watching for changes, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    store.close();
    reconciler.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nook_store::{ChangeKind, MemoryBlockStore, MemoryKvArea, StoreConfig, WindowChannel};

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse(None).expect("default"), Command::Stats);
        assert_eq!(Command::parse(Some("watch")).expect("watch"), Command::Watch);
        assert!(Command::parse(Some("drop-tables")).is_err());
    }

    #[test]
    fn test_event_line() {
        let line = event_line(&ChangeEvent::table(Table::Posts, ChangeKind::Upsert));
        assert_eq!(line, r#"{"kind":"upsert","table":"posts"}"#);
        let reload = event_line(&ChangeEvent::full_reload());
        assert_eq!(reload, r#"{"kind":"reload","table":null}"#);
    }

    #[tokio::test]
    async fn test_stats_counts_seeded_rows() {
        let store = Store::new(
            StoreConfig::default(),
            Arc::new(MemoryBlockStore::new()),
            Arc::new(MemoryKvArea::new()),
            WindowChannel::default(),
        );
        store.init().await;
        store
            .permissions()
            .set_analysis_enabled("a@test.com", true)
            .await;

        let stats = stats(&store);
        assert_eq!(stats["status"], "Ready");
        assert_eq!(stats["tables"]["users"], 3);
        assert_eq!(stats["tables"]["permissions"], 1);
        assert_eq!(stats["tables"]["psych_profile"], 0);
        assert!(export(&store).is_ok());
    }
}
