use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::FutureExt;
use listsync::config::Config;
use listsync::failure::{FailureContext, FailureHandler};
use listsync::model::{CategorySet, ItemSnapshot, ListDetail, ListItem, ListKind};
use listsync::notify::TracingSink;
use listsync::remote::{ItemStore, RemoteItemClient};
use listsync::sync::{
    complete_items, delete_items, refresh_item, refresh_items, toggle_read, ActivityMonitor,
    PollingScheduler, RefreshOptions, SchedulerConfig,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Get the config directory path (~/.config/listsync/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("listsync"))
}

#[derive(Parser, Debug)]
#[command(name = "listsync", about = "Keep shared lists in sync with the list server")]
struct Args {
    /// Config file (defaults to ~/.config/listsync/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll a list in the background and log what changes
    Watch {
        #[arg(long)]
        list: String,
    },
    /// Put completed items back on the list
    Refresh {
        #[arg(long)]
        list: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Flip the read flag on books
    ToggleRead {
        #[arg(long)]
        list: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Mark items completed
    Complete {
        #[arg(long)]
        list: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Mark items not completed
    Uncomplete {
        #[arg(long)]
        list: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Delete items
    Delete {
        #[arg(long)]
        list: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(config = ?config, "Effective configuration");

    let client = RemoteItemClient::from_config(&config).context("Invalid base_url in config")?;

    match args.command {
        Command::Watch { list } => watch(client, &config, list).await,
        Command::Refresh { list, items } => {
            let (detail, snapshot, selected) = load_selection(&client, &list, &items).await?;
            require(detail.list.kind, ListKind::supports_refresh, "refresh")?;
            let sink = TracingSink;
            let failures = FailureHandler::new(&sink);
            // A single item goes through the direct path, which reports its own failure
            let next = if let [item] = selected.as_slice() {
                refresh_item(
                    &client,
                    &list,
                    item,
                    &snapshot,
                    RefreshOptions::default(),
                    &failures,
                )
                .await
                .context("Refresh failed")?
                .snapshot
                .unwrap_or(snapshot)
            } else {
                refresh_items(&client, &list, &selected, &snapshot, &failures)
                    .await
                    .snapshot
            };
            print_snapshot(&detail, &next);
            Ok(())
        }
        Command::ToggleRead { list, items } => {
            let (detail, snapshot, selected) = load_selection(&client, &list, &items).await?;
            require(detail.list.kind, ListKind::supports_read_toggle, "toggle-read")?;
            let sink = TracingSink;
            let failures = FailureHandler::new(&sink);
            let outcome = toggle_read(&client, &list, &selected, &snapshot, &failures)
                .await
                .context("Toggle failed")?;
            print_snapshot(&detail, &outcome.snapshot);
            Ok(())
        }
        Command::Complete { list, items } => set_completed(&client, &list, &items, true).await,
        Command::Uncomplete { list, items } => {
            set_completed(&client, &list, &items, false).await
        }
        Command::Delete { list, items } => {
            let (detail, snapshot, selected) = load_selection(&client, &list, &items).await?;
            let sink = TracingSink;
            let failures = FailureHandler::new(&sink);
            let update = delete_items(&client, &list, &selected, &snapshot, &failures).await;
            print_snapshot(&detail, &update.snapshot);
            Ok(())
        }
    }
}

async fn set_completed(
    client: &RemoteItemClient,
    list_id: &str,
    item_ids: &[String],
    completed: bool,
) -> Result<()> {
    let (detail, snapshot, selected) = load_selection(client, list_id, item_ids).await?;
    let sink = TracingSink;
    let failures = FailureHandler::new(&sink);
    let update = complete_items(client, list_id, &selected, completed, &snapshot, &failures).await;
    print_snapshot(&detail, &update.snapshot);
    Ok(())
}

fn require(kind: ListKind, supported: fn(ListKind) -> bool, action: &str) -> Result<()> {
    if !supported(kind) {
        anyhow::bail!("{:?} lists do not support {}", kind, action);
    }
    Ok(())
}

/// Fetch the list and pick out the requested items, in the order given.
async fn load_selection(
    client: &RemoteItemClient,
    list_id: &str,
    item_ids: &[String],
) -> Result<(ListDetail, ItemSnapshot, Vec<ListItem>)> {
    let detail = match client.get_list(list_id).await {
        Ok(detail) => detail,
        Err(e) => {
            let sink = TracingSink;
            FailureHandler::new(&sink).handle(&e, FailureContext::new("List not found"));
            return Err(e).with_context(|| format!("Failed to load list {}", list_id));
        }
    };
    let snapshot = ItemSnapshot::from_detail(detail.clone());

    let selected = item_ids
        .iter()
        .map(|id| {
            snapshot
                .find(id)
                .cloned()
                .with_context(|| format!("Item {} is not on list {}", id, list_id))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((detail, snapshot, selected))
}

fn print_snapshot(detail: &ListDetail, snapshot: &ItemSnapshot) {
    let label = detail.list.kind.primary_label();
    println!("{} ({:?})", detail.list.name, detail.list.kind);
    for (heading, items) in [
        ("Not completed", &snapshot.not_completed),
        ("Completed", &snapshot.completed),
    ] {
        println!("{}: {}", heading, items.len());
        for item in items {
            println!("  {}  {}", item.id, item.field_data(label).unwrap_or("-"));
        }
    }
}

/// Poll the list until Ctrl-C, logging item counts and new categories.
async fn watch(client: RemoteItemClient, config: &Config, list_id: String) -> Result<()> {
    let scheduler_config = SchedulerConfig::from_config(config);
    if scheduler_config.period.is_none() {
        anyhow::bail!("Polling is disabled (poll_interval_secs = 0)");
    }

    let monitor = ActivityMonitor::new();
    let categories = Arc::new(Mutex::new(CategorySet::default()));

    let handle = PollingScheduler::new(scheduler_config, monitor.clone()).spawn(move || {
        let client = client.clone();
        let list_id = list_id.clone();
        let categories = Arc::clone(&categories);
        async move {
            let detail = client
                .get_list(&list_id)
                .await
                .with_context(|| format!("Failed to poll list {}", list_id))?;
            let snapshot = ItemSnapshot::from_detail(detail);
            let mut known = categories
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for item in snapshot.items() {
                if known.record(item) {
                    if let Some(category) = item.category() {
                        tracing::info!(category = %category, "New category");
                    }
                }
            }
            tracing::info!(
                not_completed = snapshot.not_completed.len(),
                completed = snapshot.completed.len(),
                "List synchronized"
            );
            Ok::<(), anyhow::Error>(())
        }
        .boxed()
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!(status = ?handle.status(), "Stopping poller");
    handle.stop().await;
    Ok(())
}
