use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use builder_core::{
    compose, dispatch_with_context, load_settings, ActionHandles, BuilderSettings, EventBus,
    ItemStore, RenderMode, ReqwestHttpClient, VariableStore,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shared::{
    domain::{Item, ItemId},
    protocol::deserialize_items,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod check;
mod console;

use check::check_items;
use console::Console;

#[derive(Parser, Debug)]
#[command(about = "Compose, check and exercise persisted app builder trees")]
struct Cli {
    #[arg(long, default_value = "builder.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the composed tree as JSON.
    Compose {
        #[arg(long)]
        items: PathBuf,
        #[arg(long)]
        context: Option<PathBuf>,
        #[arg(long)]
        preview: bool,
    },
    /// Report structural problems in a tree.
    Check {
        #[arg(long)]
        items: PathBuf,
    },
    /// Run the action an item has configured for an event.
    Fire {
        #[arg(long)]
        items: PathBuf,
        #[arg(long)]
        item: String,
        #[arg(long)]
        event: String,
        #[arg(long)]
        context: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.config);
    run(cli.command, &settings).await
}

async fn run(command: Command, settings: &BuilderSettings) -> Result<()> {
    match command {
        Command::Compose {
            items,
            context,
            preview,
        } => {
            let store = load_store(&items, settings)?;
            let context = read_context(context.as_deref())?;
            let mode = if preview {
                RenderMode::Preview
            } else {
                settings.render_mode
            };
            let tree = compose(&store, &context, mode);
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Command::Check { items } => {
            let items = read_items(&items)?;
            let findings = check_items(&items);
            for finding in &findings {
                println!("{finding}");
            }
            info!(items = items.len(), findings = findings.len(), "check finished");
            if !findings.is_empty() {
                return Err(anyhow!("{} problem(s) found", findings.len()));
            }
        }
        Command::Fire {
            items,
            item,
            event,
            context,
        } => {
            let store = load_store(&items, settings)?;
            let context = read_context(context.as_deref())?;
            let id = ItemId::new(item);
            let target = store
                .get(&id)
                .ok_or_else(|| anyhow!("item {id} not found"))?;
            let action = target
                .event_action(&event)
                .ok_or_else(|| anyhow!("item {id} has no action for event {event}"))?
                .with_context(|| format!("invalid action for {id}.{event}"))?;

            let http = ReqwestHttpClient::new(settings.api_base_url.as_deref())?;
            let variables = VariableStore::new(Arc::new(EventBus::new()));
            let console = Console;
            let handles = ActionHandles::new(&console)
                .with_navigator(&console)
                .with_modal_host(&console)
                .with_variables(&variables)
                .with_http(&http);

            let outcome = dispatch_with_context(&action, &handles, &context).await;
            println!("outcome: {outcome:?}");
            let variables = variables.snapshot();
            if variables.as_object().is_some_and(|vars| !vars.is_empty()) {
                println!("variables: {variables}");
            }
        }
    }
    Ok(())
}

fn read_items(path: &Path) -> Result<Vec<Item>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read items from '{}'", path.display()))?;
    deserialize_items(&raw).with_context(|| format!("invalid items in '{}'", path.display()))
}

fn load_store(path: &Path, settings: &BuilderSettings) -> Result<ItemStore> {
    let mut store = ItemStore::with_grid_size(settings.grid_size);
    store.replace_all(read_items(path)?);
    Ok(store)
}

fn read_context(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Object(Default::default()));
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read context from '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid context in '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
