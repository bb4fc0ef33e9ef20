use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, BulkOrchestrator, ConsoleStore, RestTransport, SessionBridge,
};
use console_state::selectors;
use serde_json::Value;
use shared::{
    domain::{EntityId, EntityType, ViewKey},
    protocol::SortDirection,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the api_url from console.toml and the environment.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one page of a collection and print its rows as JSON lines.
    List {
        entity_type: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
        /// Repeatable `field=value` filter.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Delete the given ids one after another and report the outcome.
    BulkDelete {
        entity_type: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.trim().to_string()))
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))
}

fn table_key(entity_type: &EntityType) -> ViewKey {
    ViewKey::new(format!("{entity_type}-table"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    let base_url = settings.api_base_url()?;
    info!(%base_url, "using admin api");

    let transport = RestTransport::from_settings(&settings).context("failed to build transport")?;
    let store = ConsoleStore::new(Arc::new(transport), &settings);
    let session = SessionBridge::from_settings(&settings);

    match cli.command {
        Command::List {
            entity_type,
            page,
            per_page,
            sort,
            desc,
            filters,
        } => {
            let entity_type = EntityType::new(entity_type);
            let view_key = table_key(&entity_type);

            session.restore(&store).await;
            let restored = store
                .snapshot()
                .await
                .view(&view_key)
                .and_then(|view| view.query.clone());
            let mut query = restored.unwrap_or_default();
            if let Some(page) = page {
                query.page = page;
            }
            if let Some(per_page) = per_page {
                query.per_page = per_page;
            }
            if let Some(field) = sort {
                let direction = if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                query = query.sorted_by(field, direction);
            }
            for (field, value) in filters {
                query = query.with_filter(field, Value::String(value));
            }

            store
                .load_collection(&view_key, &entity_type, query)
                .await
                .with_context(|| format!("failed to list {entity_type}"))?;

            let state = store.snapshot().await;
            for entity in selectors::view_entities(&state, &view_key) {
                println!("{}", serde_json::to_string(entity)?);
            }
            if let Some(view) = selectors::get_view_state(&state, &view_key) {
                println!(
                    "page {} ({} of {} rows)",
                    view.query.as_ref().map_or(0, |query| query.page),
                    view.ids.len(),
                    view.total.unwrap_or_default()
                );
            }

            if let Err(err) = session.persist(&store).await {
                warn!("failed to save session: {err}");
            }
        }
        Command::BulkDelete { entity_type, ids } => {
            let entity_type = EntityType::new(entity_type);
            let ids = ids.into_iter().map(EntityId::from).collect();
            let summary = BulkOrchestrator::new(Arc::clone(&store), &settings)
                .bulk_delete(&entity_type, ids)
                .await;

            if let Some(run) = store.snapshot().await.bulk() {
                for failure in run.failures.iter() {
                    println!("failed {}: {}", failure.id, failure.error);
                }
            }
            println!("{}: {summary}", summary.title);
        }
    }

    Ok(())
}
