mod config;
mod render;

use std::{
    io::{self, Write},
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{query_client, ApiClient, PinningClient};
use loader::LoadController;
use serde_json::Value;
use shared::protocol::{ListQuery, Page};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{load_settings, Settings};

const PROGRESS_WIDTH: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Pharmaceutical supply-chain dashboard client")]
struct Cli {
    /// Path to a TOML config file (defaults to ./dashboard.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured REST base URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetches one page of a list resource with a progress indicator.
    List {
        resource: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Pins a JSON document (e.g. NFT metadata) and prints its CID.
    Pin {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::List {
            resource,
            page,
            limit,
            search,
            status,
        } => {
            let mut query = ListQuery::default().with_status(status);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            query = query.with_page(page);
            if let Some(limit) = limit {
                query.limit = limit.max(1);
            }
            run_list(&settings, &resource, query).await
        }
        Command::Pin { file, name } => run_pin(&settings, file, name).await,
    }
}

async fn run_list(settings: &Settings, resource: &str, query: ListQuery) -> Result<()> {
    let client = query_client::init(ApiClient::with_timeout(
        &settings.api_url,
        settings.request_timeout(),
    )?)?;
    let controller = LoadController::new(settings.loader.to_timings()?)?;

    let (outcome_tx, outcome_rx) = oneshot::channel::<Result<Page<Value>, String>>();
    let error_tx = Arc::new(Mutex::new(Some(outcome_tx)));
    let success_tx = Arc::clone(&error_tx);

    let request_client = client.clone();
    let resource_name = resource.to_string();
    let cycle = controller.start(
        async move { request_client.list::<Value>(&resource_name, &query).await },
        move |page| send_outcome(&success_tx, Ok(page)),
        move |message| send_outcome(&error_tx, Err(message)),
    );
    info!(cycle = cycle.0, resource, "dashboard: loading");

    let mut state_rx = controller.subscribe();
    let renderer = tokio::spawn({
        let mut state_rx = controller.subscribe();
        async move {
            loop {
                let line = render::progress_bar(&state_rx.borrow_and_update(), PROGRESS_WIDTH);
                eprint!("\r{line}");
                let _ = io::stderr().flush();
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        settled = state_rx.wait_for(|state| !state.is_loading) => {
            settled.context("load controller dropped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("dashboard: interrupted, cancelling load");
            controller.cancel();
        }
    }
    renderer.abort();
    eprintln!();

    drop(controller);
    query_client::teardown();

    match outcome_rx.await {
        Ok(Ok(page)) => {
            println!("{}", serde_json::to_string_pretty(&page.items)?);
            eprintln!(
                "page {}/{} ({} items total)",
                page.page,
                page.total_pages().max(1),
                page.total
            );
            Ok(())
        }
        Ok(Err(message)) => anyhow::bail!(message),
        Err(_) => anyhow::bail!("load cancelled"),
    }
}

// both callbacks share one sender; whichever runs first takes it
fn send_outcome<T>(slot: &Mutex<Option<oneshot::Sender<T>>>, outcome: T) {
    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(sender) = sender {
        let _ = sender.send(outcome);
    }
}

async fn run_pin(settings: &Settings, file: PathBuf, name: Option<String>) -> Result<()> {
    let raw = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read '{}'", file.display()))?;
    let content: Value = serde_json::from_str(&raw)
        .with_context(|| format!("'{}' is not valid JSON", file.display()))?;
    let name = name.unwrap_or_else(|| {
        file.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "metadata".into())
    });

    let client = PinningClient::new(&settings.pinning_endpoint, settings.pinning_jwt.clone())?
        .with_mock_fallback(true);
    if !client.has_credentials() {
        warn!("dashboard: no pinning credentials configured, using a local mock CID");
    }
    let pinned = client.pin_json(&name, &content).await?;

    println!("cid:    {}", pinned.cid);
    println!("uri:    {}", pinned.uri());
    println!("mocked: {}", pinned.mocked);
    Ok(())
}
