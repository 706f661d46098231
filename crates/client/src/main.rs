//! expensync-client CLI entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expensync_client::cache::open_local_cache;
use expensync_client::cli::{Cli, Commands, OutputFormat};
use expensync_client::output::{format_output, pretty};
use expensync_client::{ClientError, ExpensyncClient, StoreConfig, TransactionStore};
use expensync_core::normalize::normalize_document;
use expensync_core::storage::RepositoryError;
use expensync_core::transaction::{FeedMessage, TransactionId};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expensync_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Page through the remote store until everything is loaded.
async fn load_all(store: &TransactionStore) -> anyhow::Result<()> {
    store.load_first_page().await?;
    while store.snapshot().has_more {
        store.load_more().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let client = ExpensyncClient::new(&cli.base_url);
    let cache = open_local_cache(cli.cache_path.as_deref())
        .await
        .context("failed to open local cache")?;
    let config = StoreConfig {
        page_size: cli.page_size,
        cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
        ..StoreConfig::default()
    };
    let store = Arc::new(TransactionStore::new(
        Arc::new(client.clone()),
        cache,
        config,
    ));

    match cli.command {
        Commands::List { all } => {
            if all {
                load_all(&store).await?;
            } else {
                store.load_first_page().await?;
            }
            let transactions = store.transactions();
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&transactions, cli.format)),
                OutputFormat::Pretty => {
                    println!("{}", pretty::format_transactions(&transactions));
                    if store.snapshot().has_more && !cli.quiet {
                        println!("More transactions available, use --all to list them.");
                    }
                }
            }
        }
        Commands::Get { id } => {
            let Some(transaction) = client.get(&TransactionId::new(id.as_str())).await? else {
                bail!("Transaction not found: {id}");
            };
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&transaction, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_transaction(&transaction)),
            }
        }
        Commands::Add(args) => {
            let transaction = store.add(args.into_draft()).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&transaction, cli.format)),
                OutputFormat::Pretty => {
                    println!("Created:\n{}", pretty::format_transaction(&transaction))
                }
            }
        }
        Commands::Update { id, fields } => {
            let id = TransactionId::new(id);
            let Some(mut transaction) = client.get(&id).await? else {
                bail!("Transaction not found: {id}");
            };
            fields.apply(&mut transaction);
            let transaction = store.update(transaction).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&transaction, cli.format)),
                OutputFormat::Pretty => {
                    println!("Updated:\n{}", pretty::format_transaction(&transaction))
                }
            }
        }
        Commands::Delete { id } => {
            let id = TransactionId::new(id);
            store.remove(&id).await?;
            if !cli.quiet {
                println!("Deleted transaction {id}");
            }
        }
        Commands::Summary { location } => {
            load_all(&store).await?;
            let summary = store.summary(location.as_deref());
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&summary, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_summary(&summary)),
            }
        }
        Commands::Refresh => {
            store.force_refresh().await?;
            if !cli.quiet {
                println!(
                    "Reloaded {} transactions from {}",
                    store.transactions().len(),
                    client.base_url()
                );
            }
        }
        Commands::Watch { raw: true, last_event_id } => {
            if !cli.quiet {
                eprintln!("Watching changes on {}...", client.base_url());
            }
            let mut stream = client.watch_events(last_event_id).await?;
            while let Some(message) = stream.next().await {
                match message {
                    Ok(FeedMessage::Change(event)) => match cli.format {
                        OutputFormat::Json => println!("{}", format_output(&event, cli.format)),
                        OutputFormat::Pretty => println!("{}", pretty::format_change(&event)),
                    },
                    Ok(FeedMessage::Resync) => println!("resync requested by server"),
                    Err(err) => {
                        tracing::error!(error = %err, "Change feed failed");
                        break;
                    }
                }
            }
        }
        Commands::Watch { raw: false, .. } => {
            store.load_first_page().await?;
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let mut updates = store.subscribe();
            let task = store
                .clone()
                .spawn_realtime(Arc::new(client.clone()), shutdown_rx);

            if !cli.quiet {
                eprintln!("Watching changes on {}, Ctrl+C to stop", client.base_url());
            }
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let summary = store.summary(None);
                        match cli.format {
                            OutputFormat::Json => println!("{}", format_output(&summary, cli.format)),
                            OutputFormat::Pretty => println!("{}\n", pretty::format_summary(&summary)),
                        }
                    }
                }
            }

            let _ = shutdown_tx.send(());
            task.await?;
        }
        Commands::Import { file, dry_run } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let document: serde_json::Value = serde_json::from_str(&raw)?;
            let (transactions, report) = normalize_document(&document)?;

            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&report, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_report(&report)),
            }
            if dry_run {
                return Ok(());
            }

            let mut uploaded = 0;
            let mut skipped = 0;
            for transaction in &transactions {
                match client.create(transaction).await {
                    Ok(_) => uploaded += 1,
                    Err(ClientError::Repository(RepositoryError::AlreadyExists { .. })) => {
                        tracing::debug!(transaction_id = %transaction.id, "Already on server");
                        skipped += 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            if !cli.quiet {
                println!("Uploaded {uploaded} transactions, {skipped} already present");
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&health, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_health(&health)),
            }
        }
    }

    Ok(())
}
