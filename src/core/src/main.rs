use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use flagwatch::admin::{Catalog, RuleEditor, RuleForm, ServiceEditor};
use flagwatch::api::types::PacketDirection;
use flagwatch::api::{Api, HttpApiClient};
use flagwatch::configuration::{Cli, Command, Config};
use flagwatch::feed::{FeedState, FeedSynchronizer};
use flagwatch::notification::{LogNotifier, Notifier};
use flagwatch::presentation::{render_row, render_stream};
use flagwatch::scheduler::PollScheduler;
use flagwatch::web_interface::WebServer;
use log::{error, info, warn};
use tokio::sync::{oneshot, watch};

#[tokio::main]
async fn main() {
    // RUST_LOG takes precedence over the default level
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let config = cli.load_config().unwrap_or_else(|e| {
        error!("Unable to load configuration: {}", e);
        std::process::exit(2);
    });

    let api: Arc<dyn Api> = Arc::new(HttpApiClient::new(config.api.base_url.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    info!("Using backend at {}", config.api.base_url);

    if let Err(e) = run(cli.command, config, api, notifier).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(
    command: Command,
    config: Config,
    api: Arc<dyn Api>,
    notifier: Arc<dyn Notifier>,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Watch { .. } => watch_feed(config, api, notifier).await,
        Command::Services => {
            let catalog = Catalog::new(api, notifier);
            catalog.refresh().await?;
            for entry in catalog.services() {
                let rules: Vec<&str> = entry.rules().iter().map(|r| r.name.as_str()).collect();
                println!(
                    "{:>4}  {:<20} {:>5}  {}",
                    entry.service.id,
                    entry.service.name,
                    entry.service.port,
                    rules.join(",")
                );
            }
            Ok(())
        }
        Command::Rules => {
            let catalog = Catalog::new(api, notifier);
            catalog.refresh().await?;
            for rule in catalog.rules() {
                println!(
                    "{:>4}  {:<20} {:<3}  {:<10} {}",
                    rule.id, rule.name, rule.packet_direction, rule.color, rule.regexp
                );
            }
            Ok(())
        }
        Command::RuleCreate {
            name,
            direction,
            regexp,
            color,
        } => {
            let form = rule_form(0, name, direction, regexp, color);
            RuleEditor::new(api, notifier).submit(&form).await?;
            Ok(())
        }
        Command::RuleUpdate {
            id,
            name,
            direction,
            regexp,
            color,
        } => {
            let form = rule_form(id, name, direction, regexp, color);
            RuleEditor::new(api, notifier).submit(&form).await?;
            Ok(())
        }
        Command::RuleDelete { id } => {
            let form = RuleForm {
                id,
                ..RuleForm::default()
            };
            RuleEditor::new(api, notifier).delete(&form).await?;
            Ok(())
        }
        Command::ServiceUpsert {
            id,
            name,
            port,
            attach,
            detach,
        } => {
            let catalog = Catalog::new(api.clone(), notifier.clone());
            catalog.refresh().await?;
            let mut form = catalog
                .service_form(id)
                .ok_or_else(|| format!("Service {} does not exist", id.unwrap_or_default()))?;
            form.name = name;
            form.port = port;
            for (rule_ids, checked) in [(attach, true), (detach, false)] {
                for rule_id in rule_ids {
                    if !form.set_rule_checked(rule_id, checked) {
                        warn!("Ignoring unknown rule {}", rule_id);
                    }
                }
            }
            ServiceEditor::new(api, notifier).submit(&form).await?;
            Ok(())
        }
        Command::ServiceDelete { id } => {
            let catalog = Catalog::new(api.clone(), notifier.clone());
            catalog.refresh().await?;
            let form = catalog
                .service_form(Some(id))
                .ok_or_else(|| format!("Service {} does not exist", id))?;
            ServiceEditor::new(api, notifier).delete(&form).await?;
            Ok(())
        }
    }
}

fn rule_form(
    id: i64,
    name: String,
    direction: PacketDirection,
    regexp: String,
    color: String,
) -> RuleForm {
    RuleForm {
        id,
        name,
        packet_direction: Some(direction),
        regexp,
        color,
    }
}

async fn watch_feed(
    config: Config,
    api: Arc<dyn Api>,
    notifier: Arc<dyn Notifier>,
) -> Result<(), Box<dyn Error>> {
    let feed = Arc::new(FeedSynchronizer::new(api, notifier, config.feed_options()));

    let printer = tokio::spawn(print_new_rows(feed.subscribe()));

    // A failed load is already reported; polling starts over from an empty feed.
    if let Err(e) = feed.mount(config.feed.initial_limit).await {
        warn!("Initial load failed, continuing with polling: {}", e);
    }
    if let Some(selected) = feed.with_state(|state| state.selected().map(render_stream)) {
        println!("{}", selected);
    }

    let scheduler = PollScheduler::start(feed.clone(), config.scheduler_options());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let web = if config.web.enabled {
        let server = WebServer::new(feed.clone());
        let (_, serving) = server.bind(config.web_address()?, async {
            let _ = stop_rx.await;
        })?;
        Some(tokio::spawn(serving))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, shutting down");

    scheduler.join().await;
    feed.teardown();
    let _ = stop_tx.send(());
    if let Some(web) = web {
        let _ = web.await;
    }
    printer.abort();
    Ok(())
}

/// Prints every stream entering the feed, oldest first.
async fn print_new_rows(mut rx: watch::Receiver<FeedState>) {
    let mut printed = 0;
    loop {
        let rows: Vec<String> = {
            let state = rx.borrow_and_update();
            let fresh: Vec<String> = state
                .streams
                .iter()
                .take_while(|entry| entry.id() > printed)
                .map(render_row)
                .collect();
            if state.watermark() > printed {
                printed = state.watermark();
            }
            fresh
        };
        for row in rows.iter().rev() {
            println!("{}", row);
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
