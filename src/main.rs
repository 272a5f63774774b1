use clap::{Arg, ArgAction, Command};
use progress_sync::core::engine::{SharedPage, SyncEngine};
use progress_sync::core::events::SyncEvent;
use progress_sync::core::scheduler::DEFAULT_POLL_INTERVAL;
use progress_sync::core::visibility::AlwaysVisible;
use progress_sync::i18n;
use progress_sync::plugins::http::fetcher::HttpStatusFetcher;
use progress_sync::plugins::registry::{PluginRegistry, SyncCliConfig};
use progress_sync::plugins::terminal::page::{TerminalPage, SERIES_ROW_SLOTS, STATUS_ROW_SLOTS};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

fn build_cli(registry: &PluginRegistry) -> Command {
    let watch = Command::new("watch")
        .about("Keep a terminal view of downloads in sync with the server")
        .arg(
            Arg::new("base_url")
                .long("base-url")
                .help("Base URL of the server exposing /download-progress")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .help("Page kind, selects the reconcile strategy")
                .value_parser(registry.strategy_names())
                .default_value("series")
                .num_args(1),
        )
        .arg(
            Arg::new("track")
                .long("track")
                .help("info_hash to show as a row (repeatable)")
                .action(ArgAction::Append)
                .num_args(1),
        )
        .arg(
            Arg::new("detail")
                .long("detail")
                .help("info_hash to show with an opened detail view (repeatable)")
                .action(ArgAction::Append)
                .num_args(1),
        )
        .arg(
            Arg::new("interval_ms")
                .long("interval-ms")
                .help("Poll interval in milliseconds")
                .default_value("1000")
                .num_args(1),
        )
        .arg(
            Arg::new("cycles")
                .long("cycles")
                .help("Stop after this many applied poll cycles")
                .value_parser(clap::value_parser!(u64).range(1..))
                .num_args(1),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .help("Locale of terminal labels (en, zh)")
                .default_value("en")
                .num_args(1),
        );

    let watch = registry.augment_watch_command(watch);

    Command::new("progress-sync")
        .about("Download progress synchronizer")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(watch)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let registry = PluginRegistry::with_defaults();
    let app = build_cli(&registry);
    let matches = app.get_matches();

    match matches.subcommand() {
        Some(("watch", m)) => {
            let base_url = m
                .get_one::<String>("base_url")
                .map(|s| Url::parse(s))
                .transpose()?
                .ok_or_else(|| anyhow::anyhow!("--base-url is required"))?;
            let page_kind = m.get_one::<String>("page").map(String::as_str).unwrap_or("series");
            let interval_ms: u64 = m
                .get_one::<String>("interval_ms")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(DEFAULT_POLL_INTERVAL.as_millis() as u64);
            let cycles: Option<u64> = m.get_one::<u64>("cycles").copied();
            let locale = i18n::Locale::parse(m.get_one::<String>("locale").map(String::as_str).unwrap_or("en"));
            let messages = i18n::get_messages(locale);

            let mut cfg = SyncCliConfig::default();
            registry.apply_watch_matches(m, &mut cfg)?;

            let strategy = registry
                .strategy(page_kind)
                .ok_or_else(|| anyhow::anyhow!("unknown page kind: {}", page_kind))?;
            let row_slots = if page_kind == "status" { STATUS_ROW_SLOTS } else { SERIES_ROW_SLOTS };

            let mut terminal = TerminalPage::new(messages)?;
            for id in m.get_many::<String>("track").into_iter().flatten() {
                terminal.add_summary(id, row_slots);
            }
            for id in m.get_many::<String>("detail").into_iter().flatten() {
                terminal.add_detail(id);
            }
            let terminal = Arc::new(Mutex::new(terminal));
            let page: SharedPage = terminal.clone();

            let fetcher = HttpStatusFetcher::new(&base_url, &cfg.headers, &cfg.fetcher)?;
            let endpoint = fetcher.endpoint().clone();

            let engine = SyncEngine::new(
                Arc::new(fetcher),
                page,
                Arc::new(AlwaysVisible),
                Duration::from_millis(interval_ms),
            );
            tracing::info!(
                endpoint = %endpoint,
                page = page_kind,
                interval_ms = engine.interval().as_millis() as u64,
                "watching download progress"
            );

            let mut rx = engine.subscribe();
            engine.start(strategy);

            let mut applied = 0u64;
            let mut last_failed = false;
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    evt = rx.recv() => match evt {
                        Ok(SyncEvent::SchedulerStarted { strategy }) => {
                            tracing::debug!(strategy, "polling started");
                        }
                        Ok(SyncEvent::CycleApplied { strategy, report }) => {
                            applied += 1;
                            last_failed = false;
                            if report.failed > 0 {
                                tracing::warn!(strategy, failed = report.failed, "some rows could not be updated");
                            }
                            if cycles.is_some_and(|n| applied >= n) {
                                break;
                            }
                        }
                        Ok(SyncEvent::CycleFailed { message }) => {
                            if !last_failed {
                                terminal.lock().await.println(format!("{}: {}", messages.cycle_failed, message));
                            }
                            last_failed = true;
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(skipped = n, "event receiver lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }

            engine.stop();
            println!("{}", messages.stopped);
        }
        _ => {}
    }

    Ok(())
}
