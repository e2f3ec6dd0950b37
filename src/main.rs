use pulseboard::engine::{Command, Dashboard};
use pulseboard::logger;
use pulseboard::render::LogSurface;

use feed::FeedConfig;
use series::RangeSelection;

use tokio::sync::mpsc;

const DEFAULT_FEED_URL: &str = "http://localhost:8080";

fn main() {
    logger::setup(cfg!(debug_assertions)).expect("Failed to initialize logger");

    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map_or_else(
            || "unknown location".to_string(),
            |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
        );
        let msg = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        log::error!("PANIC at {location}: {msg}");
        eprintln!("PANIC at {location}: {msg}");
    }));

    let base_url =
        std::env::var("PULSEBOARD_FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    runtime.block_on(run(FeedConfig::new(base_url)));
}

async fn run(config: FeedConfig) {
    let (commands, receiver) = mpsc::channel(8);

    // optional startup range, as a range key like "1h"
    if let Ok(raw) = std::env::var("PULSEBOARD_RANGE") {
        match raw.parse::<RangeSelection>() {
            Ok(range) => {
                let _ = commands.try_send(Command::SelectRange(range));
            }
            Err(err) => log::warn!("ignoring PULSEBOARD_RANGE: {err}"),
        }
    }

    let shutdown = commands.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutting down");
            let _ = shutdown.send(Command::Shutdown).await;
        }
    });

    Dashboard::new(config, LogSurface).run(receiver).await;
}
