mod api;
mod config;
mod error;
mod market;
mod notify;
mod poller;
mod ui;

use api::binance::rest::RestFetcher;
use clap::Parser;
use config::Config;
use env_logger::{Builder, Target, WriteStyle};
use log::{info, warn, LevelFilter};
use market::alerts::AlertEngine;
use market::history::HistoryStore;
use market::state::SessionState;
use notify::push::{PushClient, PushProvider};
use notify::Dispatcher;
use poller::Poller;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use ui::console::LogSink;
use ui::dashboard::Dashboard;

fn init_logging(config: &Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn) // dependencies stay quiet
        .filter_module("pricewatch", config.log_level)
        .format(|buf, record| {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            )
        });

    match config.log_file() {
        // Keep logs off the screen while the dashboard owns the terminal
        Some(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            builder
                .target(Target::Pipe(Box::new(file)))
                .write_style(WriteStyle::Never);
        }
        None => {
            builder.target(Target::Stderr).write_style(WriteStyle::Auto);
        }
    }

    builder.try_init()?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::parse();
    init_logging(&config)?;

    info!("Starting pricewatch...");

    let fetcher = RestFetcher::new(config.mirrors(), config.timeout())?;
    info!("Mirrors: {}", fetcher.mirrors().join(", "));

    let push_http = reqwest::Client::builder().timeout(config.timeout()).build()?;
    let push = PushClient::new(push_http, config.push, &config.push_token);
    match &push {
        Some(client) => info!("Push notifications via {}", client.provider().name()),
        None if config.push != PushProvider::None => {
            warn!("Push provider {} selected without a token, push disabled", config.push.name())
        }
        None => {}
    }
    let targets = config.targets()?;
    let dispatcher = Dispatcher::new(config.cue.build(), push);
    info!(
        "Alerting on moves of {:.1}% or more, {} price targets, push {}",
        config.threshold,
        targets.len(),
        if dispatcher.push_enabled() { "on" } else { "off" }
    );

    let history = HistoryStore::new(config.history_len);
    info!(
        "Keeping {} samples per pair, SMA {} / RSI {}",
        history.capacity(),
        config.sma_window,
        config.rsi_period
    );
    let state = SessionState::new(
        config.symbols()?,
        history,
        AlertEngine::new(config.threshold, targets),
        config.sma_window,
        config.rsi_period,
    );

    let ticks = if config.headless {
        let mut poller = Poller::new(fetcher, dispatcher, LogSink::new(), state, config.interval());
        poller.run(None).await
    } else {
        let dashboard = Dashboard::new()?;
        let mut poller = Poller::new(fetcher, dispatcher, dashboard, state, config.interval());
        poller.run(None).await
    };

    info!("Shutdown after {} ticks", ticks);
    Ok(())
}
