// SPDX-License-Identifier: MPL-2.0

use calloop::EventLoop;
use lwe_session::{App, Session, lock};
use lwe_session_config::Config;
use tracing::{info, warn};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    init_logging();

    let config = match Config::load() {
        Ok(conf) => conf,
        Err(err) => {
            warn!("Config file error, falling back to defaults: {err}");
            Config::default()
        }
    };

    let _lock = lock::acquire(&config.lock_file())?;

    let mut event_loop: EventLoop<'static, App> = EventLoop::try_new()?;
    let mut app = App::new(Session::from_config(&config), event_loop.handle());

    // give whatever launched us a moment before probing the system
    app.schedule_reconcile(config.reconcile_delay())?;
    app.watch_signals()?;

    info!("session daemon started");
    while !app.exit_requested() {
        event_loop.dispatch(None, &mut app)?;
    }
    info!("session daemon exiting");

    Ok(())
}

fn init_logging() {
    let level = ["LWE_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok())
        .and_then(|value| value.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt().with_max_level(level).init();
}
