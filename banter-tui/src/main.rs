//! Banter terminal entry point.
//!
//! Bootstraps the workbench, then hands the terminal to the event loop.
//! A session restore failure is logged and skipped; the interface still
//! comes up, with chat gated until the backend is configured.

mod app;
mod handler;
mod tui;
mod ui;

use anyhow::Result;
use banter_core::{Config, Workbench};
use tracing::warn;

use crate::app::App;
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    // The interface draws on stderr. Logs go to stdout, and only when
    // RUST_LOG asks for them, so redirecting stdout keeps the screen clean.
    if std::env::var("RUST_LOG").is_ok() {
        banter_core::init_logging();
    }

    let config = Config::default();
    let workbench = Workbench::new(config)?;
    if let Err(e) = workbench.initialize().await {
        warn!(error = %e, "Session restore failed, starting unconfigured");
    }

    let mut app = App::new(workbench);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        }
    }
    Ok(())
}
