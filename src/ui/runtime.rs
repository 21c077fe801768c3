use crate::ui::app::App;
use crate::ui::events::{AppEvent, EventHandler};
use crate::ui::render::draw;
use crate::ui::terminal_guard::setup_terminal;
use statecraft::config::ConfigStore;
use statecraft::MainLoop;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;
use tokio::runtime::Handle;

pub fn run(config: ConfigStore, runtime: Handle) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(config.get().sample.tick_rate_ms);
    let main_loop = MainLoop::new();
    let mut app = App::new(config, &main_loop, runtime)?;

    let (mut terminal, guard) = setup_terminal()?;
    let events = EventHandler::new(tick_rate);

    loop {
        main_loop.run_pending();
        terminal.draw(|frame| draw(frame, &app))?;
        if app.should_quit() {
            break;
        }

        match events.next(tick_rate) {
            Ok(AppEvent::Key(key)) => app.on_key(key),
            Ok(AppEvent::Tick) => app.on_tick(),
            // The next draw picks up the new size.
            Ok(AppEvent::Resize(cols, rows)) => tracing::trace!(cols, rows, "resized"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    app.shutdown();
    main_loop.run_pending();
    drop(events);
    drop(guard);
    Ok(())
}
