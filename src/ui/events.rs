use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    Resize(u16, u16),
}

/// Reads terminal input on a background thread and emits ticks.
pub struct EventHandler {
    rx: Receiver<AppEvent>,
    running: Arc<AtomicBool>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let spawned = thread::Builder::new()
            .name("ui-events".to_string())
            .spawn(move || {
                let mut last_tick = Instant::now();
                while flag.load(Ordering::Relaxed) {
                    // Short poll so the stop flag is checked often.
                    let timeout = tick_rate
                        .saturating_sub(last_tick.elapsed())
                        .min(Duration::from_millis(50));

                    match event::poll(timeout) {
                        Ok(true) => {
                            let forwarded = match event::read() {
                                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                                    tx.send(AppEvent::Key(key))
                                }
                                Ok(Event::Resize(cols, rows)) => tx.send(AppEvent::Resize(cols, rows)),
                                Ok(_) => Ok(()),
                                Err(err) => {
                                    tracing::error!(error = %err, "terminal read failed");
                                    break;
                                }
                            };
                            if forwarded.is_err() {
                                break;
                            }
                        }
                        Ok(false) => {}
                        Err(err) => {
                            tracing::error!(error = %err, "terminal poll failed");
                            break;
                        }
                    }

                    if last_tick.elapsed() >= tick_rate {
                        if tx.send(AppEvent::Tick).is_err() {
                            break;
                        }
                        last_tick = Instant::now();
                    }
                }
                tracing::debug!("event thread stopped");
            });
        if let Err(err) = spawned {
            tracing::error!(error = %err, "failed to spawn event thread");
        }

        Self { rx, running }
    }

    pub fn next(&self, timeout: Duration) -> Result<AppEvent, mpsc::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}
