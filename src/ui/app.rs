use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::Mutex;
use statecraft::config::{Config, ConfigStore};
use statecraft::sample::resettable::LEVEL_STEP;
use statecraft::sample::{
    ControlValues, CounterViewModel, EntityListIntent, EntityListState, EntityListViewModel,
    EntityMessage, EntityRepository, LocalEntitySource, ResettableState, ResettableViewModel,
};
use statecraft::util::Timer;
use statecraft::{Lifecycle, LifecycleState, MainLoop, MviError, StoreOptions};
use tokio::runtime::Handle;

const STATUS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenId {
    Counter,
    Entities,
    Resettable,
}

impl ScreenId {
    pub const ALL: [ScreenId; 3] = [ScreenId::Counter, ScreenId::Entities, ScreenId::Resettable];

    pub fn title(self) -> &'static str {
        match self {
            ScreenId::Counter => "Counter",
            ScreenId::Entities => "Entities",
            ScreenId::Resettable => "Resettable",
        }
    }

    fn index(self) -> usize {
        match self {
            ScreenId::Counter => 0,
            ScreenId::Entities => 1,
            ScreenId::Resettable => 2,
        }
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

impl StatusLine {
    fn new(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            text: text.into(),
            is_error,
            shown_at: Instant::now(),
        }
    }
}

/// What the screens render. Written by subscription callbacks, which run on
/// the UI thread when it drains the main loop.
#[derive(Debug, Default)]
pub struct ViewState {
    pub count: i64,
    pub entities: EntityListState,
    pub status: Option<StatusLine>,
}

pub struct App {
    active: ScreenId,
    lifecycles: [Lifecycle; 3],
    counter: CounterViewModel,
    entities: EntityListViewModel,
    resettable: ResettableViewModel,
    view: Arc<Mutex<ViewState>>,
    config: ConfigStore,
    should_quit: bool,
}

impl App {
    pub fn new(config: ConfigStore, main_loop: &MainLoop, runtime: Handle) -> Result<Self, MviError> {
        let settings = config.get();
        let view = Arc::new(Mutex::new(ViewState::default()));
        let lifecycles = [Lifecycle::new(), Lifecycle::new(), Lifecycle::new()];

        let counter = CounterViewModel::new(store_options(&settings, "counter"), main_loop.dispatcher());
        let repository = EntityRepository::new(LocalEntitySource::new(
            settings.sample.entity_count,
            Duration::from_millis(settings.sample.load_delay_ms),
        ));
        let entities = EntityListViewModel::new(
            repository,
            store_options(&settings, "entities"),
            main_loop.dispatcher(),
            runtime.clone(),
        )?;
        let timer = Timer::new(runtime, Arc::new(main_loop.dispatcher()));
        let resettable = ResettableViewModel::new(
            store_options(&settings, "resettable"),
            main_loop.dispatcher(),
            timer,
            &settings.sample,
        );

        {
            let view = Arc::clone(&view);
            counter.observe_count(&lifecycles[ScreenId::Counter.index()], move |count| {
                view.lock().count = count;
            })?;
        }
        {
            let view = Arc::clone(&view);
            entities.subscribe(&lifecycles[ScreenId::Entities.index()], move |state| {
                view.lock().entities = state;
            })?;
        }
        {
            let view = Arc::clone(&view);
            entities.subscribe_messages(&lifecycles[ScreenId::Entities.index()], move |message| {
                let is_error = matches!(message, EntityMessage::LoadFailed(_));
                view.lock().status = Some(StatusLine::new(message.to_string(), is_error));
            })?;
        }
        resettable.bind(&lifecycles[ScreenId::Resettable.index()])?;

        let mut app = Self {
            active: ScreenId::Counter,
            lifecycles,
            counter,
            entities,
            resettable,
            view,
            config,
            should_quit: false,
        };
        for lifecycle in &app.lifecycles {
            lifecycle.move_to(LifecycleState::Created);
        }
        app.show(ScreenId::Counter);
        app.entities.load()?;
        Ok(app)
    }

    pub fn active(&self) -> ScreenId {
        self.active
    }

    pub fn view(&self) -> parking_lot::MutexGuard<'_, ViewState> {
        self.view.lock()
    }

    pub fn controls(&self) -> ControlValues {
        self.resettable.shown()
    }

    pub fn confirmed_controls(&self) -> ResettableState {
        self.resettable.confirmed()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn on_tick(&mut self) {
        let mut view = self.view.lock();
        if view
            .status
            .as_ref()
            .is_some_and(|status| status.shown_at.elapsed() >= STATUS_TTL)
        {
            view.status = None;
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('r') if ctrl => self.reload_config(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.show(self.active.next()),
            KeyCode::Char('1') => self.show(ScreenId::Counter),
            KeyCode::Char('2') => self.show(ScreenId::Entities),
            KeyCode::Char('3') => self.show(ScreenId::Resettable),
            _ => match self.active {
                ScreenId::Counter => self.on_counter_key(key),
                ScreenId::Entities => self.on_entities_key(key),
                ScreenId::Resettable => self.on_resettable_key(key),
            },
        }
    }

    /// Destroy every screen lifecycle. Subscriptions bound to them end here.
    pub fn shutdown(&mut self) {
        for lifecycle in &self.lifecycles {
            lifecycle.move_to(LifecycleState::Destroyed);
        }
        self.counter.view_model().clear();
        self.entities.view_model().clear();
        self.resettable.view_model().clear();
    }

    fn show(&mut self, screen: ScreenId) {
        let previous = self.active;
        if previous != screen {
            self.lifecycles[previous.index()].move_to(LifecycleState::Created);
        }
        self.active = screen;
        self.lifecycles[screen.index()].move_to(LifecycleState::Resumed);
        tracing::debug!(screen = screen.title(), "screen shown");
    }

    fn on_counter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('+') | KeyCode::Up => self.counter.increment(),
            KeyCode::Char('-') | KeyCode::Down => self.counter.decrement(),
            KeyCode::Char('0') => self.counter.reset(),
            _ => {}
        }
    }

    fn on_entities_key(&mut self, key: KeyEvent) {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let intent = match key.code {
            KeyCode::Up if shift => EntityListIntent::MoveUp,
            KeyCode::Down if shift => EntityListIntent::MoveDown,
            KeyCode::Char('K') => EntityListIntent::MoveUp,
            KeyCode::Char('J') => EntityListIntent::MoveDown,
            KeyCode::Up | KeyCode::Char('k') => EntityListIntent::CursorUp,
            KeyCode::Down | KeyCode::Char('j') => EntityListIntent::CursorDown,
            KeyCode::Char(' ') => EntityListIntent::ToggleSelected,
            KeyCode::Char('d') | KeyCode::Delete => EntityListIntent::Remove,
            KeyCode::Char('c') => EntityListIntent::ClearSelection,
            KeyCode::Char('r') => {
                if let Err(err) = self.entities.load() {
                    self.set_status(format!("Cannot load: {err}"), true);
                }
                return;
            }
            _ => return,
        };
        self.entities.send(intent);
    }

    fn on_resettable_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(' ') | KeyCode::Char('t') => self.resettable.toggle_enabled(),
            KeyCode::Left | KeyCode::Char('h') => self.resettable.adjust_level(-LEVEL_STEP),
            KeyCode::Right | KeyCode::Char('l') => self.resettable.adjust_level(LEVEL_STEP),
            _ => {}
        }
    }

    fn reload_config(&mut self) {
        match self.config.reload() {
            Ok(()) => {
                tracing::info!(path = %self.config.path().display(), "config reloaded");
                self.set_status("Config reloaded", false);
            }
            Err(err) => {
                tracing::warn!(error = %err, "config reload failed");
                self.set_status(err.to_string(), true);
            }
        }
    }

    fn set_status(&self, text: impl Into<String>, is_error: bool) {
        self.view.lock().status = Some(StatusLine::new(text, is_error));
    }
}

fn store_options(config: &Config, screen: &str) -> StoreOptions {
    let mut options = StoreOptions::from(&config.store);
    options.worker_name = format!("{}-{}", options.worker_name, screen);
    options
}
