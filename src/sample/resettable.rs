//! Controls whose value belongs to a remote host.
//!
//! Edits are shown at once through a [`ValueLatch`] and sent to the host.
//! The host answers after a delay and rejects some values; a rejected edit
//! snaps back to the confirmed value once the latch restores.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::SampleConfig;
use crate::dispatch::Dispatcher;
use crate::disposable::{Disposable, Subscription};
use crate::error::MviError;
use crate::lifecycle::Lifecycle;
use crate::mvi::MviState;
use crate::store::{StateStore, StoreOptions};
use crate::util::{Timer, TimerTask, ValueLatch};
use crate::view_model::ViewModel;

/// Highest level the host accepts.
pub const MAX_ACCEPTED_LEVEL: u8 = 80;

pub const LEVEL_STEP: i16 = 10;

/// Values confirmed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResettableState {
    pub enabled: bool,
    pub level: u8,
}

impl Default for ResettableState {
    fn default() -> Self {
        Self {
            enabled: false,
            level: 50,
        }
    }
}

impl MviState for ResettableState {}

/// Values currently shown by the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlValues {
    pub enabled: bool,
    pub level: u8,
}

impl From<ResettableState> for ControlValues {
    fn from(state: ResettableState) -> Self {
        Self {
            enabled: state.enabled,
            level: state.level,
        }
    }
}

/// Stands in for the owner of the settings. Each request is answered after
/// `latency`; a newer request for the same control replaces a pending one.
pub struct SimulatedHost {
    store: StateStore<ResettableState>,
    timer: Timer,
    latency: Duration,
    pending_enabled: Mutex<Option<TimerTask>>,
    pending_level: Mutex<Option<TimerTask>>,
}

impl SimulatedHost {
    pub fn new(store: StateStore<ResettableState>, timer: Timer, latency: Duration) -> Self {
        Self {
            store,
            timer,
            latency,
            pending_enabled: Mutex::new(None),
            pending_level: Mutex::new(None),
        }
    }

    pub fn request_enabled(&self, enabled: bool) {
        let store = self.store.clone();
        let task = self.timer.after(self.latency, move || {
            tracing::debug!(enabled, "host confirmed enabled");
            store.set(move |state| ResettableState { enabled, ..*state });
        });
        *self.pending_enabled.lock() = Some(task);
    }

    pub fn request_level(&self, level: u8) {
        let store = self.store.clone();
        let task = self.timer.after(self.latency, move || {
            if level > MAX_ACCEPTED_LEVEL {
                tracing::debug!(level, "host rejected level");
                return;
            }
            tracing::debug!(level, "host confirmed level");
            store.set(move |state| ResettableState { level, ..*state });
        });
        *self.pending_level.lock() = Some(task);
    }
}

pub struct ResettableViewModel {
    vm: ViewModel<ResettableState>,
    enabled: Arc<ValueLatch<bool>>,
    level: Arc<ValueLatch<u8>>,
    shown: Arc<Mutex<ControlValues>>,
}

impl ResettableViewModel {
    pub fn new<D: Dispatcher + 'static>(
        options: StoreOptions,
        dispatcher: D,
        timer: Timer,
        config: &SampleConfig,
    ) -> Self {
        let vm = ViewModel::builder(ResettableState::default())
            .options(options)
            .dispatcher(dispatcher)
            .build();
        vm.log_state_changes();

        let initial = ResettableState::default();
        let shown = Arc::new(Mutex::new(ControlValues::from(initial)));
        let host = Arc::new(SimulatedHost::new(
            vm.store().clone(),
            timer.clone(),
            Duration::from_millis(config.load_delay_ms),
        ));
        let send_delay = Duration::from_millis(config.latch_send_delay_ms);
        let restore_delay = Duration::from_millis(config.latch_restore_delay_ms);

        let enabled = {
            let host = Arc::clone(&host);
            let shown = Arc::clone(&shown);
            Arc::new(ValueLatch::with_delays(
                timer.clone(),
                initial.enabled,
                send_delay,
                restore_delay,
                move |value| host.request_enabled(value),
                move |value| shown.lock().enabled = value,
            ))
        };
        let level = {
            let shown = Arc::clone(&shown);
            Arc::new(ValueLatch::with_delays(
                timer,
                initial.level,
                send_delay,
                restore_delay,
                move |value| host.request_level(value),
                move |value| shown.lock().level = value,
            ))
        };

        Self {
            vm,
            enabled,
            level,
            shown,
        }
    }

    /// Feed confirmed values into the latches while `owner` is active.
    pub fn bind(&self, owner: &Lifecycle) -> Result<Subscription, MviError> {
        let enabled = Arc::clone(&self.enabled);
        let level = Arc::clone(&self.level);
        self.vm.select_subscribe2(
            Some(owner),
            |state: &ResettableState| state.enabled,
            |state: &ResettableState| state.level,
            move |confirmed_enabled: bool, confirmed_level: u8| {
                enabled.set_state_value(confirmed_enabled);
                level.set_state_value(confirmed_level);
            },
        )
    }

    pub fn toggle_enabled(&self) {
        self.enabled.set_ui_value(!self.enabled.ui_value());
    }

    pub fn adjust_level(&self, delta: i16) {
        let next = (i16::from(self.level.ui_value()) + delta).clamp(0, 100) as u8;
        if next != self.level.ui_value() {
            self.level.set_ui_value(next);
        }
    }

    pub fn shown(&self) -> ControlValues {
        *self.shown.lock()
    }

    pub fn confirmed(&self) -> ResettableState {
        self.vm.state()
    }

    pub fn view_model(&self) -> &ViewModel<ResettableState> {
        &self.vm
    }
}

impl Drop for ResettableViewModel {
    fn drop(&mut self) {
        self.enabled.dispose();
        self.level.dispose();
    }
}
