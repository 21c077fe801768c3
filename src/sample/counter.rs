use crate::dispatch::Dispatcher;
use crate::disposable::Subscription;
use crate::error::MviError;
use crate::lifecycle::Lifecycle;
use crate::mvi::{Intent, MviState, Reducer};
use crate::store::StoreOptions;
use crate::view_model::ViewModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterState {
    pub count: i64,
}

impl MviState for CounterState {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterIntent {
    Increment,
    Decrement,
    Reset,
}

impl Intent for CounterIntent {}

pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Intent = CounterIntent;

    fn reduce(state: &Self::State, intent: &Self::Intent) -> Self::State {
        match intent {
            CounterIntent::Increment => CounterState {
                count: state.count.saturating_add(1),
            },
            CounterIntent::Decrement => CounterState {
                count: state.count.saturating_sub(1),
            },
            CounterIntent::Reset => CounterState::default(),
        }
    }
}

pub struct CounterViewModel {
    vm: ViewModel<CounterState>,
}

impl CounterViewModel {
    pub fn new<D: Dispatcher + 'static>(options: StoreOptions, dispatcher: D) -> Self {
        let vm = ViewModel::builder(CounterState::default())
            .options(options)
            .dispatcher(dispatcher)
            .build();
        vm.log_state_changes();
        Self { vm }
    }

    /// Increment, then log the count as seen after the increment.
    pub fn increment(&self) {
        self.vm.dispatch::<CounterReducer>(CounterIntent::Increment);
        self.vm.with_state(|state| {
            tracing::info!(count = state.count, "counter incremented");
        });
    }

    pub fn decrement(&self) {
        self.vm.dispatch::<CounterReducer>(CounterIntent::Decrement);
    }

    pub fn reset(&self) {
        self.vm.dispatch::<CounterReducer>(CounterIntent::Reset);
    }

    pub fn observe_count<F>(&self, owner: &Lifecycle, callback: F) -> Result<Subscription, MviError>
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.vm
            .select_subscribe(Some(owner), |state: &CounterState| state.count, callback)
    }

    pub fn view_model(&self) -> &ViewModel<CounterState> {
        &self.vm
    }
}
