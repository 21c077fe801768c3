//! A list screen backed by a slow data source.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_core::future::BoxFuture;
use tokio::runtime::Handle;

use crate::async_state::{Async, AsyncError};
use crate::dispatch::Dispatcher;
use crate::disposable::Subscription;
use crate::error::MviError;
use crate::execute::ExecutionHandle;
use crate::lifecycle::Lifecycle;
use crate::mvi::{Intent, MviState, Reducer};
use crate::store::StoreOptions;
use crate::util::collections::{move_item, remove_item, update_item, update_items};
use crate::view_model::ViewModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityItem {
    pub id: u32,
    pub title: String,
    pub selected: bool,
}

/// Produces the entity list.
pub trait EntitySource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'static, anyhow::Result<Vec<EntityItem>>>;
}

/// In-memory source that answers after a fixed latency.
#[derive(Debug, Clone)]
pub struct LocalEntitySource {
    count: usize,
    latency: Duration,
}

impl LocalEntitySource {
    pub fn new(count: usize, latency: Duration) -> Self {
        Self { count, latency }
    }
}

impl EntitySource for LocalEntitySource {
    fn fetch(&self) -> BoxFuture<'static, anyhow::Result<Vec<EntityItem>>> {
        let count = self.count;
        let latency = self.latency;
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            let last = u32::try_from(count)
                .map_err(|_| anyhow::anyhow!("entity count {count} does not fit the id range"))?;
            anyhow::Ok((1..=last)
                .map(|id| EntityItem {
                    id,
                    title: format!("Entity #{id}"),
                    selected: false,
                })
                .collect::<Vec<_>>())
        })
    }
}

#[derive(Clone)]
pub struct EntityRepository {
    source: Arc<dyn EntitySource>,
}

impl EntityRepository {
    pub fn new<S: EntitySource + 'static>(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn load(&self) -> BoxFuture<'static, anyhow::Result<Vec<EntityItem>>> {
        self.source.fetch()
    }
}

impl fmt::Debug for EntityRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRepository").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityListState {
    /// Progress of the last load.
    pub entities: Async<Vec<EntityItem>>,
    /// The list as edited by the user.
    pub items: Vec<EntityItem>,
    pub cursor: usize,
}

impl MviState for EntityListState {}

impl EntityListState {
    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|item| item.selected).count()
    }

    /// Fold one load transition. `Loading` keeps the previous list visible.
    pub fn with_load(&self, entities: Async<Vec<EntityItem>>) -> Self {
        match entities {
            Async::Success { .. } => {
                let items = entities.value().cloned().unwrap_or_default();
                Self {
                    cursor: self.cursor.min(items.len().saturating_sub(1)),
                    items,
                    entities,
                }
            }
            Async::Loading { value: None } => Self {
                entities: Async::Loading {
                    value: self.entities.value().cloned(),
                },
                ..self.clone()
            },
            other => Self {
                entities: other,
                ..self.clone()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityListIntent {
    CursorUp,
    CursorDown,
    ToggleSelected,
    MoveUp,
    MoveDown,
    Remove,
    ClearSelection,
}

impl Intent for EntityListIntent {}

pub struct EntityListReducer;

impl Reducer for EntityListReducer {
    type State = EntityListState;
    type Intent = EntityListIntent;

    fn reduce(state: &Self::State, intent: &Self::Intent) -> Self::State {
        let last = state.items.len().saturating_sub(1);
        let cursor = state.cursor;
        match intent {
            EntityListIntent::CursorUp => EntityListState {
                cursor: cursor.saturating_sub(1),
                ..state.clone()
            },
            EntityListIntent::CursorDown => EntityListState {
                cursor: (cursor + 1).min(last),
                ..state.clone()
            },
            EntityListIntent::ToggleSelected => EntityListState {
                items: update_item(&state.items, cursor, |item| EntityItem {
                    selected: !item.selected,
                    ..item.clone()
                }),
                ..state.clone()
            },
            EntityListIntent::MoveUp if cursor > 0 => EntityListState {
                items: move_item(&state.items, cursor, cursor - 1),
                cursor: cursor - 1,
                ..state.clone()
            },
            EntityListIntent::MoveDown if cursor < last => EntityListState {
                items: move_item(&state.items, cursor, cursor + 1),
                cursor: cursor + 1,
                ..state.clone()
            },
            EntityListIntent::MoveUp | EntityListIntent::MoveDown => state.clone(),
            EntityListIntent::Remove => {
                let items = remove_item(&state.items, cursor);
                EntityListState {
                    cursor: cursor.min(items.len().saturating_sub(1)),
                    items,
                    ..state.clone()
                }
            }
            EntityListIntent::ClearSelection => EntityListState {
                items: update_items(
                    &state.items,
                    |item| item.selected,
                    |item| EntityItem {
                        selected: false,
                        ..item.clone()
                    },
                ),
                ..state.clone()
            },
        }
    }
}

/// Messages the entity screen shows once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityMessage {
    Loaded { count: usize },
    LoadFailed(String),
}

impl fmt::Display for EntityMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityMessage::Loaded { .. } => write!(f, "Loading successful"),
            EntityMessage::LoadFailed(reason) => write!(f, "Loading failed: {reason}"),
        }
    }
}

pub struct EntityListViewModel {
    vm: Arc<ViewModel<EntityListState, EntityMessage>>,
    repository: EntityRepository,
}

impl EntityListViewModel {
    pub fn new<D: Dispatcher + 'static>(
        repository: EntityRepository,
        options: StoreOptions,
        dispatcher: D,
        runtime: Handle,
    ) -> Result<Self, MviError> {
        let vm = Arc::new(
            ViewModel::builder(EntityListState::default())
                .options(options)
                .dispatcher(dispatcher)
                .runtime(runtime)
                .build(),
        );
        vm.log_state_changes();

        // Report load outcomes as messages. The weak handle keeps the
        // subscription from owning its own view model.
        let on_fail = Arc::downgrade(&vm);
        let on_success = Arc::downgrade(&vm);
        vm.async_subscribe(
            None,
            |state: &EntityListState| state.entities.clone(),
            move |error: AsyncError| {
                if let Some(vm) = on_fail.upgrade() {
                    vm.send_message(EntityMessage::LoadFailed(error.to_string()));
                }
            },
            move |items: Vec<EntityItem>| {
                if let Some(vm) = on_success.upgrade() {
                    vm.send_message(EntityMessage::Loaded { count: items.len() });
                }
            },
        )?;

        Ok(Self { vm, repository })
    }

    /// Start loading unless a load is already running.
    pub fn load(&self) -> Result<Option<ExecutionHandle>, MviError> {
        if self.vm.state().entities.is_loading() {
            return Ok(None);
        }
        tracing::debug!("loading entities");
        self.vm
            .execute(self.repository.load(), |state: &EntityListState, entities| {
                state.with_load(entities)
            })
            .map(Some)
    }

    pub fn send(&self, intent: EntityListIntent) {
        self.vm.dispatch::<EntityListReducer>(intent);
    }

    pub fn subscribe<F>(&self, owner: &Lifecycle, callback: F) -> Result<Subscription, MviError>
    where
        F: Fn(EntityListState) + Send + Sync + 'static,
    {
        self.vm.subscribe(Some(owner), callback)
    }

    pub fn subscribe_messages<F>(&self, owner: &Lifecycle, callback: F) -> Result<Subscription, MviError>
    where
        F: Fn(EntityMessage) + Send + Sync + 'static,
    {
        self.vm.subscribe_messages(Some(owner), callback)
    }

    pub fn view_model(&self) -> &ViewModel<EntityListState, EntityMessage> {
        &self.vm
    }
}

impl Drop for EntityListViewModel {
    fn drop(&mut self) {
        self.vm.clear();
    }
}
