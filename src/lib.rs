//! Statecraft: a serialized Model-View-Intent state store.
//!
//! Every state transition is a pure reducer submitted to a queue and applied
//! by a single worker thread, so reads and writes from any number of threads
//! observe a total order. Subscribers receive immutable snapshots, optionally
//! projected and gated by a component [`Lifecycle`].
//!
//! ```text
//! Intent ──→ set_state(reducer) ──→ Worker ──→ State stream ──→ View
//!    ↑                                                          │
//!    └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use statecraft::{Lifecycle, LifecycleState, MviState, ViewModel};
//!
//! #[derive(Debug, Clone, PartialEq, Default)]
//! struct CounterState { count: i32 }
//! impl MviState for CounterState {}
//!
//! let vm = ViewModel::<CounterState>::new(CounterState::default());
//! let lifecycle = Lifecycle::new();
//! lifecycle.move_to(LifecycleState::Resumed);
//!
//! let _sub = vm.select_subscribe(Some(&lifecycle), |s| s.count, |count| {
//!     println!("count = {count}");
//! })?;
//!
//! vm.set_state(|s| CounterState { count: s.count + 1 });
//! vm.with_state(|s| assert_eq!(s.count, 1));
//! ```

pub mod async_state;
pub mod config;
pub mod dispatch;
pub mod disposable;
pub mod error;
pub mod execute;
pub mod lifecycle;
pub mod logging;
pub mod messages;
pub mod mvi;
pub mod sample;
pub mod store;
pub mod util;
pub mod view_model;

pub use async_state::{Async, AsyncError, Metadata};
pub use dispatch::{Dispatcher, ImmediateDispatcher, MainDispatcher, MainLoop};
pub use disposable::{CompositeDisposable, Disposable, Subscription};
pub use error::{MviError, StoreError};
pub use execute::ExecutionHandle;
pub use lifecycle::{
    DeliveryPolicy, Lifecycle, LifecycleAwareObserver, LifecycleObserver, LifecycleState,
    ObserverKey, WeakLifecycle,
};
pub use messages::MessageQueue;
pub use mvi::{Intent, MviState, Reducer};
pub use store::{StateStore, StoreOptions};
pub use view_model::{with_state, with_state2, ViewModel, ViewModelBuilder};
