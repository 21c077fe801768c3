//! View models behind the terminal demo.
//!
//! They live in the library so they can be driven from tests without a
//! terminal; the binary only renders them.

pub mod counter;
pub mod entities;
pub mod resettable;

pub use counter::{CounterIntent, CounterReducer, CounterState, CounterViewModel};
pub use entities::{
    EntityItem, EntityListIntent, EntityListReducer, EntityListState, EntityListViewModel,
    EntityMessage, EntityRepository, EntitySource, LocalEntitySource,
};
pub use resettable::{ControlValues, ResettableState, ResettableViewModel, SimulatedHost};
