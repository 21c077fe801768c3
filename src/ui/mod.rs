//! Terminal front end for the sample view models.

mod app;
mod events;
mod footer;
mod header;
mod layout;
mod render;
mod runtime;
mod terminal_guard;
mod theme;

pub use runtime::run;
