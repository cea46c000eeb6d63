//! relaybot-components: custom-id dispatch for interactive components.
//!
//! Feature modules register a handler under the custom id they embed in a
//! button, select menu or modal. Component adapters hand incoming
//! interactions to [`ComponentTable::resolve_and_invoke`], which runs the
//! handler or reports that the id is no longer active.

pub mod error;
pub mod table;

pub use error::DispatchError;
pub use table::{
    ComponentContext, ComponentHandler, ComponentTable, DispatchPolicy, Registration, handler,
};
