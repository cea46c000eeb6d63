//! relaybot-hooks: Event-driven hook system.
//!
//! One publish/subscribe channel per gateway event kind. Gateway adapters
//! emit into it; feature modules subscribe with `on` / `once` and leave with
//! `off`.

pub mod events;
pub mod registry;

pub use events::HookEvent;
pub use registry::{EmitReport, HookCallback, HookChannel, HookRegistry, Subscription, hook};
