//! Routing of component interactions through the dispatch table.

use tracing::{debug, error};

use relaybot_components::{ComponentContext, ComponentTable, DispatchError};

/// Options for answering interactions the table could not handle.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Answer unknown custom ids with `stale_message` instead of ignoring them.
    pub claim_unknown: bool,
    pub stale_message: String,
    pub busy_message: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            claim_unknown: true,
            stale_message: "This is no longer active.".to_string(),
            busy_message: "This is already being processed.".to_string(),
        }
    }
}

impl RouterOptions {
    /// The ephemeral reply owed to the user for `outcome`, if any.
    ///
    /// Handled and failed interactions are answered by their handler;
    /// ignored ones are left to other listeners.
    pub fn reply_for(&self, outcome: RouteOutcome) -> Option<&str> {
        match outcome {
            RouteOutcome::Stale => Some(&self.stale_message),
            RouteOutcome::Busy => Some(&self.busy_message),
            RouteOutcome::Handled | RouteOutcome::Ignored | RouteOutcome::Failed => None,
        }
    }
}

/// What happened to a routed component interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A handler ran to completion.
    Handled,
    /// The id is not registered and unknown ids are left alone.
    Ignored,
    /// The id is unknown or expired; the user should be told.
    Stale,
    /// Another invocation of this id is still running.
    Busy,
    /// The handler failed; it owns any user-facing reply.
    Failed,
}

/// Resolve `ctx` against `table` and classify the result.
pub async fn route_component<C: ComponentContext>(
    table: &ComponentTable<C>,
    ctx: C,
    claim_unknown: bool,
) -> RouteOutcome {
    let custom_id = ctx.custom_id().to_owned();
    if !claim_unknown && !table.id_exists(&custom_id) {
        debug!(custom_id, "Ignoring component with unregistered id");
        return RouteOutcome::Ignored;
    }

    match table.resolve_and_invoke(ctx).await {
        Ok(true) => RouteOutcome::Handled,
        Ok(false) => {
            debug!(custom_id, "Component no longer active");
            RouteOutcome::Stale
        }
        Err(DispatchError::InFlight(_)) => RouteOutcome::Busy,
        Err(e) => {
            error!(custom_id, "Component handler failed: {e}");
            RouteOutcome::Failed
        }
    }
}
