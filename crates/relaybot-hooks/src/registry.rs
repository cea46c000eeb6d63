//! Hook registry: subscription management and event dispatch.

use std::future::Future;
use std::ops::AddAssign;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use relaybot_types::{EventKind, GatewayEvent};

use crate::events::{EventChannels, HookEvent};

/// Async hook handler function type.
pub type HookCallback<A> =
    Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap an async closure as a [`HookCallback`].
pub fn hook<A, F, Fut>(f: F) -> HookCallback<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |args| f(args).boxed())
}

/// Handle to one registered callback, usable with `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: Option<EventKind>,
    id: u64,
}

impl Subscription {
    /// Event kind, or `None` for a wildcard subscription.
    pub fn kind(&self) -> Option<EventKind> {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Outcome of one `emit` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Subscribers that were run.
    pub invoked: usize,
    /// Subscribers that returned an error or panicked.
    pub failed: usize,
}

impl EmitReport {
    pub fn succeeded(&self) -> usize {
        self.invoked - self.failed
    }
}

impl AddAssign for EmitReport {
    fn add_assign(&mut self, rhs: Self) {
        self.invoked += rhs.invoked;
        self.failed += rhs.failed;
    }
}

struct Entry<A> {
    id: u64,
    callback: HookCallback<A>,
    once: bool,
}

/// Publish/subscribe channel for a single event kind.
pub struct HookChannel<A> {
    kind: Option<EventKind>,
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<A>>>,
}

impl<A: Clone + Send + Sync + 'static> HookChannel<A> {
    /// Create an empty channel. `None` is the wildcard channel.
    pub fn new(kind: Option<EventKind>) -> Self {
        Self {
            kind,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.map_or("*", |kind| kind.as_str())
    }

    /// Register a callback for every future emission.
    pub fn on(&self, callback: HookCallback<A>) -> Subscription {
        self.push(callback, false)
    }

    /// Register a callback that is removed once it has been invoked.
    pub fn once(&self, callback: HookCallback<A>) -> Subscription {
        self.push(callback, true)
    }

    fn push(&self, callback: HookCallback<A>, once: bool) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries().push(Entry { id, callback, once });
        debug!(event = self.name(), subscriber = id, once, "Hook subscribed");
        Subscription {
            kind: self.kind,
            id,
        }
    }

    /// Remove the registration behind `subscription`. Returns false if it
    /// was already gone or belongs to another channel.
    pub fn off(&self, subscription: &Subscription) -> bool {
        subscription.kind == self.kind && self.remove(subscription.id)
    }

    /// Remove the first registration whose callback is `callback`.
    pub fn off_callback(&self, callback: &HookCallback<A>) -> bool {
        let mut entries = self.entries();
        match entries
            .iter()
            .position(|entry| Arc::ptr_eq(&entry.callback, callback))
        {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries();
        match entries.iter().position(|entry| entry.id == id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Invoke every current subscriber in registration order.
    ///
    /// Subscribers run one after another; a failing or panicking subscriber
    /// is logged and does not stop the ones after it. Returns once all of
    /// them have settled.
    pub async fn emit(&self, args: A) -> EmitReport {
        // Snapshot so subscribers may call on/off while we iterate. `once`
        // entries leave the live list here, before they run.
        let snapshot: Vec<(u64, HookCallback<A>)> = {
            let mut entries = self.entries();
            let snapshot = entries
                .iter()
                .map(|entry| (entry.id, entry.callback.clone()))
                .collect();
            entries.retain(|entry| !entry.once);
            snapshot
        };

        let mut report = EmitReport::default();
        if snapshot.is_empty() {
            debug!(event = self.name(), "No subscribers");
            return report;
        }

        for (id, callback) in snapshot {
            report.invoked += 1;
            let outcome = AssertUnwindSafe(async { callback(args.clone()).await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        event = self.name(),
                        subscriber = id,
                        "Hook subscriber failed: {e:#}"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    error!(event = self.name(), subscriber = id, "Hook subscriber panicked");
                }
            }
        }

        report
    }

    /// Remove all subscribers. The channel stays usable.
    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Entry<A>>> {
        // Callbacks never run under this lock, so a poisoned list is intact.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Kind-independent channel operations.
pub(crate) trait ErasedChannel: Send + Sync {
    fn remove(&self, id: u64) -> bool;
    fn clear(&self);
    fn len(&self) -> usize;
}

impl<A: Clone + Send + Sync + 'static> ErasedChannel for HookChannel<A> {
    fn remove(&self, id: u64) -> bool {
        HookChannel::remove(self, id)
    }

    fn clear(&self) {
        HookChannel::clear(self)
    }

    fn len(&self) -> usize {
        HookChannel::len(self)
    }
}

/// Manages hook subscriptions and dispatches events.
///
/// Construct one at startup and share it as `Arc<HookRegistry>` with the
/// gateway adapters and feature modules; call [`HookRegistry::shutdown`]
/// when the process stops.
pub struct HookRegistry {
    channels: EventChannels,
    /// Subscribers to every event kind.
    wildcard: HookChannel<GatewayEvent>,
}

impl HookRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            channels: EventChannels::default(),
            wildcard: HookChannel::new(None),
        }
    }

    /// The channel for event `E`, created on first access.
    pub fn channel<E: HookEvent>(&self) -> &HookChannel<E::Args> {
        E::channel(&self.channels)
    }

    pub fn on<E: HookEvent>(&self, callback: HookCallback<E::Args>) -> Subscription {
        self.channel::<E>().on(callback)
    }

    pub fn once<E: HookEvent>(&self, callback: HookCallback<E::Args>) -> Subscription {
        self.channel::<E>().once(callback)
    }

    /// Register a handler for every event kind.
    pub fn on_any(&self, callback: HookCallback<GatewayEvent>) -> Subscription {
        self.wildcard.on(callback)
    }

    pub fn once_any(&self, callback: HookCallback<GatewayEvent>) -> Subscription {
        self.wildcard.once(callback)
    }

    /// Remove a subscription made through this registry. No-op if it is gone.
    pub fn off(&self, subscription: &Subscription) -> bool {
        match subscription.kind {
            Some(kind) => self
                .channels
                .existing(kind)
                .is_some_and(|channel| channel.remove(subscription.id)),
            None => self.wildcard.off(subscription),
        }
    }

    /// Remove the first registration of `callback` on event `E`.
    pub fn off_callback<E: HookEvent>(&self, callback: &HookCallback<E::Args>) -> bool {
        self.channel::<E>().off_callback(callback)
    }

    /// Dispatch an event to its subscribers, then to wildcard subscribers.
    pub async fn emit<E: HookEvent>(&self, args: E::Args) -> EmitReport {
        if self.wildcard.is_empty() {
            return self.channel::<E>().emit(args).await;
        }

        let mut report = self.channel::<E>().emit(args.clone()).await;
        report += self.wildcard.emit(E::wrap(args)).await;
        report
    }

    /// Remove all subscribers of event `E`.
    pub fn clear<E: HookEvent>(&self) {
        self.channel::<E>().clear();
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.channels
            .existing(kind)
            .map_or(0, |channel| channel.len())
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcard.len()
    }

    /// Clear every channel, wildcard included.
    pub fn shutdown(&self) {
        let mut removed = self.wildcard.len();
        self.wildcard.clear();
        for kind in EventKind::ALL {
            if let Some(channel) = self.channels.existing(kind) {
                removed += channel.len();
                channel.clear();
            }
        }
        info!(removed, "Hook registry shut down");
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
