//! Custom-id dispatch table.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use relaybot_types::{ComponentKind, ConcurrencyPolicy, DuplicatePolicy};

use crate::error::DispatchError;

/// An incoming component interaction, as seen by the dispatch table.
pub trait ComponentContext: Send + 'static {
    fn custom_id(&self) -> &str;
    fn kind(&self) -> ComponentKind;
}

/// Async component handler function type.
pub type ComponentHandler<C> =
    Arc<dyn Fn(C) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap an async closure as a [`ComponentHandler`].
pub fn handler<C, F, Fut>(f: F) -> ComponentHandler<C>
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// Table-wide dispatch policy.
#[derive(Debug, Clone, Default)]
pub struct DispatchPolicy {
    pub duplicates: DuplicatePolicy,
    pub concurrency: ConcurrencyPolicy,
    /// Expiry for registrations that don't choose their own.
    pub default_ttl: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
enum Expiry {
    /// Use the table's default TTL.
    Default,
    Never,
    After(Duration),
    At(Instant),
}

/// A handler plus the metadata it is registered with.
pub struct Registration<C> {
    handler: ComponentHandler<C>,
    kind: Option<ComponentKind>,
    expiry: Expiry,
    single_use: bool,
}

impl<C: ComponentContext> Registration<C> {
    pub fn new(handler: ComponentHandler<C>) -> Self {
        Self {
            handler,
            kind: None,
            expiry: Expiry::Default,
            single_use: false,
        }
    }

    /// Only resolve for interactions of this component kind.
    pub fn kind(mut self, kind: ComponentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Expire `ttl` after registration.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.expiry = Expiry::After(ttl);
        self
    }

    pub fn expires_at(mut self, at: Instant) -> Self {
        self.expiry = Expiry::At(at);
        self
    }

    /// Never expire, even if the table has a default TTL.
    pub fn persistent(mut self) -> Self {
        self.expiry = Expiry::Never;
        self
    }

    /// Remove the registration after its handler first succeeds.
    pub fn single_use(mut self) -> Self {
        self.single_use = true;
        self
    }
}

struct Entry<C> {
    handler: ComponentHandler<C>,
    kind: Option<ComponentKind>,
    expires_at: Option<Instant>,
    single_use: bool,
    /// A single-use invocation is running; cleared again if it fails.
    claimed: bool,
}

impl<C> Entry<C> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    fn accepts(&self, kind: ComponentKind) -> bool {
        self.kind.is_none_or(|expected| expected == kind)
    }
}

enum Lookup<C> {
    Missing,
    Expired,
    Claimed,
    KindMismatch(Option<ComponentKind>),
    Found {
        handler: ComponentHandler<C>,
        single_use: bool,
    },
}

/// Maps custom ids to registered component handlers.
pub struct ComponentTable<C> {
    policy: DispatchPolicy,
    entries: Mutex<HashMap<String, Entry<C>>>,
    /// Ids with a running handler, tracked under `SingleFlight` only.
    in_flight: Mutex<HashSet<String>>,
}

impl<C: ComponentContext> ComponentTable<C> {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Register a handler under `custom_id`.
    ///
    /// A live registration under the same id is kept and `DuplicateId`
    /// returned under [`DuplicatePolicy::Reject`], or replaced under
    /// [`DuplicatePolicy::Overwrite`]. Expired registrations never conflict.
    pub fn register(
        &self,
        custom_id: impl Into<String>,
        registration: Registration<C>,
    ) -> Result<(), DispatchError> {
        let custom_id = custom_id.into();
        let now = Instant::now();

        let mut entries = self.entries();
        let live = entries
            .get(&custom_id)
            .is_some_and(|existing| !existing.is_expired(now));
        if live {
            match self.policy.duplicates {
                DuplicatePolicy::Reject => {
                    warn!(custom_id, "Rejected duplicate component registration");
                    return Err(DispatchError::DuplicateId(custom_id));
                }
                DuplicatePolicy::Overwrite => {
                    debug!(custom_id, "Overwriting component registration");
                }
            }
        }

        debug!(
            custom_id,
            kind = ?registration.kind,
            single_use = registration.single_use,
            "Component registered"
        );
        entries.insert(custom_id, self.entry(registration, now));
        Ok(())
    }

    /// Register under a freshly generated `"{prefix}:{uuid}"` id and return it.
    pub fn register_unique(&self, prefix: &str, registration: Registration<C>) -> String {
        loop {
            let custom_id = format!("{prefix}:{}", uuid::Uuid::new_v4().simple());
            let mut entries = self.entries();
            if entries.contains_key(&custom_id) {
                continue;
            }
            entries.insert(custom_id.clone(), self.entry(registration, Instant::now()));
            debug!(custom_id, "Component registered");
            return custom_id;
        }
    }

    fn entry(&self, registration: Registration<C>, now: Instant) -> Entry<C> {
        let expires_at = match registration.expiry {
            // A deadline past what `Instant` can represent never arrives
            Expiry::Default => self.policy.default_ttl.and_then(|ttl| now.checked_add(ttl)),
            Expiry::Never => None,
            Expiry::After(ttl) => now.checked_add(ttl),
            Expiry::At(at) => Some(at),
        };
        Entry {
            handler: registration.handler,
            kind: registration.kind,
            expires_at,
            single_use: registration.single_use,
            claimed: false,
        }
    }

    /// Remove a registration. Returns whether a live one was removed.
    pub fn unregister(&self, custom_id: &str) -> bool {
        let now = Instant::now();
        self.entries()
            .remove(custom_id)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Whether `custom_id` currently resolves. Expired entries do not.
    pub fn id_exists(&self, custom_id: &str) -> bool {
        let now = Instant::now();
        self.entries()
            .get(custom_id)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Look up the handler for `ctx.custom_id()` and run it with `ctx`.
    ///
    /// Returns `Ok(false)` without running anything when the id is unknown,
    /// expired, or registered for another component kind; `Ok(true)` once
    /// the handler has run to completion. Handler errors and panics come
    /// back as [`DispatchError::Handler`] and
    /// [`DispatchError::HandlerPanicked`].
    ///
    /// A single-use entry is removed only after its handler succeeds. While
    /// its handler runs, further invocations get [`DispatchError::InFlight`].
    pub async fn resolve_and_invoke(&self, ctx: C) -> Result<bool, DispatchError> {
        let custom_id = ctx.custom_id().to_owned();
        let kind = ctx.kind();

        let (handler, _guard, claim) = {
            let now = Instant::now();
            let mut entries = self.entries();
            let lookup = match entries.get(&custom_id) {
                None => Lookup::Missing,
                Some(entry) if entry.is_expired(now) => Lookup::Expired,
                Some(entry) if entry.claimed => Lookup::Claimed,
                Some(entry) if !entry.accepts(kind) => Lookup::KindMismatch(entry.kind),
                Some(entry) => Lookup::Found {
                    handler: entry.handler.clone(),
                    single_use: entry.single_use,
                },
            };

            match lookup {
                Lookup::Missing => {
                    debug!(custom_id, "No component registered");
                    return Ok(false);
                }
                Lookup::Expired => {
                    entries.remove(&custom_id);
                    debug!(custom_id, "Component registration expired");
                    return Ok(false);
                }
                Lookup::Claimed => {
                    debug!(custom_id, "Single-use component already being handled");
                    return Err(DispatchError::InFlight(custom_id));
                }
                Lookup::KindMismatch(expected) => {
                    warn!(
                        custom_id,
                        ?expected,
                        actual = ?kind,
                        "Component kind does not match registration"
                    );
                    return Ok(false);
                }
                Lookup::Found {
                    handler,
                    single_use,
                } => {
                    let guard = match self.policy.concurrency {
                        ConcurrencyPolicy::Concurrent => None,
                        ConcurrencyPolicy::SingleFlight => {
                            Some(InFlightGuard::acquire(&self.in_flight, &custom_id)?)
                        }
                    };
                    let claim = single_use.then(|| {
                        if let Some(entry) = entries.get_mut(&custom_id) {
                            entry.claimed = true;
                        }
                        SingleUseClaim {
                            entries: &self.entries,
                            custom_id: custom_id.clone(),
                        }
                    });
                    (handler, guard, claim)
                }
            }
        };

        debug!(custom_id, ?kind, "Invoking component handler");
        let outcome = AssertUnwindSafe(async move { handler(ctx).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                if let Some(claim) = claim {
                    claim.consume();
                }
                Ok(true)
            }
            Ok(Err(source)) => Err(DispatchError::Handler { custom_id, source }),
            Err(_) => Err(DispatchError::HandlerPanicked { custom_id }),
        }
    }

    /// Drop every expired registration. Lookups never depend on this.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored registrations, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        info!(removed, "Component table cleared");
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry<C>>> {
        // Handlers never run under this lock, so a poisoned map is intact.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a single-use entry's claim. Dropping it without `consume` makes
/// the entry invocable again.
struct SingleUseClaim<'a, C> {
    entries: &'a Mutex<HashMap<String, Entry<C>>>,
    custom_id: String,
}

impl<C> SingleUseClaim<'_, C> {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<C>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove the claimed entry. An entry registered over it meanwhile is
    /// unclaimed and stays.
    fn consume(self) {
        let mut entries = self.lock();
        if entries.get(&self.custom_id).is_some_and(|entry| entry.claimed) {
            entries.remove(&self.custom_id);
            debug!(custom_id = self.custom_id, "Single-use component consumed");
        }
    }
}

impl<C> Drop for SingleUseClaim<'_, C> {
    fn drop(&mut self) {
        if let Some(entry) = self.lock().get_mut(&self.custom_id) {
            entry.claimed = false;
        }
    }
}

/// Marks a custom id as in flight until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    custom_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, custom_id: &str) -> Result<Self, DispatchError> {
        let mut ids = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(custom_id.to_owned()) {
            debug!(custom_id, "Component handler already in flight");
            return Err(DispatchError::InFlight(custom_id.to_owned()));
        }
        Ok(Self {
            set,
            custom_id: custom_id.to_owned(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.custom_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone)]
    struct TestCtx {
        custom_id: String,
        kind: ComponentKind,
        values: Vec<String>,
    }

    impl TestCtx {
        fn button(custom_id: &str) -> Self {
            Self {
                custom_id: custom_id.into(),
                kind: ComponentKind::Button,
                values: Vec::new(),
            }
        }

        fn select(custom_id: &str, values: &[&str]) -> Self {
            Self {
                custom_id: custom_id.into(),
                kind: ComponentKind::StringSelect,
                values: values.iter().map(|v| v.to_string()).collect(),
            }
        }
    }

    impl ComponentContext for TestCtx {
        fn custom_id(&self) -> &str {
            &self.custom_id
        }

        fn kind(&self) -> ComponentKind {
            self.kind
        }
    }

    fn table() -> ComponentTable<TestCtx> {
        ComponentTable::new(DispatchPolicy::default())
    }

    fn counting(counter: &Arc<AtomicU32>) -> Registration<TestCtx> {
        let c = counter.clone();
        Registration::new(handler(move |_ctx: TestCtx| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
    }

    #[tokio::test]
    async fn test_register_resolve_remove() {
        let table = table();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        table
            .register(
                "menu:42",
                Registration::new(handler(move |ctx: TestCtx| {
                    let s = s.clone();
                    async move {
                        s.lock().unwrap().push(ctx.values.clone());
                        Ok(())
                    }
                })),
            )
            .unwrap();

        assert!(table.id_exists("menu:42"));
        let invoked = table
            .resolve_and_invoke(TestCtx::select("menu:42", &["sword"]))
            .await
            .unwrap();
        assert!(invoked);
        assert_eq!(*seen.lock().unwrap(), vec![vec!["sword".to_string()]]);

        assert!(table.unregister("menu:42"));
        assert!(!table.id_exists("menu:42"));
        let invoked = table
            .resolve_and_invoke(TestCtx::select("menu:42", &["shield"]))
            .await
            .unwrap();
        assert!(!invoked);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_an_error() {
        let table = table();
        assert!(!table.id_exists("nope"));
        assert!(!table.resolve_and_invoke(TestCtx::button("nope")).await.unwrap());
        assert!(!table.unregister("nope"));
    }

    #[tokio::test]
    async fn test_duplicate_rejected_by_default() {
        let table = table();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        table.register("confirm", counting(&first)).unwrap();
        let err = table.register("confirm", counting(&second)).unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateId(ref id) if id == "confirm"));
        assert_eq!(err.custom_id(), "confirm");

        // The original handler keeps the id
        table.resolve_and_invoke(TestCtx::button("confirm")).await.unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_overwrite_policy() {
        let table = ComponentTable::new(DispatchPolicy {
            duplicates: DuplicatePolicy::Overwrite,
            ..Default::default()
        });
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        table.register("confirm", counting(&first)).unwrap();
        table.register("confirm", counting(&second)).unwrap();

        table.resolve_and_invoke(TestCtx::button("confirm")).await.unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_handler_error_is_structured() {
        let table = table();
        table
            .register(
                "broken",
                Registration::new(handler(|_ctx: TestCtx| async {
                    Err(anyhow::anyhow!("offer already accepted"))
                })),
            )
            .unwrap();

        let err = table
            .resolve_and_invoke(TestCtx::button("broken"))
            .await
            .unwrap_err();
        assert!(err.is_handler_failure());
        assert!(err.to_string().contains("offer already accepted"));
        // A failing handler stays registered
        assert!(table.id_exists("broken"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_caught() {
        let table = table();
        table
            .register(
                "explodes",
                Registration::new(handler(|ctx: TestCtx| async move {
                    if ctx.kind == ComponentKind::Button {
                        panic!("handler bug");
                    }
                    Ok(())
                })),
            )
            .unwrap();

        let err = table
            .resolve_and_invoke(TestCtx::button("explodes"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerPanicked { .. }));
        assert!(table.id_exists("explodes"));
    }

    #[tokio::test]
    async fn test_single_use_removed_after_first_invoke() {
        let table = table();
        let counter = Arc::new(AtomicU32::new(0));

        table.register("claim", counting(&counter).single_use()).unwrap();
        assert!(table.resolve_and_invoke(TestCtx::button("claim")).await.unwrap());
        assert!(!table.id_exists("claim"));
        assert!(!table.resolve_and_invoke(TestCtx::button("claim")).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_use_survives_failed_handler() {
        let table = table();
        let attempts = Arc::new(AtomicU32::new(0));

        let a = attempts.clone();
        table
            .register(
                "claim",
                Registration::new(handler(move |_ctx: TestCtx| {
                    let a = a.clone();
                    async move {
                        match a.fetch_add(1, Ordering::SeqCst) {
                            0 => anyhow::bail!("db down"),
                            1 => panic!("handler bug"),
                            _ => Ok(()),
                        }
                    }
                }))
                .single_use(),
            )
            .unwrap();

        let err = table
            .resolve_and_invoke(TestCtx::button("claim"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler { .. }));
        assert!(table.id_exists("claim"));

        let err = table
            .resolve_and_invoke(TestCtx::button("claim"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerPanicked { .. }));
        assert!(table.id_exists("claim"));

        // The first successful invocation uses the entry up
        assert!(table.resolve_and_invoke(TestCtx::button("claim")).await.unwrap());
        assert!(!table.id_exists("claim"));
        assert!(!table.resolve_and_invoke(TestCtx::button("claim")).await.unwrap());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_use_rejects_second_click_while_running() {
        let table = table();
        let counter = Arc::new(AtomicU32::new(0));
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);

        let c = counter.clone();
        table
            .register(
                "accept",
                Registration::new(handler(move |_ctx: TestCtx| {
                    let c = c.clone();
                    let mut release = release_rx.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        release.wait_for(|released| *released).await?;
                        Ok(())
                    }
                }))
                .single_use(),
            )
            .unwrap();

        let first = table.resolve_and_invoke(TestCtx::button("accept"));
        let second = async {
            tokio::task::yield_now().await;
            let result = table.resolve_and_invoke(TestCtx::button("accept")).await;
            release_tx.send(true).unwrap();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap());
        assert!(matches!(second, Err(DispatchError::InFlight(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!table.id_exists("accept"));
    }

    #[tokio::test]
    async fn test_single_use_overwritten_while_running_is_kept() {
        let table = Arc::new(ComponentTable::new(DispatchPolicy {
            duplicates: DuplicatePolicy::Overwrite,
            ..Default::default()
        }));
        let counter = Arc::new(AtomicU32::new(0));

        let t = table.clone();
        let c = counter.clone();
        table
            .register(
                "menu",
                Registration::new(handler(move |_ctx: TestCtx| {
                    let t = t.clone();
                    let c = c.clone();
                    async move {
                        t.register("menu", counting(&c))?;
                        Ok(())
                    }
                }))
                .single_use(),
            )
            .unwrap();

        assert!(table.resolve_and_invoke(TestCtx::button("menu")).await.unwrap());
        // The replacement registered by the handler survives its success
        assert!(table.id_exists("menu"));
        assert!(table.resolve_and_invoke(TestCtx::button("menu")).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_kind_filter() {
        let table = table();
        let counter = Arc::new(AtomicU32::new(0));

        table
            .register(
                "pick",
                counting(&counter).kind(ComponentKind::StringSelect),
            )
            .unwrap();

        assert!(!table.resolve_and_invoke(TestCtx::button("pick")).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(
            table
                .resolve_and_invoke(TestCtx::select("pick", &["a"]))
                .await
                .unwrap()
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_checked_at_lookup() {
        let table = table();
        let counter = Arc::new(AtomicU32::new(0));

        table
            .register("offer:1", counting(&counter).ttl(Duration::from_secs(60)))
            .unwrap();
        assert!(table.id_exists("offer:1"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!table.id_exists("offer:1"));
        // Still stored until the next lookup removes it
        assert_eq!(table.len(), 1);

        assert!(!table.resolve_and_invoke(TestCtx::button("offer:1")).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_and_persistent() {
        let table = ComponentTable::new(DispatchPolicy {
            default_ttl: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        let counter = Arc::new(AtomicU32::new(0));

        table.register("short", counting(&counter)).unwrap();
        table.register("pinned", counting(&counter).persistent()).unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!table.id_exists("short"));
        assert!(table.id_exists("pinned"));
        assert_eq!(table.purge_expired(), 1);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_ttl_never_expires() {
        let table = ComponentTable::new(DispatchPolicy {
            default_ttl: Some(Duration::from_secs(u64::MAX)),
            ..Default::default()
        });
        let counter = Arc::new(AtomicU32::new(0));

        table.register("default", counting(&counter)).unwrap();
        table
            .register("max", counting(&counter).ttl(Duration::MAX))
            .unwrap();

        tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;
        assert!(table.id_exists("default"));
        assert!(table.id_exists("max"));
        assert_eq!(table.purge_expired(), 0);
        assert!(table.resolve_and_invoke(TestCtx::button("max")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_does_not_block_registration() {
        let table = table();
        let counter = Arc::new(AtomicU32::new(0));

        table
            .register("menu", counting(&counter).ttl(Duration::from_secs(1)))
            .unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        table.register("menu", counting(&counter)).unwrap();
        assert!(table.id_exists("menu"));
        // Unregistering an expired entry reports nothing live was removed
        table
            .register("gone", counting(&counter).expires_at(Instant::now()))
            .unwrap();
        assert!(!table.unregister("gone"));
    }

    #[tokio::test]
    async fn test_register_unique() {
        let table = table();
        let counter = Arc::new(AtomicU32::new(0));

        let a = table.register_unique("ticket", counting(&counter));
        let b = table.register_unique("ticket", counting(&counter));
        assert_ne!(a, b);
        assert!(a.starts_with("ticket:"));
        assert!(table.id_exists(&a));
        assert!(table.resolve_and_invoke(TestCtx::button(&b)).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_invocations_allowed_by_default() {
        let table = Arc::new(table());
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        table
            .register(
                "slow",
                Registration::new(handler(move |_ctx: TestCtx| {
                    let c = c.clone();
                    async move {
                        tokio::task::yield_now().await;
                        c.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })),
            )
            .unwrap();

        let (a, b) = tokio::join!(
            table.resolve_and_invoke(TestCtx::button("slow")),
            table.resolve_and_invoke(TestCtx::button("slow")),
        );
        assert!(a.unwrap());
        assert!(b.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_flight_rejects_overlap() {
        let table = ComponentTable::new(DispatchPolicy {
            concurrency: ConcurrencyPolicy::SingleFlight,
            ..Default::default()
        });
        let counter = Arc::new(AtomicU32::new(0));
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);

        let c = counter.clone();
        table
            .register(
                "vote",
                Registration::new(handler(move |_ctx: TestCtx| {
                    let c = c.clone();
                    let mut release = release_rx.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        release.wait_for(|released| *released).await?;
                        Ok(())
                    }
                })),
            )
            .unwrap();

        let first = table.resolve_and_invoke(TestCtx::button("vote"));
        let second = async {
            tokio::task::yield_now().await;
            let result = table.resolve_and_invoke(TestCtx::button("vote")).await;
            release_tx.send(true).unwrap();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap());
        assert!(matches!(second, Err(DispatchError::InFlight(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Once the first invocation finished the id is free again
        release_tx.send(true).ok();
        assert!(table.resolve_and_invoke(TestCtx::button("vote")).await.unwrap());
    }

    #[test]
    fn test_clear() {
        let table = table();
        let counter = Arc::new(AtomicU32::new(0));
        table.register("a", counting(&counter)).unwrap();
        table.register("b", counting(&counter)).unwrap();
        table.clear();
        assert!(table.is_empty());
        assert!(!table.id_exists("a"));
    }
}
