// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event type to handler type bindings.
//!
//! A binding maps a payload type to a handler factory. The factory is built
//! once at bind time from the concrete `(E, H)` pair, so playback never looks
//! at types beyond a single `TypeId` lookup per event.
//!
//! Bindings live in two places: a [`BindingTable`] owned by each controller,
//! and a [`BindingRegistry`] shared between controllers. The process-wide
//! registry is [`BindingRegistry::global`]; controllers consult their own
//! table first and the registry second.

use crate::event::{AnyRange, AnySignal, Range, Signal};
use crate::handler::{
    RangeCallbacks, RangeHandler, RangeObserver, SignalHandler, SignalObserver,
};
use crate::pool::HandlerPools;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

/// A pooled signal handler attached to one event of one playback
pub(crate) trait LiveSignal {
    fn invoke(&mut self, event: &dyn AnySignal);
    fn release(self: Box<Self>, pools: &mut HandlerPools);
}

/// A pooled range handler attached to one event of one playback
pub(crate) trait LiveRange {
    fn is_entered(&self) -> bool;
    fn enter(&mut self, event: &dyn AnyRange);
    fn update(&mut self, event: &dyn AnyRange, elapsed: f32);
    fn exit(&mut self, event: &dyn AnyRange);
    fn cancel(&mut self, event: &dyn AnyRange);
    fn release(self: Box<Self>, pools: &mut HandlerPools);
}

struct PooledSignal<E, H> {
    handler: Box<H>,
    _event: PhantomData<fn(&E)>,
}

impl<E: 'static, H: SignalHandler<E>> LiveSignal for PooledSignal<E, H> {
    fn invoke(&mut self, event: &dyn AnySignal) {
        if let Some(event) = event.as_any().downcast_ref::<Signal<E>>() {
            self.handler.invoke(event);
        }
    }

    fn release(self: Box<Self>, pools: &mut HandlerPools) {
        pools.release(self.handler);
    }
}

struct PooledRange<E, H> {
    handler: Box<H>,
    entered: bool,
    _event: PhantomData<fn(&E)>,
}

impl<E: 'static, H: RangeHandler<E>> PooledRange<E, H> {
    fn with_event(&mut self, event: &dyn AnyRange, f: impl FnOnce(&mut H, &Range<E>)) {
        if let Some(event) = event.as_any().downcast_ref::<Range<E>>() {
            f(&mut *self.handler, event);
        }
    }
}

impl<E: 'static, H: RangeHandler<E>> LiveRange for PooledRange<E, H> {
    fn is_entered(&self) -> bool {
        self.entered
    }

    fn enter(&mut self, event: &dyn AnyRange) {
        self.entered = true;
        self.with_event(event, |h, e| h.enter(e));
    }

    fn update(&mut self, event: &dyn AnyRange, elapsed: f32) {
        self.with_event(event, |h, e| h.update(e, elapsed));
    }

    fn exit(&mut self, event: &dyn AnyRange) {
        self.entered = false;
        self.with_event(event, |h, e| h.exit(e));
    }

    fn cancel(&mut self, event: &dyn AnyRange) {
        self.entered = false;
        self.with_event(event, |h, e| h.cancel(e));
    }

    fn release(self: Box<Self>, pools: &mut HandlerPools) {
        pools.release(self.handler);
    }
}

type SignalFactory =
    Arc<dyn Fn(&mut HandlerPools, &dyn AnySignal) -> Option<Box<dyn LiveSignal>> + Send + Sync>;

type RangeFactory =
    Arc<dyn Fn(&mut HandlerPools, &dyn AnyRange) -> Option<Box<dyn LiveRange>> + Send + Sync>;

/// Signal binding: handler type plus its acquisition factory
#[derive(Clone)]
pub(crate) struct SignalBinding {
    pub(crate) handler_type: &'static str,
    acquire: SignalFactory,
}

impl SignalBinding {
    fn new<E: 'static, H>(init: Option<Arc<dyn Fn(&mut H) + Send + Sync>>) -> Self
    where
        H: SignalHandler<E> + Default,
    {
        let acquire: SignalFactory = Arc::new(
            move |pools: &mut HandlerPools, event: &dyn AnySignal| {
                let event = event.as_any().downcast_ref::<Signal<E>>()?;
                let mut handler = pools.acquire::<H>();
                if let Some(init) = &init {
                    init(&mut *handler);
                }
                handler.on_acquire(event);
                Some(Box::new(PooledSignal::<E, H> {
                    handler,
                    _event: PhantomData,
                }) as Box<dyn LiveSignal>)
            },
        );
        Self {
            handler_type: type_name::<H>(),
            acquire,
        }
    }

    /// Draw a handler from the pool and attach it to `event`
    pub(crate) fn acquire(
        &self,
        pools: &mut HandlerPools,
        event: &dyn AnySignal,
    ) -> Option<Box<dyn LiveSignal>> {
        (self.acquire)(pools, event)
    }
}

/// Range binding: handler type plus its acquisition factory
#[derive(Clone)]
pub(crate) struct RangeBinding {
    pub(crate) handler_type: &'static str,
    acquire: RangeFactory,
}

impl RangeBinding {
    fn new<E: 'static, H>(init: Option<Arc<dyn Fn(&mut H) + Send + Sync>>) -> Self
    where
        H: RangeHandler<E> + Default,
    {
        let acquire: RangeFactory = Arc::new(
            move |pools: &mut HandlerPools, event: &dyn AnyRange| {
                let event = event.as_any().downcast_ref::<Range<E>>()?;
                let mut handler = pools.acquire::<H>();
                if let Some(init) = &init {
                    init(&mut *handler);
                }
                handler.on_acquire(event);
                Some(Box::new(PooledRange::<E, H> {
                    handler,
                    entered: false,
                    _event: PhantomData,
                }) as Box<dyn LiveRange>)
            },
        );
        Self {
            handler_type: type_name::<H>(),
            acquire,
        }
    }

    /// Draw a handler from the pool and attach it to `event`
    pub(crate) fn acquire(
        &self,
        pools: &mut HandlerPools,
        event: &dyn AnyRange,
    ) -> Option<Box<dyn LiveRange>> {
        (self.acquire)(pools, event)
    }
}

/// Signal and range bindings keyed by payload type.
///
/// Binding a payload type twice replaces the earlier binding.
#[derive(Clone, Default)]
pub struct BindingTable {
    signals: IndexMap<TypeId, SignalBinding>,
    ranges: IndexMap<TypeId, RangeBinding>,
}

impl BindingTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_signal<E: 'static>(&mut self, binding: SignalBinding) {
        tracing::trace!(
            "Bind signal {} -> {}",
            type_name::<E>(),
            binding.handler_type
        );
        if let Some(old) = self.signals.insert(TypeId::of::<E>(), binding) {
            tracing::trace!("Replaced signal binding {}", old.handler_type);
        }
    }

    fn insert_range<E: 'static>(&mut self, binding: RangeBinding) {
        tracing::trace!(
            "Bind range {} -> {}",
            type_name::<E>(),
            binding.handler_type
        );
        if let Some(old) = self.ranges.insert(TypeId::of::<E>(), binding) {
            tracing::trace!("Replaced range binding {}", old.handler_type);
        }
    }

    /// Bind signals with payload `E` to handler type `H`
    pub fn bind_signal_handler<E: 'static, H>(&mut self)
    where
        H: SignalHandler<E> + Default,
    {
        self.insert_signal::<E>(SignalBinding::new::<E, H>(None));
    }

    /// Bind signals with payload `E` to handler type `H`, running `init` on every acquisition
    pub fn bind_signal_handler_with<E: 'static, H>(
        &mut self,
        init: impl Fn(&mut H) + Send + Sync + 'static,
    ) where
        H: SignalHandler<E> + Default,
    {
        self.insert_signal::<E>(SignalBinding::new::<E, H>(Some(Arc::new(init))));
    }

    /// Bind signals with payload `E` to a plain callback
    pub fn bind_signal_callback<E: 'static>(
        &mut self,
        callback: impl Fn(&Signal<E>) + Send + Sync + 'static,
    ) {
        let callback: Arc<dyn Fn(&Signal<E>) + Send + Sync> = Arc::new(callback);
        self.bind_signal_handler_with::<E, SignalObserver<E>>(move |observer| {
            observer.callback = Some(callback.clone());
        });
    }

    /// Bind ranges with payload `E` to handler type `H`
    pub fn bind_range_handler<E: 'static, H>(&mut self)
    where
        H: RangeHandler<E> + Default,
    {
        self.insert_range::<E>(RangeBinding::new::<E, H>(None));
    }

    /// Bind ranges with payload `E` to handler type `H`, running `init` on every acquisition
    pub fn bind_range_handler_with<E: 'static, H>(
        &mut self,
        init: impl Fn(&mut H) + Send + Sync + 'static,
    ) where
        H: RangeHandler<E> + Default,
    {
        self.insert_range::<E>(RangeBinding::new::<E, H>(Some(Arc::new(init))));
    }

    /// Bind ranges with payload `E` to plain callbacks
    pub fn bind_range_callbacks<E: 'static>(&mut self, callbacks: RangeCallbacks<E>) {
        self.bind_range_handler_with::<E, RangeObserver<E>>(move |observer| {
            observer.callbacks = callbacks.clone();
        });
    }

    /// Remove the signal binding for `E`, returning whether one existed
    pub fn reset_signal_handler<E: 'static>(&mut self) -> bool {
        self.signals.shift_remove(&TypeId::of::<E>()).is_some()
    }

    /// Remove the range binding for `E`, returning whether one existed
    pub fn reset_range_handler<E: 'static>(&mut self) -> bool {
        self.ranges.shift_remove(&TypeId::of::<E>()).is_some()
    }

    /// Remove every signal binding
    pub fn reset_signal_handlers(&mut self) {
        self.signals.clear();
    }

    /// Remove every range binding
    pub fn reset_range_handlers(&mut self) {
        self.ranges.clear();
    }

    /// Remove every binding
    pub fn clear(&mut self) {
        self.signals.clear();
        self.ranges.clear();
    }

    /// Whether a signal binding exists for `E`
    pub fn has_signal_binding<E: 'static>(&self) -> bool {
        self.signals.contains_key(&TypeId::of::<E>())
    }

    /// Whether a range binding exists for `E`
    pub fn has_range_binding<E: 'static>(&self) -> bool {
        self.ranges.contains_key(&TypeId::of::<E>())
    }

    /// Type name of the handler bound to signals with payload `E`
    pub fn signal_handler_type<E: 'static>(&self) -> Option<&'static str> {
        self.signals.get(&TypeId::of::<E>()).map(|b| b.handler_type)
    }

    /// Type name of the handler bound to ranges with payload `E`
    pub fn range_handler_type<E: 'static>(&self) -> Option<&'static str> {
        self.ranges.get(&TypeId::of::<E>()).map(|b| b.handler_type)
    }

    /// Number of bindings (signal and range)
    pub fn len(&self) -> usize {
        self.signals.len() + self.ranges.len()
    }

    /// Whether the table holds no bindings
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.ranges.is_empty()
    }

    pub(crate) fn signal(&self, event_type: TypeId) -> Option<&SignalBinding> {
        self.signals.get(&event_type)
    }

    pub(crate) fn range(&self, event_type: TypeId) -> Option<&RangeBinding> {
        self.ranges.get(&event_type)
    }
}

impl std::fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTable")
            .field(
                "signals",
                &self.signals.values().map(|b| b.handler_type).collect::<Vec<_>>(),
            )
            .field(
                "ranges",
                &self.ranges.values().map(|b| b.handler_type).collect::<Vec<_>>(),
            )
            .finish()
    }
}

static GLOBAL_BINDINGS: Lazy<Arc<BindingRegistry>> =
    Lazy::new(|| Arc::new(BindingRegistry::new()));

/// Binding table shared between controllers.
///
/// The process-wide instance lives for the whole process; call
/// [`BindingRegistry::clear`] to reset it (for example between test cases).
/// Controllers running on different threads may share a registry; the lock
/// only covers the table itself.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    table: RwLock<BindingTable>,
}

impl BindingRegistry {
    /// Create an empty registry, independent of the global one
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`crate::SequenceController::new`]
    pub fn global() -> Arc<BindingRegistry> {
        Arc::clone(&*GLOBAL_BINDINGS)
    }

    /// Clone the signal binding for `event_type`, releasing the lock before
    /// the caller runs its factory
    pub(crate) fn signal_binding(&self, event_type: TypeId) -> Option<SignalBinding> {
        self.table.read().signal(event_type).cloned()
    }

    /// Clone the range binding for `event_type`
    pub(crate) fn range_binding(&self, event_type: TypeId) -> Option<RangeBinding> {
        self.table.read().range(event_type).cloned()
    }

    /// Bind signals with payload `E` to handler type `H`
    pub fn bind_signal_handler<E: 'static, H>(&self)
    where
        H: SignalHandler<E> + Default,
    {
        self.table.write().bind_signal_handler::<E, H>();
    }

    /// Bind signals with payload `E` to handler type `H`, running `init` on every acquisition
    pub fn bind_signal_handler_with<E: 'static, H>(
        &self,
        init: impl Fn(&mut H) + Send + Sync + 'static,
    ) where
        H: SignalHandler<E> + Default,
    {
        self.table.write().bind_signal_handler_with::<E, H>(init);
    }

    /// Bind signals with payload `E` to a plain callback
    pub fn bind_signal_callback<E: 'static>(
        &self,
        callback: impl Fn(&Signal<E>) + Send + Sync + 'static,
    ) {
        self.table.write().bind_signal_callback::<E>(callback);
    }

    /// Bind ranges with payload `E` to handler type `H`
    pub fn bind_range_handler<E: 'static, H>(&self)
    where
        H: RangeHandler<E> + Default,
    {
        self.table.write().bind_range_handler::<E, H>();
    }

    /// Bind ranges with payload `E` to handler type `H`, running `init` on every acquisition
    pub fn bind_range_handler_with<E: 'static, H>(
        &self,
        init: impl Fn(&mut H) + Send + Sync + 'static,
    ) where
        H: RangeHandler<E> + Default,
    {
        self.table.write().bind_range_handler_with::<E, H>(init);
    }

    /// Bind ranges with payload `E` to plain callbacks
    pub fn bind_range_callbacks<E: 'static>(&self, callbacks: RangeCallbacks<E>) {
        self.table.write().bind_range_callbacks::<E>(callbacks);
    }

    /// Remove the signal binding for `E`
    pub fn reset_signal_handler<E: 'static>(&self) -> bool {
        self.table.write().reset_signal_handler::<E>()
    }

    /// Remove the range binding for `E`
    pub fn reset_range_handler<E: 'static>(&self) -> bool {
        self.table.write().reset_range_handler::<E>()
    }

    /// Remove every signal binding
    pub fn reset_signal_handlers(&self) {
        self.table.write().reset_signal_handlers();
    }

    /// Remove every range binding
    pub fn reset_range_handlers(&self) {
        self.table.write().reset_range_handlers();
    }

    /// Remove every binding
    pub fn clear(&self) {
        self.table.write().clear();
    }

    /// Whether a signal binding exists for `E`
    pub fn has_signal_binding<E: 'static>(&self) -> bool {
        self.table.read().has_signal_binding::<E>()
    }

    /// Whether a range binding exists for `E`
    pub fn has_range_binding<E: 'static>(&self) -> bool {
        self.table.read().has_range_binding::<E>()
    }

    /// Type name of the handler bound to signals with payload `E`
    pub fn signal_handler_type<E: 'static>(&self) -> Option<&'static str> {
        self.table.read().signal_handler_type::<E>()
    }

    /// Type name of the handler bound to ranges with payload `E`
    pub fn range_handler_type<E: 'static>(&self) -> Option<&'static str> {
        self.table.read().range_handler_type::<E>()
    }

    /// Number of bindings (signal and range)
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether the registry holds no bindings
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Spark;

    #[derive(Debug)]
    struct Slash;

    #[derive(Default)]
    struct First;

    impl SignalHandler<Spark> for First {
        fn invoke(&mut self, _event: &Signal<Spark>) {}
    }

    #[derive(Default)]
    struct Second;

    impl SignalHandler<Spark> for Second {
        fn invoke(&mut self, _event: &Signal<Spark>) {}
    }

    #[test]
    fn test_last_binding_wins() {
        let mut table = BindingTable::new();
        table.bind_signal_handler::<Spark, First>();
        table.bind_signal_handler::<Spark, Second>();
        assert_eq!(table.len(), 1);
        assert!(table
            .signal_handler_type::<Spark>()
            .is_some_and(|name| name.ends_with("Second")));
    }

    #[test]
    fn test_signal_and_range_tables_are_separate() {
        let mut table = BindingTable::new();
        table.bind_signal_callback::<Slash>(|_| {});
        assert!(table.has_signal_binding::<Slash>());
        assert!(!table.has_range_binding::<Slash>());

        table.bind_range_callbacks::<Slash>(RangeCallbacks::new());
        assert!(table.has_range_binding::<Slash>());
        assert_eq!(table.len(), 2);

        assert!(table.reset_range_handler::<Slash>());
        assert!(!table.reset_range_handler::<Slash>());
        assert!(table.has_signal_binding::<Slash>());

        table.reset_signal_handlers();
        assert!(table.is_empty());
    }

    #[test]
    fn test_factory_rejects_mismatched_payload() {
        let mut table = BindingTable::new();
        table.bind_signal_handler::<Spark, First>();
        let binding = table
            .signal(TypeId::of::<Spark>())
            .cloned()
            .expect("binding");

        let mut pools = HandlerPools::new();
        let wrong = Signal::new(0.0, Slash);
        assert!(binding.acquire(&mut pools, &wrong).is_none());
        assert_eq!(pools.created::<First>(), 0);

        let right = Signal::new(0.0, Spark);
        assert!(binding.acquire(&mut pools, &right).is_some());
        assert_eq!(pools.created::<First>(), 1);
    }

    #[test]
    fn test_registry_is_independent_of_global() {
        let registry = BindingRegistry::new();
        registry.bind_signal_handler::<Spark, First>();
        assert!(registry.has_signal_binding::<Spark>());
        assert!(!BindingRegistry::global().has_signal_binding::<Spark>());

        registry.clear();
        assert!(registry.is_empty());
    }
}
