// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence controller: owns playback instances and drives them each tick.
//!
//! The controller is single-threaded. `play`, `update`, `stop` and `stop_all`
//! all take `&mut self` and finish every handler callback before returning, so
//! a handler can never re-enter the controller that is calling it.

use crate::binding::{BindingRegistry, BindingTable, LiveRange, LiveSignal};
use crate::clip::Clip;
use crate::config::SequenceConfig;
use crate::event::{AnyRange, AnySignal, Signal};
use crate::handler::{RangeCallbacks, RangeHandler, SignalHandler};
use crate::playback::{
    HandlerResolver, PlaybackId, PlayingInfo, SequenceHandle, UnhandledEvent,
};
use crate::pool::HandlerPools;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Playback ids are unique across every controller in the process
static NEXT_PLAYBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Hook called for every active event that has no handler when a clip starts
pub type UnhandledHook = Box<dyn FnMut(&UnhandledEvent)>;

/// Resolution context for one `play` call: local table, then registry.
///
/// The registry lock is held only while a binding is looked up and cloned, so
/// init actions, `on_acquire` and the unhandled hook may bind or reset freely.
struct Resolver<'a> {
    local: &'a BindingTable,
    registry: &'a BindingRegistry,
    pools: &'a mut HandlerPools,
    hook: Option<&'a mut UnhandledHook>,
    warn: bool,
}

impl HandlerResolver for Resolver<'_> {
    fn signal(&mut self, event: &dyn AnySignal) -> Option<Box<dyn LiveSignal>> {
        let binding = match self.local.signal(event.event_type()) {
            Some(binding) => binding.clone(),
            None => self.registry.signal_binding(event.event_type())?,
        };
        binding.acquire(self.pools, event)
    }

    fn range(&mut self, event: &dyn AnyRange) -> Option<Box<dyn LiveRange>> {
        let binding = match self.local.range(event.event_type()) {
            Some(binding) => binding.clone(),
            None => self.registry.range_binding(event.event_type())?,
        };
        binding.acquire(self.pools, event)
    }

    fn unhandled(&mut self, event: UnhandledEvent) {
        if self.warn {
            tracing::warn!(
                "No handler for {} event {} ({:?})",
                event.kind.name(),
                event.event_type,
                event.label
            );
        } else {
            tracing::trace!(
                "No handler for {} event {} ({:?})",
                event.kind.name(),
                event.event_type,
                event.label
            );
        }
        if let Some(hook) = self.hook.as_deref_mut() {
            hook(&event);
        }
    }
}

/// Plays clips and dispatches their events to bound handlers.
pub struct SequenceController {
    /// Engine configuration
    config: SequenceConfig,
    /// Live playback instances in play order
    playing: Vec<PlayingInfo>,
    /// Bindings local to this controller
    bindings: BindingTable,
    /// Shared bindings consulted after the local table
    registry: Arc<BindingRegistry>,
    /// Handler pools owned by this controller
    pools: HandlerPools,
    /// Diagnostic hook for unbound events
    unhandled_hook: Option<UnhandledHook>,
}

impl SequenceController {
    /// Create a controller with default config using the global registry
    pub fn new() -> Self {
        Self::with_config(SequenceConfig::default())
    }

    /// Create a controller with the given config using the global registry
    pub fn with_config(config: SequenceConfig) -> Self {
        Self::with_registry(config, BindingRegistry::global())
    }

    /// Create a controller sharing bindings through `registry`
    pub fn with_registry(config: SequenceConfig, registry: Arc<BindingRegistry>) -> Self {
        Self {
            playing: Vec::with_capacity(config.initial_playback_capacity),
            pools: HandlerPools::with_max_idle(config.max_pooled_handlers_per_type),
            config,
            bindings: BindingTable::new(),
            registry,
            unhandled_hook: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Get the shared registry this controller falls back to
    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// Get the local bindings
    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Get the local bindings mutably
    pub fn bindings_mut(&mut self) -> &mut BindingTable {
        &mut self.bindings
    }

    /// Get the handler pools
    pub fn pools(&self) -> &HandlerPools {
        &self.pools
    }

    /// Get the handler pools mutably (for prewarming)
    pub fn pools_mut(&mut self) -> &mut HandlerPools {
        &mut self.pools
    }

    /// Install a hook called for every active event without a handler
    pub fn set_unhandled_hook(&mut self, hook: impl FnMut(&UnhandledEvent) + 'static) {
        self.unhandled_hook = Some(Box::new(hook));
    }

    /// Remove the unhandled-event hook
    pub fn clear_unhandled_hook(&mut self) {
        self.unhandled_hook = None;
    }

    // Local bindings

    /// Bind signals with payload `E` to handler type `H` on this controller
    pub fn bind_signal_handler<E: 'static, H>(&mut self)
    where
        H: SignalHandler<E> + Default,
    {
        self.bindings.bind_signal_handler::<E, H>();
    }

    /// Bind signals with payload `E` to `H`, running `init` on every acquisition
    pub fn bind_signal_handler_with<E: 'static, H>(
        &mut self,
        init: impl Fn(&mut H) + Send + Sync + 'static,
    ) where
        H: SignalHandler<E> + Default,
    {
        self.bindings.bind_signal_handler_with::<E, H>(init);
    }

    /// Bind signals with payload `E` to a plain callback
    pub fn bind_signal_callback<E: 'static>(
        &mut self,
        callback: impl Fn(&Signal<E>) + Send + Sync + 'static,
    ) {
        self.bindings.bind_signal_callback::<E>(callback);
    }

    /// Bind ranges with payload `E` to handler type `H` on this controller
    pub fn bind_range_handler<E: 'static, H>(&mut self)
    where
        H: RangeHandler<E> + Default,
    {
        self.bindings.bind_range_handler::<E, H>();
    }

    /// Bind ranges with payload `E` to `H`, running `init` on every acquisition
    pub fn bind_range_handler_with<E: 'static, H>(
        &mut self,
        init: impl Fn(&mut H) + Send + Sync + 'static,
    ) where
        H: RangeHandler<E> + Default,
    {
        self.bindings.bind_range_handler_with::<E, H>(init);
    }

    /// Bind ranges with payload `E` to plain callbacks
    pub fn bind_range_callbacks<E: 'static>(&mut self, callbacks: RangeCallbacks<E>) {
        self.bindings.bind_range_callbacks::<E>(callbacks);
    }

    /// Remove the local signal binding for `E`
    pub fn reset_signal_handler<E: 'static>(&mut self) -> bool {
        self.bindings.reset_signal_handler::<E>()
    }

    /// Remove the local range binding for `E`
    pub fn reset_range_handler<E: 'static>(&mut self) -> bool {
        self.bindings.reset_range_handler::<E>()
    }

    /// Remove every local signal binding
    pub fn reset_signal_handlers(&mut self) {
        self.bindings.reset_signal_handlers();
    }

    /// Remove every local range binding
    pub fn reset_range_handlers(&mut self) {
        self.bindings.reset_range_handlers();
    }

    // Playback

    /// Start playing `clip` from time zero
    pub fn play(&mut self, clip: &Arc<Clip>) -> SequenceHandle {
        self.play_from(clip, 0.0)
    }

    /// Start playing `clip` with the cursor at `start_offset` seconds.
    ///
    /// Events already due at `start_offset` resolve on the next `update`.
    pub fn play_from(&mut self, clip: &Arc<Clip>, start_offset: f32) -> SequenceHandle {
        let id = PlaybackId(NEXT_PLAYBACK_ID.fetch_add(1, Ordering::Relaxed));
        let mut resolver = Resolver {
            local: &self.bindings,
            registry: &self.registry,
            pools: &mut self.pools,
            hook: self.unhandled_hook.as_mut(),
            warn: self.config.warn_on_unhandled,
        };
        let info = PlayingInfo::new(id, Arc::clone(clip), start_offset, &mut resolver);

        tracing::debug!(
            "Playing clip '{}' as {:?}: {} signals, {} ranges",
            clip.name,
            id,
            info.pending_signals(),
            info.pending_ranges()
        );

        let handle = info.handle().clone();
        self.playing.push(info);
        handle
    }

    /// Advance every playback by `delta_time` seconds and dispatch due events.
    ///
    /// Finished playbacks are removed after all of them have been advanced.
    pub fn update(&mut self, delta_time: f32) {
        let mut finished = false;
        for info in &mut self.playing {
            finished |= info.advance(delta_time, &mut self.pools);
        }

        if finished {
            self.playing.retain(|info| {
                let done = info.is_finished();
                if done {
                    tracing::debug!("Clip '{}' finished ({:?})", info.clip().name, info.id());
                }
                !done
            });
        }
    }

    /// Stop one playback, cancelling entered ranges. Unknown, finished or
    /// foreign handles are ignored.
    pub fn stop(&mut self, handle: &SequenceHandle) {
        let Some(index) = self.position(handle) else {
            return;
        };

        let info = self.playing.remove(index);
        tracing::debug!("Stopping clip '{}' ({:?})", info.clip().name, info.id());
        info.cancel(&mut self.pools);
    }

    /// Stop every playback, cancelling entered ranges
    pub fn stop_all(&mut self) {
        if self.playing.is_empty() {
            return;
        }
        tracing::debug!("Stopping {} playbacks", self.playing.len());
        for info in std::mem::take(&mut self.playing) {
            info.cancel(&mut self.pools);
        }
    }

    /// Stop everything, drop local bindings and empty the handler pools
    pub fn dispose(&mut self) {
        self.stop_all();
        self.bindings.clear();
        self.pools.clear();
        tracing::debug!("Sequence controller disposed");
    }

    // Queries

    /// Time of the first playback of `clip`, or `-1.0` if it is not playing.
    ///
    /// With several playbacks of the same clip only the earliest started one
    /// is reported; use [`SequenceController::handle_time`] to query a
    /// specific playback.
    pub fn get_sequence_time(&self, clip: &Arc<Clip>) -> f32 {
        self.playing
            .iter()
            .find(|info| Arc::ptr_eq(info.clip(), clip))
            .map_or(-1.0, PlayingInfo::time)
    }

    /// Time of the playback behind `handle`, if it is still live here
    pub fn handle_time(&self, handle: &SequenceHandle) -> Option<f32> {
        self.position(handle).map(|index| self.playing[index].time())
    }

    /// Whether the playback behind `handle` is still live on this controller
    pub fn is_playing(&self, handle: &SequenceHandle) -> bool {
        self.position(handle).is_some()
    }

    /// Index of the playback `handle` refers to, matched by instance identity
    fn position(&self, handle: &SequenceHandle) -> Option<usize> {
        if handle.is_empty() {
            return None;
        }
        self.playing.iter().position(|info| info.handle() == handle)
    }

    /// Whether any clip is playing
    pub fn has_playing_clip(&self) -> bool {
        !self.playing.is_empty()
    }

    /// Number of live playbacks
    pub fn playing_count(&self) -> usize {
        self.playing.len()
    }
}

impl Default for SequenceController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequenceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceController")
            .field("playing", &self.playing.len())
            .field("bindings", &self.bindings)
            .field("pools", &self.pools.pool_count())
            .finish()
    }
}
