// SPDX-License-Identifier: MIT OR Apache-2.0
//! Handler protocol: what consumers implement to react to events.
//!
//! Handlers are pooled per concrete handler type. A pooled handler keeps
//! whatever state it had when it was released, so per-activation state must be
//! reset in the binding's init action or in [`SignalHandler::on_acquire`] /
//! [`RangeHandler::on_acquire`], never in `Default::default` alone.

use crate::event::{Range, Signal};
use std::fmt;
use std::sync::Arc;

/// Reacts to a [`Signal`] with payload type `E`.
pub trait SignalHandler<E>: 'static {
    /// Called each time the handler is attached to an event for a new playback
    fn on_acquire(&mut self, _event: &Signal<E>) {}

    /// Called exactly once when playback time reaches the signal
    fn invoke(&mut self, event: &Signal<E>);
}

/// Reacts to a [`Range`] with payload type `E`.
///
/// Every activation sees one `enter`, one or more `update` calls and then
/// either `exit` or, if the playback is stopped while entered, `cancel`.
///
/// Handlers do not track whether they are entered. The engine keeps that flag
/// beside each attached handler and decides from it whether `enter` has run
/// and whether a stop calls `cancel`.
pub trait RangeHandler<E>: 'static {
    /// Called each time the handler is attached to an event for a new playback
    fn on_acquire(&mut self, _event: &Range<E>) {}

    /// Playback time reached `enter_time`
    fn enter(&mut self, event: &Range<E>);

    /// Called every update while entered.
    ///
    /// `elapsed` is `cursor - enter_time` clamped to `[0, duration]`: it never
    /// exceeds the duration and is floored at zero for reversed ranges or a
    /// cursor moved back behind `enter_time`.
    fn update(&mut self, event: &Range<E>, elapsed: f32);

    /// Playback time reached `exit_time`
    fn exit(&mut self, event: &Range<E>);

    /// Playback was stopped between enter and exit
    fn cancel(&mut self, event: &Range<E>);
}

/// Callback invoked by a [`SignalObserver`]
pub type SignalCallback<E> = Arc<dyn Fn(&Signal<E>) + Send + Sync>;

/// Callback invoked by a [`RangeObserver`] on enter, exit or cancel
pub type RangeCallback<E> = Arc<dyn Fn(&Range<E>) + Send + Sync>;

/// Callback invoked by a [`RangeObserver`] on update
pub type RangeUpdateCallback<E> = Arc<dyn Fn(&Range<E>, f32) + Send + Sync>;

/// Signal handler wrapping a plain callback.
///
/// Bound through `bind_signal_callback`; the binding's init action installs the
/// callback on every acquisition.
pub struct SignalObserver<E> {
    /// Callback to run on invoke
    pub callback: Option<SignalCallback<E>>,
}

impl<E> Default for SignalObserver<E> {
    fn default() -> Self {
        Self { callback: None }
    }
}

impl<E> fmt::Debug for SignalObserver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalObserver")
            .field("bound", &self.callback.is_some())
            .finish()
    }
}

impl<E: 'static> SignalHandler<E> for SignalObserver<E> {
    fn invoke(&mut self, event: &Signal<E>) {
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

/// Set of optional callbacks for a [`RangeObserver`]
pub struct RangeCallbacks<E> {
    /// Called on enter
    pub on_enter: Option<RangeCallback<E>>,
    /// Called on every update
    pub on_update: Option<RangeUpdateCallback<E>>,
    /// Called on natural exit
    pub on_exit: Option<RangeCallback<E>>,
    /// Called when playback is stopped while entered
    pub on_cancel: Option<RangeCallback<E>>,
}

impl<E> RangeCallbacks<E> {
    /// Create an empty callback set
    pub fn new() -> Self {
        Self {
            on_enter: None,
            on_update: None,
            on_exit: None,
            on_cancel: None,
        }
    }

    /// Set the enter callback
    pub fn on_enter(mut self, f: impl Fn(&Range<E>) + Send + Sync + 'static) -> Self {
        self.on_enter = Some(Arc::new(f));
        self
    }

    /// Set the update callback
    pub fn on_update(mut self, f: impl Fn(&Range<E>, f32) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(f));
        self
    }

    /// Set the exit callback
    pub fn on_exit(mut self, f: impl Fn(&Range<E>) + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Arc::new(f));
        self
    }

    /// Set the cancel callback
    pub fn on_cancel(mut self, f: impl Fn(&Range<E>) + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(f));
        self
    }
}

impl<E> Default for RangeCallbacks<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for RangeCallbacks<E> {
    fn clone(&self) -> Self {
        Self {
            on_enter: self.on_enter.clone(),
            on_update: self.on_update.clone(),
            on_exit: self.on_exit.clone(),
            on_cancel: self.on_cancel.clone(),
        }
    }
}

/// Range handler wrapping plain callbacks.
pub struct RangeObserver<E> {
    /// Callbacks to run
    pub callbacks: RangeCallbacks<E>,
}

impl<E> Default for RangeObserver<E> {
    fn default() -> Self {
        Self {
            callbacks: RangeCallbacks::new(),
        }
    }
}

impl<E> fmt::Debug for RangeObserver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeObserver")
            .field("on_enter", &self.callbacks.on_enter.is_some())
            .field("on_update", &self.callbacks.on_update.is_some())
            .field("on_exit", &self.callbacks.on_exit.is_some())
            .field("on_cancel", &self.callbacks.on_cancel.is_some())
            .finish()
    }
}

impl<E: 'static> RangeHandler<E> for RangeObserver<E> {
    fn enter(&mut self, event: &Range<E>) {
        if let Some(f) = &self.callbacks.on_enter {
            f(event);
        }
    }

    fn update(&mut self, event: &Range<E>, elapsed: f32) {
        if let Some(f) = &self.callbacks.on_update {
            f(event, elapsed);
        }
    }

    fn exit(&mut self, event: &Range<E>) {
        if let Some(f) = &self.callbacks.on_exit {
            f(event);
        }
    }

    fn cancel(&mut self, event: &Range<E>) {
        if let Some(f) = &self.callbacks.on_cancel {
            f(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct Flash;

    #[test]
    fn test_unbound_observers_do_nothing() {
        let mut signal = SignalObserver::<Flash>::default();
        signal.invoke(&Signal::new(0.0, Flash));

        let mut range = RangeObserver::<Flash>::default();
        let event = Range::new(0.0, 1.0, Flash);
        range.enter(&event);
        range.update(&event, 0.5);
        range.exit(&event);
        range.cancel(&event);
    }

    #[test]
    fn test_range_observer_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        let mut observer = RangeObserver {
            callbacks: RangeCallbacks::new()
                .on_enter(move |_| a.lock().push("enter".to_string()))
                .on_update(move |_, t| b.lock().push(format!("update {t}")))
                .on_exit(move |_| c.lock().push("exit".to_string())),
        };

        let event = Range::new(1.0, 2.0, Flash);
        observer.enter(&event);
        observer.update(&event, 0.25);
        observer.cancel(&event);
        observer.exit(&event);
        assert_eq!(*log.lock(), ["enter", "update 0.25", "exit"]);
    }
}
