// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback instances: one live run of a clip.
//!
//! A [`PlayingInfo`] owns the time cursor of one run, the events of the clip
//! that have not resolved yet, and the pooled handlers attached to them. Both
//! pending lists are kept sorted by descending due time so resolved events are
//! popped from the tail.

use crate::binding::{LiveRange, LiveSignal};
use crate::clip::{Clip, EventRef};
use crate::event::{AnyRange, AnySignal, EventKind, SequenceEvent};
use crate::pool::HandlerPools;
use std::cell::Cell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

/// Identifier of one playback instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

#[derive(Debug)]
struct HandleState {
    id: PlaybackId,
    done: Cell<bool>,
}

/// Opaque reference to a playback instance, used to stop it.
///
/// Handles compare equal when they refer to the same instance. A default handle
/// refers to nothing and is always done.
#[derive(Debug, Clone, Default)]
pub struct SequenceHandle {
    state: Option<Rc<HandleState>>,
}

impl SequenceHandle {
    fn new(id: PlaybackId) -> Self {
        Self {
            state: Some(Rc::new(HandleState {
                id,
                done: Cell::new(false),
            })),
        }
    }

    /// Id of the referenced instance, if any
    pub fn id(&self) -> Option<PlaybackId> {
        self.state.as_ref().map(|s| s.id)
    }

    /// Whether the instance has completed or been stopped
    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, |s| s.done.get())
    }

    fn mark_done(&self) {
        if let Some(state) = &self.state {
            state.done.set(true);
        }
    }

    /// Whether this is the empty default handle
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }
}

impl PartialEq for SequenceHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for SequenceHandle {}

impl Hash for SequenceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// Signal waiting to fire
struct PendingSignal {
    event: EventRef,
    time: f32,
    handler: Option<Box<dyn LiveSignal>>,
}

/// Range waiting to enter or exit
struct PendingRange {
    event: EventRef,
    enter_time: f32,
    exit_time: f32,
    must_one_frame: bool,
    handler: Option<Box<dyn LiveRange>>,
}

/// Signal or range event that resolved to no handler when a playback started
#[derive(Debug, Clone)]
pub struct UnhandledEvent {
    /// Playback the event belongs to
    pub playback: PlaybackId,
    /// Position of the event in its clip
    pub event: EventRef,
    /// Signal or range
    pub kind: EventKind,
    /// Payload type name
    pub event_type: &'static str,
    /// Event label
    pub label: String,
}

/// One active run of a clip
pub(crate) struct PlayingInfo {
    id: PlaybackId,
    handle: SequenceHandle,
    clip: Arc<Clip>,
    time: f32,
    signals: Vec<PendingSignal>,
    ranges: Vec<PendingRange>,
}

/// Resolves an event to a handler drawn from the pools, `None` if unbound
pub(crate) trait HandlerResolver {
    fn signal(&mut self, event: &dyn AnySignal) -> Option<Box<dyn LiveSignal>>;
    fn range(&mut self, event: &dyn AnyRange) -> Option<Box<dyn LiveRange>>;
    fn unhandled(&mut self, event: UnhandledEvent);
}

impl PlayingInfo {
    /// Collect the clip's active events and attach handlers to them
    pub(crate) fn new(
        id: PlaybackId,
        clip: Arc<Clip>,
        start_time: f32,
        resolver: &mut dyn HandlerResolver,
    ) -> Self {
        let mut signals = Vec::new();
        let mut ranges = Vec::new();

        for (event_ref, event) in clip.events() {
            if !event.is_active() {
                continue;
            }

            let handled = match event {
                SequenceEvent::Signal(signal) => {
                    let handler = resolver.signal(&**signal);
                    let handled = handler.is_some();
                    signals.push(PendingSignal {
                        event: event_ref,
                        time: signal.time(),
                        handler,
                    });
                    handled
                }
                SequenceEvent::Range(range) => {
                    let handler = resolver.range(&**range);
                    let handled = handler.is_some();
                    ranges.push(PendingRange {
                        event: event_ref,
                        enter_time: range.enter_time(),
                        exit_time: range.exit_time(),
                        must_one_frame: range.must_one_frame(),
                        handler,
                    });
                    handled
                }
            };

            if !handled {
                resolver.unhandled(UnhandledEvent {
                    playback: id,
                    event: event_ref,
                    kind: event.kind(),
                    event_type: event.event_type_name(),
                    label: event.label().to_string(),
                });
            }
        }

        signals.sort_by(|a, b| b.time.total_cmp(&a.time));
        ranges.sort_by(|a, b| b.exit_time.total_cmp(&a.exit_time));

        Self {
            id,
            handle: SequenceHandle::new(id),
            clip,
            time: start_time,
            signals,
            ranges,
        }
    }

    pub(crate) fn id(&self) -> PlaybackId {
        self.id
    }

    pub(crate) fn handle(&self) -> &SequenceHandle {
        &self.handle
    }

    pub(crate) fn clip(&self) -> &Arc<Clip> {
        &self.clip
    }

    pub(crate) fn time(&self) -> f32 {
        self.time
    }

    pub(crate) fn pending_signals(&self) -> usize {
        self.signals.len()
    }

    pub(crate) fn pending_ranges(&self) -> usize {
        self.ranges.len()
    }

    /// Whether every event has resolved
    pub(crate) fn is_finished(&self) -> bool {
        self.signals.is_empty() && self.ranges.is_empty()
    }

    /// Advance the cursor and resolve due events. Returns true once finished.
    pub(crate) fn advance(&mut self, delta_time: f32, pools: &mut HandlerPools) -> bool {
        self.time += delta_time;
        self.fire_signals(pools);
        self.process_ranges(pools);

        let finished = self.is_finished();
        if finished {
            self.handle.mark_done();
        }
        finished
    }

    fn fire_signals(&mut self, pools: &mut HandlerPools) {
        while self.signals.last().is_some_and(|s| s.time <= self.time) {
            let Some(pending) = self.signals.pop() else {
                break;
            };
            let Some(mut handler) = pending.handler else {
                continue;
            };
            if let Some(SequenceEvent::Signal(event)) = self.clip.event(pending.event) {
                handler.invoke(&**event);
            }
            handler.release(pools);
        }
    }

    fn process_ranges(&mut self, pools: &mut HandlerPools) {
        let time = self.time;
        let mut index = self.ranges.len();

        while index > 0 {
            index -= 1;
            let pending = &mut self.ranges[index];

            let entered = pending.handler.as_ref().is_some_and(|h| h.is_entered());
            if !entered && time < pending.enter_time {
                continue;
            }

            if let (Some(SequenceEvent::Range(event)), Some(handler)) =
                (self.clip.event(pending.event), pending.handler.as_mut())
            {
                let entering = !handler.is_entered();
                if entering {
                    handler.enter(&**event);
                }

                let duration = pending.exit_time - pending.enter_time;
                let elapsed = (time - pending.enter_time).min(duration).max(0.0);
                handler.update(&**event, elapsed);

                let exit_due = time >= pending.exit_time;
                if !exit_due || (entering && pending.must_one_frame) {
                    continue;
                }
                handler.exit(&**event);
            }

            // Unbound ranges are dropped here without callbacks
            let removed = self.ranges.remove(index);
            if let Some(handler) = removed.handler {
                handler.release(pools);
            }
        }
    }

    /// Cancel entered ranges and return every handler to its pool
    pub(crate) fn cancel(mut self, pools: &mut HandlerPools) {
        for pending in self.signals.drain(..) {
            if let Some(handler) = pending.handler {
                handler.release(pools);
            }
        }

        for pending in self.ranges.drain(..) {
            let Some(mut handler) = pending.handler else {
                continue;
            };
            if handler.is_entered() {
                if let Some(SequenceEvent::Range(event)) = self.clip.event(pending.event) {
                    handler.cancel(&**event);
                }
            }
            handler.release(pools);
        }

        self.handle.mark_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Range, Signal};
    use crate::testing::{Cue, Window};
    use crate::track::Track;

    #[derive(Default)]
    struct Unbound {
        reported: Vec<UnhandledEvent>,
    }

    impl HandlerResolver for Unbound {
        fn signal(&mut self, _event: &dyn AnySignal) -> Option<Box<dyn LiveSignal>> {
            None
        }

        fn range(&mut self, _event: &dyn AnyRange) -> Option<Box<dyn LiveRange>> {
            None
        }

        fn unhandled(&mut self, event: UnhandledEvent) {
            self.reported.push(event);
        }
    }

    fn clip() -> Arc<Clip> {
        Arc::new(
            Clip::new("unbound")
                .with_track(
                    Track::new("signals")
                        .with_signal(Signal::new(2.0, Cue("late")))
                        .with_signal(Signal::new(0.5, Cue("off")).with_active(false))
                        .with_signal(Signal::new(1.0, Cue("early"))),
                )
                .with_track(Track::new("ranges").with_range(Range::new(0.5, 4.0, Window("w")))),
        )
    }

    #[test]
    fn test_new_collects_active_events() {
        let mut resolver = Unbound::default();
        let info = PlayingInfo::new(PlaybackId(7), clip(), 0.0, &mut resolver);

        assert_eq!(info.pending_signals(), 2);
        assert_eq!(info.pending_ranges(), 1);
        assert_eq!(resolver.reported.len(), 3);
        assert!(resolver.reported.iter().all(|e| e.playback == PlaybackId(7)));

        let range = resolver
            .reported
            .iter()
            .find(|e| e.kind == EventKind::Range)
            .expect("range reported");
        assert_eq!(range.event, EventRef { track: 1, index: 0 });
        assert!(info.signals.windows(2).all(|w| w[0].time >= w[1].time));
    }

    #[test]
    fn test_unbound_events_resolve_when_due() {
        let mut pools = HandlerPools::new();
        let mut info = PlayingInfo::new(PlaybackId(1), clip(), 0.0, &mut Unbound::default());
        let handle = info.handle().clone();

        assert!(!info.advance(0.75, &mut pools));
        assert_eq!(info.pending_signals(), 2);
        assert_eq!(info.pending_ranges(), 0);

        assert!(!info.advance(0.5, &mut pools));
        assert_eq!(info.pending_signals(), 1);
        assert!(!handle.is_done());

        assert!(info.advance(1.0, &mut pools));
        assert!(handle.is_done());
        assert_eq!(info.time(), 2.25);
    }

    #[test]
    fn test_cancel_marks_handle_done() {
        let mut pools = HandlerPools::new();
        let info = PlayingInfo::new(PlaybackId(2), clip(), 1.0, &mut Unbound::default());
        let handle = info.handle().clone();
        assert_eq!(handle.id(), Some(PlaybackId(2)));

        info.cancel(&mut pools);
        assert!(handle.is_done());
    }
}
