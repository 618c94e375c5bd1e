// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event definitions for sequence playback.
//!
//! An event is either a [`Signal`] (fires once at an instant) or a [`Range`]
//! (entered at `enter_time`, exited at `exit_time`). Both carry a user payload
//! whose concrete type is the *event type* handlers are bound against.

use std::any::{type_name, Any, TypeId};
use std::fmt;

/// Kind of a sequence event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Instantaneous trigger
    Signal,
    /// Interval trigger with enter/update/exit
    Range,
}

impl EventKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Signal => "Signal",
            Self::Range => "Range",
        }
    }
}

/// An instantaneous event fired once when playback time reaches `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal<E> {
    /// Time in seconds from playback start
    pub time: f32,
    /// Inactive events never enter a playback instance
    pub active: bool,
    /// Cosmetic label, ignored by the engine
    pub label: String,
    /// User data identifying the event type
    pub payload: E,
}

impl<E> Signal<E> {
    /// Create an active signal at `time`
    pub fn new(time: f32, payload: E) -> Self {
        Self {
            time: time.max(0.0),
            active: true,
            label: String::new(),
            payload,
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Move the signal, clamping to non-negative time
    pub fn set_time(&mut self, time: f32) {
        self.time = time.max(0.0);
    }
}

/// An interval event entered at `enter_time` and exited at `exit_time`.
///
/// The authoring setters keep `exit_time >= enter_time`. The fields stay public
/// so data produced elsewhere is taken as-is; a reversed interval has a
/// non-positive [`Range::duration`] and resolves in the tick it becomes due.
#[derive(Debug, Clone, PartialEq)]
pub struct Range<E> {
    /// Enter time in seconds from playback start
    pub enter_time: f32,
    /// Exit time in seconds from playback start
    pub exit_time: f32,
    /// Never report enter and exit within the same update
    pub must_one_frame: bool,
    /// Inactive events never enter a playback instance
    pub active: bool,
    /// Cosmetic label, ignored by the engine
    pub label: String,
    /// User data identifying the event type
    pub payload: E,
}

impl<E> Range<E> {
    /// Create an active range covering `[enter_time, exit_time]`
    pub fn new(enter_time: f32, exit_time: f32, payload: E) -> Self {
        let enter_time = enter_time.max(0.0);
        Self {
            enter_time,
            exit_time: exit_time.max(enter_time),
            must_one_frame: false,
            active: true,
            label: String::new(),
            payload,
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Require at least one full update between enter and exit
    pub fn with_must_one_frame(mut self, must_one_frame: bool) -> Self {
        self.must_one_frame = must_one_frame;
        self
    }

    /// Length of the interval in seconds
    pub fn duration(&self) -> f32 {
        self.exit_time - self.enter_time
    }

    /// Set the enter time, clamped to `[0, exit_time]`
    pub fn set_enter_time(&mut self, time: f32) {
        self.enter_time = time.clamp(0.0, self.exit_time.max(0.0));
    }

    /// Set the exit time, clamped to `>= enter_time`
    pub fn set_exit_time(&mut self, time: f32) {
        self.exit_time = time.max(self.enter_time);
    }

    /// Set the duration, keeping the enter time
    pub fn set_duration(&mut self, duration: f32) {
        self.exit_time = self.enter_time + duration.max(0.0);
    }
}

/// Type-erased view of a [`Signal`] as stored in a track.
pub trait AnySignal: Any + fmt::Debug {
    /// Fire time in seconds
    fn time(&self) -> f32;
    /// Whether the event participates in playback
    fn is_active(&self) -> bool;
    /// Cosmetic label
    fn label(&self) -> &str;
    /// Type id of the payload (the event type)
    fn event_type(&self) -> TypeId;
    /// Type name of the payload, for diagnostics
    fn event_type_name(&self) -> &'static str;
    /// Access as [`Any`] for downcasting to the concrete [`Signal`]
    fn as_any(&self) -> &dyn Any;
}

impl<E: fmt::Debug + 'static> AnySignal for Signal<E> {
    fn time(&self) -> f32 {
        self.time
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn event_type(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn event_type_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased view of a [`Range`] as stored in a track.
pub trait AnyRange: Any + fmt::Debug {
    /// Enter time in seconds
    fn enter_time(&self) -> f32;
    /// Exit time in seconds
    fn exit_time(&self) -> f32;
    /// Whether enter and exit must be reported in different updates
    fn must_one_frame(&self) -> bool;
    /// Whether the event participates in playback
    fn is_active(&self) -> bool;
    /// Cosmetic label
    fn label(&self) -> &str;
    /// Type id of the payload (the event type)
    fn event_type(&self) -> TypeId;
    /// Type name of the payload, for diagnostics
    fn event_type_name(&self) -> &'static str;
    /// Access as [`Any`] for downcasting to the concrete [`Range`]
    fn as_any(&self) -> &dyn Any;

    /// Length of the interval in seconds
    fn duration(&self) -> f32 {
        self.exit_time() - self.enter_time()
    }
}

impl<E: fmt::Debug + 'static> AnyRange for Range<E> {
    fn enter_time(&self) -> f32 {
        self.enter_time
    }

    fn exit_time(&self) -> f32 {
        self.exit_time
    }

    fn must_one_frame(&self) -> bool {
        self.must_one_frame
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn event_type(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn event_type_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An authored event: either a signal or a range with an erased payload.
#[derive(Debug)]
pub enum SequenceEvent {
    /// Instantaneous event
    Signal(Box<dyn AnySignal>),
    /// Interval event
    Range(Box<dyn AnyRange>),
}

impl SequenceEvent {
    /// Wrap a signal
    pub fn signal<E: fmt::Debug + 'static>(signal: Signal<E>) -> Self {
        Self::Signal(Box::new(signal))
    }

    /// Wrap a range
    pub fn range<E: fmt::Debug + 'static>(range: Range<E>) -> Self {
        Self::Range(Box::new(range))
    }

    /// Get the event kind
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Signal(_) => EventKind::Signal,
            Self::Range(_) => EventKind::Range,
        }
    }

    /// Whether the event participates in playback
    pub fn is_active(&self) -> bool {
        match self {
            Self::Signal(s) => s.is_active(),
            Self::Range(r) => r.is_active(),
        }
    }

    /// Cosmetic label
    pub fn label(&self) -> &str {
        match self {
            Self::Signal(s) => s.label(),
            Self::Range(r) => r.label(),
        }
    }

    /// Type name of the payload
    pub fn event_type_name(&self) -> &'static str {
        match self {
            Self::Signal(s) => s.event_type_name(),
            Self::Range(r) => r.event_type_name(),
        }
    }

    /// Time at which the event is fully resolved (signal time or exit time)
    pub fn end_time(&self) -> f32 {
        match self {
            Self::Signal(s) => s.time(),
            Self::Range(r) => r.exit_time(),
        }
    }

    /// Get the concrete signal if this is a `Signal<E>`
    pub fn as_signal<E: 'static>(&self) -> Option<&Signal<E>> {
        match self {
            Self::Signal(s) => s.as_any().downcast_ref(),
            Self::Range(_) => None,
        }
    }

    /// Get the concrete range if this is a `Range<E>`
    pub fn as_range<E: 'static>(&self) -> Option<&Range<E>> {
        match self {
            Self::Range(r) => r.as_any().downcast_ref(),
            Self::Signal(_) => None,
        }
    }
}

impl<E: fmt::Debug + 'static> From<Signal<E>> for SequenceEvent {
    fn from(signal: Signal<E>) -> Self {
        Self::signal(signal)
    }
}

impl<E: fmt::Debug + 'static> From<Range<E>> for SequenceEvent {
    fn from(range: Range<E>) -> Self {
        Self::range(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Footstep;

    #[derive(Debug, PartialEq)]
    struct Hitbox {
        damage: u32,
    }

    #[test]
    fn test_range_setters_clamp() {
        let mut range = Range::new(1.0, 2.0, Hitbox { damage: 5 });
        range.set_enter_time(3.0);
        assert_eq!(range.enter_time, 2.0);

        range.set_exit_time(0.5);
        assert_eq!(range.exit_time, 2.0);

        range.set_duration(1.5);
        assert_eq!(range.exit_time, 3.5);
        assert_eq!(range.duration(), 1.5);
    }

    #[test]
    fn test_range_new_orders_times() {
        let range = Range::new(2.0, 1.0, Footstep);
        assert_eq!(range.enter_time, 2.0);
        assert_eq!(range.exit_time, 2.0);
        assert!(range.active);
        assert!(!range.must_one_frame);
    }

    #[test]
    fn test_raw_fields_allow_reversed_interval() {
        let mut range = Range::new(0.0, 0.0, Footstep);
        range.enter_time = 2.0;
        range.exit_time = 1.0;
        assert!(range.duration() < 0.0);
    }

    #[test]
    fn test_event_type_identity() {
        let event = SequenceEvent::from(Signal::new(0.5, Footstep));
        assert_eq!(event.kind(), EventKind::Signal);
        assert!(event.as_signal::<Footstep>().is_some());
        assert!(event.as_signal::<Hitbox>().is_none());
        assert!(event.as_range::<Footstep>().is_none());

        let SequenceEvent::Signal(signal) = &event else {
            panic!("expected signal");
        };
        assert_eq!(signal.event_type(), TypeId::of::<Footstep>());
        assert!(signal.event_type_name().ends_with("Footstep"));
    }

    #[test]
    fn test_range_payload_downcast() {
        let event = SequenceEvent::from(
            Range::new(1.0, 2.0, Hitbox { damage: 7 }).with_label("swing"),
        );
        assert_eq!(event.label(), "swing");
        assert_eq!(event.end_time(), 2.0);
        assert_eq!(event.as_range::<Hitbox>().map(|r| r.payload.damage), Some(7));
    }
}
