// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for sequence clips.

use crate::event::{Range, SequenceEvent, Signal};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered group of events.
///
/// Tracks only group events for authoring; playback flattens every track of a
/// clip into one set.
#[derive(Debug)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Events in authoring order
    events: Vec<SequenceEvent>,
}

impl Track {
    /// Create a new empty track
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            events: Vec::new(),
        }
    }

    /// Add an event, returning its index
    pub fn add_event(&mut self, event: impl Into<SequenceEvent>) -> usize {
        self.events.push(event.into());
        self.events.len() - 1
    }

    /// Add a signal event
    pub fn with_signal<E: fmt::Debug + 'static>(mut self, signal: Signal<E>) -> Self {
        self.add_event(signal);
        self
    }

    /// Add a range event
    pub fn with_range<E: fmt::Debug + 'static>(mut self, range: Range<E>) -> Self {
        self.add_event(range);
        self
    }

    /// Remove the event at `index`
    pub fn remove_event(&mut self, index: usize) -> Option<SequenceEvent> {
        (index < self.events.len()).then(|| self.events.remove(index))
    }

    /// Get an event
    pub fn event(&self, index: usize) -> Option<&SequenceEvent> {
        self.events.get(index)
    }

    /// Get all events
    pub fn events(&self) -> &[SequenceEvent] {
        &self.events
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Iterate active events
    pub fn active_events(&self) -> impl Iterator<Item = &SequenceEvent> {
        self.events.iter().filter(|e| e.is_active())
    }

    /// Get the duration (latest signal or exit time)
    pub fn duration(&self) -> f32 {
        self.events
            .iter()
            .map(SequenceEvent::end_time)
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Cue;

    #[test]
    fn test_track_events() {
        let mut track = Track::new("Combat")
            .with_signal(Signal::new(0.25, Cue))
            .with_range(Range::new(0.5, 1.75, Cue));
        assert_eq!(track.event_count(), 2);
        assert_eq!(track.duration(), 1.75);

        let idx = track.add_event(Signal::new(3.0, Cue).with_active(false));
        assert_eq!(idx, 2);
        assert_eq!(track.active_events().count(), 2);
        assert_eq!(track.duration(), 3.0);

        assert!(track.remove_event(5).is_none());
        assert!(track.remove_event(0).is_some());
        assert_eq!(track.event_count(), 2);
    }
}
