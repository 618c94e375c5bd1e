// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip containing multiple tracks.

use crate::event::SequenceEvent;
use crate::track::{Track, TrackId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of an event inside a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRef {
    /// Track index in clip order
    pub track: usize,
    /// Event index within the track
    pub index: usize,
}

/// An authored clip: the unit handed to the controller for playback.
///
/// Clips are read-only while playing; the controller shares them through an
/// `Arc` and never mutates authored data.
#[derive(Debug)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Clip name
    pub name: String,
    /// Tracks in this clip
    tracks: IndexMap<TrackId, Track>,
    /// Frame rate (display only)
    pub frame_rate: f32,
}

impl Clip {
    /// Create a new clip
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClipId::new(),
            name: name.into(),
            tracks: IndexMap::new(),
            frame_rate: 60.0,
        }
    }

    /// Add a track
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.insert(id, track);
        id
    }

    /// Add a track (builder form)
    pub fn with_track(mut self, track: Track) -> Self {
        self.add_track(track);
        self
    }

    /// Remove a track, keeping the order of the rest
    pub fn remove_track(&mut self, track_id: TrackId) -> Option<Track> {
        self.tracks.shift_remove(&track_id)
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Get a mutable track
    pub fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&track_id)
    }

    /// Get all tracks
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Get an event by position
    pub fn event(&self, event: EventRef) -> Option<&SequenceEvent> {
        self.tracks
            .get_index(event.track)
            .and_then(|(_, track)| track.event(event.index))
    }

    /// Iterate every event with its position
    pub fn events(&self) -> impl Iterator<Item = (EventRef, &SequenceEvent)> {
        self.tracks
            .values()
            .enumerate()
            .flat_map(|(track, t)| {
                t.events()
                    .iter()
                    .enumerate()
                    .map(move |(index, e)| (EventRef { track, index }, e))
            })
    }

    /// Get the duration based on track content
    pub fn content_duration(&self) -> f32 {
        self.tracks.values().map(Track::duration).fold(0.0, f32::max)
    }

    /// Convert time to frame number
    pub fn time_to_frame(&self, time: f32) -> u32 {
        (time * self.frame_rate) as u32
    }

    /// Convert frame number to time
    pub fn frame_to_time(&self, frame: u32) -> f32 {
        frame as f32 / self.frame_rate
    }
}

impl Default for Clip {
    fn default() -> Self {
        Self::new("Untitled Clip")
    }
}
